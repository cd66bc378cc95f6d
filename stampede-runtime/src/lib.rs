pub mod chat;
pub mod cli;
mod error;
pub mod runtime;

pub use crate::chat::{ChatClient, ChatTarget};
pub use crate::error::RuntimeError;
pub use crate::runtime::StampedeRuntime;
