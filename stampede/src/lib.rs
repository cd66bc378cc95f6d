#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod aggregator;
pub mod client;
pub mod controller;
pub(crate) mod dispatcher;
mod error;
pub mod reporter;

pub use aggregator::Aggregator;
pub use client::{BoundedClient, Invoke};
pub use controller::RunController;
pub use error::RunError;

pub mod prelude {
    pub use crate::client::Invoke;
    pub use crate::controller::RunController;
    pub use stampede_core::{Outcome, Payload, RequestId, RunConfig, RunReport, RunState};
}
