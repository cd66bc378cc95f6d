mod config;
mod constants;
mod outcome;
mod stats;

pub use config::*;
pub use constants::*;
pub use outcome::*;
pub use stats::*;
