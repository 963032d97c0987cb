pub mod config;
pub mod error;
pub mod types;

pub use config::BrollyConfig;
pub use error::{BrollyError, Result};
pub use types::*;
