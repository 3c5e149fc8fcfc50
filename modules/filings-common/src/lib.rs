pub mod config;
pub mod error;
pub mod types;

pub use config::{BlobBackend, Config};
pub use error::{FilingError, Result};
pub use types::*;
