pub mod config;
pub mod error;
pub mod types;

pub use config::ExamConfig;
pub use error::{ExamError, Result};
pub use types::*;
