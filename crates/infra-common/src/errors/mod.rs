pub mod context;
pub mod types;

pub use context::ErrorContext;
pub use types::{Error, Result};
