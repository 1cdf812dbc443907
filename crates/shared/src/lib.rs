pub mod config;
pub mod tracing;

pub use config::*;
pub use self::tracing::*;
