// Re-export all types so callers can use `domain::types::*`.

pub use self::config::*;
pub use self::core::*;
pub use self::trust::*;

mod config;
mod core;
mod trust;
