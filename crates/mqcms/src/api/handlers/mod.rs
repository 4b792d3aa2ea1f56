//! HTTP handlers.

pub mod layout;
pub mod media;
pub mod realtime;
pub mod settings;
mod system;

pub use system::{api_fallback, health, static_not_found};
