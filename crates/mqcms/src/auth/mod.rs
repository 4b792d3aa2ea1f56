//! Admin authentication for mutating endpoints.
//!
//! When an admin token is configured, uploads, deletions, settings writes and
//! publishes require `Authorization: Bearer <token>`. Without one, those
//! routes are open, which suits a kiosk on a private network.

mod config;
mod error;
mod middleware;

pub use config::{AuthConfig, ConfigValidationError};
pub use error::AuthError;
pub use middleware::{AuthState, RequireAdmin};
