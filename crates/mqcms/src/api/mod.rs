//! HTTP edge router: websocket upgrades, publish endpoints, media and
//! settings management, and the static frontend.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
