//! mqcms: media carousel CMS server.
//!
//! Displays hold a websocket to the realtime broadcast hub and refetch
//! content whenever an upload, deletion or settings change is announced.

pub mod api;
pub mod auth;
pub mod config;
pub mod display;
pub mod storage;
pub mod ws;

pub use config::AppConfig;
