//! Test utilities and common setup.

#![allow(dead_code)]

use axum::Router;
use mqcms::api::{self, AppState};
use mqcms::auth::AuthState;
use mqcms::config::AppConfig;
use mqcms::storage::create_storage;
use tempfile::TempDir;

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// A running application backed by temporary directories.
///
/// The directories are removed when this is dropped, so keep it alive for
/// the duration of the test.
pub struct TestApp {
    pub state: AppState,
    _media: TempDir,
    _documents: TempDir,
}

impl TestApp {
    pub fn router(&self) -> Router {
        api::create_router(self.state.clone())
    }
}

/// Create a test application with admin auth enabled.
pub fn test_app() -> TestApp {
    test_app_with(|_| {})
}

/// Like [`test_app`], with config changes applied before startup.
pub fn test_app_with(configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    let media = TempDir::new().unwrap();
    let documents = TempDir::new().unwrap();

    let mut config = AppConfig::default();
    config.auth.admin_token = Some(ADMIN_TOKEN.to_string());
    configure(&mut config);
    let auth = AuthState::new(&config.auth).unwrap();

    let state = AppState::new(
        config,
        create_storage(media.path()),
        create_storage(documents.path()),
        auth,
    );

    TestApp {
        state,
        _media: media,
        _documents: documents,
    }
}

pub fn bearer() -> String {
    format!("Bearer {ADMIN_TOKEN}")
}
