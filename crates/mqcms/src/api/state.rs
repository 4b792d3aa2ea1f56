//! Shared application state.

use std::sync::Arc;

use axum::extract::FromRef;
use mqcms_protocol::Envelope;
use tokio::sync::Mutex;
use tracing::warn;

use crate::auth::AuthState;
use crate::config::AppConfig;
use crate::storage::Storage;
use crate::ws::{HubHandle, HubLocator};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub hubs: Arc<HubLocator>,
    /// Uploaded media objects.
    pub media: Arc<dyn Storage>,
    /// JSON documents such as display settings.
    pub documents: Arc<dyn Storage>,
    /// Serializes read-modify-write updates of layout documents.
    pub layout_lock: Arc<Mutex<()>>,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        media: Arc<dyn Storage>,
        documents: Arc<dyn Storage>,
        auth: AuthState,
    ) -> Self {
        let hubs = Arc::new(HubLocator::new(config.hub.clone()));
        Self {
            config: Arc::new(config),
            hubs,
            media,
            documents,
            layout_lock: Arc::new(Mutex::new(())),
            auth,
        }
    }

    /// The hub every display listens on.
    pub fn hub(&self) -> HubHandle {
        self.hubs.default_hub()
    }

    /// Tell displays that content changed. The mutation has already
    /// succeeded, so a failed publish is only logged.
    pub async fn notify(&self, update: Envelope) {
        let kind = update.kind;
        if let Err(e) = self.hub().publish(update).await {
            warn!("Failed to publish {} after a successful change: {}", kind, e);
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}
