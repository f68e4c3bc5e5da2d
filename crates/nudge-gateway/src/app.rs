use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use nudge_core::config::NudgeConfig;
use nudge_directory::DirectoryStore;
use nudge_dispatch::DispatchStore;
use nudge_notify::{NotifierRegistry, TemplateEngine};

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: NudgeConfig,
    pub directory: DirectoryStore,
    pub dispatch: DispatchStore,
    pub notifiers: NotifierRegistry,
    pub templates: TemplateEngine,
}

impl AppState {
    pub fn new(
        config: NudgeConfig,
        directory: DirectoryStore,
        dispatch: DispatchStore,
        notifiers: NotifierRegistry,
        templates: TemplateEngine,
    ) -> Self {
        Self {
            config,
            directory,
            dispatch,
            notifiers,
            templates,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/cron/drip", post(crate::http::drip::drip_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
