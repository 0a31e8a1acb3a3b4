pub mod config;
pub mod handlers;
pub mod models;
pub mod pulumi;

use axum::{Router, routing::get, routing::post};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use models::pulumi::StackRef;
use pulumi::PulumiClient;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Organization the stacks live in, resolved once at startup.
    pub org: Arc<str>,
    pub pulumi: PulumiClient,
}

impl AppState {
    pub fn stack<'a>(&'a self, name: &'a str) -> StackRef<'a> {
        StackRef {
            org: &self.org,
            project: &self.config.project,
            name,
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/sites", post(handlers::sites::create_site))
        .route(
            "/sites/{id}",
            get(handlers::sites::get_site)
                .post(handlers::sites::update_site)
                .delete(handlers::sites::delete_site),
        )
        .route("/healthz", get(handlers::health::healthz))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
