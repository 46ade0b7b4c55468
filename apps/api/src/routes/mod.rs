pub mod cards;
pub mod generate;
pub mod greetings;
pub mod health;
pub mod stats;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::services::{ServeDir, ServeFile};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let api: Router<AppState> = Router::new()
        .route("/cards", get(cards::list_cards).post(cards::upload_card))
        .route("/cards/:id", put(cards::update_card).delete(cards::delete_card))
        .route(
            "/greetings",
            get(greetings::list_greetings).post(greetings::create_greeting),
        )
        .route("/greetings/:id", delete(greetings::delete_greeting))
        .route("/generate", post(generate::generate_card))
        .route("/stats", get(stats::get_stats))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes));

    let mut router: Router<AppState> = Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(config.uploads_dir()))
        .nest_service("/generated", ServeDir::new(config.generated_dir()));

    // Single-page client: unknown paths fall back to its index.html.
    if let Some(dist) = &config.client_dist_dir {
        router = router.fallback_service(
            ServeDir::new(dist).not_found_service(ServeFile::new(dist.join("index.html"))),
        );
    }

    router.with_state(state)
}
