use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/user/find", get(handlers::profile))
        .route("/api/mood", get(handlers::list_moods).post(handlers::record_mood))
        .route("/api/mood/series", get(handlers::mood_series))
        .route("/api/stats", get(handlers::get_stats))
        .with_state(state)
}
