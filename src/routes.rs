// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, attempt, quiz, reward},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public: quiz view, milestone catalog.
/// * Authenticated: attempts, progress, earned badges.
/// * Admin: quiz authoring.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let public_routes = Router::new()
        .route("/api/quizzes/{id}", get(quiz::get_quiz))
        .route("/api/rewards/milestones", get(reward::list_milestones));

    let attempt_routes = Router::new()
        .route(
            "/api/quiz-attempts",
            get(attempt::list_attempts).post(attempt::start_attempt),
        )
        .route("/api/quiz-attempts/{id}", get(attempt::get_attempt))
        .route("/api/quiz-attempts/{id}/submit", post(attempt::submit_attempt))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let reward_routes = Router::new()
        .route("/api/rewards/progress", post(reward::update_progress))
        .route("/api/rewards/badges", get(reward::list_my_badges))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/api/admin/quizzes", post(admin::create_quiz))
        // Auth first, then the admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(attempt_routes)
        .merge(reward_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
