// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, category, feed, profile, response, survey, wallet},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, categories, profile, surveys, wallet).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let category_routes = Router::new()
        .route("/", get(category::list_categories))
        .merge(
            Router::new()
                .route("/", post(category::create_category))
                .layer(require_auth.clone()),
        );

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me))
        .route("/", put(profile::update_profile))
        .route("/categories", put(profile::set_categories))
        .route("/history", get(profile::get_history))
        .layer(require_auth.clone());

    let survey_routes = Router::new()
        .route("/", post(survey::create_survey))
        .route("/feed", get(feed::list_feed))
        .route("/mine", get(survey::list_my_surveys))
        .route("/{id}", get(feed::get_survey))
        .route("/{id}/questions", post(survey::add_question))
        .route("/{id}/publish", post(survey::publish_survey))
        .route("/{id}/close", post(survey::close_survey))
        .route("/{id}/report", get(survey::get_report))
        .route("/{id}/responses", post(response::submit_response))
        .layer(require_auth.clone());

    let wallet_routes = Router::new()
        .route("/topup", post(wallet::top_up))
        .route("/withdraw", post(wallet::withdraw))
        .route("/transactions", get(wallet::list_transactions))
        .route("/reconcile", post(wallet::reconcile))
        .layer(require_auth);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/categories", category_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/surveys", survey_routes)
        .nest("/api/wallet", wallet_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
