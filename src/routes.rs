//! Router assembly.

use axum::{
    http::{header, HeaderValue},
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::handlers::{
    handle_all_tweets, handle_all_users, handle_delete_tweet, handle_forgot_password,
    handle_health, handle_like_tweet, handle_login, handle_logout, handle_post_tweet,
    handle_register, handle_reply_tweet, handle_reset_password, handle_search_users,
    handle_update_tweet, handle_user_tweets,
};
use crate::state::AppState;

/// Path prefix for every tweet API route.
pub const API_PREFIX: &str = "/api/v1.0/tweets";

/// The tweet API routes, relative to [`API_PREFIX`].
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handle_register))
        .route("/login", post(handle_login))
        .route("/logout", post(handle_logout))
        .route("/reset", post(handle_reset_password))
        .route("/all", get(handle_all_tweets))
        .route("/users/all", get(handle_all_users))
        .route("/user/search/:username", get(handle_search_users))
        .route("/:username", get(handle_user_tweets))
        .route("/:username/forgot", get(handle_forgot_password))
        .route("/:username/add", post(handle_post_tweet))
        .route("/:username/update/:id", put(handle_update_tweet))
        .route("/:username/delete/:id", delete(handle_delete_tweet))
        .route("/:username/like/:id", put(handle_like_tweet))
        .route("/:username/reply/:id", post(handle_reply_tweet))
}

/// Builds the application router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .nest(API_PREFIX, api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                )),
        )
}
