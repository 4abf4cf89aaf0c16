//! HTTP route handlers for the tweet service.
//!
//! Each handler extracts its inputs, makes exactly one call on a collaborator
//! and maps the outcome to a status code. Failures are [`AppError`]s and render
//! through its `IntoResponse` impl.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use log::{debug, info};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::{
    Credentials, NewUser, PasswordReset, Tweet, TweetInput, User, UserResponse,
};
use crate::service::StatusMap;
use crate::session::AuthSession;
use crate::state::AppState;
use crate::validation::sanitize_for_logging;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// Handles GET requests to the `/health` endpoint.
///
/// # Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "tweetapp"
/// }
/// ```
pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "tweetapp"}))
}

/// Handles `POST /register`.
///
/// Returns `201 Created` with the new user's profile, or `409 Conflict` when
/// the username is already taken.
pub async fn handle_register(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let new_user = body(payload)?;
    let user = state.users.register(new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Handles `POST /login`.
///
/// On success the session token is returned in the body and also set as the
/// `tweetapp_session` cookie. Bad credentials yield `401` and no cookie.
pub async fn handle_login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let credentials = body(payload)?;
    let user = state.users.login(credentials).await?;

    let session = state.sessions.issue(&user.username)?;
    let cookie = state.sessions.cookie_for(&session);
    let response = UserResponse {
        user,
        token: session.token,
        expires_in: session.expires_in,
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(response)))
}

/// Handles `POST /logout` by expiring the session cookie.
///
/// Tokens are stateless, so a copied bearer token stays valid until it expires.
pub async fn handle_logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, state.sessions.clearing_cookie())],
        Json(json!({"status": "logged-out"})),
    )
}

/// Handles `GET /{username}/forgot`.
pub async fn handle_forgot_password(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<StatusMap>, AppError> {
    info!(
        "Forgot password request for {}",
        sanitize_for_logging(&username, 40)
    );
    Ok(Json(state.users.forgot_password(&username).await?))
}

/// Handles `POST /reset`.
pub async fn handle_reset_password(
    State(state): State<AppState>,
    payload: Result<Json<PasswordReset>, JsonRejection>,
) -> Result<Json<StatusMap>, AppError> {
    let reset = body(payload)?;
    info!(
        "Password reset request for {}",
        sanitize_for_logging(&reset.username, 40)
    );
    Ok(Json(state.users.reset_password(reset).await?))
}

/// Handles `GET /all`.
pub async fn handle_all_tweets(
    State(state): State<AppState>,
) -> Result<Json<Vec<Tweet>>, AppError> {
    let tweets = state.tweets.all_tweets().await?;
    debug!("Returning {} tweets", tweets.len());
    Ok(Json(tweets))
}

/// Handles `GET /users/all`.
pub async fn handle_all_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.users.list_users().await?))
}

/// Handles `GET /user/search/{username}`. No match yields `404`.
pub async fn handle_search_users(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.users.search_users(&username).await?))
}

/// Handles `GET /{username}`.
pub async fn handle_user_tweets(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<Tweet>>, AppError> {
    Ok(Json(state.tweets.tweets_by_user(&username).await?))
}

/// Handles `POST /{username}/add`. Requires a session for `username`.
pub async fn handle_post_tweet(
    State(state): State<AppState>,
    Path(username): Path<String>,
    session: AuthSession,
    payload: Result<Json<TweetInput>, JsonRejection>,
) -> Result<Json<Tweet>, AppError> {
    session.require_user(&username)?;
    let input = body(payload)?;
    Ok(Json(state.tweets.post_tweet(&username, input).await?))
}

/// Handles `PUT /{username}/update/{id}`. Only the author may update.
pub async fn handle_update_tweet(
    State(state): State<AppState>,
    Path((username, tweet_id)): Path<(String, String)>,
    session: AuthSession,
    payload: Result<Json<TweetInput>, JsonRejection>,
) -> Result<Json<Tweet>, AppError> {
    session.require_user(&username)?;
    let input = body(payload)?;
    Ok(Json(
        state.tweets.update_tweet(&username, &tweet_id, input).await?,
    ))
}

/// Handles `DELETE /{username}/delete/{id}`. Only the author may delete.
pub async fn handle_delete_tweet(
    State(state): State<AppState>,
    Path((username, tweet_id)): Path<(String, String)>,
    session: AuthSession,
) -> Result<StatusCode, AppError> {
    session.require_user(&username)?;
    state.tweets.delete_tweet(&username, &tweet_id).await?;
    Ok(StatusCode::OK)
}

/// Handles `PUT /{username}/like/{id}`.
pub async fn handle_like_tweet(
    State(state): State<AppState>,
    Path((username, tweet_id)): Path<(String, String)>,
    session: AuthSession,
) -> Result<StatusCode, AppError> {
    session.require_user(&username)?;
    state.tweets.like_tweet(&username, &tweet_id).await?;
    Ok(StatusCode::OK)
}

/// Handles `POST /{username}/reply/{id}`.
///
/// Returns the created reply. Any failure, including a malformed body, comes
/// back as a typed error response rather than a placeholder tweet.
pub async fn handle_reply_tweet(
    State(state): State<AppState>,
    Path((username, tweet_id)): Path<(String, String)>,
    session: AuthSession,
    payload: Result<Json<TweetInput>, JsonRejection>,
) -> Result<Json<Tweet>, AppError> {
    session.require_user(&username)?;
    let input = body(payload)?;
    Ok(Json(
        state.tweets.reply_tweet(&username, &tweet_id, input).await?,
    ))
}
