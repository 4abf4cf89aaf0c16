//! # Tweetapp Library
//!
//! A Rust web service backing a small tweet application: user registration,
//! login and password reset, plus posting, editing, deleting, liking and
//! replying to tweets.
//!
//! ## Configuration
//!
//! - `PORT`: Server port (defaults to 3000)
//! - `DATABASE_URL`: PostgreSQL connection string (in-memory store when unset)
//! - `SESSION_KEY`: 32-byte hex key sealing session tokens
//! - `SESSION_TTL_HOURS`: Session lifetime (defaults to 24)
//!
//! ## API Endpoints
//!
//! All under `/api/v1.0/tweets`:
//!
//! - `POST /register`, `POST /login`, `POST /logout`
//! - `GET /{username}/forgot`, `POST /reset`
//! - `GET /all`, `GET /users/all`, `GET /user/search/{username}`, `GET /{username}`
//! - `POST /{username}/add`, `PUT /{username}/update/{id}`, `DELETE /{username}/delete/{id}`
//! - `PUT /{username}/like/{id}`, `POST /{username}/reply/{id}`
//!
//! Plus `GET /health` at the root.

pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod password;
pub mod routes;
pub mod service;
pub mod session;
pub mod state;
pub mod store;
pub mod validation;

// Re-export commonly used types and functions
pub use config::{get_server_port, AppConfig};
pub use error::AppError;
pub use routes::{build_router, API_PREFIX};
pub use state::AppState;
