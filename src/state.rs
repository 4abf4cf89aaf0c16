//! Shared state handed to every handler.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::events::EventProducer;
use crate::service::{StoreTweetService, StoreUserService, TweetService, UserService};
use crate::session::SessionManager;
use crate::store::{TweetStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserService>,
    pub tweets: Arc<dyn TweetService>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserService>,
        tweets: Arc<dyn TweetService>,
        sessions: SessionManager,
    ) -> Self {
        AppState {
            users,
            tweets,
            sessions: Arc::new(sessions),
        }
    }

    /// Wires the store-backed services over a store implementing both traits.
    pub fn from_store<S>(
        store: Arc<S>,
        sessions: SessionManager,
        events: EventProducer,
        hash_cost: u32,
    ) -> Self
    where
        S: UserStore + TweetStore + 'static,
    {
        let user_store: Arc<dyn UserStore> = store.clone();
        let tweet_store: Arc<dyn TweetStore> = store;
        let users = StoreUserService::new(user_store.clone(), hash_cost);
        let tweets = StoreTweetService::new(tweet_store, user_store, events);
        Self::new(Arc::new(users), Arc::new(tweets), sessions)
    }
}

impl FromRef<AppState> for Arc<SessionManager> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
