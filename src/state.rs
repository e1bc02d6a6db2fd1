// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    models::badge::BADGE_MILESTONES,
    services::{attempts::AttemptService, badges::BadgeEvaluator, rewards::RewardService},
    store::{AttemptStore, BadgeStore, QuizCatalog, RewardLedger, UserStore},
};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn QuizCatalog>,
    pub attempts: AttemptService,
    pub rewards: RewardService,
    pub badges: BadgeEvaluator,
    pub config: Config,
}

impl AppState {
    /// Wires every service to one store implementing all collaborators.
    pub fn from_store<S>(store: S, config: Config) -> Self
    where
        S: QuizCatalog + AttemptStore + RewardLedger + UserStore + BadgeStore + 'static,
    {
        let store = Arc::new(store);
        let badges = BadgeEvaluator::new(store.clone(), BADGE_MILESTONES);

        Self {
            catalog: store.clone(),
            attempts: AttemptService::new(store.clone(), store.clone()),
            rewards: RewardService::new(store.clone(), store, badges.clone()),
            badges,
            config,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for AttemptService {
    fn from_ref(state: &AppState) -> Self {
        state.attempts.clone()
    }
}

impl FromRef<AppState> for RewardService {
    fn from_ref(state: &AppState) -> Self {
        state.rewards.clone()
    }
}

impl FromRef<AppState> for BadgeEvaluator {
    fn from_ref(state: &AppState) -> Self {
        state.badges.clone()
    }
}

impl FromRef<AppState> for Arc<dyn QuizCatalog> {
    fn from_ref(state: &AppState) -> Self {
        state.catalog.clone()
    }
}
