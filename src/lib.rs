pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::database::store::JobBoardStore;
use crate::middleware::auth::TokenVerifier;
use crate::services::{
    application_service::ApplicationService, invitation_service::InvitationService,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobBoardStore>,
    pub token_verifier: TokenVerifier,
    pub application_service: ApplicationService,
    pub invitation_service: InvitationService,
}

impl AppState {
    pub fn new(store: Arc<dyn JobBoardStore>, jwt_secret: &str) -> Self {
        let application_service = ApplicationService::new(store.clone());
        let invitation_service = InvitationService::new(store.clone());

        Self {
            store,
            token_verifier: TokenVerifier::new(jwt_secret),
            application_service,
            invitation_service,
        }
    }
}
