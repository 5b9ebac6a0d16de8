pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use crate::config::Config;
use crate::database::TestStorage;
use crate::services::{access_policy::AccessPolicy, test_service::TestService};

#[derive(Clone)]
pub struct AppState {
    pub test_service: TestService,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(storage: Arc<dyn TestStorage>, config: &Config) -> Self {
        let access = AccessPolicy::new(config.privileged_permission);
        Self {
            test_service: TestService::new(storage, access),
            jwt_secret: Arc::from(config.jwt_secret.as_str()),
        }
    }
}
