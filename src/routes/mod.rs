pub mod health;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};

use crate::middleware::auth::{optional_bearer_auth, require_bearer_auth};
use crate::AppState;

pub fn router(state: AppState) -> Router {
    let read_api = Router::new()
        .route("/api/tests", get(tests::list_tests))
        .route("/api/tests/:test_id", get(tests::get_test))
        .route_layer(from_fn_with_state(state.clone(), optional_bearer_auth));

    let write_api = Router::new()
        .route("/api/tests", post(tests::create_test))
        .route("/api/tests/:test_id", delete(tests::delete_test))
        .route("/api/tests/:test_id/preview", put(tests::update_test_preview))
        .route("/api/tests/:test_id/apply", post(tests::apply_test))
        .route_layer(from_fn_with_state(state.clone(), require_bearer_auth));

    Router::new()
        .route("/health", get(health::health))
        .merge(read_api)
        .merge(write_api)
        .with_state(state)
}
