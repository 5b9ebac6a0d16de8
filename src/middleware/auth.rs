use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::user::Caller;
use crate::AppState;

/// Claims issued by the identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub uid: i64,
    #[serde(default)]
    pub login: Option<String>,
    pub exp: usize,
    #[serde(default)]
    pub permissions: Vec<i32>,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Caller::new(claims.uid, claims.permissions)
    }
}

fn unauthorized(reason: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": reason, "code": "UNAUTHORIZED"})),
    )
        .into_response()
}

/// `Ok(None)` when no Authorization header is present at all.
fn caller_from_request(req: &Request, secret: &[u8]) -> Result<Option<Caller>, &'static str> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let auth_str = auth_header.to_str().map_err(|_| "bad_authorization")?;
    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or("unsupported_scheme")?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            "invalid_token"
        })?;

    if data.claims.uid <= 0 {
        return Err("invalid_user_id");
    }
    Ok(Some(data.claims.into()))
}

pub async fn require_bearer_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match caller_from_request(&req, state.jwt_secret.as_bytes()) {
        Ok(Some(caller)) => {
            req.extensions_mut().insert(caller);
            next.run(req).await
        }
        Ok(None) => unauthorized("missing_authorization"),
        Err(reason) => unauthorized(reason),
    }
}

/// Lets anonymous requests through; a token that is present must still be valid.
pub async fn optional_bearer_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match caller_from_request(&req, state.jwt_secret.as_bytes()) {
        Ok(Some(caller)) => {
            req.extensions_mut().insert(caller);
            next.run(req).await
        }
        Ok(None) => next.run(req).await,
        Err(reason) => unauthorized(reason),
    }
}
