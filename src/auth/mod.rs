use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entities::user::UserRole, errors::ServiceError, AppState};

/// Claims carried by tokens minted by the external identity provider.
/// The provider owns session lifecycle; this service only verifies the
/// shared-secret signature and maps the subject to a local account row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize,
}

/// Typed principal resolved once per request and passed down the call chain.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub external_subject: String,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

pub type AuthenticatedUser = AuthUser;

/// Decode and validate a bearer token against the configured shared secret.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ServiceError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))
}

fn bearer_token(parts: &Parts) -> Result<String, ServiceError> {
    let header_value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized("missing authorization header".to_string()))?;

    header_value
        .strip_prefix("Bearer ")
        .map(|t| t.to_string())
        .ok_or_else(|| ServiceError::Unauthorized("malformed authorization header".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Resolved at most once per request; later extractions reuse it.
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let token = bearer_token(parts)?;
        let claims = decode_token(&token, &state.config.jwt_secret)?;

        let user = state
            .services
            .users
            .upsert_from_identity(&claims.sub, claims.email.as_deref(), claims.name.as_deref())
            .await?;

        let principal = AuthUser {
            id: user.id,
            external_subject: user.external_subject,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
        };

        parts.extensions.insert(principal.clone());
        Ok(principal)
    }
}

/// Principal guaranteed to carry the ADMIN role. Back-office routes take
/// this extractor instead of re-checking roles ad hoc.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ServiceError::Forbidden(
                "admin role required".to_string(),
            ));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test_secret_key_for_auth_unit_tests_32ch";

    fn mint(claims: &Claims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("token encodes")
    }

    #[test]
    fn round_trips_valid_token() {
        let claims = Claims {
            sub: "auth0|abc123".to_string(),
            email: Some("a@b.com".to_string()),
            name: Some("Ada".to_string()),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };

        let decoded = decode_token(&mint(&claims), SECRET).expect("valid token decodes");
        assert_eq!(decoded.sub, "auth0|abc123");
        assert_eq!(decoded.email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn rejects_wrong_secret() {
        let claims = Claims {
            sub: "auth0|abc123".to_string(),
            email: None,
            name: None,
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };

        let err = decode_token(&mint(&claims), "another_secret_entirely_32_chars!!")
            .expect_err("wrong secret must fail");
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[test]
    fn rejects_expired_token() {
        let claims = Claims {
            sub: "auth0|abc123".to_string(),
            email: None,
            name: None,
            exp: (chrono::Utc::now().timestamp() - 3600) as usize,
        };

        let err = decode_token(&mint(&claims), SECRET).expect_err("expired token must fail");
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }
}
