use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    models::{Role, Session, SessionUser},
};

/// Audience Supabase stamps on access tokens for signed-in users.
pub const SUPABASE_AUDIENCE: &str = "authenticated";

/// Claims
///
/// The subset of a Supabase access token's payload this service reads.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the auth user's UUID.
    pub sub: Uuid,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
    #[serde(default)]
    pub user_metadata: Option<UserMetadata>,
}

/// UserMetadata
///
/// Free-form metadata written at sign-up. Only the role and the verification flag
/// are read; everything else is ignored.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
}

impl From<Claims> for SessionUser {
    fn from(claims: Claims) -> Self {
        let metadata = claims.user_metadata.unwrap_or_default();
        SessionUser {
            id: claims.sub,
            email: claims.email,
            role: Role::from_metadata(metadata.role.as_deref()),
            email_verified: claims.email_confirmed_at.is_some()
                || metadata.email_verified.unwrap_or(false),
        }
    }
}

/// CurrentSession Extractor Result
///
/// The caller's session, anonymous when no Authorization header is sent.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

/// CurrentSession Extractor Implementation
///
/// 1. No Authorization header: anonymous session.
/// 2. Bearer token: decoded and verified (HS256, expiry, audience) with the
///    configured Supabase JWT secret.
///
/// Rejection: StatusCode::UNAUTHORIZED when a header is present but unusable.
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
            return Ok(CurrentSession(Session::anonymous()));
        };

        let token = auth_header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let user = decode_access_token(token, &config.jwt_secret)?;
        Ok(CurrentSession(Session::signed_in(user)))
    }
}

/// decode_access_token
///
/// Verifies a Supabase access token and maps its claims onto a session user.
pub fn decode_access_token(token: &str, secret: &str) -> Result<SessionUser, StatusCode> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.set_audience(&[SUPABASE_AUDIENCE]);

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Ok(data.claims.into()),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("access token expired"),
                other => tracing::debug!(reason = ?other, "access token rejected"),
            }
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// AuthUser Extractor Result
///
/// A signed-in caller. Handlers use the role for admin checks.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub email_verified: bool,
}

/// AuthUser Extractor Implementation
///
/// Same token handling as `CurrentSession`, but an anonymous caller is rejected
/// with StatusCode::UNAUTHORIZED.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state).await?;
        let user = session.user.ok_or(StatusCode::UNAUTHORIZED)?;
        Ok(AuthUser {
            id: user.id,
            role: user.role,
            email_verified: user.email_verified,
        })
    }
}
