use actix_web::{dev::Payload, error, http::header, Error, FromRequest, HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use futures::future::{err, ok, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod middleware;

pub const SESSION_COOKIE: &str = "session";

/// Claims of a session token issued by the auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // auth user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
}

/// Shared secret and audience session tokens are checked against.
#[derive(Clone)]
pub struct SessionKeys {
    secret: String,
    audience: String,
}

impl SessionKeys {
    pub fn new(secret: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            audience: audience.into(),
        }
    }

    pub fn create_token(
        &self,
        user_id: Uuid,
        email: Option<String>,
        expiration_seconds: u64,
    ) -> anyhow::Result<String> {
        let now = Utc::now();
        let exp = (now + Duration::seconds(expiration_seconds as i64)).timestamp() as usize;
        let iat = now.timestamp() as usize;

        let claims = Claims {
            sub: user_id.to_string(),
            email,
            aud: self.audience.clone(),
            exp,
            iat,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }

    pub fn validate_token(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(&[self.audience.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .ok()
    }
}

/// Bearer token from the Authorization header, falling back to the session
/// cookie.
pub fn session_token(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|auth_str| auth_str.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());

    bearer.or_else(|| req.cookie(SESSION_COOKIE).map(|c| c.value().to_string()))
}

pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Claims are put in the extensions by the session gate
        let user = req.extensions().get::<Claims>().and_then(|claims| {
            Uuid::parse_str(&claims.sub)
                .ok()
                .map(|user_id| AuthenticatedUser {
                    user_id,
                    email: claims.email.clone(),
                })
        });

        match user {
            Some(user) => ok(user),
            None => err(error::ErrorUnauthorized("User not authenticated")),
        }
    }
}
