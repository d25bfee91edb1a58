use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use sqlx::{Pool, Sqlite};
use tracing::Instrument;

use crate::db::get_session_by_token;

/// Resolves who is acting on the current request. Absence means "not logged in".
pub trait IdentityResolver: Send + Sync {
    fn current_identity(&self) -> Option<String>;
}

/// Per-request identity derived from an `Authorization: Bearer <token>` header.
///
/// The guard never rejects a request: a missing, unknown or expired token
/// resolves to an anonymous identity and each operation decides which failure
/// to surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity {
    user_id: Option<String>,
    token: Option<String>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn of(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            token: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl IdentityResolver for Identity {
    fn current_identity(&self) -> Option<String> {
        self.user_id.clone()
    }
}

impl<F> IdentityResolver for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn current_identity(&self) -> Option<String> {
        self()
    }
}

fn bearer_token<'r>(request: &'r Request<'_>) -> Option<&'r str> {
    request
        .headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn resolve(request: &Request<'_>) -> Outcome<Identity, ()> {
    let Some(token) = bearer_token(request) else {
        return Outcome::Success(Identity::anonymous());
    };

    let pool = match request.rocket().state::<Pool<Sqlite>>() {
        Some(pool) => pool,
        None => {
            tracing::error!("Database pool not found in managed state");
            return Outcome::Error((Status::InternalServerError, ()));
        }
    };

    match get_session_by_token(pool, token).await {
        Ok(Some(session)) if session.is_valid() => {
            tracing::info!(user_id = %session.user_id, "User authenticated via session token");
            Outcome::Success(Identity {
                user_id: Some(session.user_id),
                token: Some(token.to_string()),
            })
        }
        Ok(Some(_)) => {
            tracing::warn!("Session token expired");
            Outcome::Success(Identity {
                user_id: None,
                token: Some(token.to_string()),
            })
        }
        Ok(None) => {
            tracing::warn!("Invalid session token");
            Outcome::Success(Identity::anonymous())
        }
        Err(err) => {
            tracing::error!(error = ?err, "Failed to look up session token");
            Outcome::Error((Status::InternalServerError, ()))
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Identity {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        resolve(request)
            .instrument(tracing::info_span!("identity_guard"))
            .await
    }
}
