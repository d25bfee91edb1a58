use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

use crate::error::AppError;
use rand::{Rng, distr::Alphanumeric};

const TOKEN_LENGTH: usize = 48;

#[derive(Debug, Clone)]
pub struct UserSession {
    pub id: i64,
    pub user_id: String,
    pub token: String,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbUserSession {
    pub id: Option<i64>,
    pub user_id: Option<String>,
    pub token: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
}

impl From<DbUserSession> for UserSession {
    fn from(session: DbUserSession) -> Self {
        Self {
            id: session.id.unwrap_or_default(),
            user_id: session.user_id.unwrap_or_default(),
            token: session.token.unwrap_or_default(),
            created_at: session.created_at.unwrap_or_default(),
            expires_at: session.expires_at.unwrap_or_default(),
        }
    }
}

impl UserSession {
    pub fn generate_token() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }

    pub fn expiry_from(now: DateTime<Utc>, hours: i64) -> Result<NaiveDateTime, AppError> {
        TimeDelta::try_hours(hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .map(|expires_at| expires_at.naive_utc())
            .ok_or_else(|| {
                AppError::Internal(format!("Session lifetime of {} hours overflows", hours))
            })
    }

    pub fn is_valid(&self) -> bool {
        self.expires_at > Utc::now().naive_utc()
    }
}
