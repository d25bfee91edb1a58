use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, instrument, warn};

use crate::{
    auth::{hash_password, verify_password},
    db::{GoalRepository, UserRepository},
    error::AppError,
    models::{LogEntry, User},
    policy::{self, Payload},
};

const REGISTRATION_FIELDS: [&str; 4] = ["id", "username", "name", "password"];
const PROFILE_FIELDS: [&str; 3] = ["username", "name", "password"];
const ASSIGNMENT_FIELDS: [&str; 1] = ["user_id"];
const LOG_FIELDS: [&str; 1] = ["timestamp"];

/// `category -> (completed, total)`
pub type Progress = BTreeMap<String, (usize, usize)>;

/// User administration, authentication, check-in log and derived metrics.
pub struct UserService<'a> {
    users: &'a dyn UserRepository,
    goals: &'a dyn GoalRepository,
}

impl<'a> UserService<'a> {
    pub fn new(users: &'a dyn UserRepository, goals: &'a dyn GoalRepository) -> Self {
        Self { users, goals }
    }

    async fn authenticated_user(&self) -> Result<User, AppError> {
        policy::require_authenticated(self.users.current_user().await?)
    }

    async fn current_admin(&self) -> Result<User, AppError> {
        let admin = self.authenticated_user().await?;
        policy::require_admin(&admin)?;
        Ok(admin)
    }

    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError> {
        match self.users.get_by_username(username).await? {
            Some(user) if verify_password(password, &user.password) => {
                info!(user_id = %user.id, "Authentication successful");
                Ok(user)
            }
            _ => {
                warn!("Authentication failed");
                Err(AppError::InvalidCredentials)
            }
        }
    }

    pub async fn current_user(&self) -> Result<Option<User>, AppError> {
        self.users.current_user().await
    }

    #[instrument(skip(self))]
    pub async fn current_users_log(&self) -> Result<Vec<LogEntry>, AppError> {
        let current_user = self.authenticated_user().await?;
        self.users.log_by_user_id(&current_user.id).await
    }

    /// Distinct calendar days with at least one check-in, ascending.
    #[instrument(skip(self))]
    pub async fn current_users_routine_accomplishment(&self) -> Result<Vec<String>, AppError> {
        let log = self.current_users_log().await?;

        let days: BTreeSet<String> = log
            .iter()
            .map(|entry| entry.timestamp.chars().take(10).collect())
            .collect();

        Ok(days.into_iter().collect())
    }

    #[instrument(skip_all)]
    pub async fn update_current_users_log(&self, data: &Payload) -> Result<(), AppError> {
        let current_user = self.authenticated_user().await?;
        policy::require_fields(data, &LOG_FIELDS)?;

        let timestamp = policy::text_field(data, "timestamp");
        policy::require_timestamp_format(&timestamp)?;

        info!(user_id = %current_user.id, %timestamp, "Recording check-in");
        self.users
            .save_log_entry(&LogEntry {
                timestamp,
                user_id: current_user.id,
            })
            .await
    }

    /// One point per task of every completed goal.
    #[instrument(skip(self))]
    pub async fn current_users_points(&self) -> Result<usize, AppError> {
        let current_user = self.authenticated_user().await?;

        let mut points = 0;
        for goal in self.goals.goals_by_user_id(&current_user.id).await? {
            if goal.status {
                points += self.goals.tasks_by_goal_id(&goal.id).await?.len();
            }
        }

        Ok(points)
    }

    #[instrument(skip(self))]
    pub async fn assigned_users(&self) -> Result<Vec<User>, AppError> {
        let admin = self.current_admin().await?;
        self.users.assigned_users(&admin.id).await
    }

    #[instrument(skip_all)]
    pub async fn assign_user(&self, data: &Payload) -> Result<(), AppError> {
        policy::require_fields(data, &ASSIGNMENT_FIELDS)?;
        let admin = self.current_admin().await?;

        let user_id = policy::text_field(data, "user_id");
        policy::require_user(self.users, &user_id).await?;

        info!(%user_id, admin_id = %admin.id, "Assigning user");
        self.users.assign(&user_id, &admin.id).await
    }

    #[instrument(skip_all)]
    pub async fn unassign_user(&self, data: &Payload) -> Result<(), AppError> {
        policy::require_fields(data, &ASSIGNMENT_FIELDS)?;
        let admin = self.current_admin().await?;

        let user_id = policy::text_field(data, "user_id");
        policy::require_user(self.users, &user_id).await?;

        info!(%user_id, admin_id = %admin.id, "Unassigning user");
        self.users.unassign(&user_id, &admin.id).await
    }

    /// New accounts are always regular users.
    #[instrument(skip_all)]
    pub async fn register_user(&self, data: &Payload) -> Result<(), AppError> {
        policy::require_fields(data, &REGISTRATION_FIELDS)?;
        self.current_admin().await?;

        let user = User {
            id: policy::text_field(data, "id"),
            username: policy::text_field(data, "username"),
            name: policy::text_field(data, "name"),
            password: hash_password(&policy::text_field(data, "password"))?,
            is_admin: false,
        };

        info!(user_id = %user.id, username = %user.username, "Registering user");
        self.users.save(&user).await
    }

    /// Replaces username, name and password; the account is kept a regular user.
    #[instrument(skip(self, data))]
    pub async fn update_user_profile(&self, id: &str, data: &Payload) -> Result<(), AppError> {
        policy::require_fields(data, &PROFILE_FIELDS)?;
        self.current_admin().await?;
        policy::require_user(self.users, id).await?;

        let user = User {
            id: id.to_string(),
            username: policy::text_field(data, "username"),
            name: policy::text_field(data, "name"),
            password: hash_password(&policy::text_field(data, "password"))?,
            is_admin: false,
        };

        info!(username = %user.username, "Updating user profile");
        self.users.save(&user).await
    }

    #[instrument(skip(self))]
    pub async fn user_by_id(&self, id: &str) -> Result<User, AppError> {
        let admin = self.current_admin().await?;
        let user = policy::require_user(self.users, id).await?;
        policy::require_assignment(self.users, id, &admin.id).await?;

        Ok(user)
    }

    /// Completed and total goal counts per category. Categories without goals
    /// are absent.
    #[instrument(skip(self))]
    pub async fn progress_by_user_id(&self, user_id: &str) -> Result<Progress, AppError> {
        let admin = self.current_admin().await?;
        policy::require_user(self.users, user_id).await?;
        policy::require_assignment(self.users, user_id, &admin.id).await?;

        let mut progress = Progress::new();
        for goal in self.goals.goals_by_user_id(user_id).await? {
            let (completed, total) = progress.entry(goal.category).or_insert((0, 0));
            if goal.status {
                *completed += 1;
            }
            *total += 1;
        }

        Ok(progress)
    }
}
