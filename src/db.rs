use chrono::{NaiveDateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::{
    auth::{DbUserSession, IdentityResolver, UserSession},
    error::{AppError, FieldError},
    models::{DbGoal, DbLogEntry, DbTask, DbUser, Goal, LogEntry, Task, User},
};

const USER_COLUMNS: &str = "id, username, name, password, is_admin";
const GOAL_COLUMNS: &str = "id, date, title, category, status, user_id";
const TASK_COLUMNS: &str = "id, title, description, hint, goal_id";

/// Users, admin assignments and check-in log.
#[rocket::async_trait]
pub trait UserRepository: Send + Sync {
    /// The user behind the injected identity, if any.
    async fn current_user(&self) -> Result<Option<User>, AppError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    /// Upsert keyed by `id`.
    async fn save(&self, user: &User) -> Result<(), AppError>;
    async fn assigned_users(&self, admin_id: &str) -> Result<Vec<User>, AppError>;
    async fn assign(&self, user_id: &str, admin_id: &str) -> Result<(), AppError>;
    async fn unassign(&self, user_id: &str, admin_id: &str) -> Result<(), AppError>;
    async fn log_by_user_id(&self, user_id: &str) -> Result<Vec<LogEntry>, AppError>;
    /// Upsert keyed by `(timestamp, user_id)`.
    async fn save_log_entry(&self, entry: &LogEntry) -> Result<(), AppError>;
}

/// Goals and their tasks.
#[rocket::async_trait]
pub trait GoalRepository: Send + Sync {
    async fn get_goal_by_id(&self, id: &str) -> Result<Option<Goal>, AppError>;
    async fn goals_by_user_id(&self, user_id: &str) -> Result<Vec<Goal>, AppError>;
    async fn save_goal(&self, goal: &Goal) -> Result<(), AppError>;
    /// Removes the goal and all of its tasks atomically.
    async fn delete_goal_by_id(&self, id: &str) -> Result<(), AppError>;
    async fn get_task_by_id(&self, id: &str) -> Result<Option<Task>, AppError>;
    async fn tasks_by_goal_id(&self, goal_id: &str) -> Result<Vec<Task>, AppError>;
    async fn save_task(&self, task: &Task) -> Result<(), AppError>;
    async fn delete_task_by_id(&self, id: &str) -> Result<(), AppError>;
}

pub struct SqliteUserRepository {
    pool: Pool<Sqlite>,
    identity: Box<dyn IdentityResolver>,
}

impl SqliteUserRepository {
    pub fn new(pool: Pool<Sqlite>, identity: impl IdentityResolver + 'static) -> Self {
        Self {
            pool,
            identity: Box::new(identity),
        }
    }
}

#[rocket::async_trait]
impl UserRepository for SqliteUserRepository {
    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<Option<User>, AppError> {
        match self.identity.current_identity() {
            Some(id) => self.get_by_id(&id).await,
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        info!("Fetching user by ID");
        let row = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    #[instrument(skip(self))]
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        info!("Getting user by username");
        let row = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {} FROM users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    #[instrument(skip_all, fields(user_id = %user.id, username = %user.username))]
    async fn save(&self, user: &User) -> Result<(), AppError> {
        info!("Saving user");
        sqlx::query(
            "INSERT INTO users (id, username, name, password, is_admin)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                username = excluded.username,
                name = excluded.name,
                password = excluded.password,
                is_admin = excluded.is_admin",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.password)
        .bind(user.is_admin)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            let username_taken = matches!(
                &err,
                sqlx::Error::Database(db_err) if db_err.is_unique_violation()
            );
            if username_taken {
                AppError::bad_request("username", FieldError::BadValue)
            } else {
                AppError::Database(err)
            }
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn assigned_users(&self, admin_id: &str) -> Result<Vec<User>, AppError> {
        info!("Getting users assigned to admin");
        let rows = sqlx::query_as::<_, DbUser>(
            "SELECT u.id, u.username, u.name, u.password, u.is_admin
             FROM admin_users a
             JOIN users u ON u.id = a.user_id
             WHERE a.admin_id = ?
             ORDER BY a.rowid",
        )
        .bind(admin_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    #[instrument(skip(self))]
    async fn assign(&self, user_id: &str, admin_id: &str) -> Result<(), AppError> {
        info!("Assigning user to admin");
        sqlx::query(
            "INSERT INTO admin_users (admin_id, user_id) VALUES (?, ?)
             ON CONFLICT (admin_id, user_id) DO NOTHING",
        )
        .bind(admin_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn unassign(&self, user_id: &str, admin_id: &str) -> Result<(), AppError> {
        info!("Unassigning user from admin");
        sqlx::query("DELETE FROM admin_users WHERE admin_id = ? AND user_id = ?")
            .bind(admin_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn log_by_user_id(&self, user_id: &str) -> Result<Vec<LogEntry>, AppError> {
        info!("Getting user log");
        let rows = sqlx::query_as::<_, DbLogEntry>(
            "SELECT timestamp, user_id FROM logs WHERE user_id = ? ORDER BY rowid",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LogEntry::from).collect())
    }

    #[instrument(skip(self))]
    async fn save_log_entry(&self, entry: &LogEntry) -> Result<(), AppError> {
        info!("Saving log entry");
        sqlx::query(
            "INSERT INTO logs (timestamp, user_id) VALUES (?, ?)
             ON CONFLICT (timestamp, user_id) DO NOTHING",
        )
        .bind(&entry.timestamp)
        .bind(&entry.user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

pub struct SqliteGoalRepository {
    pool: Pool<Sqlite>,
}

impl SqliteGoalRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[rocket::async_trait]
impl GoalRepository for SqliteGoalRepository {
    #[instrument(skip(self))]
    async fn get_goal_by_id(&self, id: &str) -> Result<Option<Goal>, AppError> {
        info!("Getting goal");
        let row = sqlx::query_as::<_, DbGoal>(&format!(
            "SELECT {} FROM goals WHERE id = ?",
            GOAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Goal::from))
    }

    #[instrument(skip(self))]
    async fn goals_by_user_id(&self, user_id: &str) -> Result<Vec<Goal>, AppError> {
        info!("Getting goals for user");
        let rows = sqlx::query_as::<_, DbGoal>(&format!(
            "SELECT {} FROM goals WHERE user_id = ? ORDER BY rowid",
            GOAL_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Goal::from).collect())
    }

    #[instrument(skip_all, fields(goal_id = %goal.id))]
    async fn save_goal(&self, goal: &Goal) -> Result<(), AppError> {
        info!("Saving goal");
        sqlx::query(
            "INSERT INTO goals (id, date, title, category, status, user_id)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                date = excluded.date,
                title = excluded.title,
                category = excluded.category,
                status = excluded.status,
                user_id = excluded.user_id",
        )
        .bind(&goal.id)
        .bind(&goal.date)
        .bind(&goal.title)
        .bind(&goal.category)
        .bind(goal.status)
        .bind(&goal.user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_goal_by_id(&self, id: &str) -> Result<(), AppError> {
        info!("Deleting goal and its tasks");
        let mut tx = self.pool.begin().await?;

        let tasks = sqlx::query("DELETE FROM tasks WHERE goal_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM goals WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(tasks_deleted = tasks.rows_affected(), "Goal deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_task_by_id(&self, id: &str) -> Result<Option<Task>, AppError> {
        info!("Getting task");
        let row = sqlx::query_as::<_, DbTask>(&format!(
            "SELECT {} FROM tasks WHERE id = ?",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Task::from))
    }

    #[instrument(skip(self))]
    async fn tasks_by_goal_id(&self, goal_id: &str) -> Result<Vec<Task>, AppError> {
        info!("Getting tasks for goal");
        let rows = sqlx::query_as::<_, DbTask>(&format!(
            "SELECT {} FROM tasks WHERE goal_id = ? ORDER BY rowid",
            TASK_COLUMNS
        ))
        .bind(goal_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    #[instrument(skip_all, fields(task_id = %task.id))]
    async fn save_task(&self, task: &Task) -> Result<(), AppError> {
        info!("Saving task");
        sqlx::query(
            "INSERT INTO tasks (id, title, description, hint, goal_id)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                hint = excluded.hint,
                goal_id = excluded.goal_id",
        )
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.hint)
        .bind(&task.goal_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_task_by_id(&self, id: &str) -> Result<(), AppError> {
        info!("Deleting task");
        sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[instrument(skip(pool, token))]
pub async fn create_user_session(
    pool: &Pool<Sqlite>,
    user_id: &str,
    token: &str,
    expires_at: NaiveDateTime,
) -> Result<i64, AppError> {
    info!("Creating user session");

    let res = sqlx::query("INSERT INTO user_sessions (user_id, token, expires_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, token))]
pub async fn get_session_by_token(
    pool: &Pool<Sqlite>,
    token: &str,
) -> Result<Option<UserSession>, AppError> {
    info!("Getting session by token");

    let session = sqlx::query_as::<_, DbUserSession>(
        "SELECT id, user_id, token, created_at, expires_at FROM user_sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(session.map(UserSession::from))
}

#[instrument(skip(pool, token))]
pub async fn invalidate_session(pool: &Pool<Sqlite>, token: &str) -> Result<(), AppError> {
    info!("Invalidating session");

    sqlx::query("DELETE FROM user_sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn clean_expired_sessions(pool: &Pool<Sqlite>) -> Result<u64, AppError> {
    info!("Cleaning expired sessions");

    let now = Utc::now().naive_utc();

    let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
