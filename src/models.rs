use serde::{Deserialize, Serialize};

/// Stored account. `password` holds the bcrypt hash and is never serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub password: String,
    pub is_admin: bool,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbUser {
    pub id: Option<String>,
    pub username: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

impl From<DbUser> for User {
    fn from(user: DbUser) -> Self {
        Self {
            id: user.id.unwrap_or_default(),
            username: user.username.unwrap_or_default(),
            name: user.name.unwrap_or_default(),
            password: user.password.unwrap_or_default(),
            is_admin: user.is_admin.unwrap_or_default(),
        }
    }
}

/// Public view of a [`User`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserData {
    pub id: String,
    pub username: String,
    pub name: String,
    pub is_admin: bool,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            is_admin: user.is_admin,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Goal {
    pub id: String,
    pub date: String,
    pub title: String,
    pub category: String,
    pub status: bool,
    pub user_id: String,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbGoal {
    pub id: Option<String>,
    pub date: Option<String>,
    pub title: Option<String>,
    pub category: Option<String>,
    pub status: Option<bool>,
    pub user_id: Option<String>,
}

impl From<DbGoal> for Goal {
    fn from(goal: DbGoal) -> Self {
        Self {
            id: goal.id.unwrap_or_default(),
            date: goal.date.unwrap_or_default(),
            title: goal.title.unwrap_or_default(),
            category: goal.category.unwrap_or_default(),
            status: goal.status.unwrap_or_default(),
            user_id: goal.user_id.unwrap_or_default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub hint: String,
    pub goal_id: String,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbTask {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub hint: Option<String>,
    pub goal_id: Option<String>,
}

impl From<DbTask> for Task {
    fn from(task: DbTask) -> Self {
        Self {
            id: task.id.unwrap_or_default(),
            title: task.title.unwrap_or_default(),
            description: task.description.unwrap_or_default(),
            hint: task.hint.unwrap_or_default(),
            goal_id: task.goal_id.unwrap_or_default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: String,
    pub user_id: String,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbLogEntry {
    pub timestamp: Option<String>,
    pub user_id: Option<String>,
}

impl From<DbLogEntry> for LogEntry {
    fn from(entry: DbLogEntry) -> Self {
        Self {
            timestamp: entry.timestamp.unwrap_or_default(),
            user_id: entry.user_id.unwrap_or_default(),
        }
    }
}
