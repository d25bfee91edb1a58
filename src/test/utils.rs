#[cfg(test)]
pub mod test_db {
    use crate::auth::{Identity, hash_password};
    use crate::db::{GoalRepository, SqliteGoalRepository, SqliteUserRepository, UserRepository};
    use crate::error::AppError;
    use crate::models::{Goal, LogEntry, Task, User};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Pool, Sqlite};
    use std::sync::Once;

    static INIT: Once = Once::new();

    pub fn standard_password(user_id: &str) -> String {
        format!("{}-password", user_id)
    }

    pub fn username_of(user_id: &str) -> String {
        format!("{}@example.com", user_id)
    }

    #[derive(Default)]
    pub struct TestDbBuilder {
        users: Vec<TestUser>,
        assignments: Vec<(String, String)>,
        goals: Vec<Goal>,
        tasks: Vec<Task>,
        logs: Vec<LogEntry>,
    }

    pub struct TestUser {
        pub id: String,
        pub name: String,
        pub password: String,
        pub is_admin: bool,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn user(mut self, id: &str) -> Self {
            self.users.push(TestUser {
                id: id.to_string(),
                name: format!("Name of {}", id),
                password: standard_password(id),
                is_admin: false,
            });
            self
        }

        pub fn admin(mut self, id: &str) -> Self {
            self.users.push(TestUser {
                id: id.to_string(),
                name: format!("Name of {}", id),
                password: standard_password(id),
                is_admin: true,
            });
            self
        }

        pub fn assign(mut self, user_id: &str, admin_id: &str) -> Self {
            self.assignments
                .push((user_id.to_string(), admin_id.to_string()));
            self
        }

        pub fn goal(
            mut self,
            id: &str,
            date: &str,
            category: &str,
            status: bool,
            user_id: &str,
        ) -> Self {
            self.goals.push(Goal {
                id: id.to_string(),
                date: date.to_string(),
                title: format!("Title of {}", id),
                category: category.to_string(),
                status,
                user_id: user_id.to_string(),
            });
            self
        }

        pub fn task(mut self, id: &str, goal_id: &str) -> Self {
            self.tasks.push(Task {
                id: id.to_string(),
                title: format!("Title of {}", id),
                description: format!("Description of {}", id),
                hint: format!("Hint for {}", id),
                goal_id: goal_id.to_string(),
            });
            self
        }

        pub fn log(mut self, timestamp: &str, user_id: &str) -> Self {
            self.logs.push(LogEntry {
                timestamp: timestamp.to_string(),
                user_id: user_id.to_string(),
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::Builder::from_env(
                    env_logger::Env::default().default_filter_or("debug"),
                )
                .is_test(true)
                .try_init();
            });

            // A single connection that never recycles keeps the in-memory
            // database alive for the whole test.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;

            let users = SqliteUserRepository::new(pool.clone(), Identity::anonymous());
            let goals = SqliteGoalRepository::new(pool.clone());

            for user in &self.users {
                users
                    .save(&User {
                        id: user.id.clone(),
                        username: username_of(&user.id),
                        name: user.name.clone(),
                        password: hash_password(&user.password)?,
                        is_admin: user.is_admin,
                    })
                    .await?;
            }

            for (user_id, admin_id) in &self.assignments {
                users.assign(user_id, admin_id).await?;
            }

            for goal in &self.goals {
                goals.save_goal(goal).await?;
            }

            for task in &self.tasks {
                goals.save_task(task).await?;
            }

            for entry in &self.logs {
                users.save_log_entry(entry).await?;
            }

            Ok(TestDb { pool })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
    }

    impl TestDb {
        /// User repository acting as `user_id`, or anonymously for `None`.
        pub fn users_as(&self, user_id: Option<&str>) -> SqliteUserRepository {
            let identity = match user_id {
                Some(id) => Identity::of(id),
                None => Identity::anonymous(),
            };
            SqliteUserRepository::new(self.pool.clone(), identity)
        }

        pub fn goals(&self) -> SqliteGoalRepository {
            SqliteGoalRepository::new(self.pool.clone())
        }
    }

    /// `admin-1` supervises `user-1` and `user-2`; `admin-2` supervises nobody
    /// and `user-3` has no supervisor.
    ///
    /// `user-1` owns a completed goal `goal-1` (2 tasks, "fitness") and an open
    /// goal `goal-2` (3 tasks, "reading") dated 2020-03-15, plus an open goal
    /// `goal-3` ("fitness") dated 2020-03-16. `user-3` owns `goal-4`.
    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .user("user-1")
            .user("user-2")
            .user("user-3")
            .admin("admin-1")
            .admin("admin-2")
            .assign("user-1", "admin-1")
            .assign("user-2", "admin-1")
            .goal("goal-1", "2020-03-15", "fitness", true, "user-1")
            .goal("goal-2", "2020-03-15", "reading", false, "user-1")
            .goal("goal-3", "2020-03-16", "fitness", false, "user-1")
            .goal("goal-4", "2020-03-15", "fitness", true, "user-3")
            .task("task-1", "goal-1")
            .task("task-2", "goal-1")
            .task("task-3", "goal-2")
            .task("task-4", "goal-2")
            .task("task-5", "goal-2")
            .task("task-6", "goal-4")
            .log("2021-03-04T08:47:19Z", "user-1")
            .log("2021-03-05T08:50:23Z", "user-1")
            .log("2021-03-04T08:50:23Z", "user-1")
            .build()
            .await
            .expect("Failed to build standard test database")
    }
}

#[cfg(test)]
pub mod test_utils {
    use std::sync::Arc;

    use rocket::http::{ContentType, Header, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;

    use crate::api::LoginResponse;
    use crate::clock::{Clock, FixedClock};
    use crate::env::AppConfig;
    use crate::init_rocket;

    pub use super::test_db::{
        TestDb, TestDbBuilder, create_standard_test_db, standard_password, username_of,
    };

    pub const TODAY: &str = "2020-03-15";

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(TODAY));
        let rocket = init_rocket(test_db.pool.clone(), clock, AppConfig::default());

        let client = Client::tracked(rocket)
            .await
            .expect("Failed to create test client");

        (client, test_db)
    }

    /// Logs `user_id` in with the standard password and returns the bearer token.
    pub async fn login_test_user(client: &Client, user_id: &str) -> String {
        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "username": username_of(user_id),
                    "password": standard_password(user_id),
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok, "Login failed for {}", user_id);

        let login: LoginResponse = response
            .into_json()
            .await
            .expect("Login response was not valid JSON");

        login.access_token
    }

    pub fn bearer(token: &str) -> Header<'static> {
        Header::new("Authorization", format!("Bearer {}", token))
    }
}
