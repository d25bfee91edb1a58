#[macro_use]
extern crate rocket;

pub mod api;
pub mod auth;
pub mod clock;
pub mod db;
pub mod env;
pub mod error;
pub mod models;
pub mod policy;
pub mod services;
pub mod telemetry;
#[cfg(test)]
mod test;

use std::sync::Arc;

use api::{
    api_assign_user, api_auth_register, api_delete_goal, api_delete_task, api_get_assigned_users,
    api_get_daily_goals, api_get_goals_by_date, api_get_log, api_get_points, api_get_progress,
    api_get_routine_accomplishment, api_get_tasks, api_get_user, api_login, api_logout, api_me,
    api_register_user, api_save_goal, api_save_task, api_unassign_user, api_update_log,
    api_update_user_profile, bad_request_api, health, internal_error_api, not_found_api,
    unauthorized_api, unprocessable_api,
};
use clock::Clock;
use env::AppConfig;
use error::AppError;
use rocket::{Build, Rocket};
use sqlx::SqlitePool;
use telemetry::TelemetryFairing;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("{0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("Application error: {0}")]
    App(#[from] AppError),
    #[error("{0}")]
    Launch(Box<rocket::Error>),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

impl From<rocket::Error> for Error {
    fn from(value: rocket::Error) -> Self {
        Error::Launch(Box::new(value))
    }
}

pub fn init_rocket(pool: SqlitePool, clock: Arc<dyn Clock>, config: AppConfig) -> Rocket<Build> {
    info!("Starting goal tracker");

    rocket::build()
        .manage(pool)
        .manage(clock)
        .manage(config)
        .mount(
            "/api",
            routes![
                api_login,
                api_logout,
                api_me,
                api_register_user,
                api_auth_register,
                api_get_assigned_users,
                api_get_user,
                api_update_user_profile,
                api_assign_user,
                api_unassign_user,
                api_get_progress,
                api_get_goals_by_date,
                api_get_daily_goals,
                api_save_goal,
                api_delete_goal,
                api_get_tasks,
                api_save_task,
                api_delete_task,
                api_get_log,
                api_update_log,
                api_get_routine_accomplishment,
                api_get_points,
            ],
        )
        .register(
            "/api",
            catchers![
                bad_request_api,
                unauthorized_api,
                not_found_api,
                unprocessable_api,
                internal_error_api,
            ],
        )
        .mount("/api", routes![health])
        .attach(TelemetryFairing)
}
