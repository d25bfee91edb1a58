use std::sync::Arc;

use chrono::Utc;
use rocket::Request;
use rocket::State;
use rocket::http::Status;
use rocket::serde::{Deserialize, Serialize, json::Json};
use serde_json::{Value, json};
use sqlx::{Pool, Sqlite};

use crate::auth::{Identity, UserSession};
use crate::clock::Clock;
use crate::db::{
    SqliteGoalRepository, SqliteUserRepository, create_user_session, invalidate_session,
};
use crate::env::AppConfig;
use crate::error::{AppError, UNAUTHENTICATED_MSG};
use crate::models::{Goal, LogEntry, Task, UserData};
use crate::policy::Payload;
use crate::services::{GoalService, Progress, UserService};

fn repositories(
    db: &Pool<Sqlite>,
    identity: Identity,
) -> (SqliteUserRepository, SqliteGoalRepository) {
    (
        SqliteUserRepository::new(db.clone(), identity),
        SqliteGoalRepository::new(db.clone()),
    )
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserData,
}

#[post("/auth/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<LoginResponse>, AppError> {
    let (users, goals) = repositories(db, Identity::anonymous());
    let user = UserService::new(&users, &goals)
        .authenticate(&login.username, &login.password)
        .await?;

    let token = UserSession::generate_token();
    let expires_at = UserSession::expiry_from(Utc::now(), config.session_hours)?;
    create_user_session(db, &user.id, &token, expires_at).await?;

    Ok(Json(LoginResponse {
        access_token: token,
        user: UserData::from(user),
    }))
}

#[post("/auth/logout")]
pub async fn api_logout(
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    if let Some(token) = identity.token() {
        invalidate_session(db, token).await?;
    }

    Ok(Status::NoContent)
}

#[get("/auth/me")]
pub async fn api_me(
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Option<UserData>>, AppError> {
    let (users, goals) = repositories(db, identity);
    let user = UserService::new(&users, &goals).current_user().await?;

    Ok(Json(user.map(UserData::from)))
}

async fn register(
    identity: Identity,
    data: Json<Payload>,
    db: &Pool<Sqlite>,
) -> Result<Status, AppError> {
    let (users, goals) = repositories(db, identity);
    UserService::new(&users, &goals).register_user(&data).await?;

    Ok(Status::Ok)
}

#[post("/users", data = "<data>")]
pub async fn api_register_user(
    identity: Identity,
    data: Json<Payload>,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    register(identity, data, db).await
}

#[post("/auth/register", data = "<data>")]
pub async fn api_auth_register(
    identity: Identity,
    data: Json<Payload>,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    register(identity, data, db).await
}

#[get("/users")]
pub async fn api_get_assigned_users(
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<UserData>>, AppError> {
    let (users, goals) = repositories(db, identity);
    let assigned = UserService::new(&users, &goals).assigned_users().await?;

    Ok(Json(assigned.into_iter().map(UserData::from).collect()))
}

#[get("/users/<id>")]
pub async fn api_get_user(
    id: &str,
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<UserData>, AppError> {
    let (users, goals) = repositories(db, identity);
    let user = UserService::new(&users, &goals).user_by_id(id).await?;

    Ok(Json(UserData::from(user)))
}

#[patch("/users/<id>", data = "<data>")]
pub async fn api_update_user_profile(
    id: &str,
    identity: Identity,
    data: Json<Payload>,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    let (users, goals) = repositories(db, identity);
    UserService::new(&users, &goals)
        .update_user_profile(id, &data)
        .await?;

    Ok(Status::Ok)
}

#[post("/users/assign", data = "<data>")]
pub async fn api_assign_user(
    identity: Identity,
    data: Json<Payload>,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    let (users, goals) = repositories(db, identity);
    UserService::new(&users, &goals).assign_user(&data).await?;

    Ok(Status::Ok)
}

#[post("/users/unassign", data = "<data>")]
pub async fn api_unassign_user(
    identity: Identity,
    data: Json<Payload>,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    let (users, goals) = repositories(db, identity);
    UserService::new(&users, &goals).unassign_user(&data).await?;

    Ok(Status::Ok)
}

#[get("/users/<id>/progress")]
pub async fn api_get_progress(
    id: &str,
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Progress>, AppError> {
    let (users, goals) = repositories(db, identity);
    let progress = UserService::new(&users, &goals)
        .progress_by_user_id(id)
        .await?;

    Ok(Json(progress))
}

#[get("/users/<user_id>/goals/<date>")]
pub async fn api_get_goals_by_date(
    user_id: &str,
    date: &str,
    identity: Identity,
    db: &State<Pool<Sqlite>>,
    clock: &State<Arc<dyn Clock>>,
) -> Result<Json<Vec<Goal>>, AppError> {
    let (users, goals) = repositories(db, identity);
    let found = GoalService::new(&goals, &users, clock.inner().as_ref())
        .goals_by_date_for_user(date, user_id)
        .await?;

    Ok(Json(found))
}

#[get("/goals")]
pub async fn api_get_daily_goals(
    identity: Identity,
    db: &State<Pool<Sqlite>>,
    clock: &State<Arc<dyn Clock>>,
) -> Result<Json<Vec<Goal>>, AppError> {
    let (users, goals) = repositories(db, identity);
    let daily = GoalService::new(&goals, &users, clock.inner().as_ref())
        .current_users_daily_goals()
        .await?;

    Ok(Json(daily))
}

/// The path id fills in a body without one.
#[put("/goals/<id>", data = "<data>")]
pub async fn api_save_goal(
    id: &str,
    identity: Identity,
    data: Json<Payload>,
    db: &State<Pool<Sqlite>>,
    clock: &State<Arc<dyn Clock>>,
) -> Result<Status, AppError> {
    let mut data = data.into_inner();
    data.entry("id")
        .or_insert_with(|| Value::String(id.to_string()));

    let (users, goals) = repositories(db, identity);
    GoalService::new(&goals, &users, clock.inner().as_ref())
        .save_goal(&data)
        .await?;

    Ok(Status::Ok)
}

#[delete("/goals/<id>")]
pub async fn api_delete_goal(
    id: &str,
    identity: Identity,
    db: &State<Pool<Sqlite>>,
    clock: &State<Arc<dyn Clock>>,
) -> Result<Status, AppError> {
    let (users, goals) = repositories(db, identity);
    GoalService::new(&goals, &users, clock.inner().as_ref())
        .delete_goal_by_id(id)
        .await?;

    Ok(Status::Ok)
}

#[get("/goals/<id>/tasks")]
pub async fn api_get_tasks(
    id: &str,
    identity: Identity,
    db: &State<Pool<Sqlite>>,
    clock: &State<Arc<dyn Clock>>,
) -> Result<Json<Vec<Task>>, AppError> {
    let (users, goals) = repositories(db, identity);
    let tasks = GoalService::new(&goals, &users, clock.inner().as_ref())
        .tasks_by_goal_id(id)
        .await?;

    Ok(Json(tasks))
}

#[put("/goals/<goal_id>/tasks/<task_id>", data = "<data>")]
pub async fn api_save_task(
    goal_id: &str,
    task_id: &str,
    identity: Identity,
    data: Json<Payload>,
    db: &State<Pool<Sqlite>>,
    clock: &State<Arc<dyn Clock>>,
) -> Result<Status, AppError> {
    let mut data = data.into_inner();
    data.entry("id")
        .or_insert_with(|| Value::String(task_id.to_string()));
    data.entry("goal_id")
        .or_insert_with(|| Value::String(goal_id.to_string()));

    let (users, goals) = repositories(db, identity);
    GoalService::new(&goals, &users, clock.inner().as_ref())
        .save_task(&data)
        .await?;

    Ok(Status::Ok)
}

#[delete("/goals/<_goal_id>/tasks/<task_id>")]
pub async fn api_delete_task(
    _goal_id: &str,
    task_id: &str,
    identity: Identity,
    db: &State<Pool<Sqlite>>,
    clock: &State<Arc<dyn Clock>>,
) -> Result<Status, AppError> {
    let (users, goals) = repositories(db, identity);
    GoalService::new(&goals, &users, clock.inner().as_ref())
        .delete_task_by_id(task_id)
        .await?;

    Ok(Status::Ok)
}

#[get("/log")]
pub async fn api_get_log(
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<LogEntry>>, AppError> {
    let (users, goals) = repositories(db, identity);
    let log = UserService::new(&users, &goals).current_users_log().await?;

    Ok(Json(log))
}

#[post("/log/update", data = "<data>")]
pub async fn api_update_log(
    identity: Identity,
    data: Json<Payload>,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    let (users, goals) = repositories(db, identity);
    UserService::new(&users, &goals)
        .update_current_users_log(&data)
        .await?;

    Ok(Status::Ok)
}

#[get("/frequency")]
pub async fn api_get_routine_accomplishment(
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<String>>, AppError> {
    let (users, goals) = repositories(db, identity);
    let days = UserService::new(&users, &goals)
        .current_users_routine_accomplishment()
        .await?;

    Ok(Json(days))
}

#[get("/points")]
pub async fn api_get_points(
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<usize>, AppError> {
    let (users, goals) = repositories(db, identity);
    let points = UserService::new(&users, &goals)
        .current_users_points()
        .await?;

    Ok(Json(points))
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}

#[catch(400)]
pub fn bad_request_api(_req: &Request) -> Json<Value> {
    Json(json!({ "msg": "Malformed request body." }))
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Json<Value> {
    Json(json!({ "msg": UNAUTHENTICATED_MSG }))
}

#[catch(404)]
pub fn not_found_api(req: &Request) -> Json<Value> {
    Json(json!({ "msg": format!("Resource '{}' not found.", req.uri()) }))
}

#[catch(422)]
pub fn unprocessable_api(_req: &Request) -> Json<Value> {
    Json(json!({ "msg": "Request body must be a JSON object." }))
}

#[catch(500)]
pub fn internal_error_api(_req: &Request) -> Json<Value> {
    Json(json!({ "msg": "Internal server error" }))
}
