//! Access control policy shared by the services.
//!
//! Every check either passes silently or fails with a typed [`AppError`].
//! Services compose them in a fixed order: authentication, role, request
//! shape, existence, then ownership/assignment. Only the required-fields
//! check accumulates; everything else is fail-fast.

use std::ops::RangeInclusive;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    db::{GoalRepository, UserRepository},
    error::{AppError, FieldError, FieldErrors},
    models::{Goal, Task, User},
};

/// Untyped request body as received at the boundary.
pub type Payload = Map<String, Value>;

pub fn require_authenticated(current_user: Option<User>) -> Result<User, AppError> {
    current_user.ok_or(AppError::Unauthenticated)
}

pub fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin {
        Ok(())
    } else {
        warn!(user_id = %user.id, "Admin role required");
        Err(AppError::Forbidden)
    }
}

/// Reports every missing field at once. An explicit `null` counts as missing.
pub fn require_fields(payload: &Payload, fields: &[&str]) -> Result<(), AppError> {
    let missing: FieldErrors = fields
        .iter()
        .filter(|field| payload.get(**field).is_none_or(Value::is_null))
        .map(|field| (field.to_string(), FieldError::Required))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(missing))
    }
}

/// Integer view of a flag-like value; booleans read as 0/1.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Bool(flag) => Some(i64::from(*flag)),
        Value::Number(number) => number.as_i64(),
        _ => None,
    }
}

pub fn require_range(values: &[(&str, &Value)], range: RangeInclusive<i64>) -> Result<(), AppError> {
    let out_of_range: FieldErrors = values
        .iter()
        .filter(|(_, value)| !as_integer(value).is_some_and(|n| range.contains(&n)))
        .map(|(field, _)| (field.to_string(), FieldError::BadValue))
        .collect();

    if out_of_range.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(out_of_range))
    }
}

pub fn require_date_format(date: &str) -> Result<NaiveDate, AppError> {
    if date.len() != 10 {
        return Err(AppError::bad_request("date", FieldError::BadFormat));
    }

    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request("date", FieldError::BadFormat))
}

/// Accepts RFC 3339 timestamps and offset-less ISO-8601 date-times.
pub fn require_timestamp_format(timestamp: &str) -> Result<(), AppError> {
    let valid = DateTime::parse_from_rfc3339(timestamp).is_ok()
        || NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f").is_ok();

    if valid {
        Ok(())
    } else {
        Err(AppError::bad_request("timestamp", FieldError::BadFormat))
    }
}

pub async fn require_user(users: &dyn UserRepository, user_id: &str) -> Result<User, AppError> {
    users
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", user_id))
}

pub async fn require_goal(goals: &dyn GoalRepository, goal_id: &str) -> Result<Goal, AppError> {
    goals
        .get_goal_by_id(goal_id)
        .await?
        .ok_or_else(|| AppError::not_found("Goal", goal_id))
}

pub async fn require_task(goals: &dyn GoalRepository, task_id: &str) -> Result<Task, AppError> {
    goals
        .get_task_by_id(task_id)
        .await?
        .ok_or_else(|| AppError::not_found("Task", task_id))
}

/// Admins act only on users explicitly assigned to them.
pub async fn require_assignment(
    users: &dyn UserRepository,
    user_id: &str,
    admin_id: &str,
) -> Result<(), AppError> {
    let assigned = users.assigned_users(admin_id).await?;

    if assigned.iter().any(|user| user.id == user_id) {
        Ok(())
    } else {
        warn!(%user_id, %admin_id, "User is not assigned to admin");
        Err(AppError::Forbidden)
    }
}

/// Regular users reach only their own goals; admins reach the goals of their
/// assigned users.
pub async fn require_goal_access(
    users: &dyn UserRepository,
    goal: &Goal,
    acting_user: &User,
) -> Result<(), AppError> {
    if acting_user.is_admin {
        return require_assignment(users, &goal.user_id, &acting_user.id).await;
    }

    if goal.user_id == acting_user.id {
        Ok(())
    } else {
        warn!(goal_id = %goal.id, user_id = %acting_user.id, "Goal belongs to another user");
        Err(AppError::Forbidden)
    }
}

/// Reads a present field as text. Non-string scalars are rendered as JSON.
pub fn text_field(payload: &Payload, field: &str) -> String {
    match payload.get(field) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Reads a field already checked by [`require_range`] as a 0/1 flag.
pub fn flag_field(payload: &Payload, field: &str) -> bool {
    payload
        .get(field)
        .and_then(as_integer)
        .is_some_and(|n| n != 0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    fn user(id: &str, is_admin: bool) -> User {
        User {
            id: id.to_string(),
            username: format!("{}@example.com", id),
            name: id.to_string(),
            password: String::new(),
            is_admin,
        }
    }

    fn field_errors(err: AppError) -> Vec<(String, FieldError)> {
        match err {
            AppError::BadRequest(errors) => errors.into_iter().collect(),
            other => panic!("Expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_identity_is_unauthenticated() {
        let err = require_authenticated(None).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
        assert_eq!(
            err.payload(),
            json!({"msg": "This operation is not authorized. Please, log in."})
        );

        let resolved = require_authenticated(Some(user("user-1", false))).unwrap();
        assert_eq!(resolved.id, "user-1");
    }

    #[test]
    fn test_admin_role() {
        assert!(require_admin(&user("admin-1", true)).is_ok());

        let err = require_admin(&user("user-1", false)).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        assert_eq!(err.payload(), json!({"msg": "This operation is not authorized."}));
    }

    #[test]
    fn test_required_fields_reports_every_missing_field() {
        let fields = ["id", "title", "description", "hint", "goal_id"];

        let err = require_fields(&payload(json!({})), &fields).unwrap_err();
        assert_eq!(field_errors(err).len(), 5);

        let err = require_fields(
            &payload(json!({"id": "t1", "description": "d", "goal_id": "g1"})),
            &fields,
        )
        .unwrap_err();
        assert_eq!(
            field_errors(err),
            vec![
                ("hint".to_string(), FieldError::Required),
                ("title".to_string(), FieldError::Required),
            ]
        );

        let complete = json!({
            "id": "t1", "title": "t", "description": "d", "hint": "h", "goal_id": "g1"
        });
        assert!(require_fields(&payload(complete), &fields).is_ok());
    }

    #[test]
    fn test_required_fields_treats_null_as_missing() {
        let err = require_fields(&payload(json!({"user_id": null})), &["user_id"]).unwrap_err();
        assert_eq!(err.payload(), json!({"user_id": "REQUIRED"}));
    }

    #[test]
    fn test_range() {
        let zero = json!(0);
        let one = json!(1);
        let flag = json!(true);
        assert!(require_range(&[("status", &zero)], 0..=1).is_ok());
        assert!(require_range(&[("status", &one)], 0..=1).is_ok());
        assert!(require_range(&[("status", &flag)], 0..=1).is_ok());

        for bad in [json!(2), json!(-1), json!("status-with-wrong-format"), json!(0.5)] {
            let err = require_range(&[("status", &bad)], 0..=1).unwrap_err();
            assert_eq!(err.payload(), json!({"status": "BAD VALUE"}));
        }
    }

    #[test]
    fn test_date_format() {
        assert!(require_date_format("2020-03-15").is_ok());

        for bad in ["date-with-wrong-format", "2020-3-15", "2020-02-30", "15-03-2020", ""] {
            let err = require_date_format(bad).unwrap_err();
            assert_eq!(err.payload(), json!({"date": "BAD FORMAT"}), "{}", bad);
        }
    }

    #[test]
    fn test_timestamp_format() {
        assert!(require_timestamp_format("2021-03-04T08:47:19Z").is_ok());
        assert!(require_timestamp_format("2021-03-04T08:47:19.123+01:00").is_ok());
        assert!(require_timestamp_format("2021-03-04T08:47:19").is_ok());

        for bad in ["timestamp-in-wrong-format", "2021-03-04", "08:47:19"] {
            let err = require_timestamp_format(bad).unwrap_err();
            assert_eq!(err.payload(), json!({"timestamp": "BAD FORMAT"}), "{}", bad);
        }
    }

    #[test]
    fn test_field_readers() {
        let data = payload(json!({"title": "t", "status": 1, "hint": 7, "done": false}));
        assert_eq!(text_field(&data, "title"), "t");
        assert_eq!(text_field(&data, "hint"), "7");
        assert_eq!(text_field(&data, "missing"), "");
        assert!(flag_field(&data, "status"));
        assert!(!flag_field(&data, "done"));
    }
}
