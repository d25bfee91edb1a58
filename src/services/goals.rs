use serde_json::Value;
use tracing::{info, instrument};

use crate::{
    clock::Clock,
    db::{GoalRepository, UserRepository},
    error::AppError,
    models::{Goal, Task, User},
    policy::{self, Payload},
};

const GOAL_FIELDS: [&str; 6] = ["id", "date", "title", "category", "status", "user_id"];
const TASK_FIELDS: [&str; 5] = ["id", "title", "description", "hint", "goal_id"];

/// Goal and task operations, gated by the access policy.
pub struct GoalService<'a> {
    goals: &'a dyn GoalRepository,
    users: &'a dyn UserRepository,
    clock: &'a dyn Clock,
}

impl<'a> GoalService<'a> {
    pub fn new(
        goals: &'a dyn GoalRepository,
        users: &'a dyn UserRepository,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            goals,
            users,
            clock,
        }
    }

    async fn current_user(&self) -> Result<User, AppError> {
        policy::require_authenticated(self.users.current_user().await?)
    }

    async fn current_admin(&self) -> Result<User, AppError> {
        let admin = self.current_user().await?;
        policy::require_admin(&admin)?;
        Ok(admin)
    }

    #[instrument(skip(self))]
    pub async fn current_users_daily_goals(&self) -> Result<Vec<Goal>, AppError> {
        let current_user = self.current_user().await?;
        let today = self.clock.today();

        let goals = self.goals.goals_by_user_id(&current_user.id).await?;
        Ok(goals.into_iter().filter(|goal| goal.date == today).collect())
    }

    #[instrument(skip(self))]
    pub async fn tasks_by_goal_id(&self, goal_id: &str) -> Result<Vec<Task>, AppError> {
        let current_user = self.current_user().await?;
        let goal = policy::require_goal(self.goals, goal_id).await?;
        policy::require_goal_access(self.users, &goal, &current_user).await?;

        self.goals.tasks_by_goal_id(goal_id).await
    }

    #[instrument(skip(self))]
    pub async fn goals_by_date_for_user(
        &self,
        date: &str,
        user_id: &str,
    ) -> Result<Vec<Goal>, AppError> {
        let admin = self.current_admin().await?;
        policy::require_date_format(date)?;
        policy::require_user(self.users, user_id).await?;
        policy::require_assignment(self.users, user_id, &admin.id).await?;

        let goals = self.goals.goals_by_user_id(user_id).await?;
        Ok(goals.into_iter().filter(|goal| goal.date == date).collect())
    }

    #[instrument(skip_all)]
    pub async fn save_goal(&self, data: &Payload) -> Result<(), AppError> {
        let admin = self.current_admin().await?;
        policy::require_fields(data, &GOAL_FIELDS)?;

        let date = policy::text_field(data, "date");
        policy::require_date_format(&date)?;
        let status = data.get("status").unwrap_or(&Value::Null);
        policy::require_range(&[("status", status)], 0..=1)?;

        let user_id = policy::text_field(data, "user_id");
        policy::require_user(self.users, &user_id).await?;
        policy::require_assignment(self.users, &user_id, &admin.id).await?;

        let goal = Goal {
            id: policy::text_field(data, "id"),
            date,
            title: policy::text_field(data, "title"),
            category: policy::text_field(data, "category"),
            status: policy::flag_field(data, "status"),
            user_id,
        };

        info!(goal_id = %goal.id, user_id = %goal.user_id, "Saving goal");
        self.goals.save_goal(&goal).await
    }

    #[instrument(skip(self))]
    pub async fn delete_goal_by_id(&self, goal_id: &str) -> Result<(), AppError> {
        let admin = self.current_admin().await?;
        let goal = policy::require_goal(self.goals, goal_id).await?;
        policy::require_assignment(self.users, &goal.user_id, &admin.id).await?;

        self.goals.delete_goal_by_id(goal_id).await
    }

    #[instrument(skip_all)]
    pub async fn save_task(&self, data: &Payload) -> Result<(), AppError> {
        let admin = self.current_admin().await?;
        policy::require_fields(data, &TASK_FIELDS)?;

        let goal_id = policy::text_field(data, "goal_id");
        let goal = policy::require_goal(self.goals, &goal_id).await?;
        policy::require_goal_access(self.users, &goal, &admin).await?;

        let task = Task {
            id: policy::text_field(data, "id"),
            title: policy::text_field(data, "title"),
            description: policy::text_field(data, "description"),
            hint: policy::text_field(data, "hint"),
            goal_id,
        };

        info!(task_id = %task.id, goal_id = %task.goal_id, "Saving task");
        self.goals.save_task(&task).await
    }

    #[instrument(skip(self))]
    pub async fn delete_task_by_id(&self, task_id: &str) -> Result<(), AppError> {
        let admin = self.current_admin().await?;
        let task = policy::require_task(self.goals, task_id).await?;
        let goal = policy::require_goal(self.goals, &task.goal_id).await?;
        policy::require_goal_access(self.users, &goal, &admin).await?;

        self.goals.delete_task_by_id(task_id).await
    }
}
