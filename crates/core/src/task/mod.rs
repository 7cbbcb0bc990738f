//! Scheduled tasks, their runs and logs, and the validator which gates
//! access to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::iam::Id;

pub mod service;
pub mod validator;

pub use self::service::TaskService;
pub use self::validator::{TaskServiceValidator, ValidatorOptions};

#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
	#[default]
	Active,
	Inactive,
}

/// A script executed on a schedule on behalf of an organization.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
	pub id: Id,
	#[serde(rename = "orgID")]
	pub organization_id: Id,
	#[serde(default)]
	pub organization: String,
	#[serde(rename = "ownerID", default, skip_serializing_if = "Option::is_none")]
	pub owner_id: Option<Id>,
	pub name: String,
	#[serde(default)]
	pub status: TaskStatus,
	pub flux: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub every: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub cron: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub offset: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub latest_completed: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created_at: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub updated_at: Option<DateTime<Utc>>,
}

/// The fields needed to create a task.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreate {
	#[serde(rename = "orgID")]
	pub organization_id: Id,
	#[serde(rename = "ownerID", default, skip_serializing_if = "Option::is_none")]
	pub owner_id: Option<Id>,
	pub flux: String,
	#[serde(default)]
	pub status: TaskStatus,
}

impl TaskCreate {
	pub fn new(organization_id: Id, flux: impl Into<String>) -> Self {
		Self {
			organization_id,
			owner_id: None,
			flux: flux.into(),
			status: TaskStatus::Active,
		}
	}
}

/// A partial update of a task. Absent fields are left unchanged.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub flux: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<TaskStatus>,
}

/// Selects a page of tasks.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TaskFilter {
	/// Return tasks with IDs after this one
	pub after: Option<Id>,
	pub organization_id: Option<Id>,
	pub organization: Option<String>,
	pub user: Option<Id>,
	/// The maximum number of tasks in the page
	pub limit: Option<usize>,
}

#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
	#[default]
	Scheduled,
	Started,
	Failed,
	Success,
	Canceled,
}

/// One execution of a task.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
	pub id: Id,
	#[serde(rename = "taskID")]
	pub task_id: Id,
	#[serde(default)]
	pub status: RunStatus,
	pub scheduled_for: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub started_at: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub finished_at: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub requested_at: Option<DateTime<Utc>>,
}

/// Selects runs of one task.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunFilter {
	pub task: Id,
	pub after: Option<Id>,
	pub limit: Option<usize>,
	pub after_time: Option<DateTime<Utc>>,
	pub before_time: Option<DateTime<Utc>>,
}

impl RunFilter {
	pub fn new(task: Id) -> Self {
		Self {
			task,
			after: None,
			limit: None,
			after_time: None,
			before_time: None,
		}
	}
}

/// A line logged by a run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
	#[serde(rename = "runID")]
	pub run_id: Id,
	pub time: DateTime<Utc>,
	pub message: String,
}

/// Selects logs of a task, or of one of its runs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogFilter {
	pub task: Id,
	pub run: Option<Id>,
}

impl LogFilter {
	pub fn new(task: Id) -> Self {
		Self {
			task,
			run: None,
		}
	}
}
