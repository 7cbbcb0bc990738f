use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Log, LogFilter, Run, RunFilter, Task, TaskCreate, TaskFilter, TaskUpdate};
use crate::ctx::Context;
use crate::err::Error;
use crate::iam::Id;

/// Manages tasks and their runs.
///
/// Listing operations return the page of items along with a count.
#[async_trait]
pub trait TaskService: Send + Sync {
	async fn find_task_by_id(&self, ctx: &Context, id: Id) -> Result<Task, Error>;

	async fn find_tasks(&self, ctx: &Context, filter: TaskFilter) -> Result<(Vec<Task>, usize), Error>;

	async fn create_task(&self, ctx: &Context, create: TaskCreate) -> Result<Task, Error>;

	async fn update_task(&self, ctx: &Context, id: Id, update: TaskUpdate) -> Result<Task, Error>;

	async fn delete_task(&self, ctx: &Context, id: Id) -> Result<(), Error>;

	async fn find_logs(&self, ctx: &Context, filter: LogFilter) -> Result<(Vec<Log>, usize), Error>;

	async fn find_runs(&self, ctx: &Context, filter: RunFilter) -> Result<(Vec<Run>, usize), Error>;

	async fn find_run_by_id(&self, ctx: &Context, task_id: Id, run_id: Id) -> Result<Run, Error>;

	async fn cancel_run(&self, ctx: &Context, task_id: Id, run_id: Id) -> Result<(), Error>;

	async fn retry_run(&self, ctx: &Context, task_id: Id, run_id: Id) -> Result<Run, Error>;

	/// Schedule a run of the task for the given time, outside its schedule
	async fn force_run(
		&self,
		ctx: &Context,
		task_id: Id,
		scheduled_for: DateTime<Utc>,
	) -> Result<Run, Error>;
}
