use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Log, LogFilter, Run, RunFilter, Task, TaskCreate, TaskFilter, TaskService, TaskUpdate};
use crate::buc::BucketService;
use crate::cnf::CONCEAL_UNAUTHORIZED_LOOKUPS;
use crate::ctx::Context;
use crate::err::{Error, ErrorCode};
use crate::iam::{self, Action, Id, Permission, ResourceType};
use crate::query::{Compiler, PreAuthorizer};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ValidatorOptions {
	/// Report missing tasks and denied tasks alike, as unauthorized, so
	/// that callers cannot probe for the existence of tasks
	pub conceal_unauthorized_lookups: bool,
}

impl Default for ValidatorOptions {
	fn default() -> Self {
		Self {
			conceal_unauthorized_lookups: *CONCEAL_UNAUTHORIZED_LOOKUPS,
		}
	}
}

/// Gates every operation of a [`TaskService`] on the permissions of the
/// principal in the request context.
///
/// Single task operations first look the task up without authentication to
/// learn its organization, then check the permission the operation requires.
/// Scripts which are stored are compiled and pre-authorized, so a task can
/// never reference buckets its creator may not access.
pub struct TaskServiceValidator {
	inner: Arc<dyn TaskService>,
	compiler: Arc<dyn Compiler>,
	pre_auth: PreAuthorizer,
	options: ValidatorOptions,
}

impl TaskServiceValidator {
	pub fn new(
		inner: Arc<dyn TaskService>,
		compiler: Arc<dyn Compiler>,
		buckets: Arc<dyn BucketService>,
	) -> Self {
		Self {
			inner,
			compiler,
			pre_auth: PreAuthorizer::new(buckets),
			options: ValidatorOptions::default(),
		}
	}

	pub fn with_options(mut self, options: ValidatorOptions) -> Self {
		self.options = options;
		self
	}

	fn denied(&self, id: Id) -> Error {
		Error::Unauthorized(format!("access to task {id} denied"))
	}

	/// Looks a task up without authentication
	async fn lookup(&self, ctx: &Context, id: Id) -> Result<Task, Error> {
		match self.inner.find_task_by_id(ctx, id).await {
			Err(e) if self.options.conceal_unauthorized_lookups && e.code() == ErrorCode::NotFound => {
				Err(self.denied(id))
			}
			res => res,
		}
	}

	fn authorize_task(&self, ctx: &Context, task: &Task, action: Action) -> Result<(), Error> {
		let auth = ctx.authorizer()?;
		let permission = Permission::at_id(task.id, action, ResourceType::Tasks, task.organization_id);
		match iam::authorize(&**auth, &permission) {
			Ok(()) => Ok(()),
			Err(_) if self.options.conceal_unauthorized_lookups => Err(self.denied(task.id)),
			Err(e) => Err(e.into()),
		}
	}

	/// Compiles the script and checks every bucket it references
	async fn validate_script(&self, ctx: &Context, script: &str) -> Result<(), Error> {
		let auth = ctx.authorizer()?;
		let plan = self
			.compiler
			.compile(ctx, script, Utc::now())
			.await
			.map_err(|e| Error::invalid("Failed to compile flux script.", e))?;
		self.pre_auth
			.pre_authorize(ctx, &plan, &**auth)
			.await
			.map_err(|e| Error::invalid("Failed to authorize.", e))
	}
}

#[async_trait]
impl TaskService for TaskServiceValidator {
	#[instrument(level = "trace", target = "fluxgate::core::task", name = "TaskServiceValidator.find_task_by_id", skip(self, ctx))]
	async fn find_task_by_id(&self, ctx: &Context, id: Id) -> Result<Task, Error> {
		let task = self.lookup(ctx, id).await?;
		self.authorize_task(ctx, &task, Action::Read)?;
		Ok(task)
	}

	#[instrument(level = "trace", target = "fluxgate::core::task", name = "TaskServiceValidator.find_tasks", skip_all)]
	async fn find_tasks(&self, ctx: &Context, filter: TaskFilter) -> Result<(Vec<Task>, usize), Error> {
		let auth = ctx.authorizer()?;
		// The page is selected before it is filtered, so it may hold fewer
		// readable tasks than the limit even when more exist
		let (candidates, _) = self.inner.find_tasks(ctx, filter).await?;
		let tasks: Vec<Task> = candidates
			.into_iter()
			.filter(|t| {
				let permission =
					Permission::at_id(t.id, Action::Read, ResourceType::Tasks, t.organization_id);
				iam::authorize(&**auth, &permission).is_ok()
			})
			.collect();
		let count = tasks.len();
		Ok((tasks, count))
	}

	#[instrument(level = "trace", target = "fluxgate::core::task", name = "TaskServiceValidator.create_task", skip_all, fields(org_id = %create.organization_id))]
	async fn create_task(&self, ctx: &Context, create: TaskCreate) -> Result<Task, Error> {
		let auth = ctx.authorizer()?;
		let permission = Permission::new(Action::Write, ResourceType::Tasks, create.organization_id);
		iam::authorize(&**auth, &permission)?;
		self.validate_script(ctx, &create.flux).await?;
		self.inner.create_task(ctx, create).await
	}

	#[instrument(level = "trace", target = "fluxgate::core::task", name = "TaskServiceValidator.update_task", skip(self, ctx, update))]
	async fn update_task(&self, ctx: &Context, id: Id, update: TaskUpdate) -> Result<Task, Error> {
		let task = self.lookup(ctx, id).await?;
		self.authorize_task(ctx, &task, Action::Write)?;
		// Check the script the task will hold once updated
		let script = update.flux.as_deref().unwrap_or(&task.flux);
		self.validate_script(ctx, script).await?;
		self.inner.update_task(ctx, id, update).await
	}

	#[instrument(level = "trace", target = "fluxgate::core::task", name = "TaskServiceValidator.delete_task", skip(self, ctx))]
	async fn delete_task(&self, ctx: &Context, id: Id) -> Result<(), Error> {
		let task = self.lookup(ctx, id).await?;
		self.authorize_task(ctx, &task, Action::Write)?;
		self.inner.delete_task(ctx, id).await
	}

	#[instrument(level = "trace", target = "fluxgate::core::task", name = "TaskServiceValidator.find_logs", skip_all, fields(task_id = %filter.task))]
	async fn find_logs(&self, ctx: &Context, filter: LogFilter) -> Result<(Vec<Log>, usize), Error> {
		// Being able to read the task is enough to read its logs
		self.find_task_by_id(ctx, filter.task).await?;
		self.inner.find_logs(ctx, filter).await
	}

	#[instrument(level = "trace", target = "fluxgate::core::task", name = "TaskServiceValidator.find_runs", skip_all, fields(task_id = %filter.task))]
	async fn find_runs(&self, ctx: &Context, filter: RunFilter) -> Result<(Vec<Run>, usize), Error> {
		let task = self.find_task_by_id(ctx, filter.task).await?;
		self.authorize_task(ctx, &task, Action::Read)?;
		self.inner.find_runs(ctx, filter).await
	}

	#[instrument(level = "trace", target = "fluxgate::core::task", name = "TaskServiceValidator.find_run_by_id", skip(self, ctx))]
	async fn find_run_by_id(&self, ctx: &Context, task_id: Id, run_id: Id) -> Result<Run, Error> {
		let task = self.find_task_by_id(ctx, task_id).await?;
		self.authorize_task(ctx, &task, Action::Read)?;
		self.inner.find_run_by_id(ctx, task_id, run_id).await
	}

	#[instrument(level = "trace", target = "fluxgate::core::task", name = "TaskServiceValidator.cancel_run", skip(self, ctx))]
	async fn cancel_run(&self, ctx: &Context, task_id: Id, run_id: Id) -> Result<(), Error> {
		let task = self.find_task_by_id(ctx, task_id).await?;
		self.authorize_task(ctx, &task, Action::Write)?;
		self.inner.cancel_run(ctx, task_id, run_id).await
	}

	#[instrument(level = "trace", target = "fluxgate::core::task", name = "TaskServiceValidator.retry_run", skip(self, ctx))]
	async fn retry_run(&self, ctx: &Context, task_id: Id, run_id: Id) -> Result<Run, Error> {
		let task = self.find_task_by_id(ctx, task_id).await?;
		self.authorize_task(ctx, &task, Action::Write)?;
		self.inner.retry_run(ctx, task_id, run_id).await
	}

	#[instrument(level = "trace", target = "fluxgate::core::task", name = "TaskServiceValidator.force_run", skip(self, ctx))]
	async fn force_run(
		&self,
		ctx: &Context,
		task_id: Id,
		scheduled_for: DateTime<Utc>,
	) -> Result<Run, Error> {
		let task = self.find_task_by_id(ctx, task_id).await?;
		self.authorize_task(ctx, &task, Action::Write)?;
		self.inner.force_run(ctx, task_id, scheduled_for).await
	}
}
