//! In memory collaborators for unit tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use crate::buc::{Bucket, BucketFilter, BucketService};
use crate::ctx::Context;
use crate::err::Error;
use crate::iam::Id;
use crate::query::{
	AsyncQueryService, CompiledPlan, Compiler, Dialect, Encoded, Encoder, Log, Query, QueryLogger,
	QueryService, Request, ResponseWriter, ResultIterator, Statistics, TableResult,
};
use crate::task::{
	Log as RunLog, LogFilter, Run, RunFilter, RunStatus, Task, TaskCreate, TaskFilter, TaskService,
	TaskStatus, TaskUpdate,
};

fn id(v: u64) -> Id {
	Id::new(v).unwrap()
}

/// Statistics reported by a finished query
fn finished() -> Statistics {
	Statistics {
		total_duration: Duration::from_millis(1),
		execute_duration: Duration::from_millis(1),
		concurrency: 1,
		..Default::default()
	}
}

/// A shared call counter
#[derive(Clone, Debug, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
	pub fn incr(&self) {
		self.0.fetch_add(1, Ordering::SeqCst);
	}

	pub fn get(&self) -> usize {
		self.0.load(Ordering::SeqCst)
	}
}

pub fn table(name: &str) -> TableResult {
	TableResult::new(
		name,
		vec!["_time".into(), "_value".into()],
		vec![vec![serde_json::json!(1), serde_json::json!(2.5)]],
	)
}

pub fn task(task_id: u64, org_id: u64, flux: &str) -> Task {
	Task {
		id: id(task_id),
		organization_id: id(org_id),
		organization: String::new(),
		owner_id: None,
		name: format!("task-{task_id}"),
		status: TaskStatus::Active,
		flux: flux.to_owned(),
		every: "1h".into(),
		cron: String::new(),
		offset: String::new(),
		latest_completed: None,
		created_at: None,
		updated_at: None,
	}
}

#[derive(Default)]
pub struct MockBuckets {
	buckets: RwLock<Vec<Bucket>>,
}

impl MockBuckets {
	pub fn insert(&self, bucket_id: Id, org_id: Id, name: &str) {
		self.buckets.write().push(Bucket {
			id: bucket_id,
			org_id,
			name: name.to_owned(),
		});
	}
}

#[async_trait]
impl BucketService for MockBuckets {
	async fn find_bucket(&self, _: &Context, filter: &BucketFilter) -> Result<Bucket, Error> {
		self.buckets
			.read()
			.iter()
			.find(|b| {
				filter.id.is_none_or(|id| id == b.id)
					&& filter.name.as_ref().is_none_or(|n| *n == b.name)
					&& filter.org_id.is_none_or(|org| org == b.org_id)
			})
			.cloned()
			.ok_or_else(|| Error::NotFound("bucket".into()))
	}
}

/// Compiles a fixed set of scripts, rejecting every other script
#[derive(Default)]
pub struct StaticCompiler {
	plans: HashMap<String, CompiledPlan>,
}

impl StaticCompiler {
	pub fn with(mut self, script: &str, plan: CompiledPlan) -> Self {
		self.plans.insert(script.to_owned(), plan);
		self
	}
}

#[async_trait]
impl Compiler for StaticCompiler {
	async fn compile(&self, _: &Context, script: &str, _: DateTime<Utc>) -> Result<CompiledPlan, Error> {
		self.plans
			.get(script)
			.cloned()
			.ok_or_else(|| Error::Compile(format!("unexpected token in {script:?}")))
	}
}

/// Stores tasks in memory, counting the calls made to each operation
#[derive(Default)]
pub struct MockTaskService {
	tasks: RwLock<BTreeMap<Id, Task>>,
	calls: Mutex<HashMap<&'static str, usize>>,
	ids: AtomicU64,
}

impl MockTaskService {
	pub fn with_tasks(tasks: Vec<Task>) -> Self {
		let svc = Self {
			ids: AtomicU64::new(1000),
			..Default::default()
		};
		svc.tasks.write().extend(tasks.into_iter().map(|t| (t.id, t)));
		svc
	}

	pub fn calls(&self, op: &str) -> usize {
		self.calls.lock().get(op).copied().unwrap_or(0)
	}

	fn record(&self, op: &'static str) {
		*self.calls.lock().entry(op).or_default() += 1;
	}

	fn run(&self, task_id: Id, run_id: Id, status: RunStatus) -> Run {
		Run {
			id: run_id,
			task_id,
			status,
			scheduled_for: Utc::now(),
			started_at: None,
			finished_at: None,
			requested_at: None,
		}
	}
}

#[async_trait]
impl TaskService for MockTaskService {
	async fn find_task_by_id(&self, _: &Context, task_id: Id) -> Result<Task, Error> {
		self.record("find_task_by_id");
		self.tasks.read().get(&task_id).cloned().ok_or_else(|| Error::NotFound("task".into()))
	}

	async fn find_tasks(&self, _: &Context, filter: TaskFilter) -> Result<(Vec<Task>, usize), Error> {
		self.record("find_tasks");
		let page: Vec<Task> = self
			.tasks
			.read()
			.values()
			.filter(|t| filter.organization_id.is_none_or(|org| org == t.organization_id))
			.filter(|t| filter.after.is_none_or(|after| t.id > after))
			.take(filter.limit.unwrap_or(usize::MAX))
			.cloned()
			.collect();
		let count = page.len();
		Ok((page, count))
	}

	async fn create_task(&self, _: &Context, create: TaskCreate) -> Result<Task, Error> {
		self.record("create_task");
		let task_id = id(self.ids.fetch_add(1, Ordering::SeqCst));
		let mut t = task(task_id.get(), create.organization_id.get(), &create.flux);
		t.owner_id = create.owner_id;
		t.status = create.status;
		self.tasks.write().insert(t.id, t.clone());
		Ok(t)
	}

	async fn update_task(&self, _: &Context, task_id: Id, update: TaskUpdate) -> Result<Task, Error> {
		self.record("update_task");
		let mut tasks = self.tasks.write();
		let t = tasks.get_mut(&task_id).ok_or_else(|| Error::NotFound("task".into()))?;
		if let Some(flux) = update.flux {
			t.flux = flux;
		}
		if let Some(status) = update.status {
			t.status = status;
		}
		Ok(t.clone())
	}

	async fn delete_task(&self, _: &Context, task_id: Id) -> Result<(), Error> {
		self.record("delete_task");
		self.tasks.write().remove(&task_id).map(|_| ()).ok_or_else(|| Error::NotFound("task".into()))
	}

	async fn find_logs(&self, _: &Context, filter: LogFilter) -> Result<(Vec<RunLog>, usize), Error> {
		self.record("find_logs");
		let log = RunLog {
			run_id: filter.run.unwrap_or(filter.task),
			time: Utc::now(),
			message: "Started task from script".into(),
		};
		Ok((vec![log], 1))
	}

	async fn find_runs(&self, _: &Context, filter: RunFilter) -> Result<(Vec<Run>, usize), Error> {
		self.record("find_runs");
		Ok((vec![self.run(filter.task, id(1), RunStatus::Success)], 1))
	}

	async fn find_run_by_id(&self, _: &Context, task_id: Id, run_id: Id) -> Result<Run, Error> {
		self.record("find_run_by_id");
		Ok(self.run(task_id, run_id, RunStatus::Success))
	}

	async fn cancel_run(&self, _: &Context, _: Id, _: Id) -> Result<(), Error> {
		self.record("cancel_run");
		Ok(())
	}

	async fn retry_run(&self, _: &Context, task_id: Id, run_id: Id) -> Result<Run, Error> {
		self.record("retry_run");
		Ok(self.run(task_id, run_id, RunStatus::Scheduled))
	}

	async fn force_run(&self, _: &Context, task_id: Id, scheduled_for: DateTime<Utc>) -> Result<Run, Error> {
		self.record("force_run");
		let mut run = self.run(task_id, id(2), RunStatus::Scheduled);
		run.scheduled_for = scheduled_for;
		run.requested_at = Some(Utc::now());
		Ok(run)
	}
}

/// Yields a fixed list of tables. Statistics are only reported once released.
pub struct ScriptedResults {
	tables: VecDeque<TableResult>,
	err: Option<Error>,
	released: bool,
	releases: Counter,
}

impl ScriptedResults {
	pub fn new(tables: Vec<TableResult>) -> Self {
		Self {
			tables: tables.into(),
			err: None,
			released: false,
			releases: Counter::default(),
		}
	}

	pub fn releases(&self) -> Counter {
		self.releases.clone()
	}
}

impl ResultIterator for ScriptedResults {
	fn more(&mut self) -> bool {
		!self.released && !self.tables.is_empty()
	}

	fn next(&mut self) -> Option<TableResult> {
		if self.released {
			return None;
		}
		self.tables.pop_front()
	}

	fn release(&mut self) {
		if !self.released {
			self.released = true;
			self.releases.incr();
		}
	}

	fn err(&self) -> Option<Error> {
		self.err.clone()
	}

	fn statistics(&self) -> Statistics {
		if self.released {
			finished()
		} else {
			Statistics::default()
		}
	}
}

enum Behaviour {
	Tables(Vec<TableResult>, Option<Error>),
	Fail(Error),
	Panic,
}

/// Answers every query in the same way, recording the requests
pub struct MockQueryService {
	behaviour: Behaviour,
	requests: Mutex<Vec<Request>>,
	pub releases: Counter,
}

impl MockQueryService {
	fn new(behaviour: Behaviour) -> Self {
		Self {
			behaviour,
			requests: Mutex::new(Vec::new()),
			releases: Counter::default(),
		}
	}

	pub fn ok(tables: Vec<TableResult>) -> Self {
		Self::new(Behaviour::Tables(tables, None))
	}

	pub fn erroring(err: Error) -> Self {
		Self::new(Behaviour::Fail(err))
	}

	pub fn panicking() -> Self {
		Self::new(Behaviour::Panic)
	}

	/// Report an error from the results once they are iterated
	pub fn with_results_err(mut self, err: Error) -> Self {
		if let Behaviour::Tables(_, slot) = &mut self.behaviour {
			*slot = Some(err);
		}
		self
	}

	pub fn requests(&self) -> Vec<Request> {
		self.requests.lock().clone()
	}
}

impl QueryService for MockQueryService {
	fn query(&self, _: &Context, req: &Request) -> Result<Box<dyn ResultIterator>, Error> {
		self.requests.lock().push(req.clone());
		match &self.behaviour {
			Behaviour::Tables(tables, err) => Ok(Box::new(ScriptedResults {
				tables: tables.clone().into(),
				err: err.clone(),
				released: false,
				releases: self.releases.clone(),
			})),
			Behaviour::Fail(err) => Err(err.clone()),
			Behaviour::Panic => panic!("query engine exploded"),
		}
	}
}

/// A query on an asynchronous backend with its results already queued
pub struct ScriptedQuery {
	rx: Receiver<TableResult>,
	// Held open by queries which never finish
	_tx: Option<Sender<TableResult>>,
	finished: bool,
	cancels: Counter,
	dones: Counter,
}

impl Query for ScriptedQuery {
	fn results(&self) -> &Receiver<TableResult> {
		&self.rx
	}

	fn done(&mut self) {
		if !self.finished {
			self.finished = true;
			self.dones.incr();
		}
	}

	fn cancel(&self) {
		self.cancels.incr();
		self.rx.close();
	}

	fn err(&self) -> Option<Error> {
		None
	}

	fn statistics(&self) -> Statistics {
		if self.finished {
			finished()
		} else {
			Statistics::default()
		}
	}
}

pub struct MockAsyncQueries {
	tables: Vec<TableResult>,
	pending: bool,
	pub cancels: Counter,
	pub dones: Counter,
}

impl MockAsyncQueries {
	pub fn new(tables: Vec<TableResult>) -> Self {
		Self {
			tables,
			pending: false,
			cancels: Counter::default(),
			dones: Counter::default(),
		}
	}

	/// Queries which never produce a result
	pub fn pending() -> Self {
		Self {
			pending: true,
			..Self::new(vec![])
		}
	}
}

impl AsyncQueryService for MockAsyncQueries {
	fn query(&self, _: &Context, _: &Request) -> Result<Box<dyn Query>, Error> {
		let (tx, rx) = async_channel::unbounded();
		for t in &self.tables {
			tx.try_send(t.clone()).map_err(|e| Error::Internal(e.to_string()))?;
		}
		Ok(Box::new(ScriptedQuery {
			rx,
			_tx: self.pending.then_some(tx),
			finished: false,
			cancels: self.cancels.clone(),
			dones: self.dones.clone(),
		}))
	}
}

#[derive(Clone, Copy, Debug)]
enum EncoderKind {
	WriteAll,
	FailAfter(usize),
	Panic,
}

/// A line based format writing the name and row count of each table
#[derive(Debug)]
pub struct MockDialect {
	kind: EncoderKind,
}

impl MockDialect {
	pub fn write_all() -> Self {
		Self {
			kind: EncoderKind::WriteAll,
		}
	}

	/// Writes the given number of bytes and then fails
	pub fn fail_after(bytes: usize) -> Self {
		Self {
			kind: EncoderKind::FailAfter(bytes),
		}
	}

	pub fn panicking() -> Self {
		Self {
			kind: EncoderKind::Panic,
		}
	}
}

impl Dialect for MockDialect {
	fn name(&self) -> &str {
		"mock"
	}

	fn encoder(&self) -> Box<dyn Encoder> {
		Box::new(MockEncoder {
			kind: self.kind,
		})
	}

	fn set_headers(&self, w: &mut dyn ResponseWriter) {
		if let Some(headers) = w.headers() {
			headers.insert(http::header::CONTENT_TYPE, http::HeaderValue::from_static("text/plain"));
		}
	}
}

struct MockEncoder {
	kind: EncoderKind,
}

impl Encoder for MockEncoder {
	fn encode(&mut self, w: &mut dyn Write, results: &mut dyn ResultIterator) -> Encoded {
		match self.kind {
			EncoderKind::WriteAll => {
				let mut n = 0;
				while results.more() {
					let Some(table) = results.next() else {
						break;
					};
					let line = format!("{}:{}\n", table.name, table.rows.len());
					if let Err(e) = w.write_all(line.as_bytes()) {
						return Encoded::failed(n, e.into());
					}
					n += line.len() as u64;
				}
				Encoded::ok(n)
			}
			EncoderKind::FailAfter(bytes) => {
				if let Err(e) = w.write_all(&vec![b'x'; bytes]) {
					return Encoded::failed(0, e.into());
				}
				Encoded::failed(bytes as u64, Error::Io("connection reset by peer".into()))
			}
			EncoderKind::Panic => panic!("encoder exploded"),
		}
	}
}

/// Keeps every query log record
#[derive(Default)]
pub struct RecordingLogger {
	logs: Mutex<Vec<Log>>,
}

impl RecordingLogger {
	pub fn logs(&self) -> Vec<Log> {
		self.logs.lock().clone()
	}
}

impl QueryLogger for RecordingLogger {
	fn log(&self, log: Log) -> Result<(), Error> {
		self.logs.lock().push(log);
		Ok(())
	}
}
