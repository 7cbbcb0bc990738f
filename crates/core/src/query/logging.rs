use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::cnf::QUERY_LOG_SCRIPT_LIMIT;
use crate::ctx::Context;
use crate::err::Error;
use crate::iam::Id;
use crate::query::encode::{Encoded, ResponseWriter};
use crate::query::request::ProxyRequest;
use crate::query::result::ReleaseGuard;
use crate::query::service::{ProxyQueryService, QueryService};
use crate::query::stats::Statistics;

const TARGET: &str = "fluxgate::core::query::logging";

/// The record of one executed query.
#[derive(Clone, Debug)]
pub struct Log {
	pub organization_id: Id,
	pub request: ProxyRequest,
	pub response_size: u64,
	/// When the query finished
	pub time: DateTime<Utc>,
	pub elapsed: Duration,
	pub statistics: Statistics,
	pub error: Option<Error>,
}

/// Records executed queries.
pub trait QueryLogger: Send + Sync {
	fn log(&self, log: Log) -> Result<(), Error>;
}

/// Writes query records as structured tracing events.
#[derive(Clone, Debug)]
pub struct TracingQueryLogger {
	script_limit: usize,
}

impl Default for TracingQueryLogger {
	fn default() -> Self {
		Self {
			script_limit: *QUERY_LOG_SCRIPT_LIMIT,
		}
	}
}

impl TracingQueryLogger {
	pub fn new() -> Self {
		Self::default()
	}

	/// Limit the number of script characters included in each record
	pub fn with_script_limit(mut self, limit: usize) -> Self {
		self.script_limit = limit;
		self
	}

	fn script<'a>(&self, script: &'a str) -> &'a str {
		match script.char_indices().nth(self.script_limit) {
			Some((end, _)) => &script[..end],
			None => script,
		}
	}
}

impl QueryLogger for TracingQueryLogger {
	fn log(&self, log: Log) -> Result<(), Error> {
		let statistics = serde_json::to_string(&log.statistics)?;
		let compiler = &log.request.request.compiler;
		info!(
			target: TARGET,
			org_id = %log.organization_id,
			compiler = compiler.compiler_type(),
			script = self.script(compiler.script()),
			dialect = log.request.dialect.name(),
			response_size = log.response_size,
			elapsed = ?log.elapsed,
			statistics = %statistics,
			error = log.error.as_ref().map(tracing::field::display),
			"Executed query"
		);
		Ok(())
	}
}

/// Implements [`ProxyQueryService`] on top of a [`QueryService`], recording
/// exactly one [`Log`] per query whatever its outcome.
///
/// A panic raised while executing or encoding the query is recovered and
/// reported as an error, both in the record and to the caller.
pub struct LoggingServiceBridge {
	query_service: Arc<dyn QueryService>,
	query_logger: Arc<dyn QueryLogger>,
}

impl LoggingServiceBridge {
	pub fn new(query_service: Arc<dyn QueryService>, query_logger: Arc<dyn QueryLogger>) -> Self {
		Self {
			query_service,
			query_logger,
		}
	}

	fn execute(
		&self,
		ctx: &Context,
		w: &mut dyn ResponseWriter,
		req: &ProxyRequest,
		stats: &mut Statistics,
	) -> Encoded {
		let results = match self.query_service.query(ctx, &req.request) {
			Ok(results) => results,
			Err(e) => return Encoded::failed(0, e),
		};
		// Statistics are copied out once the results are released, on every
		// path out of this function, unwinding included
		let mut results = ReleaseGuard::collecting(results, stats);
		let mut encoder = req.dialect.encoder();
		let encoded = encoder.encode(w, &mut *results);
		if encoded.result.is_err() {
			return encoded;
		}
		// The results may have failed independently of the encoder
		if let Some(e) = results.err() {
			return Encoded::failed(encoded.bytes, e);
		}
		encoded
	}
}

impl ProxyQueryService for LoggingServiceBridge {
	#[instrument(level = "trace", target = "fluxgate::core::query::logging", name = "LoggingServiceBridge.query", skip_all, fields(org_id = %req.request.organization_id))]
	fn query(&self, ctx: &Context, w: &mut dyn ResponseWriter, req: &ProxyRequest) -> Encoded {
		let start = Instant::now();
		let mut stats = Statistics::default();
		let encoded = match catch_unwind(AssertUnwindSafe(|| self.execute(ctx, w, req, &mut stats))) {
			Ok(encoded) => encoded,
			Err(payload) => {
				let err = Error::from_panic(payload);
				warn!(target: TARGET, "Recovered from a panic while executing a query: {err}");
				Encoded::failed(0, err)
			}
		};
		let log = Log {
			organization_id: req.request.organization_id,
			request: req.clone(),
			response_size: encoded.bytes,
			time: Utc::now(),
			elapsed: start.elapsed(),
			statistics: stats,
			error: encoded.err().cloned(),
		};
		if let Err(e) = self.query_logger.log(log) {
			warn!(target: TARGET, "Failed to log query: {e}");
		}
		encoded
	}
}
