use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};

use crate::cnf::RESPONSE_BYTES_METADATA_KEY;
use crate::ctx::Context;
use crate::err::{Error, ErrorBody, ErrorCode};
use crate::iam::Id;
use crate::query::encode::{self, CountingWriter, Dialect, ResponseWriter};
use crate::query::request::Request;
use crate::query::result::ReleaseGuard;
use crate::query::service::QueryService;
use crate::query::stats::Statistics;

const TARGET: &str = "fluxgate::core::query::handler";

/// Sent to the finished hook once a query has been served.
#[derive(Clone, Debug)]
pub struct QueryFinishedEvent {
	pub organization_id: Id,
	pub statistics: Statistics,
	pub response_byte_count: u64,
	pub err: Option<Error>,
}

pub type FinishedHook = Box<dyn Fn(QueryFinishedEvent) + Send + Sync>;

/// Serves one query into a response.
///
/// Failures before any bytes were written replace the response with a JSON
/// error body and a failure status. Once the body has started it can no
/// longer be rewritten, so later failures are only logged.
pub struct QueryHandler {
	query_service: Arc<dyn QueryService>,
	dialect: Arc<dyn Dialect>,
	on_finished: Option<FinishedHook>,
}

impl QueryHandler {
	pub fn new(query_service: Arc<dyn QueryService>, dialect: Arc<dyn Dialect>) -> Self {
		Self {
			query_service,
			dialect,
			on_finished: None,
		}
	}

	/// Invoke the hook once each query has finished
	pub fn on_finished(mut self, hook: impl Fn(QueryFinishedEvent) + Send + Sync + 'static) -> Self {
		self.on_finished = Some(Box::new(hook));
		self
	}

	#[instrument(level = "trace", target = "fluxgate::core::query::handler", name = "QueryHandler.serve", skip_all, fields(org_id = %req.organization_id))]
	pub fn serve(&self, ctx: &Context, w: &mut dyn ResponseWriter, req: &Request) {
		let results = match self.query_service.query(ctx, req) {
			Ok(results) => results,
			Err(e) => {
				write_error(w, &e);
				return;
			}
		};
		let mut results = ReleaseGuard::new(results);
		encode::announce_statistics(w);
		self.dialect.set_headers(w);
		let mut counter = CountingWriter::new(w);
		let encoded = self.dialect.encoder().encode(&mut counter, &mut *results);
		let count = counter.count();
		let encode_err = match encoded.result {
			Err(e) if count == 0 => {
				write_error(w, &e);
				Some(e)
			}
			Err(e) => {
				warn!(target: TARGET, "Failed to encode client response after {count} bytes: {e}");
				Some(e)
			}
			Ok(()) => None,
		};
		// Releasing the results finalizes the statistics
		let mut stats = results.finish();
		stats.metadata_add(RESPONSE_BYTES_METADATA_KEY, count);
		if let Some(hook) = &self.on_finished {
			hook(QueryFinishedEvent {
				organization_id: req.organization_id,
				statistics: stats.clone(),
				response_byte_count: count,
				err: results.err().or(encode_err),
			});
		}
		encode::set_statistics(w, &stats);
	}
}

/// The response status reported for an error
pub fn status(code: ErrorCode) -> StatusCode {
	match code {
		ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
		ErrorCode::Invalid => StatusCode::BAD_REQUEST,
		ErrorCode::NotFound => StatusCode::NOT_FOUND,
		ErrorCode::Canceled => StatusCode::REQUEST_TIMEOUT,
		ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

fn write_error(w: &mut dyn ResponseWriter, err: &Error) {
	debug!(target: TARGET, "Query failed: {err}");
	w.set_status(status(err.code()));
	if let Some(headers) = w.headers() {
		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
	}
	if let Err(e) = serde_json::to_writer(&mut *w, &ErrorBody::from(err)) {
		warn!(target: TARGET, "Failed to write error response: {e}");
	}
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;

	use super::*;
	use crate::ctx::MutableContext;
	use crate::mock::{MockDialect, MockQueryService, table};
	use crate::query::encode::BufferedResponse;
	use crate::query::request::QueryCompiler;

	fn request() -> Request {
		Request::new(Id::new(9).unwrap(), QueryCompiler::flux("from(bucket: \"cpu\")"))
	}

	fn serve(service: MockQueryService, dialect: MockDialect) -> (BufferedResponse, Vec<QueryFinishedEvent>) {
		let events = Arc::new(Mutex::new(Vec::new()));
		let sink = events.clone();
		let handler = QueryHandler::new(Arc::new(service), Arc::new(dialect))
			.on_finished(move |event| sink.lock().push(event));
		let ctx = MutableContext::background().freeze();
		let mut res = BufferedResponse::new();
		handler.serve(&ctx, &mut res, &request());
		let events = events.lock().clone();
		(res, events)
	}

	#[test_log::test]
	fn success_sets_statistics_with_response_bytes() {
		let (res, events) = serve(MockQueryService::ok(vec![table("a")]), MockDialect::write_all());
		assert_eq!(res.status, None);
		let stats = res.statistics().unwrap();
		let bytes = res.body.len() as u64;
		assert_eq!(stats.metadata[RESPONSE_BYTES_METADATA_KEY], vec![serde_json::json!(bytes)]);
		assert_eq!(res.headers[CONTENT_TYPE], "text/plain");
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].response_byte_count, bytes);
		assert_eq!(events[0].organization_id, Id::new(9).unwrap());
		assert!(events[0].err.is_none());
	}

	#[test_log::test]
	fn query_failure_writes_an_error_body() {
		let (res, events) = serve(
			MockQueryService::erroring(Error::NotFound("bucket".into())),
			MockDialect::write_all(),
		);
		assert_eq!(res.status, Some(StatusCode::NOT_FOUND));
		let body: serde_json::Value = serde_json::from_slice(&res.body).unwrap();
		assert_eq!(body["code"], "not_found");
		assert!(res.statistics().is_none());
		assert!(events.is_empty());
	}

	#[test_log::test]
	fn encode_failure_before_output_writes_an_error_body() {
		let (res, events) = serve(MockQueryService::ok(vec![table("a")]), MockDialect::fail_after(0));
		assert_eq!(res.status, Some(StatusCode::INTERNAL_SERVER_ERROR));
		let body: serde_json::Value = serde_json::from_slice(&res.body).unwrap();
		assert_eq!(body["code"], "internal");
		assert_eq!(events.len(), 1);
		assert!(events[0].err.is_some());
		// Statistics still follow the error body
		assert!(res.statistics().is_some());
	}

	#[test_log::test]
	fn encode_failure_after_output_is_only_logged() {
		let (res, events) = serve(MockQueryService::ok(vec![table("a")]), MockDialect::fail_after(5));
		assert_eq!(res.status, None);
		assert_eq!(res.body.len(), 5);
		assert_eq!(events[0].response_byte_count, 5);
		assert!(events[0].err.is_some());
	}
}
