use std::sync::Arc;

use crate::ctx::Context;
use crate::err::Error;
use crate::iam::{Authorization, Id};
use crate::query::encode::{self, Encoded, ResponseWriter};
use crate::query::request::{ProxyRequest, QueryCompiler, Request};
use crate::query::result::{ReleaseGuard, ResultIterator, TableResult};
use crate::query::service::{AsyncQueryService, ProxyQueryService, Query, QueryService};
use crate::query::stats::Statistics;

const TARGET: &str = "fluxgate::core::query::bridge";

/// Implements [`QueryService`] on top of an [`AsyncQueryService`].
pub struct QueryServiceBridge {
	async_query_service: Arc<dyn AsyncQueryService>,
}

impl QueryServiceBridge {
	pub fn new(async_query_service: Arc<dyn AsyncQueryService>) -> Self {
		Self {
			async_query_service,
		}
	}
}

impl QueryService for QueryServiceBridge {
	#[instrument(level = "trace", target = "fluxgate::core::query::bridge", name = "QueryServiceBridge.query", skip_all)]
	fn query(&self, ctx: &Context, req: &Request) -> Result<Box<dyn ResultIterator>, Error> {
		let query = self.async_query_service.query(ctx, req)?;
		Ok(Box::new(QueryResults::new(ctx.clone(), query)))
	}
}

/// Iterates the results of an asynchronous query, blocking once per step.
struct QueryResults {
	ctx: Context,
	query: Box<dyn Query>,
	next: Option<TableResult>,
	exhausted: bool,
	released: bool,
	err: Option<Error>,
}

impl QueryResults {
	fn new(ctx: Context, query: Box<dyn Query>) -> Self {
		Self {
			ctx,
			query,
			next: None,
			exhausted: false,
			released: false,
			err: None,
		}
	}
}

impl ResultIterator for QueryResults {
	fn more(&mut self) -> bool {
		if self.released || self.exhausted {
			return false;
		}
		if self.next.is_some() {
			return true;
		}
		if let Some(reason) = self.ctx.done() {
			debug!(target: TARGET, "Cancelling query: {reason}");
			self.query.cancel();
			self.err = Some(reason.into());
			self.exhausted = true;
			return false;
		}
		match self.query.results().recv_blocking() {
			Ok(table) => {
				self.next = Some(table);
				true
			}
			// The backend closes the channel once it has finished, or once
			// it has given up on a context which is done
			Err(_) => {
				self.exhausted = true;
				self.err = self.ctx.done().map(Error::from);
				false
			}
		}
	}

	fn next(&mut self) -> Option<TableResult> {
		if self.next.is_none() && !self.more() {
			return None;
		}
		self.next.take()
	}

	fn release(&mut self) {
		if self.released {
			return;
		}
		self.released = true;
		self.next = None;
		if !self.exhausted {
			self.query.cancel();
		}
		self.query.done();
	}

	fn err(&self) -> Option<Error> {
		self.err.clone().or_else(|| self.query.err())
	}

	fn statistics(&self) -> Statistics {
		self.query.statistics()
	}
}

/// Stops iteration and releases the results once the context is done.
struct Cancellable {
	ctx: Context,
	results: Box<dyn ResultIterator>,
	released: bool,
	err: Option<Error>,
}

impl Cancellable {
	fn new(ctx: Context, results: Box<dyn ResultIterator>) -> Self {
		Self {
			ctx,
			results,
			released: false,
			err: None,
		}
	}
}

impl ResultIterator for Cancellable {
	fn more(&mut self) -> bool {
		if self.released {
			return false;
		}
		if let Some(reason) = self.ctx.done() {
			self.err = Some(reason.into());
			self.release();
			return false;
		}
		self.results.more()
	}

	fn next(&mut self) -> Option<TableResult> {
		if self.released {
			return None;
		}
		self.results.next()
	}

	fn release(&mut self) {
		if !self.released {
			self.released = true;
			self.results.release();
		}
	}

	fn err(&self) -> Option<Error> {
		self.err.clone().or_else(|| self.results.err())
	}

	fn statistics(&self) -> Statistics {
		self.results.statistics()
	}
}

/// Implements [`ProxyQueryService`] on top of a [`QueryService`], encoding
/// the results into the writer and attaching the finalized statistics as a
/// trailer.
pub struct ProxyQueryServiceBridge {
	query_service: Arc<dyn QueryService>,
}

impl ProxyQueryServiceBridge {
	pub fn new(query_service: Arc<dyn QueryService>) -> Self {
		Self {
			query_service,
		}
	}
}

impl ProxyQueryService for ProxyQueryServiceBridge {
	#[instrument(level = "trace", target = "fluxgate::core::query::bridge", name = "ProxyQueryServiceBridge.query", skip_all, fields(org_id = %req.request.organization_id))]
	fn query(&self, ctx: &Context, w: &mut dyn ResponseWriter, req: &ProxyRequest) -> Encoded {
		let results = match self.query_service.query(ctx, &req.request) {
			Ok(results) => results,
			Err(e) => {
				debug!(target: TARGET, "Query failed: {e}");
				return Encoded::failed(0, e);
			}
		};
		let mut results = ReleaseGuard::new(Box::new(Cancellable::new(ctx.clone(), results)));
		// The trailer must be announced before the body is written
		encode::announce_statistics(w);
		let mut encoder = req.dialect.encoder();
		let encoded = encoder.encode(w, &mut *results);
		if let Err(e) = encoded.result {
			debug!(target: TARGET, "Encoding failed after {} bytes: {e}", encoded.bytes);
			return Encoded::failed(encoded.bytes, e);
		}
		if let Some(e) = results.err() {
			debug!(target: TARGET, "Results failed after {} bytes: {e}", encoded.bytes);
			return Encoded::failed(encoded.bytes, e);
		}
		if let Some(reason) = ctx.done() {
			return Encoded::failed(encoded.bytes, reason.into());
		}
		let stats = results.finish();
		encode::set_statistics(w, &stats);
		Encoded::ok(encoded.bytes)
	}
}

/// Runs interactive queries as a fixed authorization and organization.
pub struct ReplQuerier {
	pub authorization: Arc<Authorization>,
	pub organization_id: Id,
	pub query_service: Arc<dyn QueryService>,
}

impl ReplQuerier {
	pub fn new(
		authorization: Arc<Authorization>,
		organization_id: Id,
		query_service: Arc<dyn QueryService>,
	) -> Self {
		Self {
			authorization,
			organization_id,
			query_service,
		}
	}

	pub fn query(
		&self,
		ctx: &Context,
		compiler: QueryCompiler,
	) -> Result<Box<dyn ResultIterator>, Error> {
		let req = Request {
			authorization: Some(self.authorization.clone()),
			organization_id: self.organization_id,
			compiler,
		};
		self.query_service.query(ctx, &req)
	}
}
