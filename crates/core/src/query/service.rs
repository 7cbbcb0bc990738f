use async_channel::Receiver;

use crate::ctx::Context;
use crate::err::Error;
use crate::query::encode::{Encoded, ResponseWriter};
use crate::query::request::{ProxyRequest, Request};
use crate::query::result::{ResultIterator, TableResult};
use crate::query::stats::Statistics;

/// Executes queries, returning their results as an iterator.
///
/// The caller owns the returned iterator and must release it.
pub trait QueryService: Send + Sync {
	fn query(&self, ctx: &Context, req: &Request) -> Result<Box<dyn ResultIterator>, Error>;
}

/// Executes queries, encoding their results straight into a writer.
///
/// The number of bytes written is reported even when the query fails part
/// way through encoding.
pub trait ProxyQueryService: Send + Sync {
	fn query(&self, ctx: &Context, w: &mut dyn ResponseWriter, req: &ProxyRequest) -> Encoded;
}

/// Submits queries to an asynchronous execution backend.
pub trait AsyncQueryService: Send + Sync {
	fn query(&self, ctx: &Context, req: &Request) -> Result<Box<dyn Query>, Error>;
}

/// A query running on an asynchronous execution backend.
///
/// Results are delivered on a channel which is closed once the query has
/// finished, failed, or been cancelled.
pub trait Query: Send {
	/// The channel the result tables are delivered on
	fn results(&self) -> &Receiver<TableResult>;

	/// Signal that the caller is finished with the query. Statistics are
	/// complete once this returns.
	fn done(&mut self);

	/// Stop the query early
	fn cancel(&self);

	/// The error which ended the query, if any
	fn err(&self) -> Option<Error>;

	fn statistics(&self) -> Statistics;
}
