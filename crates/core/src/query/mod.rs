//! Query execution: requests, result streams and their statistics, the
//! pre-authorization of compiled plans, and the bridges which adapt, encode
//! and log query execution.

pub mod bridge;
pub mod encode;
pub mod handler;
pub mod logging;
pub mod plan;
pub mod preauth;
pub mod request;
pub mod result;
pub mod service;
pub mod stats;

pub use self::bridge::{ProxyQueryServiceBridge, QueryServiceBridge, ReplQuerier};
pub use self::encode::{BufferedResponse, CountingWriter, Dialect, Encoded, Encoder, ResponseWriter};
pub use self::handler::{QueryFinishedEvent, QueryHandler};
pub use self::logging::{Log, LoggingServiceBridge, QueryLogger, TracingQueryLogger};
pub use self::plan::{BucketAccess, CompiledPlan, Compiler};
pub use self::preauth::PreAuthorizer;
pub use self::request::{ProxyRequest, QueryCompiler, Request};
pub use self::result::{ReleaseGuard, ResultIterator, TableResult};
pub use self::service::{AsyncQueryService, ProxyQueryService, Query, QueryService};
pub use self::stats::Statistics;
