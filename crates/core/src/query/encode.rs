use std::fmt::Debug;
use std::io::{self, Write};

use http::header::TRAILER;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::err::Error;
use crate::query::result::ResultIterator;
use crate::query::stats::Statistics;

/// The name of the statistics trailer, as used on the header map
fn statistics_header() -> HeaderName {
	HeaderName::from_static("influx-query-statistics")
}

/// The outcome of encoding a result stream.
///
/// Encoding may fail part way, so the number of bytes already written is
/// reported alongside the result, whatever the outcome.
#[derive(Debug)]
#[must_use]
pub struct Encoded {
	pub bytes: u64,
	pub result: Result<(), Error>,
}

impl Encoded {
	pub fn ok(bytes: u64) -> Self {
		Self {
			bytes,
			result: Ok(()),
		}
	}

	pub fn failed(bytes: u64, err: Error) -> Self {
		Self {
			bytes,
			result: Err(err),
		}
	}

	pub fn is_ok(&self) -> bool {
		self.result.is_ok()
	}

	pub fn err(&self) -> Option<&Error> {
		self.result.as_ref().err()
	}
}

/// Streams a result iterator into a writer in some output format.
pub trait Encoder: Send {
	/// Encode every table of the iterator, reporting the bytes written even
	/// when encoding fails part way
	fn encode(&mut self, w: &mut dyn Write, results: &mut dyn ResultIterator) -> Encoded;
}

/// A caller selected output format.
pub trait Dialect: Debug + Send + Sync {
	/// A short name for the format, used in logs
	fn name(&self) -> &str;

	/// Create an encoder for one result stream
	fn encoder(&self) -> Box<dyn Encoder>;

	/// Set any response headers the format requires
	fn set_headers(&self, _w: &mut dyn ResponseWriter) {}
}

/// A destination for encoded results.
///
/// Writers which can carry response metadata expose a header map, into
/// which trailers are recorded. The status can only be changed before any
/// body bytes are written.
pub trait ResponseWriter: Write + Send {
	fn headers(&mut self) -> Option<&mut HeaderMap> {
		None
	}

	fn set_status(&mut self, _status: StatusCode) {}
}

impl ResponseWriter for Vec<u8> {}

/// An in memory response with headers, trailers and a status.
#[derive(Debug, Default)]
pub struct BufferedResponse {
	pub status: Option<StatusCode>,
	pub headers: HeaderMap,
	pub body: Vec<u8>,
}

impl BufferedResponse {
	pub fn new() -> Self {
		Self::default()
	}

	/// The statistics trailer, if one was set
	pub fn statistics(&self) -> Option<Statistics> {
		let value = self.headers.get(statistics_header())?;
		serde_json::from_slice(value.as_bytes()).ok()
	}
}

impl Write for BufferedResponse {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.body.write(buf)
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

impl ResponseWriter for BufferedResponse {
	fn headers(&mut self) -> Option<&mut HeaderMap> {
		Some(&mut self.headers)
	}

	fn set_status(&mut self, status: StatusCode) {
		if self.body.is_empty() {
			self.status = Some(status);
		}
	}
}

/// Counts the bytes passed through to an inner writer.
pub struct CountingWriter<'a> {
	inner: &'a mut dyn ResponseWriter,
	count: u64,
}

impl<'a> CountingWriter<'a> {
	pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
		Self {
			inner,
			count: 0,
		}
	}

	pub fn count(&self) -> u64 {
		self.count
	}
}

impl Write for CountingWriter<'_> {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		let n = self.inner.write(buf)?;
		self.count += n as u64;
		Ok(n)
	}

	fn flush(&mut self) -> io::Result<()> {
		self.inner.flush()
	}
}

impl ResponseWriter for CountingWriter<'_> {
	fn headers(&mut self) -> Option<&mut HeaderMap> {
		self.inner.headers()
	}

	fn set_status(&mut self, status: StatusCode) {
		self.inner.set_status(status)
	}
}

/// Announces that the statistics trailer will follow the body
pub(crate) fn announce_statistics(w: &mut dyn ResponseWriter) {
	if let Some(headers) = w.headers() {
		headers.insert(TRAILER, HeaderValue::from_static(crate::cnf::QUERY_STATISTICS_TRAILER));
	}
}

/// Records the finalized statistics as a JSON trailer
pub(crate) fn set_statistics(w: &mut dyn ResponseWriter, stats: &Statistics) {
	let Some(headers) = w.headers() else {
		return;
	};
	let value = match serde_json::to_vec(stats) {
		Ok(json) => HeaderValue::from_bytes(&json),
		Err(e) => {
			warn!("Failed to encode query statistics: {e}");
			return;
		}
	};
	match value {
		Ok(value) => {
			headers.insert(statistics_header(), value);
		}
		Err(e) => warn!("Failed to set query statistics trailer: {e}"),
	}
}
