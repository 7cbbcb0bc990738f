use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::err::Error;
use crate::query::stats::Statistics;

/// A single table of query results.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableResult {
	pub name: String,
	pub columns: Vec<String>,
	pub rows: Vec<Vec<serde_json::Value>>,
}

impl TableResult {
	pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
		Self {
			name: name.into(),
			columns,
			rows,
		}
	}
}

/// A lazy, single consumer sequence of result tables.
///
/// An iterator is open until [`ResultIterator::release`] is called, after
/// which it yields nothing more. Release must be called exactly once by the
/// owner, and repeated calls must not panic. The statistics are only
/// finalized after release; reading them earlier yields partial values.
pub trait ResultIterator: Send {
	/// Check if another table is available, blocking until this is known
	fn more(&mut self) -> bool;

	/// Take the next table, if `more` reported one
	fn next(&mut self) -> Option<TableResult>;

	/// Release all resources held by the query
	fn release(&mut self);

	/// The error which ended iteration early, if any
	fn err(&self) -> Option<Error>;

	/// The statistics of the query, complete only once released
	fn statistics(&self) -> Statistics;
}

/// Owns a result iterator and releases it on every exit path.
///
/// When dropped, or when [`ReleaseGuard::finish`] is called, the iterator is
/// released once and its finalized statistics are copied into the slot given
/// to [`ReleaseGuard::collecting`], if any.
pub struct ReleaseGuard<'a> {
	results: Box<dyn ResultIterator>,
	released: bool,
	collect: Option<&'a mut Statistics>,
}

impl<'a> ReleaseGuard<'a> {
	pub fn new(results: Box<dyn ResultIterator>) -> Self {
		Self {
			results,
			released: false,
			collect: None,
		}
	}

	/// Guard the iterator, storing its statistics in `slot` once released
	pub fn collecting(results: Box<dyn ResultIterator>, slot: &'a mut Statistics) -> Self {
		Self {
			results,
			released: false,
			collect: Some(slot),
		}
	}

	/// Releases the iterator and returns its finalized statistics
	pub fn finish(&mut self) -> Statistics {
		if !self.released {
			self.released = true;
			self.results.release();
			let stats = self.results.statistics();
			if let Some(slot) = self.collect.as_deref_mut() {
				*slot = stats.clone();
			}
			return stats;
		}
		self.results.statistics()
	}

	/// Check if the iterator has been released
	pub fn is_released(&self) -> bool {
		self.released
	}
}

impl Deref for ReleaseGuard<'_> {
	type Target = dyn ResultIterator;

	fn deref(&self) -> &Self::Target {
		self.results.as_ref()
	}
}

impl DerefMut for ReleaseGuard<'_> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		self.results.as_mut()
	}
}

impl Drop for ReleaseGuard<'_> {
	fn drop(&mut self) {
		if !self.released {
			self.finish();
		}
	}
}
