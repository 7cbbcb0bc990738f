use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Statistics collected while executing a query.
///
/// Statistics are only complete once the result iterator which reports them
/// has been released. Reading them earlier yields partial or zero values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
	#[serde(with = "nanos")]
	pub total_duration: Duration,
	#[serde(with = "nanos")]
	pub compile_duration: Duration,
	#[serde(with = "nanos")]
	pub queue_duration: Duration,
	#[serde(with = "nanos")]
	pub plan_duration: Duration,
	#[serde(with = "nanos")]
	pub requeue_duration: Duration,
	#[serde(with = "nanos")]
	pub execute_duration: Duration,
	/// The number of goroutines, threads or tasks that executed the query
	pub concurrency: u64,
	/// The peak memory allocated by the query, in bytes
	pub max_allocated: u64,
	/// The total memory allocated by the query, in bytes
	pub total_allocated: u64,
	pub runtime_errors: Vec<String>,
	pub metadata: BTreeMap<String, Vec<serde_json::Value>>,
}

impl Statistics {
	/// Aggregates the statistics of another query into this one
	pub fn add(&mut self, other: &Statistics) {
		self.total_duration = self.total_duration.saturating_add(other.total_duration);
		self.compile_duration = self.compile_duration.saturating_add(other.compile_duration);
		self.queue_duration = self.queue_duration.saturating_add(other.queue_duration);
		self.plan_duration = self.plan_duration.saturating_add(other.plan_duration);
		self.requeue_duration = self.requeue_duration.saturating_add(other.requeue_duration);
		self.execute_duration = self.execute_duration.saturating_add(other.execute_duration);
		self.concurrency = self.concurrency.max(other.concurrency);
		self.max_allocated = self.max_allocated.max(other.max_allocated);
		self.total_allocated = self.total_allocated.saturating_add(other.total_allocated);
		self.runtime_errors.extend(other.runtime_errors.iter().cloned());
		for (k, v) in &other.metadata {
			self.metadata.entry(k.clone()).or_default().extend(v.iter().cloned());
		}
	}

	/// Appends a value under a metadata key
	pub fn metadata_add(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
		self.metadata.entry(key.into()).or_default().push(value.into());
	}
}

/// Serializes durations as integer nanoseconds.
mod nanos {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
		s.serialize_u64(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
		u64::deserialize(d).map(Duration::from_nanos)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn add_saturates() {
		let mut stats = Statistics {
			total_duration: Duration::MAX,
			total_allocated: u64::MAX,
			..Default::default()
		};
		stats.add(&Statistics {
			total_duration: Duration::from_secs(1),
			execute_duration: Duration::from_secs(1),
			total_allocated: 1,
			..Default::default()
		});
		assert_eq!(stats.total_duration, Duration::MAX);
		assert_eq!(stats.execute_duration, Duration::from_secs(1));
		assert_eq!(stats.total_allocated, u64::MAX);
	}

	#[test]
	fn json_uses_nanoseconds() {
		let mut stats = Statistics {
			total_duration: Duration::from_millis(3),
			concurrency: 2,
			..Default::default()
		};
		stats.metadata_add("influxdb/response-bytes", 128);
		let json = serde_json::to_value(&stats).unwrap();
		assert_eq!(json["total_duration"], 3_000_000);
		assert_eq!(json["concurrency"], 2);
		assert_eq!(json["metadata"]["influxdb/response-bytes"], serde_json::json!([128]));
		// Missing fields fall back to their defaults
		let parsed: Statistics = serde_json::from_str(r#"{"total_duration": 3000000}"#).unwrap();
		assert_eq!(parsed.total_duration, Duration::from_millis(3));
		assert_eq!(parsed.metadata.len(), 0);
	}

	#[test]
	fn add_aggregates() {
		let mut a = Statistics {
			execute_duration: Duration::from_millis(5),
			concurrency: 4,
			total_allocated: 10,
			..Default::default()
		};
		let mut b = Statistics {
			execute_duration: Duration::from_millis(7),
			concurrency: 2,
			total_allocated: 5,
			runtime_errors: vec!["division by zero".into()],
			..Default::default()
		};
		b.metadata_add("flux/query-plan", "plan");
		a.add(&b);
		assert_eq!(a.execute_duration, Duration::from_millis(12));
		assert_eq!(a.concurrency, 4);
		assert_eq!(a.total_allocated, 15);
		assert_eq!(a.runtime_errors, vec!["division by zero".to_owned()]);
		assert_eq!(a.metadata["flux/query-plan"].len(), 1);
	}
}
