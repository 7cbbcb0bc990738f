use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::iam::Error;

/// The length of an encoded identifier.
const ID_LENGTH: usize = 16;

/// A platform identifier.
///
/// Identifiers are never zero, and are encoded as 16 lowercase hexadecimal
/// characters both on the wire and when displayed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Id(NonZeroU64);

impl Id {
	/// Creates an identifier, returning `None` for zero.
	pub const fn new(v: u64) -> Option<Self> {
		match NonZeroU64::new(v) {
			Some(v) => Some(Self(v)),
			None => None,
		}
	}

	pub const fn get(&self) -> u64 {
		self.0.get()
	}
}

impl fmt::Display for Id {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:016x}", self.0.get())
	}
}

impl FromStr for Id {
	type Err = Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.len() != ID_LENGTH {
			return Err(Error::InvalidId(s.to_owned()));
		}
		let mut bytes = [0u8; ID_LENGTH / 2];
		hex::decode_to_slice(s, &mut bytes).map_err(|_| Error::InvalidId(s.to_owned()))?;
		Id::new(u64::from_be_bytes(bytes)).ok_or_else(|| Error::InvalidId(s.to_owned()))
	}
}

impl TryFrom<u64> for Id {
	type Error = Error;
	fn try_from(v: u64) -> Result<Self, Self::Error> {
		Id::new(v).ok_or_else(|| Error::InvalidId(v.to_string()))
	}
}

impl Serialize for Id {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for Id {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}
