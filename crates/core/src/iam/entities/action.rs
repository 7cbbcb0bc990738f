use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::iam::Error;

// Write does not imply read. A principal allowed to write a resource must
// hold a separate read permission to inspect it.
#[derive(Hash, Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
	Read,
	Write,
}

impl std::fmt::Display for Action {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Action::Read => write!(f, "read"),
			Action::Write => write!(f, "write"),
		}
	}
}

impl FromStr for Action {
	type Err = Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"read" => Ok(Self::Read),
			"write" => Ok(Self::Write),
			_ => Err(Error::InvalidAction(s.to_string())),
		}
	}
}
