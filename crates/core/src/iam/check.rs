use super::Permission;

/// Evaluates whether any of the `held` permissions satisfies `required`.
///
/// Evaluation is pure, so it is safe to call concurrently against shared
/// permission sets.
pub fn evaluate(held: &[Permission], required: &Permission) -> bool {
	held.iter().any(|p| p.matches(required))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::iam::{Action, Id, Resource, ResourceType};

	const ORG: u64 = 0x10;
	const OTHER_ORG: u64 = 0x20;
	const TASK: u64 = 0x100;
	const OTHER_TASK: u64 = 0x200;

	fn id(v: u64) -> Id {
		Id::new(v).unwrap()
	}

	fn perm(action: Action, kind: ResourceType, task: Option<u64>, org: Option<u64>) -> Permission {
		Permission {
			action,
			resource: Resource {
				kind,
				id: task.map(id),
				org_id: org.map(id),
			},
		}
	}

	#[test]
	fn scope_table() {
		use Action::*;
		use ResourceType::*;
		// The required permission: read one task owned by ORG
		let required = perm(Read, Tasks, Some(TASK), Some(ORG));
		let cases = [
			// Unscoped
			(perm(Read, Tasks, None, None), true),
			(perm(Write, Tasks, None, None), false),
			(perm(Read, Buckets, None, None), false),
			// Org-scoped
			(perm(Read, Tasks, None, Some(ORG)), true),
			(perm(Read, Tasks, None, Some(OTHER_ORG)), false),
			(perm(Write, Tasks, None, Some(ORG)), false),
			(perm(Read, Buckets, None, Some(ORG)), false),
			// ID-scoped
			(perm(Read, Tasks, Some(TASK), Some(ORG)), true),
			(perm(Read, Tasks, Some(TASK), None), true),
			(perm(Read, Tasks, Some(OTHER_TASK), Some(ORG)), false),
			(perm(Read, Tasks, Some(OTHER_TASK), None), false),
			(perm(Write, Tasks, Some(TASK), Some(ORG)), false),
			(perm(Read, Buckets, Some(TASK), Some(ORG)), false),
		];
		for (held, expected) in cases {
			assert_eq!(evaluate(&[held.clone()], &required), expected, "held {held}");
		}
	}

	#[test]
	fn org_scoped_requirement() {
		use Action::*;
		use ResourceType::*;
		// Creating a task requires write on all tasks of ORG
		let required = perm(Write, Tasks, None, Some(ORG));
		let cases = [
			(perm(Write, Tasks, None, None), true),
			(perm(Write, Tasks, None, Some(ORG)), true),
			(perm(Write, Tasks, None, Some(OTHER_ORG)), false),
			// A single task does not grant the whole organization
			(perm(Write, Tasks, Some(TASK), Some(ORG)), false),
			(perm(Read, Tasks, None, Some(ORG)), false),
		];
		for (held, expected) in cases {
			assert_eq!(evaluate(&[held.clone()], &required), expected, "held {held}");
		}
	}

	#[test]
	fn any_permission_in_the_set_suffices() {
		use Action::*;
		use ResourceType::*;
		let required = perm(Write, Buckets, Some(TASK), Some(ORG));
		let held = vec![
			perm(Read, Buckets, None, None),
			perm(Write, Tasks, None, Some(ORG)),
			perm(Write, Buckets, None, Some(ORG)),
		];
		assert!(evaluate(&held, &required));
		assert!(!evaluate(&held[..2], &required));
		assert!(!evaluate(&[], &required));
	}
}
