use pretty_assertions::assert_eq;

use super::*;

#[test]
fn baseline_names_need_no_slot() {
	let resolver = EntryPointResolver::new();
	assert_eq!(
		resolver.lookup("glXSwapBuffers"),
		Some(Resolution::Baseline(BaselineEntry::SwapBuffers))
	);
	assert!(resolver.snapshot().is_empty());
}

#[test]
fn first_extension_gets_first_slot() {
	let resolver = EntryPointResolver::new();
	assert_eq!(resolver.lookup("foo"), None);

	let assigned = resolver.assign("foo");
	assert!(assigned.fresh);
	assert_eq!(assigned.slot, SlotIndex(32));
	assert_eq!(resolver.lookup("foo"), Some(Resolution::Slot(SlotIndex(32))));
}

#[test]
fn assignment_is_idempotent_and_dense() {
	let resolver = EntryPointResolver::new();
	let a = resolver.assign("glXSwapIntervalEXT").slot;
	let b = resolver.assign("glXSwapIntervalMESA").slot;
	let again = resolver.assign("glXSwapIntervalEXT");

	assert_eq!(a, SlotIndex(32));
	assert_eq!(b, SlotIndex(33));
	assert!(!again.fresh);
	assert_eq!(again.slot, a);
	assert_eq!(resolver.snapshot().len(), 2);
}

#[test]
fn snapshot_iterates_in_assignment_order() {
	let resolver = EntryPointResolver::new();
	for name in ["c", "a", "b"] {
		resolver.assign(name);
	}
	let snap = resolver.snapshot();
	let order: Vec<_> = snap.iter().map(|(slot, name)| (slot.0, name.to_string())).collect();
	assert_eq!(
		order,
		vec![(32, "c".to_string()), (33, "a".to_string()), (34, "b".to_string())]
	);
	assert_eq!(snap.name(SlotIndex(33)), Some("a"));
	assert_eq!(snap.name(SlotIndex(3)), None);
}

#[test]
fn old_snapshots_are_unaffected_by_new_assignments() {
	let resolver = EntryPointResolver::new();
	resolver.assign("a");
	let before = resolver.snapshot();
	resolver.assign("b");
	assert_eq!(before.len(), 1);
	assert_eq!(before.get("b"), None);
	assert_eq!(resolver.snapshot().len(), 2);
}
