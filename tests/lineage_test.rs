//! Integration tests for the version lineage.
//!
//! Exercises the full editing flow against the public API: seeding,
//! appending, locking, save-target resolution, and record assembly.

use pretty_assertions::assert_eq;

use analysis_refinery::error::LineageError;
use analysis_refinery::lineage::VersionLineage;

#[test]
fn test_full_editing_scenario() {
    let mut lineage = VersionLineage::new();

    lineage.initialize("Result A", "Summarize doc");
    assert_eq!(lineage.version_count(), 1);
    assert_eq!(lineage.artifact().unwrap().name, "Document Summary");

    lineage.append("Result B", "Add USA data", "ctx");
    assert_eq!(lineage.version_count(), 2);
    assert_eq!(lineage.current_number(), 2);
    assert_eq!(lineage.chat_history(), ["Summarize doc", "Add USA data"]);

    // A no-argument lock targets the current version.
    let locked = lineage.lock(None).unwrap().number;
    assert_eq!(locked, 2);

    assert_eq!(lineage.resolve_save_target().unwrap().number, 2);

    let record = lineage.build_save_record(Some("My Element")).unwrap();
    assert_eq!(record.element_name, "My Element");
    assert_eq!(record.saved_version, 2);
    assert_eq!(record.output, "Result B");
}

#[test]
fn test_lock_before_initialization_via_fallback() {
    let mut lineage = VersionLineage::new();

    // Locking an empty lineage is a hard error; the caller repairs it
    // explicitly with whatever content is at hand.
    assert!(matches!(lineage.lock(None), Err(LineageError::EmptyLineage)));

    lineage.ensure_initialized("Fallback text");
    let locked = lineage.lock(None).unwrap();
    assert_eq!(locked.number, 1);
    assert_eq!(locked.output, "Fallback text");
    assert!(locked.locked);
}

#[test]
fn test_version_numbers_have_no_gaps_or_repeats() {
    let mut lineage = VersionLineage::new();
    lineage.initialize("seed output", "seed");

    for i in 0..20 {
        lineage.append("output", &format!("instruction {}", i), "ctx");
    }

    let numbers: Vec<u32> = lineage.versions().iter().map(|v| v.number).collect();
    let expected: Vec<u32> = (1..=21).collect();
    assert_eq!(numbers, expected);

    for version in lineage.versions() {
        assert_eq!(version.chat_history.len(), version.number as usize);
        assert_eq!(
            version.chat_history,
            lineage.chat_history()[..version.number as usize]
        );
    }
}

#[test]
fn test_locking_never_resets() {
    let mut lineage = VersionLineage::new();
    lineage.initialize("out", "seed");
    lineage.append("out 2", "second", "ctx");

    lineage.lock(Some(1)).unwrap();

    // Further appends, selections, and save records leave the lock alone.
    lineage.append("out 3", "third", "ctx");
    lineage.select_for_save(3);
    lineage.build_save_record(None).unwrap();

    assert!(lineage.version(1).unwrap().locked);
}

#[test]
fn test_save_resolution_precedence() {
    let mut lineage = VersionLineage::new();
    lineage.initialize("out 1", "seed");
    lineage.append("out 2", "second", "ctx");
    lineage.append("out 3", "third", "ctx");

    // No selection, no locks: Version #1.
    assert_eq!(lineage.resolve_save_target().unwrap().number, 1);

    // Locks: the most recently locked version wins.
    lineage.lock(Some(2)).unwrap();
    assert_eq!(lineage.resolve_save_target().unwrap().number, 2);
    lineage.lock(Some(3)).unwrap();
    assert_eq!(lineage.resolve_save_target().unwrap().number, 3);

    // Explicit selection beats everything, locked or not.
    lineage.select_for_save(1);
    assert_eq!(lineage.resolve_save_target().unwrap().number, 1);
}

#[test]
fn test_save_record_matches_append_inputs() {
    let mut lineage = VersionLineage::new();
    lineage.initialize("seed output", "seed");
    lineage.append("refined output", "refine it", "Previous output: seed output... + User request: refine it");
    lineage.lock(None).unwrap();

    let record = lineage.build_save_record(None).unwrap();
    assert_eq!(record.output, "refined output");
    assert_eq!(
        record.context_used,
        "Previous output: seed output... + User request: refine it"
    );
    assert_eq!(record.full_chat_history, ["seed", "refine it"]);
    assert_eq!(record.all_versions.len(), 2);
}
