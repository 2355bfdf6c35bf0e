use tempfile::tempdir;
use ulwazi::core::course::Course;
use ulwazi::core::db;
use ulwazi::core::error::UlwaziError;
use ulwazi::core::store::Store;
use ulwazi::plugins::ksb::add_ksb;
use ulwazi::plugins::mapping::{Location, add_mapping};
use ulwazi::plugins::session::{
    SessionSlot, add_session, list_sessions, remove_session, update_notes,
};

fn test_store() -> (tempfile::TempDir, Store, Course) {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    db::initialize_db(&store).unwrap();
    let course = Course::parse("DE5").unwrap();
    add_ksb(&store, &course, "K1", "x").unwrap();
    add_mapping(&store, &course, "K1", Location::Module(2)).unwrap();
    (tmp, store, course)
}

#[test]
fn test_add_session_on_mapped_module() {
    let (_tmp, store, course) = test_store();

    add_session(&store, &course, "k1", SessionSlot::new(2, 1, 1), Some("intro")).unwrap();
    add_session(&store, &course, "K1", SessionSlot::new(2, 1, 2), None).unwrap();

    let sessions = list_sessions(&store, &course, "K1").unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].slot, SessionSlot::new(2, 1, 1));
    assert_eq!(sessions[0].notes, "intro");
    assert_eq!(sessions[1].notes, "");
}

#[test]
fn test_unmapped_module_is_rejected_with_map_hint() {
    let (_tmp, store, course) = test_store();

    let err = add_session(&store, &course, "K1", SessionSlot::new(3, 1, 1), None).unwrap_err();
    assert!(matches!(err, UlwaziError::NotPhaseMapped { module: 3, .. }));
    assert!(err.hint().unwrap().contains("ulwazi map K1 -m 3"));
    assert!(list_sessions(&store, &course, "K1").unwrap().is_empty());
}

#[test]
fn test_discover_mapping_does_not_satisfy_module_precondition() {
    let (_tmp, store, course) = test_store();
    add_ksb(&store, &course, "S1", "skill").unwrap();
    add_mapping(&store, &course, "S1", Location::Discover).unwrap();

    let err = add_session(&store, &course, "S1", SessionSlot::new(1, 1, 1), None).unwrap_err();
    assert!(matches!(err, UlwaziError::NotPhaseMapped { .. }));
}

#[test]
fn test_missing_ksb_is_reported_first() {
    let (_tmp, store, course) = test_store();

    let err = add_session(&store, &course, "B2", SessionSlot::new(2, 1, 1), None).unwrap_err();
    assert!(matches!(err, UlwaziError::KsbNotFound { .. }));
}

#[test]
fn test_duplicate_session_is_rejected() {
    let (_tmp, store, course) = test_store();
    let slot = SessionSlot::new(2, 1, 1);

    add_session(&store, &course, "K1", slot, Some("first")).unwrap();
    let err = add_session(&store, &course, "K1", slot, Some("second")).unwrap_err();
    assert!(matches!(err, UlwaziError::SessionExists { .. }));
    assert!(err.hint().unwrap().contains("--update"));

    let sessions = list_sessions(&store, &course, "K1").unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].notes, "first");
}

#[test]
fn test_update_notes_never_creates() {
    let (_tmp, store, course) = test_store();
    let slot = SessionSlot::new(2, 4, 1);

    let err = update_notes(&store, &course, "K1", slot, "notes").unwrap_err();
    assert!(matches!(err, UlwaziError::SessionNotFound { .. }));
    assert!(list_sessions(&store, &course, "K1").unwrap().is_empty());

    add_session(&store, &course, "K1", slot, None).unwrap();
    update_notes(&store, &course, "K1", slot, "worked example").unwrap();
    assert_eq!(
        list_sessions(&store, &course, "K1").unwrap()[0].notes,
        "worked example"
    );
}

#[test]
fn test_remove_session() {
    let (_tmp, store, course) = test_store();
    let slot = SessionSlot::new(2, 1, 1);

    let err = remove_session(&store, &course, "K1", slot).unwrap_err();
    assert!(matches!(err, UlwaziError::SessionNotFound { .. }));
    assert_eq!(
        err.hint().as_deref(),
        Some("List its session slots with `ulwazi ksb K1`")
    );

    add_session(&store, &course, "K1", slot, None).unwrap();
    remove_session(&store, &course, "K1", slot).unwrap();
    assert!(list_sessions(&store, &course, "K1").unwrap().is_empty());
}
