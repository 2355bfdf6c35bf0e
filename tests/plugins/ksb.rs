use tempfile::tempdir;
use ulwazi::core::course::Course;
use ulwazi::core::db;
use ulwazi::core::error::UlwaziError;
use ulwazi::core::store::Store;
use ulwazi::plugins::ksb::{
    Category, add_ksb, get_ksb, ksb_detail, list_ksbs, remove_ksb, update_description,
};
use ulwazi::plugins::mapping::{Location, add_mapping, list_mappings};
use ulwazi::plugins::session::{SessionSlot, add_session, list_sessions};

fn test_store() -> (tempfile::TempDir, Store) {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    db::initialize_db(&store).unwrap();
    (tmp, store)
}

fn de5() -> Course {
    Course::parse("DE5").unwrap()
}

#[test]
fn test_add_derives_category_from_code() {
    let (_tmp, store) = test_store();
    let course = de5();

    assert_eq!(add_ksb(&store, &course, "k1", "Know").unwrap(), Category::Knowledge);
    assert_eq!(add_ksb(&store, &course, "S1", "Do").unwrap(), Category::Skill);
    assert_eq!(add_ksb(&store, &course, "b1", "Be").unwrap(), Category::Behaviour);

    let k1 = get_ksb(&store, &course, "K1").unwrap();
    assert_eq!(k1.code, "K1");
    assert_eq!(k1.category, Category::Knowledge);
    assert_eq!(k1.description, "Know");
}

#[test]
fn test_invalid_code_is_rejected_before_write() {
    let (_tmp, store) = test_store();
    let course = de5();

    let err = add_ksb(&store, &course, "X9", "nope").unwrap_err();
    assert!(matches!(err, UlwaziError::InvalidCode(_)));
    assert!(list_ksbs(&store, &course, None).unwrap().is_empty());
}

#[test]
fn test_duplicate_add_keeps_original_description() {
    let (_tmp, store) = test_store();
    let course = de5();

    add_ksb(&store, &course, "K1", "Original").unwrap();
    let err = add_ksb(&store, &course, "k1", "Replacement").unwrap_err();
    assert!(matches!(err, UlwaziError::KsbExists { .. }));
    assert!(err.hint().unwrap().contains("ulwazi ksb K1 --update"));

    assert_eq!(get_ksb(&store, &course, "K1").unwrap().description, "Original");
}

#[test]
fn test_same_code_in_two_courses_is_independent() {
    let (_tmp, store) = test_store();
    let de5 = de5();
    let da4 = Course::parse("DA4").unwrap();

    add_ksb(&store, &de5, "K1", "DE5 knowledge").unwrap();
    add_ksb(&store, &da4, "K1", "DA4 knowledge").unwrap();

    assert_eq!(get_ksb(&store, &de5, "K1").unwrap().description, "DE5 knowledge");
    assert_eq!(get_ksb(&store, &da4, "K1").unwrap().description, "DA4 knowledge");
}

#[test]
fn test_update_never_creates() {
    let (_tmp, store) = test_store();
    let course = de5();

    let err = update_description(&store, &course, "K7", "text").unwrap_err();
    assert!(matches!(err, UlwaziError::KsbNotFound { .. }));
    assert!(get_ksb(&store, &course, "K7").is_err());

    add_ksb(&store, &course, "K7", "old").unwrap();
    update_description(&store, &course, "k7", "new").unwrap();
    assert_eq!(get_ksb(&store, &course, "K7").unwrap().description, "new");
}

#[test]
fn test_remove_missing_ksb_fails() {
    let (_tmp, store) = test_store();
    let err = remove_ksb(&store, &de5(), "B4").unwrap_err();
    assert!(matches!(err, UlwaziError::KsbNotFound { .. }));
}

#[test]
fn test_remove_cascades_to_mappings_and_sessions() {
    let (_tmp, store) = test_store();
    let course = de5();

    add_ksb(&store, &course, "K1", "x").unwrap();
    add_mapping(&store, &course, "K1", Location::Discover).unwrap();
    add_mapping(&store, &course, "K1", Location::Module(2)).unwrap();
    add_session(&store, &course, "K1", SessionSlot::new(2, 1, 1), Some("intro")).unwrap();

    remove_ksb(&store, &course, "K1").unwrap();

    assert!(list_mappings(&store, &course, "K1").unwrap().is_empty());
    assert!(list_sessions(&store, &course, "K1").unwrap().is_empty());

    // Re-adding starts from a clean slate.
    add_ksb(&store, &course, "K1", "again").unwrap();
    let detail = ksb_detail(&store, &course, "K1").unwrap();
    assert!(detail.phase_mappings.is_empty());
    assert!(detail.sessions.is_empty());
}

#[test]
fn test_list_includes_unmapped_ksbs_and_filters_category() {
    let (_tmp, store) = test_store();
    let course = de5();

    add_ksb(&store, &course, "K1", "mapped").unwrap();
    add_ksb(&store, &course, "K2", "unmapped").unwrap();
    add_ksb(&store, &course, "S1", "skill").unwrap();
    add_mapping(&store, &course, "K1", Location::Module(1)).unwrap();
    add_mapping(&store, &course, "K1", Location::Discover).unwrap();

    let all = list_ksbs(&store, &course, None).unwrap();
    assert_eq!(all.len(), 3);
    let k1 = all.iter().find(|k| k.code == "K1").unwrap();
    assert_eq!(k1.phase_mappings, vec![Location::Discover, Location::Module(1)]);
    let k2 = all.iter().find(|k| k.code == "K2").unwrap();
    assert!(k2.phase_mappings.is_empty());

    let skills = list_ksbs(&store, &course, Some(Category::Skill)).unwrap();
    assert_eq!(skills.len(), 1);
    assert_eq!(skills[0].code, "S1");
}
