use rusqlite::params;
use std::fs;
use tempfile::tempdir;
use ulwazi::core::broker::{self, DbBroker};
use ulwazi::core::config::{self, Config};
use ulwazi::core::course::Course;
use ulwazi::core::db;
use ulwazi::core::error::UlwaziError;
use ulwazi::core::schemas;
use ulwazi::core::store::Store;
use ulwazi::plugins::ksb::{add_ksb, get_ksb};

#[test]
fn schema_init_is_idempotent_and_enables_foreign_keys() {
    let tmp = tempdir().expect("tempdir");
    let store = Store::new(tmp.path());

    db::initialize_db(&store).expect("first init");
    db::initialize_db(&store).expect("second init");
    assert!(store.db_path().exists());

    let tables = db::table_names(&store).expect("tables");
    assert_eq!(tables, vec!["ksbs", "module_ksbs", "session_ksbs"]);

    let conn = db::db_connect(&store.db_path()).expect("db connect");
    let fk_on: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .expect("pragma foreign_keys");
    assert_eq!(fk_on, 1);
}

#[test]
fn schema_rejects_inconsistent_phase_rows() {
    let tmp = tempdir().expect("tempdir");
    let store = Store::new(tmp.path());
    db::initialize_db(&store).expect("init");

    let conn = db::db_connect(&store.db_path()).expect("db connect");
    conn.execute(
        "INSERT INTO ksbs(standard, code, category, description) VALUES('DE5', 'K1', 'Knowledge', 'x')",
        [],
    )
    .expect("insert ksb");

    let discover_with_module = conn.execute(
        "INSERT INTO module_ksbs(standard, ksb_code, phase, module_number) VALUES('DE5', 'K1', 'Discover', 2)",
        [],
    );
    assert!(discover_with_module.is_err());

    let module_without_number = conn.execute(
        "INSERT INTO module_ksbs(standard, ksb_code, phase, module_number) VALUES('DE5', 'K1', 'Module', NULL)",
        [],
    );
    assert!(module_without_number.is_err());

    let bad_category = conn.execute(
        "INSERT INTO ksbs(standard, code, category, description) VALUES('DE5', 'X1', 'Other', 'x')",
        [],
    );
    assert!(bad_category.is_err());
}

#[test]
fn broker_rolls_back_failed_operations_and_audits_both() {
    let tmp = tempdir().expect("tempdir");
    let store = Store::new(tmp.path());
    db::initialize_db(&store).expect("init");

    let broker = DbBroker::new(&store);
    let result: Result<(), UlwaziError> = broker.with_conn(Some("DE5"), "test.fail", |conn| {
        conn.execute(
            "INSERT INTO ksbs(standard, code, category, description) VALUES(?1, ?2, ?3, ?4)",
            params!["DE5", "K1", "Knowledge", "rolled back"],
        )?;
        Err(UlwaziError::InvalidArgument("abort".into()))
    });
    assert!(result.is_err());

    let count: i64 = broker
        .with_conn(Some("DE5"), "test.count", |conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM ksbs", [], |row| row.get(0))?)
        })
        .expect("count");
    assert_eq!(count, 0, "failed operation must not leave rows behind");

    let events = broker::read_audit_log(&store).expect("audit log");
    let fail = events.iter().find(|e| e.op == "test.fail").expect("fail event");
    assert_eq!(fail.status, "error");
    assert_eq!(fail.course.as_deref(), Some("DE5"));
    assert_eq!(fail.db_id, schemas::ULWAZI_DB_NAME);
    let ok = events.iter().find(|e| e.op == "test.count").expect("count event");
    assert_eq!(ok.status, "success");
}

#[test]
fn unwritable_audit_log_does_not_change_store_outcome() {
    let tmp = tempdir().expect("tempdir");
    let store = Store::new(tmp.path());
    db::initialize_db(&store).expect("init");
    // A directory in place of the log makes every append fail.
    fs::remove_file(store.audit_log_path()).expect("drop init audit log");
    fs::create_dir(store.audit_log_path()).expect("block audit log");

    let course = Course::parse("DE5").expect("course");
    add_ksb(&store, &course, "K1", "persisted").expect("add reports success");
    assert_eq!(
        get_ksb(&store, &course, "K1").expect("get").description,
        "persisted"
    );

    let err = add_ksb(&store, &course, "K1", "again").unwrap_err();
    assert!(matches!(err, UlwaziError::KsbExists { .. }));
}

#[test]
fn config_round_trip_and_resolution() {
    let tmp = tempdir().expect("tempdir");
    let store = Store::new(tmp.path());

    assert_eq!(config::load_config(&store).expect("empty"), Config::default());
    assert!(config::current_course(&store).expect("none").is_none());

    config::set_current_course(&store, &Course::parse("de5").expect("course")).expect("save");
    let raw = fs::read_to_string(store.config_path()).expect("read config");
    assert!(raw.contains("current_course = \"DE5\""));

    let course = config::resolve_course(&store, None).expect("resolve");
    assert_eq!(course.as_str(), "DE5");
    assert!(matches!(
        config::resolve_course(&store, Some("zz1")),
        Err(UlwaziError::InvalidArgument(_))
    ));
}

#[test]
fn corrupt_config_is_an_error() {
    let tmp = tempdir().expect("tempdir");
    let store = Store::new(tmp.path());
    fs::write(store.config_path(), "current_course = [").expect("write");

    assert!(matches!(
        config::load_config(&store),
        Err(UlwaziError::ConfigError(_))
    ));
}

#[test]
fn store_resolve_creates_directory() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("nested").join("ulwazi");
    let store = Store::resolve(Some(home.as_path())).expect("resolve");
    assert!(home.is_dir());
    assert_eq!(store.db_path(), home.join("ulwazi.db"));
    assert_eq!(store.config_path(), home.join("config.toml"));
}
