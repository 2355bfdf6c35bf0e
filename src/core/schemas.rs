//! Centralized schema definitions for the Ulwazi store.
//!
//! One SQLite database holds three tables, all partitioned by `standard`:
//! 1. ksbs: the KSB registry.
//! 2. module_ksbs: phase mappings (Discover or a numbered module).
//! 3. session_ksbs: module/day/session slots with notes.

pub const ULWAZI_DB_NAME: &str = "ulwazi.db";
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Earlier JSON config, read only when `config.toml` is absent.
pub const LEGACY_CONFIG_FILE_NAME: &str = "config.json";
pub const BROKER_EVENTS_NAME: &str = "broker.events.jsonl";

pub const ULWAZI_DB_SCHEMA_KSBS: &str = "
    CREATE TABLE IF NOT EXISTS ksbs (
        standard    TEXT NOT NULL,
        code        TEXT NOT NULL,
        category    TEXT CHECK(category IN ('Knowledge', 'Skill', 'Behaviour')),
        description TEXT,
        PRIMARY KEY (standard, code)
    )
";

// module_number is NULL for Discover rows, so the primary key alone cannot
// reject a second Discover mapping; the expression index below does.
pub const ULWAZI_DB_SCHEMA_MODULE_KSBS: &str = "
    CREATE TABLE IF NOT EXISTS module_ksbs (
        standard      TEXT NOT NULL,
        ksb_code      TEXT NOT NULL,
        phase         TEXT CHECK(phase IN ('Discover', 'Module')),
        module_number INTEGER,
        PRIMARY KEY (standard, ksb_code, phase, module_number),
        CHECK ((phase = 'Discover' AND module_number IS NULL)
            OR (phase = 'Module' AND module_number IS NOT NULL)),
        FOREIGN KEY (standard, ksb_code) REFERENCES ksbs(standard, code)
            ON DELETE CASCADE
    )
";

pub const ULWAZI_DB_INDEX_MODULE_KSBS_LOCATION: &str = "
    CREATE UNIQUE INDEX IF NOT EXISTS idx_module_ksbs_location
        ON module_ksbs(standard, ksb_code, phase, IFNULL(module_number, -1))
";

pub const ULWAZI_DB_SCHEMA_SESSION_KSBS: &str = "
    CREATE TABLE IF NOT EXISTS session_ksbs (
        standard       TEXT NOT NULL,
        ksb_code       TEXT NOT NULL,
        module_number  INTEGER NOT NULL CHECK(module_number > 0),
        day_number     INTEGER NOT NULL CHECK(day_number > 0),
        session_number INTEGER NOT NULL CHECK(session_number > 0),
        notes TEXT,
        PRIMARY KEY (standard, ksb_code, module_number, day_number, session_number),
        FOREIGN KEY (standard, ksb_code) REFERENCES ksbs(standard, code)
            ON DELETE CASCADE
    )
";

pub const ULWAZI_DB_INDEX_SESSION_KSBS_MODULE: &str = "
    CREATE INDEX IF NOT EXISTS idx_session_ksbs_module
        ON session_ksbs(standard, module_number, day_number)
";

/// Statements run, in order, by the schema manager.
pub const ULWAZI_DB_SCHEMA: &[&str] = &[
    ULWAZI_DB_SCHEMA_KSBS,
    ULWAZI_DB_SCHEMA_MODULE_KSBS,
    ULWAZI_DB_INDEX_MODULE_KSBS_LOCATION,
    ULWAZI_DB_SCHEMA_SESSION_KSBS,
    ULWAZI_DB_INDEX_SESSION_KSBS_MODULE,
];
