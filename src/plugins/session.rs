use crate::core::broker::DbBroker;
use crate::core::config;
use crate::core::course::Course;
use crate::core::db;
use crate::core::error::{self, UlwaziError};
use crate::core::store::Store;
use crate::plugins::ksb;
use crate::plugins::mapping::{self, Location};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A (module, day, session) slot within the curriculum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionSlot {
    pub module: u32,
    pub day: u32,
    pub session: u32,
}

impl SessionSlot {
    pub fn new(module: u32, day: u32, session: u32) -> Self {
        Self {
            module,
            day,
            session,
        }
    }

    /// Compact tag, e.g. `M2 D1 S3`.
    pub fn label(&self) -> String {
        format!("M{} D{} S{}", self.module, self.day, self.session)
    }

    /// CLI flags that select this slot.
    pub fn flags(&self) -> String {
        format!("-m {} -d {} -s {}", self.module, self.day, self.session)
    }

    fn validate(&self) -> Result<(), UlwaziError> {
        if self.module == 0 || self.day == 0 || self.session == 0 {
            return Err(UlwaziError::InvalidArgument(
                "Module, day and session numbers start at 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for SessionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Module {}, Day {}, Session {}",
            self.module, self.day, self.session
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionMapping {
    pub code: String,
    #[serde(flatten)]
    pub slot: SessionSlot,
    pub notes: String,
}

fn not_found(course: &Course, code: &str, slot: SessionSlot) -> UlwaziError {
    UlwaziError::SessionNotFound {
        standard: course.to_string(),
        code: code.to_string(),
        slot: slot.to_string(),
        flags: slot.flags(),
    }
}

/// Session slots of one KSB, ordered by module, day, session.
pub(crate) fn fetch_sessions(
    conn: &Connection,
    course: &Course,
    code: &str,
) -> Result<Vec<SessionMapping>, UlwaziError> {
    let mut stmt = conn.prepare(
        "SELECT ksb_code, module_number, day_number, session_number, notes
         FROM session_ksbs
         WHERE standard = ?1 AND ksb_code = ?2
         ORDER BY module_number, day_number, session_number",
    )?;
    let rows = stmt
        .query_map(params![course.as_str(), code], |row| {
            Ok(SessionMapping {
                code: row.get(0)?,
                slot: SessionSlot::new(row.get(1)?, row.get(2)?, row.get(3)?),
                notes: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// --- Operations ---

/// Attach a KSB to a session slot.
///
/// Checked in order: the KSB exists, it is phase-mapped to `slot.module`,
/// and the slot is not already taken by this KSB. Nothing is written unless
/// all three hold.
pub fn add_session(
    store: &Store,
    course: &Course,
    code: &str,
    slot: SessionSlot,
    notes: Option<&str>,
) -> Result<(), UlwaziError> {
    let (code, _) = ksb::normalize_code(code)?;
    slot.validate()?;
    let broker = DbBroker::new(store);

    broker.with_conn(Some(course.as_str()), "session.add", |conn| {
        ksb::require_ksb(conn, course, &code)?;
        if !mapping::has_mapping(conn, course, &code, Location::Module(slot.module))? {
            return Err(UlwaziError::NotPhaseMapped {
                standard: course.to_string(),
                code,
                module: slot.module,
            });
        }
        conn.execute(
            "INSERT INTO session_ksbs(standard, ksb_code, module_number, day_number, session_number, notes)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                course.as_str(),
                code,
                slot.module,
                slot.day,
                slot.session,
                notes.unwrap_or("")
            ],
        )
        .map_err(|e| {
            if error::is_unique_violation(&e) {
                UlwaziError::SessionExists {
                    standard: course.to_string(),
                    code: code.clone(),
                    slot: slot.to_string(),
                    flags: slot.flags(),
                }
            } else {
                e.into()
            }
        })?;
        Ok(())
    })
}

/// Replace the notes of an existing session slot. Never creates one.
pub fn update_notes(
    store: &Store,
    course: &Course,
    code: &str,
    slot: SessionSlot,
    notes: &str,
) -> Result<(), UlwaziError> {
    let (code, _) = ksb::normalize_code(code)?;
    let broker = DbBroker::new(store);

    broker.with_conn(Some(course.as_str()), "session.update", |conn| {
        let changed = conn.execute(
            "UPDATE session_ksbs SET notes = ?1
             WHERE standard = ?2 AND ksb_code = ?3
               AND module_number = ?4 AND day_number = ?5 AND session_number = ?6",
            params![
                notes,
                course.as_str(),
                code,
                slot.module,
                slot.day,
                slot.session
            ],
        )?;
        if changed == 0 {
            return Err(not_found(course, &code, slot));
        }
        Ok(())
    })
}

pub fn remove_session(
    store: &Store,
    course: &Course,
    code: &str,
    slot: SessionSlot,
) -> Result<(), UlwaziError> {
    let (code, _) = ksb::normalize_code(code)?;
    let broker = DbBroker::new(store);

    broker.with_conn(Some(course.as_str()), "session.remove", |conn| {
        let removed = conn.execute(
            "DELETE FROM session_ksbs
             WHERE standard = ?1 AND ksb_code = ?2
               AND module_number = ?3 AND day_number = ?4 AND session_number = ?5",
            params![course.as_str(), code, slot.module, slot.day, slot.session],
        )?;
        if removed == 0 {
            return Err(not_found(course, &code, slot));
        }
        Ok(())
    })
}

pub fn list_sessions(
    store: &Store,
    course: &Course,
    code: &str,
) -> Result<Vec<SessionMapping>, UlwaziError> {
    let (code, _) = ksb::normalize_code(code)?;
    let broker = DbBroker::new(store);
    broker.with_conn(Some(course.as_str()), "session.list", |conn| {
        fetch_sessions(conn, course, &code)
    })
}

// --- CLI ---

#[derive(clap::Args, Debug)]
pub struct SessionCli {
    /// KSB code
    pub code: String,
    /// Course to work on (defaults to the current course)
    #[clap(long)]
    pub course: Option<String>,
    /// Module number
    #[clap(short = 'm', long = "module", value_parser = clap::value_parser!(u32).range(1..))]
    pub module: u32,
    /// Day within the module
    #[clap(short = 'd', long = "day", value_parser = clap::value_parser!(u32).range(1..))]
    pub day: u32,
    /// Session within the day
    #[clap(short = 's', long = "session", value_parser = clap::value_parser!(u32).range(1..))]
    pub session: u32,
    /// Free-text notes for the session
    #[clap(long)]
    pub notes: Option<String>,
    /// Change the notes of an existing session instead of adding one
    #[clap(long, requires = "notes", conflicts_with = "remove")]
    pub update: bool,
    /// Remove the session mapping
    #[clap(long)]
    pub remove: bool,
}

pub fn run_session_cli(store: &Store, cli: SessionCli) -> Result<(), UlwaziError> {
    let course = config::resolve_course(store, cli.course.as_deref())?;
    let (code, _) = ksb::normalize_code(&cli.code)?;
    let slot = SessionSlot::new(cli.module, cli.day, cli.session);
    db::initialize_db(store)?;

    if cli.remove {
        remove_session(store, &course, &code, slot)?;
        println!("Removed {} from {}", code, slot);
    } else if cli.update {
        update_notes(store, &course, &code, slot, cli.notes.as_deref().unwrap_or(""))?;
        println!("Updated notes for {} at {}", code, slot);
    } else {
        add_session(store, &course, &code, slot, cli.notes.as_deref())?;
        println!("Mapped {} to {}", code, slot);
    }
    Ok(())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "session",
        "version": "0.1.0",
        "description": "Map module-mapped KSBs to day/session slots with notes",
        "commands": [
            { "name": "add", "parameters": ["code", "module", "day", "session", "notes"] },
            { "name": "update", "parameters": ["code", "module", "day", "session", "notes"] },
            { "name": "remove", "parameters": ["code", "module", "day", "session"] }
        ],
        "storage": ["ulwazi.db"]
    })
}
