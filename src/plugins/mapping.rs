use crate::core::broker::DbBroker;
use crate::core::config;
use crate::core::course::Course;
use crate::core::db;
use crate::core::error::{self, UlwaziError};
use crate::core::store::Store;
use crate::plugins::ksb;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Serialize, Serializer};
use std::fmt;

/// Curriculum phase column values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Discover,
    Module,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Discover => "Discover",
            Phase::Module => "Module",
        }
    }
}

/// Where in the curriculum a KSB is taught: the Discover phase or one
/// numbered module. Either a module number or Discover, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Location {
    Discover,
    Module(u32),
}

impl Location {
    /// Build a location from the `-m N` / `--discover` flag pair. Exactly one
    /// must be given.
    pub fn from_flags(module: Option<u32>, discover: bool) -> Result<Location, UlwaziError> {
        match (module, discover) {
            (Some(_), true) => Err(UlwaziError::InvalidArgument(
                "Use either -m <N> or --discover, not both".to_string(),
            )),
            (None, false) => Err(UlwaziError::InvalidArgument(
                "Specify a module with -m <N> or use --discover".to_string(),
            )),
            (Some(0), false) => Err(UlwaziError::InvalidArgument(
                "Module numbers start at 1".to_string(),
            )),
            (Some(n), false) => Ok(Location::Module(n)),
            (None, true) => Ok(Location::Discover),
        }
    }

    pub fn from_columns(phase: &str, module_number: Option<u32>) -> Result<Location, UlwaziError> {
        match (phase, module_number) {
            ("Discover", None) => Ok(Location::Discover),
            ("Module", Some(n)) => Ok(Location::Module(n)),
            (p, m) => Err(UlwaziError::InvalidArgument(format!(
                "Inconsistent phase mapping in store: phase={} module={:?}",
                p, m
            ))),
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Location::Discover => Phase::Discover,
            Location::Module(_) => Phase::Module,
        }
    }

    pub fn module_number(&self) -> Option<u32> {
        match self {
            Location::Discover => None,
            Location::Module(n) => Some(*n),
        }
    }

    /// Short tag used in reports: `Discover` or `M<N>`.
    pub fn label(&self) -> String {
        match self {
            Location::Discover => "Discover".to_string(),
            Location::Module(n) => format!("M{}", n),
        }
    }

    /// CLI flags that select this location.
    pub fn flag(&self) -> String {
        match self {
            Location::Discover => "--discover".to_string(),
            Location::Module(n) => format!("-m {}", n),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Discover => f.write_str("Discover"),
            Location::Module(n) => write!(f, "Module {}", n),
        }
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

// --- Queries shared with other subsystems ---

/// Phase mappings of one KSB, Discover first then modules ascending.
pub(crate) fn fetch_locations(
    conn: &Connection,
    course: &Course,
    code: &str,
) -> Result<Vec<Location>, UlwaziError> {
    let mut stmt = conn.prepare(
        "SELECT phase, module_number FROM module_ksbs
         WHERE standard = ?1 AND ksb_code = ?2
         ORDER BY phase, module_number",
    )?;
    let rows = stmt
        .query_map(params![course.as_str(), code], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<u32>>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(phase, module)| Location::from_columns(&phase, module))
        .collect()
}

pub(crate) fn has_mapping(
    conn: &Connection,
    course: &Course,
    code: &str,
    location: Location,
) -> Result<bool, UlwaziError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM module_ksbs
             WHERE standard = ?1 AND ksb_code = ?2 AND phase = ?3 AND module_number IS ?4",
            params![
                course.as_str(),
                code,
                location.phase().as_str(),
                location.module_number()
            ],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

// --- Operations ---

pub fn add_mapping(
    store: &Store,
    course: &Course,
    code: &str,
    location: Location,
) -> Result<(), UlwaziError> {
    let (code, _) = ksb::normalize_code(code)?;
    let broker = DbBroker::new(store);

    broker.with_conn(Some(course.as_str()), "mapping.add", |conn| {
        ksb::require_ksb(conn, course, &code)?;
        conn.execute(
            "INSERT INTO module_ksbs(standard, ksb_code, phase, module_number) VALUES(?1, ?2, ?3, ?4)",
            params![
                course.as_str(),
                code,
                location.phase().as_str(),
                location.module_number()
            ],
        )
        .map_err(|e| {
            if error::is_unique_violation(&e) {
                UlwaziError::MappingExists {
                    standard: course.to_string(),
                    code: code.clone(),
                    location: location.to_string(),
                    flag: location.flag(),
                }
            } else if error::is_foreign_key_violation(&e) {
                UlwaziError::KsbNotFound {
                    standard: course.to_string(),
                    code: code.clone(),
                }
            } else {
                e.into()
            }
        })?;
        tracing::debug!(code = %code, location = %location, "phase mapping added");
        Ok(())
    })
}

pub fn remove_mapping(
    store: &Store,
    course: &Course,
    code: &str,
    location: Location,
) -> Result<(), UlwaziError> {
    let (code, _) = ksb::normalize_code(code)?;
    let broker = DbBroker::new(store);

    broker.with_conn(Some(course.as_str()), "mapping.remove", |conn| {
        let removed = conn.execute(
            "DELETE FROM module_ksbs
             WHERE standard = ?1 AND ksb_code = ?2 AND phase = ?3 AND module_number IS ?4",
            params![
                course.as_str(),
                code,
                location.phase().as_str(),
                location.module_number()
            ],
        )?;
        if removed == 0 {
            return Err(UlwaziError::MappingNotFound {
                standard: course.to_string(),
                code,
                location: location.to_string(),
                flag: location.flag(),
            });
        }
        Ok(())
    })
}

pub fn list_mappings(
    store: &Store,
    course: &Course,
    code: &str,
) -> Result<Vec<Location>, UlwaziError> {
    let (code, _) = ksb::normalize_code(code)?;
    let broker = DbBroker::new(store);
    broker.with_conn(Some(course.as_str()), "mapping.list", |conn| {
        fetch_locations(conn, course, &code)
    })
}

// --- CLI ---

#[derive(clap::Args, Debug)]
pub struct MapCli {
    /// KSB code to map
    pub code: String,
    /// Course to work on (defaults to the current course)
    #[clap(long)]
    pub course: Option<String>,
    /// Module number
    #[clap(short = 'm', long = "module", value_parser = clap::value_parser!(u32).range(1..))]
    pub module: Option<u32>,
    /// Map to the Discover phase instead of a module
    #[clap(long)]
    pub discover: bool,
    /// Remove the mapping instead of adding it
    #[clap(long)]
    pub remove: bool,
}

pub fn run_map_cli(store: &Store, cli: MapCli) -> Result<(), UlwaziError> {
    let location = Location::from_flags(cli.module, cli.discover)?;
    let course = config::resolve_course(store, cli.course.as_deref())?;
    let (code, _) = ksb::normalize_code(&cli.code)?;
    db::initialize_db(store)?;

    if cli.remove {
        remove_mapping(store, &course, &code, location)?;
        println!("Removed {} from {}", code, location.label());
    } else {
        add_mapping(store, &course, &code, location)?;
        println!("Mapped {} to {}", code, location.label());
    }
    Ok(())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "map",
        "version": "0.1.0",
        "description": "Map KSBs to the Discover phase or numbered modules",
        "commands": [
            { "name": "add", "parameters": ["code", "module|discover"] },
            { "name": "remove", "parameters": ["code", "module|discover"] }
        ],
        "storage": ["ulwazi.db"]
    })
}
