use crate::core::broker::DbBroker;
use crate::core::config;
use crate::core::course::Course;
use crate::core::db;
use crate::core::error::{self, UlwaziError};
use crate::core::output::{self, OutputFormat};
use crate::core::store::Store;
use crate::plugins::mapping::{self, Location};
use crate::plugins::session::{self, SessionMapping};
use clap::ArgGroup;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Data model ---

/// KSB category, derived from the first letter of the code.
///
/// Variant order is the report order (Behaviour < Knowledge < Skill).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Behaviour,
    Knowledge,
    Skill,
}

/// Filter letters accepted by `--ksb`.
const CATEGORY_FILTERS: &[(&str, Category)] = &[
    ("k", Category::Knowledge),
    ("s", Category::Skill),
    ("b", Category::Behaviour),
];

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Knowledge => "Knowledge",
            Category::Skill => "Skill",
            Category::Behaviour => "Behaviour",
        }
    }

    /// Category for an already upper-cased code.
    pub fn from_code(code: &str) -> Result<Category, UlwaziError> {
        match code.chars().next() {
            Some('K') => Ok(Category::Knowledge),
            Some('S') => Ok(Category::Skill),
            Some('B') => Ok(Category::Behaviour),
            _ => Err(UlwaziError::InvalidCode(code.to_string())),
        }
    }

    pub fn from_db(raw: &str) -> Result<Category, UlwaziError> {
        match raw {
            "Knowledge" => Ok(Category::Knowledge),
            "Skill" => Ok(Category::Skill),
            "Behaviour" => Ok(Category::Behaviour),
            other => Err(UlwaziError::InvalidArgument(format!(
                "Unknown category '{}' in store",
                other
            ))),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Translate a `--ksb` filter letter (k/s/b, any case) to a category.
pub fn parse_category_filter(letter: &str) -> Result<Category, UlwaziError> {
    let key = letter.trim().to_lowercase();
    CATEGORY_FILTERS
        .iter()
        .find(|(l, _)| *l == key)
        .map(|(_, c)| *c)
        .ok_or_else(|| {
            UlwaziError::InvalidArgument(format!(
                "Unknown KSB filter '{}'. Use k (Knowledge), s (Skill) or b (Behaviour)",
                letter.trim()
            ))
        })
}

/// Upper-case a user supplied code and check its leading letter.
pub fn normalize_code(raw: &str) -> Result<(String, Category), UlwaziError> {
    let code = raw.trim().to_uppercase();
    let category = Category::from_code(&code)?;
    Ok((code, category))
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Ksb {
    pub code: String,
    pub category: Category,
    pub description: String,
}

/// A KSB together with every phase mapping it holds (possibly none).
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct KsbListing {
    pub code: String,
    pub category: Category,
    pub description: String,
    pub phase_mappings: Vec<Location>,
}

/// Everything known about one KSB, for the detail view.
#[derive(Debug, Serialize, Clone)]
pub struct KsbDetail {
    pub standard: String,
    #[serde(flatten)]
    pub ksb: Ksb,
    pub phase_mappings: Vec<Location>,
    pub sessions: Vec<SessionMapping>,
}

// --- Operations ---

pub(crate) fn fetch_ksb(
    conn: &Connection,
    course: &Course,
    code: &str,
) -> Result<Option<Ksb>, UlwaziError> {
    let row = conn
        .query_row(
            "SELECT code, category, description FROM ksbs WHERE standard = ?1 AND code = ?2",
            params![course.as_str(), code],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;

    row.map(|(code, category, description)| {
        Ok(Ksb {
            code,
            category: Category::from_db(&category)?,
            description: description.unwrap_or_default(),
        })
    })
    .transpose()
}

/// Fail with `KsbNotFound` unless the KSB is registered.
pub(crate) fn require_ksb(
    conn: &Connection,
    course: &Course,
    code: &str,
) -> Result<Ksb, UlwaziError> {
    fetch_ksb(conn, course, code)?.ok_or_else(|| UlwaziError::KsbNotFound {
        standard: course.to_string(),
        code: code.to_string(),
    })
}

pub fn add_ksb(
    store: &Store,
    course: &Course,
    code: &str,
    description: &str,
) -> Result<Category, UlwaziError> {
    let (code, category) = normalize_code(code)?;
    let broker = DbBroker::new(store);

    broker.with_conn(Some(course.as_str()), "ksb.add", |conn| {
        conn.execute(
            "INSERT INTO ksbs(standard, code, category, description) VALUES(?1, ?2, ?3, ?4)",
            params![course.as_str(), code, category.as_str(), description],
        )
        .map_err(|e| {
            if error::is_unique_violation(&e) {
                UlwaziError::KsbExists {
                    standard: course.to_string(),
                    code: code.clone(),
                }
            } else {
                e.into()
            }
        })?;
        Ok(category)
    })
}

pub fn update_description(
    store: &Store,
    course: &Course,
    code: &str,
    description: &str,
) -> Result<(), UlwaziError> {
    let (code, _) = normalize_code(code)?;
    let broker = DbBroker::new(store);

    broker.with_conn(Some(course.as_str()), "ksb.update", |conn| {
        let changed = conn.execute(
            "UPDATE ksbs SET description = ?1 WHERE standard = ?2 AND code = ?3",
            params![description, course.as_str(), code],
        )?;
        if changed == 0 {
            return Err(UlwaziError::KsbNotFound {
                standard: course.to_string(),
                code,
            });
        }
        Ok(())
    })
}

/// Remove a KSB. Its phase and session mappings go with it via the
/// `ON DELETE CASCADE` foreign keys.
pub fn remove_ksb(store: &Store, course: &Course, code: &str) -> Result<(), UlwaziError> {
    let (code, _) = normalize_code(code)?;
    let broker = DbBroker::new(store);

    broker.with_conn(Some(course.as_str()), "ksb.remove", |conn| {
        let removed = conn.execute(
            "DELETE FROM ksbs WHERE standard = ?1 AND code = ?2",
            params![course.as_str(), code],
        )?;
        if removed == 0 {
            return Err(UlwaziError::KsbNotFound {
                standard: course.to_string(),
                code,
            });
        }
        Ok(())
    })
}

pub fn get_ksb(store: &Store, course: &Course, code: &str) -> Result<Ksb, UlwaziError> {
    let (code, _) = normalize_code(code)?;
    let broker = DbBroker::new(store);
    broker.with_conn(Some(course.as_str()), "ksb.get", |conn| {
        require_ksb(conn, course, &code)
    })
}

pub fn ksb_detail(store: &Store, course: &Course, code: &str) -> Result<KsbDetail, UlwaziError> {
    let (code, _) = normalize_code(code)?;
    let broker = DbBroker::new(store);
    broker.with_conn(Some(course.as_str()), "ksb.detail", |conn| {
        let ksb = require_ksb(conn, course, &code)?;
        let phase_mappings = mapping::fetch_locations(conn, course, &code)?;
        let sessions = session::fetch_sessions(conn, course, &code)?;
        Ok(KsbDetail {
            standard: course.to_string(),
            ksb,
            phase_mappings,
            sessions,
        })
    })
}

/// Every KSB of a course left-joined with its phase mappings.
///
/// Rows come back ordered by code; KSBs without mappings carry an empty list.
pub fn list_ksbs(
    store: &Store,
    course: &Course,
    category: Option<Category>,
) -> Result<Vec<KsbListing>, UlwaziError> {
    let broker = DbBroker::new(store);
    broker.with_conn(Some(course.as_str()), "ksb.list", |conn| {
        let mut stmt = conn.prepare(
            "SELECT k.code, k.category, k.description, m.phase, m.module_number
             FROM ksbs k
             LEFT JOIN module_ksbs m ON m.standard = k.standard AND m.ksb_code = k.code
             WHERE k.standard = ?1 AND (?2 IS NULL OR k.category = ?2)
             ORDER BY k.code, m.phase, m.module_number",
        )?;
        let rows = stmt
            .query_map(
                params![course.as_str(), category.map(|c| c.as_str())],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<u32>>(4)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut listings: Vec<KsbListing> = Vec::new();
        for (code, category, description, phase, module_number) in rows {
            let is_new = listings.last().is_none_or(|last| last.code != code);
            if is_new {
                listings.push(KsbListing {
                    code,
                    category: Category::from_db(&category)?,
                    description: description.unwrap_or_default(),
                    phase_mappings: Vec::new(),
                });
            }
            if let Some(phase) = phase {
                let location = Location::from_columns(&phase, module_number)?;
                if let Some(last) = listings.last_mut() {
                    last.phase_mappings.push(location);
                }
            }
        }
        Ok(listings)
    })
}

// --- CLI ---

#[derive(clap::Args, Debug)]
#[clap(group(ArgGroup::new("action").args(["add", "update", "remove"])))]
pub struct KsbCli {
    /// KSB code (e.g. K1, S12, B3)
    pub code: String,
    /// Course to work on (defaults to the current course)
    #[clap(long)]
    pub course: Option<String>,
    /// Add a new KSB with this description
    #[clap(long, value_name = "DESC")]
    pub add: Option<String>,
    /// Replace the description of an existing KSB
    #[clap(long, value_name = "DESC")]
    pub update: Option<String>,
    /// Remove the KSB and all of its mappings
    #[clap(long)]
    pub remove: bool,
    /// Output format for the detail view
    #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn run_ksb_cli(store: &Store, cli: KsbCli) -> Result<(), UlwaziError> {
    let course = config::resolve_course(store, cli.course.as_deref())?;
    // Reject bad codes before touching the store.
    let (code, _) = normalize_code(&cli.code)?;
    db::initialize_db(store)?;

    if let Some(description) = cli.add {
        let category = add_ksb(store, &course, &code, &description)?;
        println!("Added {} ({}) to {}", code, category, course);
    } else if let Some(description) = cli.update {
        update_description(store, &course, &code, &description)?;
        println!("Updated {} description", code);
    } else if cli.remove {
        remove_ksb(store, &course, &code)?;
        println!("Removed {} (and all mappings)", code);
    } else {
        let detail = ksb_detail(store, &course, &code)?;
        match cli.format {
            OutputFormat::Text => print!("{}", render_ksb_detail(&detail)),
            OutputFormat::Json => println!("{}", output::to_json(&detail)?),
        }
    }
    Ok(())
}

pub fn render_ksb_detail(detail: &KsbDetail) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str(&format!("{} ({})\n", detail.ksb.code, detail.ksb.category));
    out.push_str(&"-".repeat(50));
    out.push('\n');
    out.push_str(&detail.ksb.description);
    out.push_str("\n\n");

    if detail.phase_mappings.is_empty() {
        out.push_str("Mapped to: (none)\n");
    } else {
        let labels: Vec<String> = detail.phase_mappings.iter().map(|l| l.label()).collect();
        out.push_str(&format!("Mapped to: {}\n", labels.join(", ")));
    }

    if !detail.sessions.is_empty() {
        out.push_str("Sessions:\n");
        for s in &detail.sessions {
            if s.notes.is_empty() {
                out.push_str(&format!("  {}\n", s.slot.label()));
            } else {
                out.push_str(&format!("  {}  {}\n", s.slot.label(), s.notes));
            }
        }
    }
    out.push('\n');
    out
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "ksb",
        "version": "0.1.0",
        "description": "KSB registry (Knowledge, Skill, Behaviour) per course",
        "commands": [
            { "name": "add", "parameters": ["code", "description"] },
            { "name": "update", "parameters": ["code", "description"] },
            { "name": "remove", "parameters": ["code"] },
            { "name": "view", "parameters": ["code"] }
        ],
        "storage": ["ulwazi.db"]
    })
}
