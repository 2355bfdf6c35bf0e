//! Read-only coverage views over the KSB store.
//!
//! Two orderings are in play. `show` orders categories by the [`Category`]
//! enum (Behaviour, Knowledge, Skill). `coverage` groups by the category
//! name string. They currently agree; tests pin both so a change to either
//! is noticed.

use crate::core::broker::DbBroker;
use crate::core::config;
use crate::core::course::Course;
use crate::core::db;
use crate::core::error::UlwaziError;
use crate::core::output::{self, OutputFormat};
use crate::core::store::Store;
use crate::plugins::ksb::{self, Category, KsbListing};
use crate::plugins::mapping::Location;
use rusqlite::params;
use serde::Serialize;
use std::collections::BTreeMap;

/// Numeric value of the first run of digits in a code; 0 when there is none.
///
/// `K2` sorts before `K11` because 2 < 11.
pub fn natural_code_key(code: &str) -> u64 {
    code.chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .fold(0u64, |acc, c| {
            acc.saturating_mul(10)
                .saturating_add(u64::from(c.to_digit(10).unwrap_or(0)))
        })
}

/// Sort codes by their embedded number, falling back to the code text.
pub fn sort_codes_naturally<T>(items: &mut [T], code: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| {
        let (ca, cb) = (code(a), code(b));
        natural_code_key(ca)
            .cmp(&natural_code_key(cb))
            .then_with(|| ca.cmp(cb))
    });
}

// --- Course listing ---

#[derive(Debug, Serialize, Clone)]
pub struct CourseReport {
    pub standard: String,
    pub category: Option<Category>,
    pub ksbs: Vec<KsbListing>,
}

/// Every KSB of the course with its location tags, ordered by category then
/// natural code number.
pub fn show_course(
    store: &Store,
    course: &Course,
    category: Option<Category>,
) -> Result<CourseReport, UlwaziError> {
    let mut ksbs = ksb::list_ksbs(store, course, category)?;
    sort_codes_naturally(&mut ksbs, |k| k.code.as_str());
    // Stable sort keeps the natural order inside each category.
    ksbs.sort_by_key(|k| k.category);
    Ok(CourseReport {
        standard: course.to_string(),
        category,
        ksbs,
    })
}

pub fn render_course_report(report: &CourseReport, include_description: bool) -> String {
    let mut out = String::new();
    if report.ksbs.is_empty() {
        match report.category {
            Some(c) => out.push_str(&format!("No {} KSBs found in {}\n", c, report.standard)),
            None => out.push_str(&format!("No KSBs found in {}\n", report.standard)),
        }
        return out;
    }

    out.push_str(&format!("{} KSBs\n", report.standard));
    let mut current: Option<Category> = None;
    for k in &report.ksbs {
        if current != Some(k.category) {
            out.push_str(&format!("\n{}\n", k.category));
            current = Some(k.category);
        }
        if k.phase_mappings.is_empty() {
            out.push_str(&format!(
                "  {} ~ {}\n",
                k.code,
                output::description_preview(&k.description)
            ));
        } else {
            let tags: Vec<String> = k.phase_mappings.iter().map(Location::label).collect();
            out.push_str(&format!("  {} - {}\n", k.code, tags.join(", ")));
            if include_description {
                out.push_str(&format!(
                    "      {}\n",
                    output::description_preview(&k.description)
                ));
            }
        }
    }
    out
}

// --- Phase coverage ---

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CoverageRow {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct CategoryGroup {
    pub category: String,
    pub ksbs: Vec<CoverageRow>,
}

#[derive(Debug, Serialize, Clone)]
pub struct CoverageReport {
    pub standard: String,
    pub location: Location,
    pub groups: Vec<CategoryGroup>,
}

impl CoverageReport {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// KSBs mapped to exactly one location, grouped by category name.
pub fn show_coverage(
    store: &Store,
    course: &Course,
    location: Location,
    category: Option<Category>,
) -> Result<CoverageReport, UlwaziError> {
    let broker = DbBroker::new(store);
    let rows = broker.with_conn(Some(course.as_str()), "report.coverage", |conn| {
        let mut stmt = conn.prepare(
            "SELECT k.category, k.code, k.description
             FROM ksbs k
             JOIN module_ksbs m ON m.standard = k.standard AND m.ksb_code = k.code
             WHERE k.standard = ?1 AND m.phase = ?2 AND m.module_number IS ?3
               AND (?4 IS NULL OR k.category = ?4)",
        )?;
        let rows = stmt
            .query_map(
                params![
                    course.as_str(),
                    location.phase().as_str(),
                    location.module_number(),
                    category.map(|c| c.as_str())
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        CoverageRow {
                            code: row.get(1)?,
                            description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        },
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;

    let mut by_category: BTreeMap<String, Vec<CoverageRow>> = BTreeMap::new();
    for (category, row) in rows {
        by_category.entry(category).or_default().push(row);
    }
    let groups = by_category
        .into_iter()
        .map(|(category, mut ksbs)| {
            sort_codes_naturally(&mut ksbs, |r| r.code.as_str());
            CategoryGroup { category, ksbs }
        })
        .collect();

    Ok(CoverageReport {
        standard: course.to_string(),
        location,
        groups,
    })
}

pub fn render_coverage_report(report: &CoverageReport) -> String {
    if report.is_empty() {
        return format!(
            "No KSBs found for {} in {}\n",
            report.standard, report.location
        );
    }
    let mut out = format!("{} coverage: {}\n", report.standard, report.location);
    for group in &report.groups {
        out.push_str(&format!("\n{}\n", group.category));
        for row in &group.ksbs {
            out.push_str(&format!(
                "  {} ~ {}\n",
                row.code,
                output::description_preview(&row.description)
            ));
        }
    }
    out
}

// --- Session coverage ---

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SessionRow {
    pub code: String,
    pub category: Category,
    pub notes: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct SessionGroup {
    pub day: u32,
    pub session: u32,
    pub ksbs: Vec<SessionRow>,
}

#[derive(Debug, Serialize, Clone)]
pub struct SessionCoverageReport {
    pub standard: String,
    pub module: u32,
    pub day: Option<u32>,
    pub sessions: Vec<SessionGroup>,
}

/// Session slots of one module (optionally one day), grouped by slot.
pub fn show_session_coverage(
    store: &Store,
    course: &Course,
    module: u32,
    day: Option<u32>,
    category: Option<Category>,
) -> Result<SessionCoverageReport, UlwaziError> {
    let broker = DbBroker::new(store);
    let rows = broker.with_conn(Some(course.as_str()), "report.sessions", |conn| {
        let mut stmt = conn.prepare(
            "SELECT s.day_number, s.session_number, k.code, k.category, s.notes
             FROM session_ksbs s
             JOIN ksbs k ON k.standard = s.standard AND k.code = s.ksb_code
             WHERE s.standard = ?1 AND s.module_number = ?2
               AND (?3 IS NULL OR s.day_number = ?3)
               AND (?4 IS NULL OR k.category = ?4)",
        )?;
        let rows = stmt
            .query_map(
                params![course.as_str(), module, day, category.map(|c| c.as_str())],
                |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;

    let mut by_slot: BTreeMap<(u32, u32), Vec<SessionRow>> = BTreeMap::new();
    for (day, session, code, category, notes) in rows {
        by_slot.entry((day, session)).or_default().push(SessionRow {
            code,
            category: Category::from_db(&category)?,
            notes: notes.unwrap_or_default(),
        });
    }
    let sessions = by_slot
        .into_iter()
        .map(|((day, session), mut ksbs)| {
            sort_codes_naturally(&mut ksbs, |r| r.code.as_str());
            SessionGroup { day, session, ksbs }
        })
        .collect();

    Ok(SessionCoverageReport {
        standard: course.to_string(),
        module,
        day,
        sessions,
    })
}

pub fn render_session_coverage_report(report: &SessionCoverageReport) -> String {
    let scope = match report.day {
        Some(d) => format!("Module {}, Day {}", report.module, d),
        None => format!("Module {}", report.module),
    };
    if report.sessions.is_empty() {
        return format!(
            "No session KSBs found for {} in {}\n",
            report.standard, scope
        );
    }
    let mut out = format!("{} sessions: {}\n", report.standard, scope);
    for group in &report.sessions {
        out.push_str(&format!("\nDay {}, Session {}\n", group.day, group.session));
        for row in &group.ksbs {
            if row.notes.trim().is_empty() {
                out.push_str(&format!("  {}\n", row.code));
            } else {
                out.push_str(&format!(
                    "  {} - {}\n",
                    row.code,
                    output::compact_line(&row.notes, output::DESCRIPTION_PREVIEW_CHARS)
                ));
            }
        }
    }
    out
}

// --- CLI ---

#[derive(clap::Args, Debug)]
pub struct ShowCli {
    /// Course to report on (defaults to the current course)
    #[clap(long)]
    pub course: Option<String>,
    /// Only one category: k (Knowledge), s (Skill) or b (Behaviour)
    #[clap(long = "ksb", value_name = "k|s|b")]
    pub ksb: Option<String>,
    /// Print a description line under mapped KSBs
    #[clap(long)]
    pub desc: bool,
    /// Output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug)]
pub struct CoverageCli {
    /// Course to report on (defaults to the current course)
    #[clap(long)]
    pub course: Option<String>,
    /// Module number
    #[clap(short = 'm', long = "module", value_parser = clap::value_parser!(u32).range(1..))]
    pub module: Option<u32>,
    /// Report the Discover phase
    #[clap(long)]
    pub discover: bool,
    /// Report session slots of this day of the module
    #[clap(short = 'd', long = "day", value_parser = clap::value_parser!(u32).range(1..))]
    pub day: Option<u32>,
    /// Report session slots of every day of the module
    #[clap(long)]
    pub sessions: bool,
    /// Only one category: k (Knowledge), s (Skill) or b (Behaviour)
    #[clap(long = "ksb", value_name = "k|s|b")]
    pub ksb: Option<String>,
    /// Output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

fn category_filter(raw: Option<&str>) -> Result<Option<Category>, UlwaziError> {
    raw.map(ksb::parse_category_filter).transpose()
}

pub fn run_show_cli(store: &Store, cli: ShowCli) -> Result<(), UlwaziError> {
    let category = category_filter(cli.ksb.as_deref())?;
    let course = config::resolve_course(store, cli.course.as_deref())?;
    db::initialize_db(store)?;

    let report = show_course(store, &course, category)?;
    match cli.format {
        OutputFormat::Text => print!("{}", render_course_report(&report, cli.desc)),
        OutputFormat::Json => println!("{}", output::to_json(&report)?),
    }
    Ok(())
}

pub fn run_coverage_cli(store: &Store, cli: CoverageCli) -> Result<(), UlwaziError> {
    let location = Location::from_flags(cli.module, cli.discover)?;
    let category = category_filter(cli.ksb.as_deref())?;
    let course = config::resolve_course(store, cli.course.as_deref())?;

    let session_view = cli.day.is_some() || cli.sessions;
    let module = match (location, session_view) {
        (Location::Discover, true) => {
            return Err(UlwaziError::InvalidArgument(
                "Session coverage needs a module (-m <N>); Discover has no sessions".to_string(),
            ));
        }
        (Location::Module(n), true) => Some(n),
        (_, false) => None,
    };
    db::initialize_db(store)?;

    if let Some(module) = module {
        let report = show_session_coverage(store, &course, module, cli.day, category)?;
        match cli.format {
            OutputFormat::Text => print!("{}", render_session_coverage_report(&report)),
            OutputFormat::Json => println!("{}", output::to_json(&report)?),
        }
    } else {
        let report = show_coverage(store, &course, location, category)?;
        match cli.format {
            OutputFormat::Text => print!("{}", render_coverage_report(&report)),
            OutputFormat::Json => println!("{}", output::to_json(&report)?),
        }
    }
    Ok(())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "report",
        "version": "0.1.0",
        "description": "Course listing and phase/session coverage views",
        "commands": [
            { "name": "show", "parameters": ["ksb", "desc"] },
            { "name": "coverage", "parameters": ["module|discover", "day", "sessions", "ksb"] }
        ],
        "storage": ["ulwazi.db"]
    })
}
