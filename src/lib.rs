//! Ulwazi: KSB mapping for apprenticeship training.
//!
//! An apprenticeship standard (course) defines Knowledge, Skill and
//! Behaviour requirements (KSBs). Ulwazi records where each one is taught:
//! the Discover onboarding phase, numbered modules, and concrete
//! day/session slots within a module.
//!
//! # Architecture
//!
//! - All state lives in one data directory (`~/.ulwazi` by default):
//!   `ulwazi.db` (SQLite), `config.toml` (current course) and
//!   `broker.events.jsonl` (audit log).
//! - Every store access goes through `DbBroker`, which runs the operation in
//!   one transaction and records an audit event.
//! - Nothing is held in memory between invocations.
//!
//! # Examples
//!
//! ```bash
//! ulwazi course DE5
//! ulwazi ksb K1 --add "Data modelling fundamentals"
//! ulwazi map K1 -m 2
//! ulwazi session K1 -m 2 -d 1 -s 1 --notes "intro"
//! ulwazi show --desc
//! ulwazi coverage -m 2
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: store, schema, broker, configuration and output primitives
//! - [`plugins`]: KSB registry, phase mapper, session mapper, report views

mod cli;
pub mod core;
pub mod plugins;

use cli::{Cli, Command};
use crate::core::{config, course::Course, db, error, output, store::Store};
use plugins::{ksb, mapping, report, session};

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A second init (e.g. from tests) is ignored.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub fn run() -> Result<(), error::UlwaziError> {
    let cli = Cli::parse();
    init_tracing(cli.global.debug);

    let store = Store::resolve(cli.global.home.as_deref())?;
    tracing::debug!(root = %store.root.display(), "store resolved");

    match cli.command {
        Command::Init => {
            db::initialize_db(&store)?;
            for table in db::table_names(&store)? {
                println!("✓ Table '{}' ready", table);
            }
            println!("✓ Database location: {}", store.db_path().display());
        }
        Command::Course { code } => {
            let course = Course::parse(&code)?;
            config::set_current_course(&store, &course)?;
            println!("Set current course to: {}", course);
        }
        Command::Current => match config::current_course(&store)? {
            Some(course) => println!("Currently working on: {}", course),
            None => println!(
                "No current course set. Use 'ulwazi course <DE5|DA4>' to set one."
            ),
        },
        Command::Ksb(ksb_cli) => ksb::run_ksb_cli(&store, ksb_cli)?,
        Command::Show(show_cli) => report::run_show_cli(&store, show_cli)?,
        Command::Map(map_cli) => mapping::run_map_cli(&store, map_cli)?,
        Command::Coverage(coverage_cli) => report::run_coverage_cli(&store, coverage_cli)?,
        Command::Session(session_cli) => session::run_session_cli(&store, session_cli)?,
        Command::Schema => {
            let schemas = serde_json::json!([
                ksb::schema(),
                mapping::schema(),
                session::schema(),
                report::schema(),
            ]);
            println!("{}", output::to_json(&schemas)?);
        }
    }
    Ok(())
}

/// Print an error and its remediation hint on stderr.
pub fn report_error(err: &error::UlwaziError) {
    use colored::Colorize;

    eprintln!("{} {}", "Error:".bright_red().bold(), err);
    if let Some(hint) = err.hint() {
        eprintln!("  {} {}", "Hint:".bright_cyan(), hint);
    }
}
