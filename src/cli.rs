//! CLI struct definitions for the Ulwazi command-line interface.
//!
//! Subsystem argument structs live next to their subsystem; dispatch lives
//! in `lib.rs`.

use crate::plugins::{ksb, mapping, report, session};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "ulwazi",
    version = env!("CARGO_PKG_VERSION"),
    about = "Ulwazi - KSB mapping tool for apprenticeship training"
)]
pub(crate) struct Cli {
    #[clap(flatten)]
    pub global: GlobalFlags,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(clap::Args, Debug)]
pub(crate) struct GlobalFlags {
    /// Data directory holding ulwazi.db and config.toml (default: ~/.ulwazi).
    #[clap(long, global = true, env = "ULWAZI_HOME")]
    pub home: Option<PathBuf>,
    /// Enable debug logging on stderr.
    #[clap(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create the database tables (safe to repeat)
    Init,

    /// Set the current working course (DE5, DA4 or TEST)
    Course {
        /// Course code
        code: String,
    },

    /// Show the current working course
    Current,

    /// Manage KSBs (view, add, update, remove)
    Ksb(ksb::KsbCli),

    /// List every KSB of the course with where it is taught
    Show(report::ShowCli),

    /// Map a KSB to the Discover phase or a module
    Map(mapping::MapCli),

    /// Show which KSBs a phase, module, or module day covers
    Coverage(report::CoverageCli),

    /// Map a KSB to a module day/session slot
    Session(session::SessionCli),

    /// Print the JSON schema of every subsystem
    Schema,
}
