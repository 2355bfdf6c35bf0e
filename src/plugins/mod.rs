//! Ulwazi subsystems: KSB registry, phase mapper, session mapper, reports.

pub mod ksb;
pub mod mapping;
pub mod report;
pub mod session;
