//! Core modules shared by every Ulwazi subsystem.

pub mod broker;
pub mod config;
pub mod course;
pub mod db;
pub mod error;
pub mod output;
pub mod schemas;
pub mod store;
pub mod time;
