use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UlwaziError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Path error: {0}")]
    PathError(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("KSB code must start with K, S, or B (got '{0}')")]
    InvalidCode(String),
    #[error("No current course set")]
    NoCourseSelected,
    #[error("{code} not found in {standard}")]
    KsbNotFound { standard: String, code: String },
    #[error("{code} already exists in {standard}")]
    KsbExists { standard: String, code: String },
    #[error("{code} is not mapped to {location} in {standard}")]
    MappingNotFound {
        standard: String,
        code: String,
        location: String,
        flag: String,
    },
    #[error("{code} is already mapped to {location} in {standard}")]
    MappingExists {
        standard: String,
        code: String,
        location: String,
        flag: String,
    },
    #[error("{code} is not mapped to Module {module} in {standard}")]
    NotPhaseMapped {
        standard: String,
        code: String,
        module: u32,
    },
    #[error("{code} has no session at {slot} in {standard}")]
    SessionNotFound {
        standard: String,
        code: String,
        slot: String,
        flags: String,
    },
    #[error("{code} is already mapped to {slot} in {standard}")]
    SessionExists {
        standard: String,
        code: String,
        slot: String,
        flags: String,
    },
}

impl UlwaziError {
    /// Follow-up command a user can run to recover from this error.
    pub fn hint(&self) -> Option<String> {
        match self {
            UlwaziError::NoCourseSelected => {
                Some("Use `ulwazi course <DE5|DA4>` to set one, or pass --course.".to_string())
            }
            UlwaziError::InvalidCode(_) => Some("Codes look like K1, S12 or B3.".to_string()),
            UlwaziError::KsbNotFound { code, .. } => Some(format!(
                "Add it first with `ulwazi ksb {} --add \"<description>\"`",
                code
            )),
            UlwaziError::KsbExists { code, .. } => Some(format!(
                "Use `ulwazi ksb {} --update \"<description>\"` to modify it",
                code
            )),
            UlwaziError::MappingNotFound { code, flag, .. } => {
                Some(format!("Map it with `ulwazi map {} {}`", code, flag))
            }
            UlwaziError::MappingExists { code, flag, .. } => Some(format!(
                "Remove it with `ulwazi map {} {} --remove` if it is wrong",
                code, flag
            )),
            UlwaziError::NotPhaseMapped { code, module, .. } => Some(format!(
                "Map it first with `ulwazi map {} -m {}`",
                code, module
            )),
            UlwaziError::SessionNotFound { code, .. } => Some(format!(
                "List its session slots with `ulwazi ksb {}`",
                code
            )),
            UlwaziError::SessionExists { code, flags, .. } => Some(format!(
                "Use `ulwazi session {} {} --notes \"<notes>\" --update` to change its notes",
                code, flags
            )),
            _ => None,
        }
    }
}

/// Extended result code of a SQLite constraint failure, if `err` is one.
pub(crate) fn constraint_code(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Some(e.extended_code)
        }
        _ => None,
    }
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        constraint_code(err),
        Some(rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
            | Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
    )
}

pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    constraint_code(err) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}
