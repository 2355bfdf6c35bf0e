//! Course (apprenticeship standard) codes.
//!
//! A course is not a stored row; it is the partition key on every table.

use crate::core::error::UlwaziError;
use std::fmt;
use std::str::FromStr;

/// Standards Ulwazi accepts. Add new codes here.
pub const KNOWN_COURSES: &[&str] = &["DE5", "DA4", "TEST"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Course(String);

impl Course {
    /// Normalize to upper case and check against [`KNOWN_COURSES`].
    pub fn parse(raw: &str) -> Result<Course, UlwaziError> {
        let code = raw.trim().to_uppercase();
        if KNOWN_COURSES.contains(&code.as_str()) {
            Ok(Course(code))
        } else {
            Err(UlwaziError::InvalidArgument(format!(
                "Unknown course '{}'. Course must be one of: {}",
                raw.trim(),
                KNOWN_COURSES.join(", ")
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Course {
    type Err = UlwaziError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Course::parse(s)
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
