//! Severity mapping between Monolog-style numeric codes and Seq level names.
//!
//! Records arrive with the numeric codes used by the upstream logging
//! facade (100 for debug through 600 for emergency). Seq only knows five
//! named levels, so several codes collapse onto the same name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Numeric code for debug records.
pub const DEBUG: i64 = 100;
/// Numeric code for informational records.
pub const INFO: i64 = 200;
/// Numeric code for notices.
pub const NOTICE: i64 = 250;
/// Numeric code for warnings.
pub const WARNING: i64 = 300;
/// Numeric code for errors.
pub const ERROR: i64 = 400;
/// Numeric code for critical conditions.
pub const CRITICAL: i64 = 500;
/// Numeric code for alerts.
pub const ALERT: i64 = 550;
/// Numeric code for emergencies.
pub const EMERGENCY: i64 = 600;

/// Canonical Seq severity.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SeqLevel {
    Debug,
    /// Fallback for codes outside the mapping table.
    #[default]
    Information,
    Warning,
    Error,
    Fatal,
}

impl SeqLevel {
    /// Map a numeric severity code onto a Seq level.
    ///
    /// Codes outside the table resolve to [`SeqLevel::Information`] rather
    /// than failing, since this runs on every log call.
    ///
    /// ```rust
    /// use seqlog::SeqLevel;
    ///
    /// assert_eq!(SeqLevel::from_code(300), SeqLevel::Warning);
    /// assert_eq!(SeqLevel::from_code(550), SeqLevel::Fatal);
    /// assert_eq!(SeqLevel::from_code(42), SeqLevel::Information);
    /// ```
    pub fn from_code(code: i64) -> Self {
        match code {
            DEBUG => Self::Debug,
            INFO | NOTICE => Self::Information,
            WARNING => Self::Warning,
            ERROR | CRITICAL => Self::Error,
            ALERT | EMERGENCY => Self::Fatal,
            _ => Self::default(),
        }
    }

    /// Name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Information => "Information",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
        }
    }
}

/// Map a numeric severity code to its canonical Seq name.
pub fn map_severity(code: i64) -> &'static str {
    SeqLevel::from_code(code).as_str()
}

/// Resolve a facade level name ("WARNING", "critical", ...) to its numeric code.
pub fn code_for_name(name: &str) -> Option<i64> {
    match name.to_ascii_uppercase().as_str() {
        "DEBUG" => Some(DEBUG),
        "INFO" | "INFORMATION" => Some(INFO),
        "NOTICE" => Some(NOTICE),
        "WARN" | "WARNING" => Some(WARNING),
        "ERROR" => Some(ERROR),
        "CRITICAL" => Some(CRITICAL),
        "ALERT" => Some(ALERT),
        "EMERGENCY" | "FATAL" => Some(EMERGENCY),
        _ => None,
    }
}

impl fmt::Display for SeqLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeqLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        code_for_name(s).map(Self::from_code).ok_or(())
    }
}
