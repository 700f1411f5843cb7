use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Deserialize;

/// A named regular expression paired with the commands run when it matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Pattern {
    #[serde(rename = "Name", alias = "name", default)]
    pub name: String,
    #[serde(rename = "Regex", alias = "regex", default)]
    pub regex: String,
    #[serde(rename = "Command", alias = "command", default)]
    pub command: String,
    #[serde(rename = "Alert", alias = "alert", default)]
    pub alert: String,
}

#[cfg(test)]
impl Pattern {
    pub fn new(name: &str, regex: &str, command: &str, alert: &str) -> Self {
        Self {
            name: name.to_string(),
            regex: regex.to_string(),
            command: command.to_string(),
            alert: alert.to_string(),
        }
    }
}

/// The four comparable fields of a [`Pattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternField {
    Name,
    Regex,
    Command,
    Alert,
}

impl PatternField {
    pub const ALL: [PatternField; 4] = [
        PatternField::Name,
        PatternField::Regex,
        PatternField::Command,
        PatternField::Alert,
    ];

    pub fn value<'a>(&self, pattern: &'a Pattern) -> &'a str {
        match self {
            PatternField::Name => &pattern.name,
            PatternField::Regex => &pattern.regex,
            PatternField::Command => &pattern.command,
            PatternField::Alert => &pattern.alert,
        }
    }
}

impl fmt::Display for PatternField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternField::Name => "Name",
            PatternField::Regex => "Regex",
            PatternField::Command => "Command",
            PatternField::Alert => "Alert",
        };
        f.write_str(name)
    }
}

/// Audit record verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    Verbose,
    Minimal,
    /// Accepted without a warning, but records keep the verbose layout.
    None,
}

impl LoggingMode {
    /// Parses a `Logging` setting. `None` in the result means the value was
    /// empty or unrecognised and the caller fell back to verbose.
    pub fn parse(value: &str) -> Option<LoggingMode> {
        match value {
            "verbose" => Some(LoggingMode::Verbose),
            "minimal" => Some(LoggingMode::Minimal),
            "none" => Some(LoggingMode::None),
            _ => None,
        }
    }

    pub fn from_setting(value: &str) -> LoggingMode {
        Self::parse(value).unwrap_or(LoggingMode::Verbose)
    }
}

/// Where audit records go, decoded from the `Log_file` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    Discard,
    Stdout,
    File(PathBuf),
}

impl LogDestination {
    pub fn from_setting(value: &str) -> LogDestination {
        match value {
            "" | "none" => LogDestination::Discard,
            "stdout" => LogDestination::Stdout,
            path => LogDestination::File(PathBuf::from(path)),
        }
    }
}

/// Everything known about a single match, alive only while it is being reported.
#[derive(Debug, Clone)]
pub struct MatchEvent<'a> {
    pub timestamp: DateTime<Local>,
    pub source: &'a str,
    pub pattern: &'a Pattern,
    pub line: &'a str,
}
