//! Structural checks run on a loaded [`Config`] before any file is watched.
//!
//! Duplicate detection compares each pattern only with the one that follows it
//! in the list; two identical patterns further apart are not reported.

use std::fmt;
use std::io::{self, BufRead, Write};

use crate::config::Config;
use crate::types::{LoggingMode, PatternField};

/// A fatal configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    DuplicateValue { field: PatternField, value: String },
    LogFileLoop { path: String },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::DuplicateValue { field, value } => {
                write!(f, "Duplicate value: {} (field {})", value, field)
            }
            Problem::LogFileLoop { path } => {
                write!(f, "cannot tail log file {} (possible loop)", path)
            }
        }
    }
}

/// Non-fatal findings; the caller reports them and carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    MissingLogging,
    InvalidLogging(String),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingLogging => {
                f.write_str("No logging method specified, defaulting to verbose.")
            }
            Warning::InvalidLogging(value) => write!(
                f,
                "Invalid logging method {:?}, defaulting to verbose.",
                value
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct Report {
    pub problems: Vec<Problem>,
    pub warnings: Vec<Warning>,
    /// Indices of patterns whose regex is empty; each needs operator confirmation.
    pub empty_regex: Vec<usize>,
}

impl Report {
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

pub fn validate(config: &Config) -> Report {
    let mut report = Report::default();

    if config.logging.is_empty() {
        report.warnings.push(Warning::MissingLogging);
    } else if LoggingMode::parse(&config.logging).is_none() {
        report
            .warnings
            .push(Warning::InvalidLogging(config.logging.clone()));
    }

    for pair in config.patterns.windows(2) {
        for field in PatternField::ALL {
            let value = field.value(&pair[0]);
            if value == field.value(&pair[1]) {
                report.problems.push(Problem::DuplicateValue {
                    field,
                    value: value.to_string(),
                });
            }
        }
    }

    for file in &config.files {
        if *file == config.log_file {
            report.problems.push(Problem::LogFileLoop { path: file.clone() });
        }
    }

    report.empty_regex = config
        .patterns
        .iter()
        .enumerate()
        .filter(|(_, pattern)| pattern.regex.is_empty())
        .map(|(index, _)| index)
        .collect();

    report
}

/// Asks `question` until the answer is exactly `y` or `n`.
///
/// End of input counts as `n`.
pub fn confirm<R: BufRead, W: Write>(mut input: R, mut output: W, question: &str) -> io::Result<bool> {
    let mut line = String::new();
    loop {
        write!(output, "{} [y/n] ", question)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(false);
        }

        match line.split_whitespace().next() {
            Some("y") => return Ok(true),
            Some("n") => return Ok(false),
            _ => continue,
        }
    }
}
