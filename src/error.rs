use std::path::PathBuf;

use thiserror::Error;

use crate::validator::Problem;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{}: {source}", path.display())]
    NotFound {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The path exists but cannot be read (permissions and the like).
    #[error("{}: {source}", path.display())]
    Inaccessible {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration ({} problem(s))", .0.len())]
    Invalid(Vec<Problem>),

    #[error("invalid regex for pattern {name}: {source}")]
    Regex { name: String, source: regex::Error },

    #[error("failed to write to log file {}: {source}", path.display())]
    Sink {
        path: PathBuf,
        source: std::io::Error,
    },
}
