use std::fs::File;
use std::io;
use std::path::Path;

use chrono::{DateTime, Local};

use crate::error::{Error, Result};

/// Checks that `path` exists and can be opened for reading.
pub fn can_access_file(path: &Path) -> Result<()> {
    let classify = |source: io::Error| {
        if source.kind() == io::ErrorKind::NotFound {
            Error::NotFound {
                path: path.to_path_buf(),
                source,
            }
        } else {
            Error::Inaccessible {
                path: path.to_path_buf(),
                source,
            }
        }
    };

    std::fs::metadata(path).map_err(classify)?;
    File::open(path).map_err(classify)?;
    Ok(())
}

/// RFC 1123 layout with a numeric zone, e.g. `Mon, 02 Jan 2006 15:04:05 +0100`.
pub fn format_rfc1123(timestamp: &DateTime<Local>) -> String {
    timestamp.format("%a, %d %b %Y %H:%M:%S %z").to_string()
}

pub fn format_date_time(timestamp: &DateTime<Local>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}
