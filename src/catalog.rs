//! Course catalog backed by a tab-separated text file.
//!
//! Each line holds `session\tcode\tname`. The file is read from start to
//! finish on every query, so edits to the catalog are visible immediately.

use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::model::Course;

/// Field delimiter within a catalog line.
pub const FIELD_DELIMITER: char = '\t';

/// Read-only view over the catalog file.
#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
}

impl Catalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// List every course offered during `session`, in file order.
    ///
    /// Session labels are compared exactly. Malformed lines are logged and
    /// skipped; only failing to read the file is an error.
    pub async fn list_by_session(&self, session: &str) -> Result<Vec<Course>> {
        let file = File::open(&self.path).await.map_err(Error::StoreUnavailable)?;
        let mut reader = BufReader::new(file);

        let mut courses = Vec::new();
        let mut buf = Vec::new();
        let mut line_no = 0;
        let mut skipped = 0;

        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(Error::StoreUnavailable)?;
            if n == 0 {
                break;
            }
            line_no += 1;

            // A line that is not UTF-8 is a malformed record, not a read failure.
            let record = match decode_line(&buf, line_no) {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "Skipping catalog record");
                    skipped += 1;
                    continue;
                }
            };
            if record.trim().is_empty() {
                continue;
            }

            match parse_line(record, line_no) {
                Ok(course) if course.session == session => {
                    trace!(code = %course.code, "Course matched");
                    courses.push(course);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Skipping catalog record");
                    skipped += 1;
                }
            }
        }

        debug!(
            session,
            matched = courses.len(),
            scanned = line_no,
            skipped,
            "Catalog scan complete"
        );
        Ok(courses)
    }
}

/// Decode one raw catalog line, without its line terminator.
fn decode_line(raw: &[u8], line_no: usize) -> Result<&str> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    std::str::from_utf8(raw).map_err(|e| Error::MalformedRecord {
        line: line_no,
        reason: format!("not valid UTF-8: {e}"),
    })
}

/// Parse one catalog line into a course.
///
/// The line must split into exactly three fields; each is trimmed.
pub fn parse_line(line: &str, line_no: usize) -> Result<Course> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).map(str::trim).collect();
    match fields.as_slice() {
        [session, code, name] => Ok(Course::new(*session, *code, *name)),
        _ => Err(Error::MalformedRecord {
            line: line_no,
            reason: format!("expected 3 fields, found {}", fields.len()),
        }),
    }
}
