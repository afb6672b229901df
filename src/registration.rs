//! Append-only registration log.
//!
//! Each accepted registration becomes one tab-separated line:
//!
//! ```text
//! recorded_at\tsession\tcourse_code\tstudent_id\tfirst_name\tlast_name\temail
//! ```
//!
//! The log is the only record of registrations; nothing is kept in memory.

use chrono::{DateTime, SecondsFormat, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::RegistrationForm;

/// Field delimiter within a log line.
pub const FIELD_DELIMITER: char = '\t';

/// Number of fields in a log line.
const RECORD_FIELDS: usize = 7;

/// Message returned to the client once a registration is durable.
pub type Confirmation = String;

/// One registration read back from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedRegistration {
    pub recorded_at: DateTime<Utc>,
    pub form: RegistrationForm,
}

/// Durable, append-only sink for registration forms.
#[derive(Debug)]
pub struct RegistrationLog {
    path: PathBuf,
    /// Serializes appends so concurrent connections never interleave lines.
    writer: Mutex<()>,
}

impl RegistrationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `form` to the log and return a confirmation once it is on disk.
    pub async fn submit(&self, form: &RegistrationForm) -> Result<Confirmation> {
        validate(form)?;

        let record = encode_record(form, Utc::now());

        let _guard = self.writer.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(Error::PersistenceError)?;
        file.write_all(record.as_bytes())
            .await
            .map_err(Error::PersistenceError)?;
        file.flush().await.map_err(Error::PersistenceError)?;
        file.sync_data().await.map_err(Error::PersistenceError)?;

        info!(
            student_id = %form.student_id,
            course = %form.course_code,
            "Registration recorded"
        );

        Ok(format!(
            "Registration successful: student {} enrolled in {}",
            form.student_id, form.course_code
        ))
    }

    /// Read every registration recorded so far, oldest first.
    ///
    /// A log that does not exist yet is an empty history. Unreadable lines
    /// are logged and skipped.
    pub async fn read_all(&self) -> Result<Vec<LoggedRegistration>> {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::PersistenceError(e)),
        };

        let mut lines = BufReader::new(file).lines();
        let mut records = Vec::new();
        let mut line_no = 0;

        while let Some(line) = lines.next_line().await.map_err(Error::PersistenceError)? {
            line_no += 1;
            if line.is_empty() {
                continue;
            }
            match decode_record(&line, line_no) {
                Ok(record) => records.push(record),
                Err(e) => warn!(error = %e, "Skipping registration record"),
            }
        }

        Ok(records)
    }
}

/// Reject forms whose values would break the line format.
fn validate(form: &RegistrationForm) -> Result<()> {
    let fields = [
        ("student_id", &form.student_id),
        ("course_code", &form.course_code),
        ("session", &form.session),
        ("first_name", &form.first_name),
        ("last_name", &form.last_name),
        ("email", &form.email),
    ];

    for (name, value) in fields {
        if value.contains(|c: char| c == FIELD_DELIMITER || c == '\n' || c == '\r') {
            return Err(Error::InvalidForm(format!(
                "field `{name}` contains a tab or line break"
            )));
        }
    }
    Ok(())
}

fn encode_record(form: &RegistrationForm, recorded_at: DateTime<Utc>) -> String {
    let timestamp = recorded_at.to_rfc3339_opts(SecondsFormat::Micros, true);
    let mut line = [
        timestamp.as_str(),
        form.session.as_str(),
        form.course_code.as_str(),
        form.student_id.as_str(),
        form.first_name.as_str(),
        form.last_name.as_str(),
        form.email.as_str(),
    ]
    .join("\t");
    line.push('\n');
    line
}

fn decode_record(line: &str, line_no: usize) -> Result<LoggedRegistration> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    let [recorded_at, session, course_code, student_id, first_name, last_name, email] =
        fields.as_slice()
    else {
        return Err(Error::MalformedRecord {
            line: line_no,
            reason: format!("expected {RECORD_FIELDS} fields, found {}", fields.len()),
        });
    };

    let recorded_at = DateTime::parse_from_rfc3339(recorded_at)
        .map_err(|e| Error::MalformedRecord {
            line: line_no,
            reason: format!("bad timestamp: {e}"),
        })?
        .with_timezone(&Utc);

    Ok(LoggedRegistration {
        recorded_at,
        form: RegistrationForm {
            student_id: student_id.to_string(),
            course_code: course_code.to_string(),
            session: session.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
        },
    })
}
