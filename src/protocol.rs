//! Wire protocol between the registration client and server.
//!
//! ```text
//! Request:  CHARGER Automne\n
//! Response: {"status":"courses","body":[{"session":"Automne","code":"IFT1015","name":"Programmation1"}]}\n
//!
//! Request:  INSCRIRE {"student_id":"123","course_code":"IFT1025"}\n
//! Response: {"status":"confirmation","body":"..."}\n
//!
//! Request:  F1 Automne\n
//! Response: {"status":"error","body":"unknown command: F1"}\n
//! ```
//!
//! Requests are plain text lines parsed by [`crate::command::parse`].
//! Responses are single JSON lines.

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::model::Course;

/// Verb listing the courses of a session. Argument: the session label.
pub const LOAD_COMMAND: &str = "CHARGER";

/// Verb submitting a registration. Argument: the form encoded as JSON.
pub const REGISTER_COMMAND: &str = "INSCRIRE";

/// Longest request line accepted, not counting its terminator.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// A server reply. Exactly one is written per command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "body", rename_all = "snake_case")]
pub enum Response {
    /// Courses matching a load request, in catalog order.
    Courses(Vec<Course>),
    /// Confirmation of a recorded registration.
    Confirmation(String),
    /// The command failed; the message is safe to show to the user.
    Error(String),
}

impl Response {
    /// Encode as a newline-terminated JSON line.
    pub fn encode(&self) -> serde_json::Result<BytesMut> {
        let json = serde_json::to_vec(self)?;
        let mut buf = BytesMut::with_capacity(json.len() + 1);
        buf.extend_from_slice(&json);
        buf.put_u8(b'\n');
        Ok(buf)
    }

    /// Decode one response line.
    pub fn decode(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim_end())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}

/// Build the request line for a verb and argument.
pub fn request_line(verb: &str, argument: &str) -> String {
    if argument.is_empty() {
        format!("{verb}\n")
    } else {
        format!("{verb} {argument}\n")
    }
}
