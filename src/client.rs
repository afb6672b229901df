//! Client side of the registration protocol.
//!
//! Each call opens a fresh connection, sends one request line, reads one
//! response line and disconnects.

use std::io;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::model::RegistrationForm;
use crate::protocol::{request_line, Response, LOAD_COMMAND, REGISTER_COMMAND};

/// Failures seen by the client. Server-side errors arrive as
/// [`Response::Error`] instead.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
    #[error("could not encode request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("unreadable server response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("server closed the connection without responding")]
    ClosedEarly,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Connection parameters for talking to a registration server.
#[derive(Debug, Clone)]
pub struct Client {
    addr: String,
}

impl Client {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send one command and wait for its response.
    pub async fn send(&self, verb: &str, argument: &str) -> Result<Response, ClientError> {
        if verb.is_empty() || verb.contains(char::is_whitespace) {
            return Err(ClientError::InvalidRequest(format!("bad verb {verb:?}")));
        }
        if argument.contains(|c: char| c == '\n' || c == '\r') {
            return Err(ClientError::InvalidRequest(
                "argument contains a line break".to_string(),
            ));
        }

        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
        debug!(server = %self.addr, verb, "Connected");

        let (reader, mut writer) = stream.into_split();
        writer
            .write_all(request_line(verb, argument).as_bytes())
            .await?;
        writer.flush().await?;

        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(ClientError::ClosedEarly);
        }
        trace!(response = %line.trim_end(), "Received response");

        if let Err(e) = writer.shutdown().await {
            trace!(error = %e, "Shutdown failed");
        }

        Response::decode(&line).map_err(ClientError::Decode)
    }

    /// List the courses offered during `session`.
    pub async fn load_courses(&self, session: &str) -> Result<Response, ClientError> {
        self.send(LOAD_COMMAND, session).await
    }

    /// Submit a registration form.
    pub async fn register(&self, form: &RegistrationForm) -> Result<Response, ClientError> {
        let argument = serde_json::to_string(form).map_err(ClientError::Encode)?;
        self.send(REGISTER_COMMAND, &argument).await
    }
}

/// Text shown to the user for a response.
pub fn render(response: &Response) -> String {
    match response {
        Response::Courses(courses) if courses.is_empty() => {
            "No courses are offered for this session.".to_string()
        }
        Response::Courses(courses) => courses
            .iter()
            .enumerate()
            .map(|(i, course)| format!("{}. {}\t{}", i + 1, course.code, course.name))
            .collect::<Vec<_>>()
            .join("\n"),
        Response::Confirmation(message) => message.clone(),
        Response::Error(message) => format!("Error: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Course;

    #[test]
    fn test_render_uses_each_course_name() {
        let response = Response::Courses(vec![
            Course::new("Automne", "IFT1015", "Programmation1"),
            Course::new("Automne", "IFT2255", "Genie_Logiciel"),
        ]);
        assert_eq!(
            render(&response),
            "1. IFT1015\tProgrammation1\n2. IFT2255\tGenie_Logiciel"
        );
    }

    #[test]
    fn test_render_empty_and_messages() {
        assert_eq!(
            render(&Response::Courses(vec![])),
            "No courses are offered for this session."
        );
        assert_eq!(render(&Response::Confirmation("ok".to_string())), "ok");
        assert_eq!(
            render(&Response::Error("unknown command: F1".to_string())),
            "Error: unknown command: F1"
        );
    }

    #[tokio::test]
    async fn test_send_rejects_multiline_argument() {
        let client = Client::new("127.0.0.1:1");
        assert!(matches!(
            client.send(LOAD_COMMAND, "Hiver\nINSCRIRE {}").await,
            Err(ClientError::InvalidRequest(_))
        ));
        assert!(matches!(
            client.send("", "Hiver").await,
            Err(ClientError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_failure() {
        // Bind then drop to obtain a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::new(addr.to_string());
        assert!(matches!(
            client.load_courses("Hiver").await,
            Err(ClientError::Connect { .. })
        ));
    }
}
