//! registrar: a course registration server and client.
//!
//! Clients send one line per command; the server answers with one JSON line:
//! - `CHARGER <session>` lists the courses offered during a session
//! - `INSCRIRE <form>` appends a registration to the registration log
//!
//! Courses are read from a tab-separated catalog file on every request.
//! Registrations are appended to a text log and never held in memory.

pub mod catalog;
pub mod client;
pub mod command;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod protocol;
pub mod registration;
pub mod server;

pub use error::{Error, Result};
