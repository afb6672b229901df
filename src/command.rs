//! Command line parser.
//!
//! A request is a single text line: a verb, optionally followed by
//! whitespace and an argument. The parser does not know which verbs exist;
//! that is the dispatcher's concern.

use crate::error::{Error, Result};

/// A decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: String,
    pub argument: String,
}

/// Parse a raw request line into a verb and its argument.
///
/// The verb is the first whitespace-delimited token. The argument is the
/// rest of the line after the whitespace following the verb, with its
/// interior left untouched. Surrounding whitespace and the line terminator
/// are dropped.
pub fn parse(line: &str) -> Result<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(Error::MalformedCommand("empty command line".to_string()));
    }

    let (verb, argument) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim_start()),
        None => (trimmed, ""),
    };

    Ok(Command {
        verb: verb.to_string(),
        argument: argument.to_string(),
    })
}
