//! Per-connection state machine.
//!
//! ```text
//! Accepted -> AwaitingCommand -> Dispatching -> RespondingSuccess -> Closed
//!                                            \-> RespondingError  -/
//! ```
//!
//! Every command that is read gets exactly one response line. End of
//! stream, transport errors and undecodable lines close the connection
//! without a reply. With `max_commands == 0` the handler loops back to
//! `AwaitingCommand` after each response until the client hangs up.

use std::io;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, error, trace, warn};

use crate::command::{self, Command};
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::protocol::{Response, MAX_LINE_LENGTH};

/// Current state of a connection.
#[derive(Debug)]
pub enum ConnState {
    /// Socket established, channel not yet read from.
    Accepted,
    /// Waiting for the next request line.
    AwaitingCommand,
    /// A command was decoded and is being executed.
    Dispatching(Command),
    /// Writing a successful result.
    RespondingSuccess(Response),
    /// Writing an error reply.
    RespondingError(Error),
    /// Terminal.
    Closed,
}

/// Serve one connection to completion.
///
/// Returns the number of responses written. At most `max_commands`
/// commands are served; `0` means no limit. The write half is shut down
/// before returning, whether or not serving succeeded.
pub async fn handle_connection<S>(
    stream: S,
    dispatcher: &Dispatcher,
    max_commands: usize,
) -> Result<usize>
where
    S: AsyncRead + AsyncWrite,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut line = String::with_capacity(256);
    let mut served = 0;
    let mut state = ConnState::Accepted;

    let result = loop {
        state = match state {
            ConnState::Accepted => {
                trace!("Connection accepted");
                ConnState::AwaitingCommand
            }

            ConnState::AwaitingCommand => {
                if max_commands != 0 && served >= max_commands {
                    ConnState::Closed
                } else {
                    match read_line(&mut reader, &mut line).await {
                        Ok(true) => match command::parse(&line) {
                            Ok(command) => ConnState::Dispatching(command),
                            Err(e) => ConnState::RespondingError(e),
                        },
                        Ok(false) => {
                            trace!("Connection closed by client");
                            ConnState::Closed
                        }
                        Err(e) => break Err(e),
                    }
                }
            }

            ConnState::Dispatching(command) => {
                trace!(verb = %command.verb, "Processing command");
                match dispatcher.dispatch(&command.verb, &command.argument).await {
                    Ok(response) => ConnState::RespondingSuccess(response),
                    Err(e) => ConnState::RespondingError(e),
                }
            }

            ConnState::RespondingSuccess(response) => {
                if let Err(e) = write_response(&mut writer, &response).await {
                    break Err(e);
                }
                served += 1;
                ConnState::AwaitingCommand
            }

            ConnState::RespondingError(e) => {
                match &e {
                    Error::StoreUnavailable(_)
                    | Error::PersistenceError(_)
                    | Error::ConnectionError(_) => error!(error = %e, "Command failed"),
                    _ => warn!(error = %e, "Command rejected"),
                }
                let response = Response::Error(e.client_message());
                if let Err(e) = write_response(&mut writer, &response).await {
                    break Err(e);
                }
                served += 1;
                ConnState::AwaitingCommand
            }

            ConnState::Closed => break Ok(served),
        };
    };

    if let Err(e) = writer.shutdown().await {
        trace!(error = %e, "Shutdown after close failed");
    }
    drop(reader);
    drop(writer);

    debug!(served, "Connection closed");
    result
}

/// Read one request line into `line`.
///
/// Returns `Ok(false)` at end of stream. A final line without a
/// terminator still counts as a request. A line longer than
/// `MAX_LINE_LENGTH` bytes, not counting its `\n`, is a transport error.
async fn read_line<R>(reader: &mut R, line: &mut String) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();

    // One byte of headroom tells a full-length line from an over-long one.
    let limit = MAX_LINE_LENGTH as u64 + 1;
    let n = reader.take(limit).read_line(line).await?;
    if n == 0 {
        return Ok(false);
    }
    if n > MAX_LINE_LENGTH && !line.ends_with('\n') {
        return Err(Error::ConnectionError(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("request line exceeds {MAX_LINE_LENGTH} bytes"),
        )));
    }
    Ok(true)
}

async fn write_response<W>(writer: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let encoded = response.encode().map_err(io::Error::from)?;
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}
