//! Turns a raw payload line stream into game events.

use super::{GameEvent, decode_event};
use crate::error::ProtocolError;
use crate::transport::LineStream;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Lazy event sequence for one connection.
///
/// Items are either decoded events or the protocol error for a payload that
/// was skipped. The sequence ends on transport close or error, after a
/// terminal event, or when the connection stays silent (keep-alives count as
/// traffic) for longer than the idle timeout.
pub type EventStream = BoxStream<'static, Result<GameEvent, ProtocolError>>;

/// Decodes a game stream on behalf of one account.
#[derive(Debug, Clone)]
pub struct StreamReader {
    account_id: String,
    idle_timeout: Duration,
}

impl StreamReader {
    /// Creates a reader for the given account.
    #[instrument]
    pub fn new(account_id: String, idle_timeout: Duration) -> Self {
        Self {
            account_id,
            idle_timeout,
        }
    }

    /// Wraps a line stream into an event stream.
    #[instrument(skip(self, lines), fields(account_id = %self.account_id))]
    pub fn events(&self, mut lines: LineStream) -> EventStream {
        let account_id = self.account_id.clone();
        let idle_timeout = self.idle_timeout;

        let events = async_stream::stream! {
            loop {
                let line = match tokio::time::timeout(idle_timeout, lines.next()).await {
                    Err(_) => {
                        warn!(timeout_secs = idle_timeout.as_secs(), "Game stream idle, closing");
                        break;
                    }
                    Ok(None) => {
                        info!("Game stream closed by server");
                        break;
                    }
                    Ok(Some(Err(e))) => {
                        warn!(error = %e, "Game stream failed");
                        break;
                    }
                    Ok(Some(Ok(line))) => line,
                };

                if line.trim().is_empty() {
                    debug!("Keep-alive");
                    continue;
                }

                match decode_event(&line, &account_id) {
                    Ok(event) => {
                        let terminal = event.is_terminal();
                        yield Ok(event);
                        if terminal {
                            debug!("Terminal event, ending stream");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed payload");
                        yield Err(e);
                    }
                }
            }
        };

        Box::pin(events)
    }
}
