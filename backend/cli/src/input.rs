//! Operator input: lines from a reader forwarded to the conversation task.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::terminal_output::ConsoleSurface;

/// Forward lines from `reader`. Lines typed while the surface has input
/// disabled are dropped. Reaching end of input closes the channel.
pub fn spawn_input_reader<R>(reader: R, surface: Arc<ConsoleSurface>) -> mpsc::Receiver<String>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if !surface.input_enabled() {
                        debug!(len = line.len(), "Input disabled, dropping line");
                        continue;
                    }
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read input");
                    break;
                }
            }
        }
    });
    rx
}
