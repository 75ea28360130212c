pub mod check;
pub mod graph;
pub mod init;
pub mod probe;
pub mod render;
pub mod schedule;

use std::io::Write;

use clipcraft_common::ProgressSink;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Write progress lines to `out` as they arrive until every sender is gone.
/// The writer is handed back when the printer finishes.
pub fn spawn_progress_printer<W>(progress: &ProgressSink, mut out: W) -> JoinHandle<W>
where
    W: Write + Send + 'static,
{
    let mut rx = progress.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let line = writeln!(
                        out,
                        "[{}] {}",
                        event.timestamp.format("%H:%M:%S"),
                        event.text
                    );
                    if line.and_then(|_| out.flush()).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("  ... {skipped} progress lines skipped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        out
    })
}
