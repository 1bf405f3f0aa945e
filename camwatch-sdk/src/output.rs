//! Output backends for emitting health reports.

use std::path::PathBuf;

use camwatch_types::HealthReport;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

/// Output destination for health reports.
#[derive(Debug)]
pub enum Output {
    /// Write reports to a JSON file.
    ///
    /// The file is overwritten with each report.
    File(PathBuf),

    /// Send reports to a TCP server.
    ///
    /// Each report is sent as a newline-delimited JSON message.
    Tcp(String),

    /// Send reports through a channel.
    ///
    /// Use `Output::channel()` to create this variant and get the receiver.
    Channel(tokio::sync::mpsc::Sender<HealthReport>),
}

impl Output {
    /// Create a file output.
    ///
    /// ```rust
    /// use camwatch_sdk::Output;
    ///
    /// let output = Output::file("health.json");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Output::File(path.into())
    }

    /// Create a TCP output.
    pub fn tcp(addr: impl Into<String>) -> Self {
        Output::Tcp(addr.into())
    }

    /// Create a channel output and return both the output and receiver.
    pub fn channel(buffer: usize) -> (Self, tokio::sync::mpsc::Receiver<HealthReport>) {
        let (tx, rx) = tokio::sync::mpsc::channel(buffer.max(1));
        (Output::Channel(tx), rx)
    }

    /// Emit a report to this output.
    pub(crate) async fn emit(&self, report: &HealthReport) -> std::io::Result<()> {
        match self {
            Output::File(path) => {
                let json = serde_json::to_string_pretty(report)?;
                tokio::fs::write(path, json).await?;
            }
            Output::Tcp(addr) => {
                // Best effort: an absent listener is not an error.
                match TcpStream::connect(addr).await {
                    Ok(mut stream) => {
                        let mut json = serde_json::to_vec(report)?;
                        json.push(b'\n');
                        stream.write_all(&json).await?;
                    }
                    Err(e) => debug!(%addr, error = %e, "health listener unreachable"),
                }
            }
            Output::Channel(tx) => {
                if tx.try_send(report.clone()).is_err() {
                    debug!("health report dropped; channel full or closed");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camwatch_types::{CheckReport, Level, Timestamp};
    use tokio::io::AsyncBufReadExt;

    fn report() -> HealthReport {
        HealthReport::builder()
            .hardware_id("cam-7")
            .stamp(Timestamp::from_secs(3))
            .check_report("calibration", CheckReport::warn("camera is not calibrated"))
            .build()
    }

    #[tokio::test]
    async fn file_output_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("health.json");
        let output = Output::file(&path);

        output.emit(&HealthReport::new("old", Timestamp::ZERO)).await.unwrap();
        output.emit(&report()).await.unwrap();

        let written: HealthReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, report());
    }

    #[tokio::test]
    async fn channel_output_forwards() {
        let (output, mut rx) = Output::channel(4);
        output.emit(&report()).await.unwrap();
        assert_eq!(rx.recv().await.map(|r| r.level), Some(Level::Warn));
    }

    #[tokio::test]
    async fn tcp_output_sends_one_line() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let output = Output::tcp(listener.local_addr().unwrap().to_string());

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut line = String::new();
            tokio::io::BufReader::new(stream).read_line(&mut line).await.unwrap();
            line
        });

        output.emit(&report()).await.unwrap();
        let line = server.await.unwrap();
        let received: HealthReport = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(received.hardware_id, "cam-7");
    }

    #[tokio::test]
    async fn tcp_output_tolerates_missing_listener() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(Output::tcp(addr).emit(&report()).await.is_ok());
    }
}
