//! `run`: supervise the stream in the foreground.
//!
//! stdout carries newline-delimited JSON only. Two kinds of lines are
//! written there:
//!
//! - `{"type": "status", "timestamp": ..., "readings": {...}}` on every
//!   status tick
//! - `{"type": "response", "result": {...}}` for every command read from
//!   stdin
//!
//! Closing stdin does not stop the supervisor; Ctrl-C does.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use rtspmic_core::StreamConfig;
use rtspmic_runtime::StreamSupervisor;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::error::{CliError, CliResult};

/// Start the supervisor and serve stdin/stdout until Ctrl-C.
pub async fn execute(config: StreamConfig, status_interval: f64, autostart: bool) -> CliResult<()> {
    let status_every = status_period(status_interval)?;

    let supervisor = StreamSupervisor::with_system_ports(config)?;
    if autostart {
        // A failed first start is visible in status; commands can retry it
        if let Err(e) = supervisor.start().await {
            warn!(error = %e, "Initial start failed");
        }
    }

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Unable to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl-C, shutting down");
    };

    let result = serve(
        &supervisor,
        tokio::io::stdin(),
        tokio::io::stdout(),
        status_every,
        ctrl_c,
    )
    .await;

    supervisor.shutdown().await;
    result
}

/// Convert `--status-interval` seconds; zero disables status lines.
pub fn status_period(seconds: f64) -> CliResult<Option<Duration>> {
    let period = Duration::try_from_secs_f64(seconds).map_err(|e| {
        CliError::Arguments(format!(
            "--status-interval must be a non-negative number of seconds, got {seconds}: {e}"
        ))
    })?;
    Ok((!period.is_zero()).then_some(period))
}

/// Serve commands from `input` and status to `output` until `shutdown` resolves.
pub async fn serve<R, W>(
    supervisor: &StreamSupervisor,
    input: R,
    mut output: W,
    status_every: Option<Duration>,
    shutdown: impl Future<Output = ()>,
) -> CliResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut input_open = true;

    let mut ticker = interval(status_every.unwrap_or(Duration::from_secs(3600)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,

            _ = ticker.tick(), if status_every.is_some() => {
                write_line(&mut output, &status_line(supervisor)).await?;
            }

            line = lines.next_line(), if input_open => match line {
                Ok(Some(line)) => {
                    if let Some(result) = handle_line(supervisor, &line).await {
                        let response = json!({"type": "response", "result": result});
                        write_line(&mut output, &response).await?;
                    }
                }
                Ok(None) => {
                    debug!("stdin closed, no more commands");
                    input_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read command input");
                    input_open = false;
                }
            },
        }
    }

    Ok(())
}

/// Answer one input line; blank lines get no answer.
pub async fn handle_line(supervisor: &StreamSupervisor, line: &str) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(line) {
        Ok(request) => Some(supervisor.handle_request(&request).await),
        Err(e) => Some(json!({"error": format!("Invalid request: {e}")})),
    }
}

fn status_line(supervisor: &StreamSupervisor) -> Value {
    json!({
        "type": "status",
        "timestamp": Utc::now().to_rfc3339(),
        "readings": supervisor.readings(),
    })
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, value: &Value) -> CliResult<()> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    output.write_all(line.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}
