//! JSON log lines: one JSON object per line (ndjson) for ingestion and audit.

use serde::Serialize;
use std::io::Write;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Summary line for one completed pipeline stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageEvent<'a> {
    pub stage: &'a str,
    pub rows: usize,
    pub columns: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'a str>,
}

pub struct StructuredLogger;

impl StructuredLogger {
    /// Install global subscriber on stderr; level from RUST_LOG or `default_level`.
    /// Stdout stays reserved for command output.
    pub fn init(json: bool, default_level: &str) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let result = if json {
            let fmt = tracing_subscriber::fmt::layer()
                .json()
                .with_span_events(FmtSpan::NONE)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry().with(filter).with(fmt).try_init()
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
        };
        if result.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    }

    /// Emit a single structured line (e.g. a prediction) without going through tracing
    pub fn emit_json(event: &impl Serialize, w: &mut impl Write) -> std::io::Result<()> {
        let line = serde_json::to_string(event)?;
        writeln!(w, "{}", line)
    }

    /// Log a stage summary through tracing.
    pub fn stage(event: &StageEvent<'_>) {
        tracing::info!(
            stage = event.stage,
            rows = event.rows,
            columns = event.columns,
            dropped = ?event.dropped,
            note = event.note.unwrap_or(""),
            "stage complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_json_writes_one_line() {
        let dropped = vec!["srcip".to_string()];
        let event = StageEvent {
            stage: "dedup",
            rows: 28,
            columns: 9,
            dropped: Some(dropped.as_slice()),
            note: Some("2 duplicate rows removed"),
        };
        let mut buf = Vec::new();
        StructuredLogger::emit_json(&event, &mut buf).unwrap();
        let line = String::from_utf8(buf).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        let v: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(v["stage"], "dedup");
        assert_eq!(v["dropped"][0], "srcip");
        assert_eq!(v["note"], "2 duplicate rows removed");

        let bare = StageEvent { note: None, dropped: None, ..event };
        let mut buf = Vec::new();
        StructuredLogger::emit_json(&bare, &mut buf).unwrap();
        let v: serde_json::Value = serde_json::from_str(String::from_utf8(buf).unwrap().trim()).unwrap();
        assert!(v.get("note").is_none());
        assert!(v.get("dropped").is_none());
    }
}
