// On-demand per-container log streaming

use bollard::container::LogOutput;
use bollard::query_parameters::LogsOptions;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tracing::debug;

use super::DockerHost;
use crate::models::{AppEvent, ContainerKey, EventSender, LogRecord, LogStream};

/// How many historical lines to request when the view opens.
const TAIL_LINES: &str = "100";

/// Follow a container's log stream, emitting one `LogRecord` per line until
/// the stream ends, the task is aborted, or the channel closes. No
/// synthetic lines are emitted on either end.
pub async fn stream_logs(host: DockerHost, container_id: String, tx: EventSender) {
    let key = ContainerKey::new(host.host_id.clone(), container_id.clone());
    let options = LogsOptions {
        follow: true,
        stdout: true,
        stderr: true,
        timestamps: true,
        tail: TAIL_LINES.to_string(),
        ..Default::default()
    };

    let mut stream = host.docker.logs(&container_id, Some(options));
    while let Some(result) = stream.next().await {
        match result {
            Ok(output) => {
                for record in records_from_output(&key, output) {
                    if tx.send(AppEvent::Log(record)).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                debug!(host = %key.host_id, id = %key.container_id, "log stream error: {}", e);
                return;
            }
        }
    }
    debug!(host = %key.host_id, id = %key.container_id, "log stream ended");
}

/// One engine payload can carry several lines; split, strip, and parse each.
fn records_from_output(key: &ContainerKey, output: LogOutput) -> Vec<LogRecord> {
    let (stream, bytes) = match output {
        LogOutput::StdOut { message } => (LogStream::Stdout, message),
        LogOutput::StdErr { message } => (LogStream::Stderr, message),
        LogOutput::Console { message } => (LogStream::Stdout, message),
        LogOutput::StdIn { .. } => return Vec::new(),
    };

    let (stream, payload) = demux_frame(stream, &bytes);
    // \r-driven progress output corrupts the viewport; drop it outright
    let text = String::from_utf8_lossy(payload).replace('\r', "");

    text.split('\n')
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (ts, message) = split_timestamp(line);
            LogRecord {
                key: key.clone(),
                ts,
                stream,
                message: message.to_string(),
            }
        })
        .collect()
}

/// Engines without a TTY frame each payload with an 8-byte header (stream
/// byte, three zeros, big-endian length). bollard usually strips it, but a
/// raw frame can still surface; detect and unwrap it.
fn demux_frame(stream: LogStream, bytes: &[u8]) -> (LogStream, &[u8]) {
    if bytes.len() > 8 && (bytes[0] == 1 || bytes[0] == 2) && bytes[1..4] == [0, 0, 0] {
        let stream = if bytes[0] == 2 {
            LogStream::Stderr
        } else {
            LogStream::Stdout
        };
        (stream, &bytes[8..])
    } else {
        (stream, bytes)
    }
}

/// Split a leading RFC3339Nano timestamp off the line. Lines without a
/// parseable prefix pass through whole.
fn split_timestamp(line: &str) -> (Option<DateTime<Utc>>, &str) {
    let Some(space) = line.find(' ') else {
        return (None, line);
    };
    let (prefix, rest) = line.split_at(space);
    match DateTime::parse_from_rfc3339(prefix) {
        Ok(ts) => (Some(ts.with_timezone(&Utc)), &rest[1..]),
        Err(_) => (None, line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ContainerKey {
        ContainerKey::new("local".to_string(), "abc123def456")
    }

    #[test]
    fn timestamp_prefix_is_parsed_and_stripped() {
        let (ts, message) = split_timestamp("2025-10-28T12:34:56.789123456Z hello world");
        assert!(ts.is_some());
        assert_eq!(message, "hello world");
    }

    #[test]
    fn line_without_timestamp_passes_through() {
        let (ts, message) = split_timestamp("plain message");
        assert!(ts.is_none());
        assert_eq!(message, "plain message");

        let (ts, message) = split_timestamp("no-space-at-all");
        assert!(ts.is_none());
        assert_eq!(message, "no-space-at-all");
    }

    #[test]
    fn raw_multiplex_header_is_unwrapped() {
        let mut framed = vec![2u8, 0, 0, 0, 0, 0, 0, 5];
        framed.extend_from_slice(b"oops\n");
        let records = records_from_output(
            &key(),
            LogOutput::StdOut {
                message: framed.into(),
            },
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stream, LogStream::Stderr);
        assert_eq!(records[0].message, "oops");
    }

    #[test]
    fn carriage_returns_are_stripped_and_lines_split() {
        let records = records_from_output(
            &key(),
            LogOutput::StdErr {
                message: "2025-10-28T12:00:00Z one\r\n2025-10-28T12:00:01Z two\n".into(),
            },
        );
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.stream == LogStream::Stderr));
        assert_eq!(records[0].message, "one");
        assert_eq!(records[1].message, "two");
        assert!(records[0].ts.is_some());
    }
}
