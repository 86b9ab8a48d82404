//! Operational log for reportable errors, and the shared report path.

use metrics::counter;
use switchyard_core::AppError;

use crate::connection::Connection;

/// One reportable error, as seen by the operational log.
#[derive(Clone, Copy, Debug)]
pub struct ErrorLogEntry<'a> {
    /// Sequence number of the failed request.
    pub seq: i64,
    /// User on the connection (empty when unauthenticated).
    pub user_id: &'a str,
    /// Wire error code.
    pub code: &'a str,
    /// Where the error was raised.
    pub location: &'a str,
    /// Message sent to the peer.
    pub user_message: &'a str,
    /// Internal detail, never sent to the peer.
    pub details: &'a str,
}

/// Sink receiving every reportable error. Purely observational.
pub trait ErrorLog: Send + Sync {
    /// Record one error.
    fn record(&self, entry: &ErrorLogEntry<'_>);
}

/// Writes entries to the `tracing` subscriber at error level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingErrorLog;

impl ErrorLog for TracingErrorLog {
    fn record(&self, entry: &ErrorLogEntry<'_>) {
        tracing::error!(
            seq = entry.seq,
            user_id = entry.user_id,
            code = entry.code,
            location = entry.location,
            details = entry.details,
            "websocket routing error: {}",
            entry.user_message
        );
    }
}

/// Log `err`, strip its detail, and enqueue the error reply for `seq` on `conn`.
pub fn report_error(log: &dyn ErrorLog, conn: &Connection, seq: i64, mut err: AppError) {
    let user_id = conn.user_id();
    log.record(&ErrorLogEntry {
        seq,
        user_id: &user_id,
        code: err.code(),
        location: &err.location,
        user_message: &err.user_message,
        details: &err.detailed_error,
    });
    counter!("ws_errors_total", "code" => err.code()).increment(1);

    err.clear_details();
    let _ = conn.send_response(&err.to_response(seq));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use switchyard_core::ErrorKind;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct Captured(Mutex<Vec<(i64, String, String, String)>>);

    impl ErrorLog for Captured {
        fn record(&self, entry: &ErrorLogEntry<'_>) {
            self.0.lock().push((
                entry.seq,
                entry.user_id.to_owned(),
                entry.code.to_owned(),
                entry.details.to_owned(),
            ));
        }
    }

    #[tokio::test]
    async fn report_logs_detail_and_sends_sanitized_reply() {
        let (tx, mut rx) = mpsc::channel(4);
        let conn = Connection::new(tx);
        let log = Captured::default();

        let err = AppError::new(ErrorKind::BadAction, "Router::dispatch", "action=launch_missiles");
        report_error(&log, &conn, 12, err);

        let entries = log.0.lock().clone();
        assert_eq!(
            entries,
            vec![(12, String::new(), "BadAction".into(), "action=launch_missiles".into())]
        );

        let msg = rx.recv().await.unwrap();
        assert!(!msg.contains("launch_missiles"));
        let v: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(v["seq"], 12);
        assert_eq!(v["error"]["code"], "BadAction");
    }

    #[test]
    fn tracing_log_does_not_panic_without_subscriber() {
        TracingErrorLog.record(&ErrorLogEntry {
            seq: 1,
            user_id: "",
            code: "NoAction",
            location: "here",
            user_message: "No websocket action",
            details: "",
        });
    }

    #[test]
    fn sink_is_object_safe() {
        let _log: Arc<dyn ErrorLog> = Arc::new(TracingErrorLog);
    }
}
