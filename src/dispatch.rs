//! Inbound message classification and routing.
//!
//! The transport (socket framing, reconnection) lives outside this crate;
//! what arrives here is the raw text of each delivered frame, in delivery
//! order. A frame is either a single message or a batch array, which is
//! expanded and dispatched left-to-right.
//!
//! Classification is validated at this boundary: a payload matching none of
//! the known shapes is a recoverable [`MalformedMessageError`], logged and
//! skipped, never a crash and never a silent drop.

use {
    crate::model::Report,
    crate::report_store::ReportStore,
    serde_json::Value,
    std::sync::{Arc, Mutex},
};

/// Fixed backlog-replay request sent once on connection establishment.
/// The server answers with zero or more report messages, then streams.
pub const HANDSHAKE_REQUEST: &str = "getpreviousresults";

/// Receives percentage updates from `{"status":"progress"}` messages.
pub trait ProgressObserver: Send {
    fn progress_updated(&mut self, percent: f64);
}

/// Receives every non-progress status message.
pub trait StatusObserver: Send {
    fn status_posted(&mut self, status: &str, message: &str);
}

#[derive(Debug)]
pub struct MalformedMessageError {
    pub reason: String,
}

impl MalformedMessageError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for MalformedMessageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Malformed inbound message: {}", self.reason)
    }
}

impl std::error::Error for MalformedMessageError {}

/// One classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// New analysis result to accumulate.
    Report(Report),
    /// Computation progress, percent.
    Progress(f64),
    /// Transient status banner.
    Status { status: String, msg: String },
}

/// Classify one decoded JSON object into a tagged message.
///
/// Shape rules, in order: an object carrying both `id` and `members` is a
/// report; an object carrying `status` is progress when `status` is
/// exactly `"progress"` (numeric or numeric-string `msg`), otherwise a
/// status banner. Everything else is malformed.
pub fn classify(value: Value) -> Result<InboundMessage, MalformedMessageError> {
    let object = match &value {
        Value::Object(map) => map,
        other => {
            return Err(MalformedMessageError::new(format!(
                "expected a JSON object, got {}",
                type_name(other)
            )))
        }
    };

    if object.contains_key("id") && object.contains_key("members") {
        let report: Report = serde_json::from_value(value)
            .map_err(|e| MalformedMessageError::new(format!("invalid report payload: {}", e)))?;
        return Ok(InboundMessage::Report(report));
    }

    if let Some(status) = object.get("status") {
        let status = status
            .as_str()
            .ok_or_else(|| MalformedMessageError::new("status field is not a string"))?;

        if status == "progress" {
            let percent = match object.get("msg") {
                Some(Value::Number(n)) => n.as_f64(),
                Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
            .ok_or_else(|| MalformedMessageError::new("progress msg is not numeric"))?;
            return Ok(InboundMessage::Progress(percent));
        }

        let msg = object
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Ok(InboundMessage::Status {
            status: status.to_string(),
            msg,
        });
    }

    Err(MalformedMessageError::new(
        "object matches neither the report nor the status shape",
    ))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// State-free router from classified messages to their consumers.
///
/// Reports go into the store (which notifies its own observer); progress
/// and status messages are forwarded to the registered observers. The
/// dispatcher never interprets outbound payloads.
pub struct Dispatcher {
    progress: Option<Arc<Mutex<dyn ProgressObserver>>>,
    status: Option<Arc<Mutex<dyn StatusObserver>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            progress: None,
            status: None,
        }
    }

    pub fn set_progress_observer(&mut self, observer: Arc<Mutex<dyn ProgressObserver>>) {
        self.progress = Some(observer);
    }

    pub fn set_status_observer(&mut self, observer: Arc<Mutex<dyn StatusObserver>>) {
        self.status = Some(observer);
    }

    /// Dispatch one raw frame. Returns the number of reports inserted.
    ///
    /// A top-level array is expanded and processed left-to-right; one
    /// malformed element is logged and skipped without aborting the rest.
    /// A frame that is not parseable JSON at all is a
    /// [`MalformedMessageError`] for the caller to log; it must not stop
    /// the message loop.
    pub fn dispatch_text(
        &mut self,
        raw: &str,
        store: &mut ReportStore,
    ) -> Result<usize, MalformedMessageError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| MalformedMessageError::new(format!("not valid JSON: {}", e)))?;

        let mut inserted = 0;
        match value {
            Value::Array(batch) => {
                for element in batch {
                    match classify(element) {
                        Ok(message) => inserted += self.dispatch(message, store),
                        Err(e) => log::warn!("Skipping batch element: {}", e),
                    }
                }
            }
            single => inserted += self.dispatch(classify(single)?, store),
        }
        Ok(inserted)
    }

    /// Route one classified message. Returns 1 when a report was inserted.
    pub fn dispatch(&mut self, message: InboundMessage, store: &mut ReportStore) -> usize {
        match message {
            InboundMessage::Report(report) => {
                let key = store.insert(report);
                log::info!("Report message stored under key {}", key);
                1
            }
            InboundMessage::Progress(percent) => {
                log::debug!("Computation progress: {}%", percent);
                if let Some(observer) = &self.progress {
                    if let Ok(mut observer) = observer.lock() {
                        observer.progress_updated(percent);
                    }
                }
                0
            }
            InboundMessage::Status { status, msg } => {
                log::info!("Status '{}': {}", status, msg);
                if let Some(observer) = &self.status {
                    if let Ok(mut observer) = observer.lock() {
                        observer.status_posted(&status, &msg);
                    }
                }
                0
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Scalar;

    struct ProgressRecorder {
        updates: Vec<f64>,
    }

    impl ProgressObserver for ProgressRecorder {
        fn progress_updated(&mut self, percent: f64) {
            self.updates.push(percent);
        }
    }

    struct StatusRecorder {
        posts: Vec<(String, String)>,
    }

    impl StatusObserver for StatusRecorder {
        fn status_posted(&mut self, status: &str, message: &str) {
            self.posts.push((status.to_string(), message.to_string()));
        }
    }

    fn wired_dispatcher() -> (
        Dispatcher,
        Arc<Mutex<ProgressRecorder>>,
        Arc<Mutex<StatusRecorder>>,
    ) {
        let progress = Arc::new(Mutex::new(ProgressRecorder { updates: Vec::new() }));
        let status = Arc::new(Mutex::new(StatusRecorder { posts: Vec::new() }));
        let mut dispatcher = Dispatcher::new();
        dispatcher.set_progress_observer(progress.clone());
        dispatcher.set_status_observer(status.clone());
        (dispatcher, progress, status)
    }

    #[test]
    fn test_classify_report_shape() {
        let message = classify(serde_json::json!({
            "id": "r1", "start": 0, "end": 10,
            "members": [{"id": "t1", "value": 5.0}]
        }))
        .unwrap();
        match message {
            InboundMessage::Report(report) => {
                assert_eq!(report.id, Scalar::Text("r1".to_string()));
                assert_eq!(report.members.len(), 1);
            }
            other => panic!("expected report, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_progress_numeric_and_string() {
        assert_eq!(
            classify(serde_json::json!({"status": "progress", "msg": 40})).unwrap(),
            InboundMessage::Progress(40.0)
        );
        assert_eq!(
            classify(serde_json::json!({"status": "progress", "msg": "62.5"})).unwrap(),
            InboundMessage::Progress(62.5)
        );
    }

    #[test]
    fn test_classify_progress_rejects_non_numeric_msg() {
        assert!(classify(serde_json::json!({"status": "progress", "msg": "almost"})).is_err());
    }

    #[test]
    fn test_classify_status_defaults_missing_msg() {
        let message = classify(serde_json::json!({"status": "done"})).unwrap();
        assert_eq!(
            message,
            InboundMessage::Status {
                status: "done".to_string(),
                msg: String::new()
            }
        );
    }

    #[test]
    fn test_classify_rejects_unknown_shape() {
        assert!(classify(serde_json::json!({"foo": 1})).is_err());
        assert!(classify(serde_json::json!(42)).is_err());
        assert!(classify(serde_json::json!("status")).is_err());
    }

    #[test]
    fn test_dispatch_batch_in_order() {
        // Scenario: progress then one empty report in a single batch frame
        let (mut dispatcher, progress, _status) = wired_dispatcher();
        let mut store = ReportStore::new();

        let inserted = dispatcher
            .dispatch_text(
                r#"[{"status":"progress","msg":40},{"id":"r1","members":[]}]"#,
                &mut store,
            )
            .unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(store.count(), 1);
        assert!(store.get(0).unwrap().members.is_empty());
        assert_eq!(progress.lock().unwrap().updates, vec![40.0]);
    }

    #[test]
    fn test_dispatch_batch_survives_malformed_element() {
        let (mut dispatcher, _progress, status) = wired_dispatcher();
        let mut store = ReportStore::new();

        let inserted = dispatcher
            .dispatch_text(
                r#"[{"bogus":true},{"id":1,"members":[]},{"status":"finished","msg":"ok"}]"#,
                &mut store,
            )
            .unwrap();

        // The malformed first element is skipped; the rest still land
        assert_eq!(inserted, 1);
        assert_eq!(store.count(), 1);
        assert_eq!(
            status.lock().unwrap().posts,
            vec![("finished".to_string(), "ok".to_string())]
        );
    }

    #[test]
    fn test_dispatch_text_rejects_invalid_json() {
        let mut dispatcher = Dispatcher::new();
        let mut store = ReportStore::new();
        assert!(dispatcher.dispatch_text("{not json", &mut store).is_err());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_handshake_literal() {
        assert_eq!(HANDSHAKE_REQUEST, "getpreviousresults");
    }
}
