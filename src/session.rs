//! Application session: the single owner of all mutable state.
//!
//! Created once at startup, alive for the process lifetime. Owns the report
//! store, the dispatcher wiring, the active use case, and the one displayed
//! graph slot. Everything runs on the single control thread: a handler runs
//! to completion before the next message or user action is processed, so
//! store mutation and graph builds never interleave.

use {
    crate::dispatch::{Dispatcher, MalformedMessageError, HANDSHAKE_REQUEST},
    crate::graph_core::{build_account_graph, build_transaction_graph, Graph, GraphBuildError},
    crate::model::Report,
    crate::notify::{Notifier, ProgressTracker, ReportListLogger},
    crate::report_store::{NotFoundError, ReportStore},
    crate::use_case::{GraphElement, UnknownStrategyError, UseCase, UseCaseRegistry},
    std::collections::HashMap,
    std::sync::{Arc, Mutex},
    tokio::sync::mpsc,
};

#[derive(Debug)]
pub enum SessionError {
    ReportNotFound(NotFoundError),
    Build(GraphBuildError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::ReportNotFound(e) => write!(f, "{}", e),
            SessionError::Build(e) => write!(f, "Graph build failed: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<NotFoundError> for SessionError {
    fn from(err: NotFoundError) -> Self {
        SessionError::ReportNotFound(err)
    }
}

impl From<GraphBuildError> for SessionError {
    fn from(err: GraphBuildError) -> Self {
        SessionError::Build(err)
    }
}

#[derive(Debug)]
pub enum ImportError {
    /// Not valid JSON, or not the expected report-map shape.
    Format(String),
    Io(std::io::Error),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Format(e) => write!(f, "Import format error: {}", e),
            ImportError::Io(e) => write!(f, "Import IO error: {}", e),
        }
    }
}

impl std::error::Error for ImportError {}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::Io(err)
    }
}

/// One row of the report list display.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportListEntry {
    pub key: u64,
    /// Formatted report time window.
    pub window: String,
    /// Use-case specific one-line description.
    pub signature: String,
}

pub struct Session {
    store: ReportStore,
    dispatcher: Dispatcher,
    registry: UseCaseRegistry,
    use_case: Arc<dyn UseCase>,
    /// The single displayed graph. Replaced wholesale by a successful
    /// build; a failed build leaves it untouched.
    graph: Graph,
    notifier: Arc<Mutex<Notifier>>,
    progress: Arc<Mutex<ProgressTracker>>,
    report_list: Arc<Mutex<ReportListLogger>>,
    outbound: Option<mpsc::Sender<String>>,
}

impl Session {
    /// Session with the default registry and the Bitcoin use case active.
    pub fn new() -> Self {
        let notifier = Arc::new(Mutex::new(Notifier::new()));
        let progress = Arc::new(Mutex::new(ProgressTracker::new()));
        let report_list = Arc::new(Mutex::new(ReportListLogger::new()));

        let mut store = ReportStore::new();
        store.set_observer(report_list.clone());

        let mut dispatcher = Dispatcher::new();
        dispatcher.set_progress_observer(progress.clone());
        dispatcher.set_status_observer(notifier.clone());

        let registry = UseCaseRegistry::default();
        let use_case = registry
            .resolve(crate::config::DEFAULT_USE_CASE)
            .expect("default registry registers the default use case");

        Self {
            store,
            dispatcher,
            registry,
            use_case,
            graph: Graph::default(),
            notifier,
            progress,
            report_list,
            outbound: None,
        }
    }

    // ---- inbound ----

    /// Dispatch one raw inbound frame into the store/observers.
    pub fn handle_raw(&mut self, raw: &str) -> Result<usize, MalformedMessageError> {
        self.dispatcher.dispatch_text(raw, &mut self.store)
    }

    // ---- outbound ----

    /// Attach the outbound transport and request backlog replay.
    pub fn connect(&mut self, outbound: mpsc::Sender<String>) {
        self.outbound = Some(outbound);
        self.send_raw(HANDSHAKE_REQUEST);
    }

    /// Send an opaque free-text query; the payload is never interpreted.
    pub fn send_query(&self, query: &str) {
        self.send_raw(query);
    }

    fn send_raw(&self, text: &str) {
        match &self.outbound {
            Some(tx) => {
                if let Err(e) = tx.try_send(text.to_string()) {
                    log::warn!("Failed to send outbound message: {}", e);
                }
            }
            None => log::warn!("No transport connected, dropping outbound message"),
        }
    }

    // ---- graph display ----

    /// Build and display the transaction graph for a stored report.
    pub fn show_transaction_graph(&mut self, key: u64) -> Result<&Graph, SessionError> {
        let report = self.store.get(key)?;
        let graph = build_transaction_graph(report, self.use_case.value_scale())?;
        // Assign only after a complete build: the renderer never sees a
        // half-replaced node/link pair.
        self.graph = graph;
        log::info!(
            "Displaying transaction graph for report {} ({} nodes, {} links)",
            key,
            self.graph.nodes.len(),
            self.graph.links.len()
        );
        Ok(&self.graph)
    }

    /// Build and display the account graph for a stored report.
    pub fn show_account_graph(&mut self, key: u64) -> Result<&Graph, SessionError> {
        let report = self.store.get(key)?;
        let graph = build_account_graph(report);
        self.graph = graph;
        log::info!(
            "Displaying account graph for report {} ({} nodes, {} links)",
            key,
            self.graph.nodes.len(),
            self.graph.links.len()
        );
        Ok(&self.graph)
    }

    /// The currently displayed graph (empty until the first build).
    pub fn current_graph(&self) -> &Graph {
        &self.graph
    }

    /// Inspector text for any element of the displayed graph.
    pub fn details_for(&self, element: GraphElement<'_>) -> String {
        self.use_case.details_for(element)
    }

    // ---- use case ----

    /// Switch the active use case. A failed switch leaves the prior one
    /// active; an already-displayed graph is not re-rendered.
    pub fn set_use_case(&mut self, name: &str) -> Result<(), UnknownStrategyError> {
        let strategy = self.registry.resolve(name)?;
        log::info!("Use case switched to {}", strategy.name());
        self.use_case = strategy;
        Ok(())
    }

    pub fn use_case_name(&self) -> &'static str {
        self.use_case.name()
    }

    // ---- report list ----

    /// Report list rows in insertion order, formatted with the *current*
    /// use case (a later switch changes the next listing, not the store).
    pub fn report_list(&self) -> Vec<ReportListEntry> {
        self.store
            .list()
            .map(|(key, report)| ReportListEntry {
                key,
                window: format_window(report),
                signature: self.use_case.report_signature(report),
            })
            .collect()
    }

    pub fn remove_report(&mut self, key: u64) {
        self.store.remove(key);
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    // ---- observer state ----

    pub fn progress_percent(&self) -> f64 {
        self.progress.lock().map(|p| p.percent()).unwrap_or(0.0)
    }

    /// The visible status banner, or None once auto-dismissed.
    pub fn notification(&self) -> Option<String> {
        self.notifier
            .lock()
            .ok()
            .and_then(|n| n.current().map(str::to_string))
    }

    /// Store keys in arrival order, as seen by the list-refresh observer.
    pub fn listed_keys(&self) -> Vec<u64> {
        self.report_list
            .lock()
            .map(|l| l.keys().to_vec())
            .unwrap_or_default()
    }

    // ---- export / import ----

    /// Serialize the live store entries as a JSON object keyed by storage
    /// key.
    pub fn export_reports(&self) -> Result<String, serde_json::Error> {
        let mut map = serde_json::Map::new();
        for (key, report) in self.store.list() {
            map.insert(key.to_string(), serde_json::to_value(report)?);
        }
        serde_json::to_string_pretty(&serde_json::Value::Object(map))
    }

    pub fn export_to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let json = self.export_reports()?;
        std::fs::write(path, json)?;
        log::info!("Exported {} reports to {}", self.store.count(), path);
        Ok(())
    }

    /// Re-insert every report of an exported map through the normal insert
    /// path. Storage keys are *reassigned*; the original keys only decide
    /// the re-insertion order. A malformed payload leaves the store
    /// untouched. Returns the number of reports imported.
    pub fn import_reports(&mut self, json: &str) -> Result<usize, ImportError> {
        let parsed: HashMap<String, Report> =
            serde_json::from_str(json).map_err(|e| ImportError::Format(e.to_string()))?;

        // Ascending original-key order so the relative listing survives
        let mut entries: Vec<(String, Report)> = parsed.into_iter().collect();
        entries.sort_by_key(|(key, _)| key.parse::<u64>().ok());

        let count = entries.len();
        for (_, report) in entries {
            self.store.insert(report);
        }
        log::info!("Imported {} reports", count);
        Ok(count)
    }

    pub fn import_from_file(&mut self, path: &str) -> Result<usize, ImportError> {
        let json = std::fs::read_to_string(path)?;
        self.import_reports(&json)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn format_window(report: &Report) -> String {
    let fmt = |scalar: &crate::model::Scalar| match scalar.as_datetime() {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => scalar.to_string(),
    };
    format!("{} - {}", fmt(&report.start), fmt(&report.end))
}
