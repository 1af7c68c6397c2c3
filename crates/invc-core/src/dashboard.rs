//! Presentation-facing facade.
//!
//! The dashboard validates user input, resolves tools from the registry and
//! hands work to the orchestrator. Invalid input is rejected here, before any
//! task exists.

use crate::error::Result;
use crate::orchestrator::TaskOrchestrator;
use crate::store::ResultStore;
use crate::tools::{Capability, ToolInvoker, ToolRegistry, launcher};
use crate::types::{AnalysisTarget, InvestigationRecord, TaskId, TaskOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

pub struct Dashboard {
    registry: ToolRegistry,
    store: ResultStore,
    orchestrator: TaskOrchestrator,
    runtime: Handle,
}

impl Dashboard {
    pub fn new(registry: ToolRegistry, store: ResultStore, runtime: Handle) -> Self {
        let orchestrator = TaskOrchestrator::new(runtime.clone());
        Self {
            registry,
            store,
            orchestrator,
            runtime,
        }
    }

    pub fn with_invoker(
        registry: ToolRegistry,
        store: ResultStore,
        runtime: Handle,
        invoker: Arc<dyn ToolInvoker>,
    ) -> Self {
        let orchestrator = TaskOrchestrator::with_invoker(runtime.clone(), invoker);
        Self {
            registry,
            store,
            orchestrator,
            runtime,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn orchestrator(&self) -> &TaskOrchestrator {
        &self.orchestrator
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Investigations
    // ─────────────────────────────────────────────────────────────────────────

    /// Run the document analysis tool on `path` in the background.
    pub fn submit_document_analysis<F>(&mut self, path: impl Into<PathBuf>, on_outcome: F) -> Result<TaskId>
    where
        F: FnOnce(TaskOutcome) + 'static,
    {
        let target = AnalysisTarget::document(path)?;
        self.submit(Capability::DocumentAnalysis, target, on_outcome)
    }

    /// Run the URL investigation tool on `url` in the background.
    pub fn submit_url_investigation<F>(&mut self, url: &str, on_outcome: F) -> Result<TaskId>
    where
        F: FnOnce(TaskOutcome) + 'static,
    {
        let target = AnalysisTarget::url(url)?;
        self.submit(Capability::UrlInvestigation, target, on_outcome)
    }

    fn submit<F>(&mut self, capability: Capability, target: AnalysisTarget, on_outcome: F) -> Result<TaskId>
    where
        F: FnOnce(TaskOutcome) + 'static,
    {
        let mut tool = self.registry.require(capability)?.clone();
        if tool.results_dir.is_none() {
            tool.results_dir = Some(self.store.root().to_path_buf());
        }
        Ok(self.orchestrator.submit(target, tool, on_outcome))
    }

    pub fn list_investigations(&self) -> Vec<InvestigationRecord> {
        self.store.list_investigations()
    }

    pub fn locate(&self, record: &InvestigationRecord) -> Option<PathBuf> {
        self.store.locate(record)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Delivery (call from the update surface)
    // ─────────────────────────────────────────────────────────────────────────

    pub fn pump(&mut self) -> usize {
        self.orchestrator.pump()
    }

    pub async fn next_delivery(&mut self) -> Option<TaskId> {
        self.orchestrator.next_delivery().await
    }

    pub async fn run_until_idle(&mut self) -> usize {
        self.orchestrator.run_until_idle().await
    }

    pub fn in_flight(&self) -> usize {
        self.orchestrator.in_flight()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Auxiliary applications
    // ─────────────────────────────────────────────────────────────────────────

    /// Open a document in the configured safe viewer.
    pub fn safe_view(&self, path: impl Into<PathBuf>) -> Result<u32> {
        let target = AnalysisTarget::document(path)?;
        self.launch(Capability::SafeView, Some(&target))
    }

    /// Open a URL in the configured text-mode browser.
    pub fn browse_url(&self, url: &str) -> Result<u32> {
        let target = AnalysisTarget::url(url)?;
        self.launch(Capability::UrlBrowser, Some(&target))
    }

    /// Open the file manager, at `path` when given.
    pub fn open_folder(&self, path: Option<&Path>) -> Result<u32> {
        let target = path.map(AnalysisTarget::document).transpose()?;
        self.launch(Capability::FileManager, target.as_ref())
    }

    /// Start a named desktop application.
    pub fn launch_app(&self, name: &str) -> Result<u32> {
        let tool = self.registry.app(name)?;
        let _guard = self.runtime.enter();
        launcher::launch(tool, None)
    }

    fn launch(&self, capability: Capability, target: Option<&AnalysisTarget>) -> Result<u32> {
        let tool = self.registry.require(capability)?;
        info!(capability = %capability, target = ?target.map(|t| t.to_string()), "Launching");
        let _guard = self.runtime.enter();
        launcher::launch(tool, target)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::tools::ToolSpec;
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn sh(script: &str) -> ToolSpec {
        ToolSpec::new("/bin/sh", Duration::from_secs(10)).with_args([
            "-c",
            script,
            "sh",
            "{target}",
            "{results}",
        ])
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register(Capability::DocumentAnalysis, sh(r#"echo "analyzed $1""#))
            .register(Capability::UrlInvestigation, sh(r#"echo "investigated $1 into $2""#))
            .register(Capability::SafeView, sh("exit 0"))
            .register_app("true", ToolSpec::new("/bin/sh", Duration::ZERO).with_args(["-c", "exit 0"]));
        registry
    }

    #[tokio::test]
    async fn test_url_investigation_round_trip() {
        let temp = tempdir().expect("Failed to create temp dir");
        let mut dashboard = Dashboard::new(registry(), ResultStore::new(temp.path()), Handle::current());
        let received = Rc::new(RefCell::new(None));

        let sink = Rc::clone(&received);
        dashboard
            .submit_url_investigation("  https://phish.example/login  ", move |outcome| {
                *sink.borrow_mut() = Some(outcome);
            })
            .unwrap();
        assert_eq!(dashboard.in_flight(), 1);

        assert_eq!(dashboard.run_until_idle().await, 1);
        match received.borrow_mut().take() {
            Some(TaskOutcome::Success { stdout, .. }) => assert_eq!(
                stdout,
                format!("investigated https://phish.example/login into {}\n", temp.path().display())
            ),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_targets_rejected_before_task_creation() {
        let temp = tempdir().expect("Failed to create temp dir");
        let mut dashboard = Dashboard::new(registry(), ResultStore::new(temp.path()), Handle::current());

        let url = dashboard.submit_url_investigation("   ", |_| panic!("must not run"));
        assert!(matches!(url, Err(Error::InvalidTarget(_))));

        let doc = dashboard.submit_document_analysis(temp.path().join("missing.docx"), |_| panic!("must not run"));
        assert!(matches!(doc, Err(Error::InvalidTarget(_))));

        assert_eq!(dashboard.in_flight(), 0);
        assert_eq!(dashboard.run_until_idle().await, 0);
    }

    #[tokio::test]
    async fn test_unconfigured_capability_is_reported() {
        let temp = tempdir().expect("Failed to create temp dir");
        let dashboard = Dashboard::new(ToolRegistry::new(), ResultStore::new(temp.path()), Handle::current());

        assert!(matches!(
            dashboard.browse_url("https://example.com"),
            Err(Error::UnknownTool(_))
        ));
        assert!(matches!(dashboard.launch_app("gedit"), Err(Error::UnknownTool(_))));
        assert!(matches!(dashboard.open_folder(None), Err(Error::UnknownTool(_))));
    }

    #[tokio::test]
    async fn test_document_analysis_and_history() {
        let temp = tempdir().expect("Failed to create temp dir");
        let results = temp.path().join("investigations");
        fs::create_dir_all(results.join("quarterly_report")).unwrap();
        fs::create_dir_all(results.join("url_2024-01-01")).unwrap();
        let doc = temp.path().join("quarterly_report.pdf");
        fs::write(&doc, b"%PDF").unwrap();

        let mut dashboard = Dashboard::new(registry(), ResultStore::new(&results), Handle::current());
        let outcomes = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&outcomes);
        dashboard
            .submit_document_analysis(&doc, move |outcome| sink.borrow_mut().push(outcome))
            .unwrap();
        dashboard.run_until_idle().await;

        assert_eq!(outcomes.borrow().len(), 1);
        assert!(outcomes.borrow()[0].is_success());

        let records = dashboard.list_investigations();
        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(dashboard.locate(record), Some(results.join(&record.dir_name)));
        }
    }

    #[tokio::test]
    async fn test_launchers() {
        let temp = tempdir().expect("Failed to create temp dir");
        let doc = temp.path().join("memo.doc");
        fs::write(&doc, b"doc").unwrap();
        let dashboard = Dashboard::new(registry(), ResultStore::new(temp.path()), Handle::current());

        assert!(dashboard.safe_view(&doc).is_ok());
        assert!(matches!(
            dashboard.safe_view(temp.path().join("nope.doc")),
            Err(Error::InvalidTarget(_))
        ));
        assert!(dashboard.launch_app("true").is_ok());
    }
}
