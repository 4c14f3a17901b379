//! Central script execution orchestrator.
//!
//! Coordinates the durable record, the process runner, output aggregation
//! and the process registry. Held by the API as an
//! `Arc<ExecutionOrchestrator>`.
//!
//! Lifecycle of one execution:
//!
//! 1. `create` spawns a launch task that inserts the record and starts the
//!    runner.
//! 2. The launch waits for both the PID and the handle, writes PID +
//!    running=true, and registers the handle. `create` returns its result.
//! 3. A spawned background unit drains output into the store until the
//!    sequence ends, then writes running=false, unregisters, and marks the
//!    handle settled.
//!
//! `stop` and `delete` cancel through the registered handle and wait
//! (bounded) for step 3 to complete. They never unregister themselves.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::aggregator::{OutputAggregator, StoreSink};
use super::config::ExecutionConfig;
use super::error::{ScriptError, StoreError};
use super::handle::ProcessHandle;
use super::registry::ProcessRegistry;
use super::runner::{ProcessRunner, RunSignals};
use super::store::{NewScript, ScriptRecord, ScriptStore};
use crate::types::DbId;

/// Public coordinator for script executions.
pub struct ExecutionOrchestrator {
    store: Arc<dyn ScriptStore>,
    registry: Arc<ProcessRegistry>,
    runner: ProcessRunner,
    aggregator: OutputAggregator,
    config: ExecutionConfig,
}

impl ExecutionOrchestrator {
    /// Create an orchestrator over `store` and `registry`.
    ///
    /// The runner and aggregator are built from `config`.
    pub fn new(
        store: Arc<dyn ScriptStore>,
        registry: Arc<ProcessRegistry>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            store,
            registry,
            runner: ProcessRunner::from_config(&config),
            aggregator: OutputAggregator::new(config.batch_size),
            config,
        }
    }

    /// Replace the process runner.
    pub fn with_runner(mut self, runner: ProcessRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn store(&self) -> &Arc<dyn ScriptStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    /// Run `command` in the background using the configured default deadline.
    pub async fn create(&self, command: &str) -> Result<ScriptRecord, ScriptError> {
        self.create_with_deadline(command, self.config.default_deadline)
            .await
    }

    /// Run `command` in the background.
    ///
    /// Returns once the process has started and is registered, with the
    /// record showing its PID and `is_running = true`. If `deadline` is set,
    /// the process is cancelled when it elapses, exactly as `stop` would.
    ///
    /// A process that cannot be started leaves no record behind. The launch
    /// runs in its own task, so dropping the returned future does not
    /// interrupt it: the script still ends up registered or rolled back.
    pub async fn create_with_deadline(
        &self,
        command: &str,
        deadline: Option<Duration>,
    ) -> Result<ScriptRecord, ScriptError> {
        if command.trim().is_empty() {
            return Err(ScriptError::EmptyCommand);
        }

        let launch = Launch {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            runner: self.runner.clone(),
            aggregator: self.aggregator,
            start_timeout: self.config.start_timeout,
        };

        tokio::spawn(launch.run(command.to_string(), deadline))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Script launch task failed");
                Err(ScriptError::StartFailure(format!("launch task failed: {e}")))
            })
    }

    /// Stop a running script.
    ///
    /// Cancels the process, writes running=false, and waits (bounded by the
    /// stop timeout) for the background unit to settle. Not idempotent: once
    /// this returns, a second call reports
    /// [`ScriptError::NoSuchRunningScript`].
    pub async fn stop(&self, id: DbId) -> Result<(), ScriptError> {
        let handle = self
            .registry
            .lookup(id)
            .await
            .ok_or(ScriptError::NoSuchRunningScript(id))?;

        handle.cancel();
        self.store.update_running(id, false).await?;
        self.await_settled(id, &handle).await;

        tracing::info!(script_id = id, "Script stopped");
        Ok(())
    }

    /// Fetch a single record.
    pub async fn get(&self, id: DbId) -> Result<ScriptRecord, ScriptError> {
        Ok(self.store.get(id).await?)
    }

    /// List records in creation order. `limit = None` is unbounded.
    pub async fn get_all(
        &self,
        offset: i64,
        limit: Option<i64>,
    ) -> Result<Vec<ScriptRecord>, ScriptError> {
        let offset = offset.max(0);
        let limit = limit.map(|n| n.max(0));
        Ok(self.store.get_all(offset, limit).await?)
    }

    /// Delete a record, killing its process first if it is still running.
    pub async fn delete(&self, id: DbId) -> Result<(), ScriptError> {
        self.store.get(id).await?;

        if let Some(handle) = self.registry.lookup(id).await {
            handle.cancel();
            self.await_settled(id, &handle).await;
        }

        self.store.delete(id).await?;

        // A `create` racing with this call may have registered after the
        // lookup above; its process must not outlive the record.
        if let Some(handle) = self.registry.lookup(id).await {
            tracing::warn!(script_id = id, "Script registered during delete; cancelling");
            handle.cancel();
        }

        tracing::info!(script_id = id, "Script deleted");
        Ok(())
    }

    /// IDs of scripts with a live process.
    pub async fn running_ids(&self) -> Vec<DbId> {
        self.registry.ids().await
    }

    /// Cancel every running script and wait for each to settle.
    pub async fn shutdown(&self) {
        let mut handles: Vec<(DbId, ProcessHandle)> = Vec::new();
        for id in self.registry.ids().await {
            if let Some(handle) = self.registry.lookup(id).await {
                handle.cancel();
                handles.push((id, handle));
            }
        }

        tracing::info!(count = handles.len(), "Stopping running scripts");
        for (id, handle) in &handles {
            self.await_settled(*id, handle).await;
        }
    }

    /// Wait for the process to be reaped and its unit to settle.
    async fn await_settled(&self, id: DbId, handle: &ProcessHandle) {
        let wait = async {
            let outcome = handle.wait().await;
            handle.settled().await;
            outcome
        };

        match tokio::time::timeout(self.config.stop_timeout, wait).await {
            Ok(outcome) => {
                tracing::debug!(script_id = id, ?outcome, "Script settled");
            }
            Err(_elapsed) => {
                tracing::warn!(
                    script_id = id,
                    pid = handle.pid(),
                    timeout_secs = self.config.stop_timeout.as_secs_f64(),
                    "Script did not settle within the stop timeout"
                );
            }
        }
    }
}

/// Everything needed to start one script, owned so it can run detached
/// from the caller.
struct Launch {
    store: Arc<dyn ScriptStore>,
    registry: Arc<ProcessRegistry>,
    runner: ProcessRunner,
    aggregator: OutputAggregator,
    start_timeout: Duration,
}

impl Launch {
    async fn run(
        self,
        command: String,
        deadline: Option<Duration>,
    ) -> Result<ScriptRecord, ScriptError> {
        let record = self.store.insert(NewScript::new(command.as_str())).await?;
        let id = record.id;

        let cancel = CancellationToken::new();
        let RunSignals {
            started,
            handle,
            lines,
        } = self.runner.run(&command, cancel.clone());

        // Both signals are awaited together; their relative order is not
        // assumed.
        let handshake = async { tokio::join!(started, handle) };
        let (pid, handle) = match tokio::time::timeout(self.start_timeout, handshake).await {
            Ok((Ok(Ok(pid)), Ok(handle))) => (pid, handle),
            Ok((Ok(Err(e)), _)) => return Err(self.roll_back(id, e).await),
            Ok(_) => {
                cancel.cancel();
                let e = ScriptError::StartFailure(
                    "runner stopped before reporting the process".to_string(),
                );
                return Err(self.roll_back(id, e).await);
            }
            Err(_elapsed) => {
                cancel.cancel();
                let e = ScriptError::StartFailure(format!(
                    "process did not start within {}s",
                    self.start_timeout.as_secs_f64()
                ));
                return Err(self.roll_back(id, e).await);
            }
        };

        let Ok(db_pid) = i32::try_from(pid) else {
            handle.cancel();
            let e = ScriptError::StartFailure(format!("pid {pid} out of range"));
            return Err(self.roll_back(id, e).await);
        };

        let record = match self.store.update_pid_and_running(id, db_pid, true).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(
                    script_id = id,
                    pid,
                    error = %e,
                    "Failed to record started script; killing it"
                );
                handle.cancel();
                return Err(self.roll_back(id, e.into()).await);
            }
        };

        // Register before the unit exists so its unregister always wins.
        self.registry.register(id, handle.clone()).await;

        let unit = BackgroundUnit {
            id,
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            aggregator: self.aggregator,
            handle: handle.clone(),
        };
        tokio::spawn(unit.run(lines, deadline));

        // A `delete` that removed the record before we registered could not
        // see the handle; the unit unregisters once the kill lands.
        if let Err(StoreError::NotFound(_)) = self.store.get(id).await {
            tracing::warn!(script_id = id, pid, "Script deleted while starting; cancelling");
            handle.cancel();
            return Err(ScriptError::NoSuchScript(id));
        }

        tracing::info!(script_id = id, pid, "Script started");
        Ok(record)
    }

    /// Remove the record of a script that never ran, returning `err`.
    async fn roll_back(&self, id: DbId, err: ScriptError) -> ScriptError {
        match self.store.delete(id).await {
            Ok(_) | Err(StoreError::NotFound(_)) => {}
            Err(e) => {
                tracing::error!(
                    script_id = id,
                    error = %e,
                    "Failed to roll back record of script that did not start"
                );
            }
        }
        tracing::warn!(script_id = id, error = %err, "Script creation rolled back");
        err
    }
}

/// Long-lived task owning one execution after `create` returns.
struct BackgroundUnit {
    id: DbId,
    store: Arc<dyn ScriptStore>,
    registry: Arc<ProcessRegistry>,
    aggregator: OutputAggregator,
    handle: ProcessHandle,
}

impl BackgroundUnit {
    async fn run(self, lines: mpsc::UnboundedReceiver<String>, deadline: Option<Duration>) {
        // Settled fires when this guard drops, whatever path we leave by.
        let _settled = self.handle.settle_guard();

        if let Some(deadline) = deadline {
            let handle = self.handle.clone();
            let id = self.id;
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(deadline) => {
                        tracing::info!(
                            script_id = id,
                            deadline_secs = deadline.as_secs_f64(),
                            "Script deadline reached; cancelling"
                        );
                        handle.cancel();
                    }
                    _ = handle.settled() => {}
                }
            });
        }

        let sink = StoreSink::new(Arc::clone(&self.store), self.id);
        let summary = self.aggregator.drain(lines, &sink).await;
        let outcome = self.handle.wait().await;

        tracing::info!(
            script_id = self.id,
            pid = self.handle.pid(),
            ?outcome,
            lines = summary.lines,
            failed_batches = summary.failed_batches,
            "Script finished"
        );

        match self.store.update_running(self.id, false).await {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(script_id = self.id, "Record deleted before script finished");
            }
            Err(e) => {
                tracing::error!(
                    script_id = self.id,
                    error = %e,
                    "Failed to mark finished script as not running"
                );
            }
        }

        self.registry.unregister(self.id).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;
    use crate::scripting::memory_store::MemoryScriptStore;
    use crate::scripting::test_helpers::{eventually, test_config};

    const SETTLE: Duration = Duration::from_secs(5);

    struct Fixture {
        orchestrator: ExecutionOrchestrator,
        store: Arc<dyn ScriptStore>,
        registry: Arc<ProcessRegistry>,
        _dir: tempfile::TempDir,
    }

    fn fixture_with_store(store: Arc<dyn ScriptStore>) -> Fixture {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = ExecutionConfig {
            script_dir: dir.path().to_path_buf(),
            ..test_config()
        };
        let registry = Arc::new(ProcessRegistry::new());
        let orchestrator =
            ExecutionOrchestrator::new(Arc::clone(&store), Arc::clone(&registry), config);
        Fixture {
            orchestrator,
            store,
            registry,
            _dir: dir,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_store(Arc::new(MemoryScriptStore::new()))
    }

    impl Fixture {
        /// Wait until `id` has settled: not running in the store, not registered.
        async fn settled(&self, id: DbId) -> bool {
            let store = &self.store;
            let registry = &self.registry;
            eventually(SETTLE, || async move {
                let record = store.get(id).await.expect("record");
                !record.is_running && registry.lookup(id).await.is_none()
            })
            .await
        }
    }

    /// Wraps a memory store and fails selected operations on demand.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryScriptStore,
        fail_appends: AtomicBool,
        fail_pid_updates: AtomicBool,
    }

    #[async_trait]
    impl ScriptStore for FlakyStore {
        async fn insert(&self, new: NewScript) -> Result<ScriptRecord, StoreError> {
            self.inner.insert(new).await
        }

        async fn update_pid_and_running(
            &self,
            id: DbId,
            pid: i32,
            is_running: bool,
        ) -> Result<ScriptRecord, StoreError> {
            if self.fail_pid_updates.load(Ordering::SeqCst) {
                return Err(StoreError::backend("pid update refused"));
            }
            self.inner.update_pid_and_running(id, pid, is_running).await
        }

        async fn update_running(
            &self,
            id: DbId,
            is_running: bool,
        ) -> Result<ScriptRecord, StoreError> {
            self.inner.update_running(id, is_running).await
        }

        async fn append_output(
            &self,
            id: DbId,
            text: &str,
        ) -> Result<ScriptRecord, StoreError> {
            if self.fail_appends.load(Ordering::SeqCst) {
                return Err(StoreError::backend("append refused"));
            }
            self.inner.append_output(id, text).await
        }

        async fn get(&self, id: DbId) -> Result<ScriptRecord, StoreError> {
            self.inner.get(id).await
        }

        async fn get_all(
            &self,
            offset: i64,
            limit: Option<i64>,
        ) -> Result<Vec<ScriptRecord>, StoreError> {
            self.inner.get_all(offset, limit).await
        }

        async fn delete(&self, id: DbId) -> Result<ScriptRecord, StoreError> {
            self.inner.delete(id).await
        }
    }

    fn process_alive(pid: i32) -> bool {
        // SAFETY: signal 0 only checks for existence.
        unsafe { libc::kill(pid, 0) == 0 }
    }

    #[tokio::test]
    async fn echo_runs_to_completion() {
        let fx = fixture();
        let record = fx.orchestrator.create("echo hello").await.expect("create");

        assert!(record.is_running);
        assert!(record.pid.is_some_and(|pid| pid > 0));
        assert!(fx.settled(record.id).await, "script should settle");

        let record = fx.orchestrator.get(record.id).await.expect("get");
        assert_eq!(record.output, "hello\n");
        assert!(!record.is_running);
    }

    #[tokio::test]
    async fn long_running_script_can_be_stopped() {
        let fx = fixture();
        let record = fx
            .orchestrator
            .create("echo started\nsleep 5")
            .await
            .expect("create");
        let pid = record.pid.expect("pid");

        let current = fx.orchestrator.get(record.id).await.expect("get");
        assert!(current.is_running);
        assert!(pid > 0);
        assert_eq!(fx.orchestrator.running_ids().await, [record.id]);

        fx.orchestrator.stop(record.id).await.expect("stop");

        let stopped = fx.orchestrator.get(record.id).await.expect("get");
        assert!(!stopped.is_running);
        assert!(fx.registry.lookup(record.id).await.is_none());
        assert!(!process_alive(pid), "process should be gone after stop");

        tokio::time::sleep(Duration::from_millis(200)).await;
        let later = fx.orchestrator.get(record.id).await.expect("get");
        assert_eq!(later.output, stopped.output, "output frozen after stop");
    }

    #[tokio::test]
    async fn second_stop_reports_not_running() {
        let fx = fixture();
        let record = fx.orchestrator.create("sleep 5").await.expect("create");

        fx.orchestrator.stop(record.id).await.expect("first stop");
        assert_matches!(
            fx.orchestrator.stop(record.id).await,
            Err(ScriptError::NoSuchRunningScript(id)) if id == record.id
        );
    }

    #[tokio::test]
    async fn stop_unknown_id_reports_not_running() {
        let fx = fixture();
        assert_matches!(
            fx.orchestrator.stop(404).await,
            Err(ScriptError::NoSuchRunningScript(404))
        );
    }

    #[tokio::test]
    async fn unspawnable_command_leaves_no_record() {
        let fx = fixture();
        let orchestrator = fx
            .orchestrator
            .with_runner(ProcessRunner::new("/nonexistent/interpreter", "/tmp"));

        assert_matches!(
            orchestrator.create("echo hello").await,
            Err(ScriptError::StartFailure(_))
        );
        assert!(orchestrator.get_all(0, None).await.expect("list").is_empty());
        assert_matches!(orchestrator.get(1).await, Err(ScriptError::NoSuchScript(1)));
        assert!(fx.registry.is_empty().await);
    }

    #[tokio::test]
    async fn empty_command_is_rejected_before_insert() {
        let fx = fixture();
        assert_matches!(
            fx.orchestrator.create("   ").await,
            Err(ScriptError::EmptyCommand)
        );
        assert!(fx.store.get_all(0, None).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn get_all_returns_every_script_in_creation_order() {
        let fx = fixture();
        let mut ids = Vec::new();
        for i in 0..4 {
            let record = fx
                .orchestrator
                .create(&format!("echo {i}"))
                .await
                .expect("create");
            ids.push(record.id);
        }

        let all = fx.orchestrator.get_all(0, None).await.expect("list");
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), ids);

        let page = fx.orchestrator.get_all(1, Some(2)).await.expect("page");
        assert_eq!(page.iter().map(|r| r.id).collect::<Vec<_>>(), ids[1..3]);
    }

    #[tokio::test]
    async fn delete_running_script_kills_it_and_removes_record() {
        let fx = fixture();
        let record = fx.orchestrator.create("sleep 30").await.expect("create");
        let pid = record.pid.expect("pid");

        fx.orchestrator.delete(record.id).await.expect("delete");

        assert_matches!(
            fx.orchestrator.get(record.id).await,
            Err(ScriptError::NoSuchScript(_))
        );
        assert!(fx.registry.lookup(record.id).await.is_none());
        assert!(!process_alive(pid), "process should be gone after delete");
    }

    #[tokio::test]
    async fn delete_finished_script_removes_record() {
        let fx = fixture();
        let record = fx.orchestrator.create("true").await.expect("create");
        assert!(fx.settled(record.id).await);

        fx.orchestrator.delete(record.id).await.expect("delete");
        assert_matches!(
            fx.orchestrator.delete(record.id).await,
            Err(ScriptError::NoSuchScript(_))
        );
    }

    #[tokio::test]
    async fn nonzero_exit_keeps_record() {
        let fx = fixture();
        let record = fx
            .orchestrator
            .create("echo failing\nexit 7")
            .await
            .expect("create");
        assert!(fx.settled(record.id).await);

        let record = fx.orchestrator.get(record.id).await.expect("get");
        assert_eq!(record.output, "failing\n");
    }

    #[tokio::test]
    async fn output_is_complete_across_batches() {
        let fx = fixture();
        let record = fx
            .orchestrator
            .create("for i in 1 2 3 4 5; do echo line$i; done")
            .await
            .expect("create");
        assert!(fx.settled(record.id).await);

        let record = fx.orchestrator.get(record.id).await.expect("get");
        assert_eq!(record.output, "line1\nline2\nline3\nline4\nline5\n");
    }

    #[tokio::test]
    async fn flush_failures_do_not_abort_the_script() {
        let flaky = Arc::new(FlakyStore::default());
        flaky.fail_appends.store(true, Ordering::SeqCst);
        let fx = fixture_with_store(flaky.clone());

        let record = fx.orchestrator.create("echo lost").await.expect("create");
        assert!(fx.settled(record.id).await);
        assert_eq!(fx.orchestrator.get(record.id).await.expect("get").output, "");
    }

    #[tokio::test]
    async fn failed_pid_write_rolls_back_and_kills() {
        let flaky = Arc::new(FlakyStore::default());
        flaky.fail_pid_updates.store(true, Ordering::SeqCst);
        let fx = fixture_with_store(flaky.clone());

        assert_matches!(
            fx.orchestrator.create("sleep 30").await,
            Err(ScriptError::Store(StoreError::Backend(_)))
        );
        assert!(fx.store.get_all(0, None).await.expect("list").is_empty());
        assert!(fx.registry.is_empty().await);
    }

    #[tokio::test]
    async fn deadline_cancels_like_stop() {
        let fx = fixture();
        let record = fx
            .orchestrator
            .create_with_deadline("sleep 30", Some(Duration::from_millis(200)))
            .await
            .expect("create");

        assert!(fx.settled(record.id).await, "deadline should end the script");
        assert!(!process_alive(record.pid.expect("pid")));
    }

    /// Command that sleeps, then creates `marker` if it was not killed.
    fn touch_after_sleep(marker: &std::path::Path) -> String {
        format!("sleep 1\ntouch {}", marker.display())
    }

    async fn first_record_id(store: &Arc<dyn ScriptStore>) -> DbId {
        assert!(
            eventually(SETTLE, || async move {
                !store.get_all(0, None).await.expect("list").is_empty()
            })
            .await,
            "record should be inserted"
        );
        store.get_all(0, None).await.expect("list")[0].id
    }

    #[tokio::test]
    async fn dropped_create_still_registers_the_process() {
        let fx = fixture();
        let marker_dir = tempfile::tempdir().expect("temp dir");
        let marker = marker_dir.path().join("ran");
        let command = touch_after_sleep(&marker);

        // Abandon `create` after its first poll.
        tokio::select! {
            biased;
            _ = fx.orchestrator.create(&command) => {}
            _ = std::future::ready(()) => {}
        }

        let registry = &fx.registry;
        assert!(
            eventually(SETTLE, || async move { !registry.is_empty().await }).await,
            "launch should complete without its caller"
        );
        let id = fx.registry.ids().await[0];
        let record = fx.orchestrator.get(id).await.expect("get");
        assert!(record.is_running);
        assert!(record.pid.is_some());

        fx.orchestrator.stop(id).await.expect("stop");
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists(), "stopped script must not keep running");
    }

    #[tokio::test]
    async fn delete_during_start_leaves_no_process_or_record() {
        let fx = fixture();
        let marker_dir = tempfile::tempdir().expect("temp dir");
        let marker = marker_dir.path().join("ran");
        let command = touch_after_sleep(&marker);

        let deleting = async {
            let id = first_record_id(&fx.store).await;
            fx.orchestrator.delete(id).await
        };
        let (created, deleted) = tokio::join!(fx.orchestrator.create(&command), deleting);

        deleted.expect("delete");
        match created {
            Ok(_) | Err(ScriptError::NoSuchScript(_)) => {}
            Err(e) => panic!("unexpected create error: {e}"),
        }

        assert!(fx.store.get_all(0, None).await.expect("list").is_empty());
        let registry = &fx.registry;
        assert!(eventually(SETTLE, || async move { registry.is_empty().await }).await);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists(), "deleted script must not keep running");
    }

    #[tokio::test]
    async fn stop_during_start_is_rejected_or_stops() {
        let fx = fixture();

        let stopping = async {
            let id = first_record_id(&fx.store).await;
            (id, fx.orchestrator.stop(id).await)
        };
        let (created, (id, stopped)) =
            tokio::join!(fx.orchestrator.create("sleep 30"), stopping);
        let record = created.expect("create");
        assert_eq!(record.id, id);

        match stopped {
            Ok(()) => {}
            Err(ScriptError::NoSuchRunningScript(_)) => {
                fx.orchestrator.stop(id).await.expect("stop once running");
            }
            Err(e) => panic!("unexpected stop error: {e}"),
        }

        assert!(fx.registry.lookup(id).await.is_none());
        assert!(!fx.orchestrator.get(id).await.expect("get").is_running);
        assert!(!process_alive(record.pid.expect("pid")));
    }

    #[tokio::test]
    async fn shutdown_stops_everything() {
        let fx = fixture();
        let a = fx.orchestrator.create("sleep 30").await.expect("create a");
        let b = fx.orchestrator.create("sleep 30").await.expect("create b");

        fx.orchestrator.shutdown().await;

        assert!(fx.orchestrator.running_ids().await.is_empty());
        for id in [a.id, b.id] {
            assert!(!fx.store.get(id).await.expect("record").is_running);
        }
    }
}
