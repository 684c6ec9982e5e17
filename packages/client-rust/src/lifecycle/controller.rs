//! Start/shutdown orchestration for the whole client.
//!
//! State machine: `NotStarted -> Running -> ShuttingDown -> Stopped`.
//!
//! Teardown runs exactly once no matter how many callers ask for it, and
//! every caller, early or late, gets a [`CompletionSignal`] that fires when
//! teardown is done. Cancelling the token passed to `start` triggers the same
//! shutdown from a watcher task owned by the controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};

use arc_swap::{ArcSwap, ArcSwapOption};
use flowgate_core::{Registration, RootConfig, Transport};
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ClientOptions;
use crate::error::LifecycleError;
use crate::observability::DiagnosticLogger;
use crate::runtime::{WorkerFactory, WorkerGroupRuntime};
use crate::service::Router;

/// Lifecycle state of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed; `start` not called or not yet finished.
    NotStarted,
    /// Started. Quiescent (no groups) when the client is disabled.
    Running,
    /// Teardown in progress; new calls are rejected.
    ShuttingDown,
    /// Teardown finished. Only further no-op shutdowns are valid.
    Stopped,
}

/// Fires once teardown has finished. Cheap to clone; waiting after the fact
/// returns immediately.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    rx: watch::Receiver<bool>,
}

impl CompletionSignal {
    fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// A signal that has already fired.
    #[must_use]
    pub fn completed() -> Self {
        let (_tx, rx) = watch::channel(true);
        Self { rx }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits until teardown has finished.
    pub async fn wait(mut self) {
        // A closed channel here means the controller is gone, and with it
        // everything teardown would have stopped.
        let _ = self.rx.wait_for(|done| *done).await;
    }
}

/// External collaborators the client is built on.
#[derive(Clone)]
pub struct ClientDeps {
    pub transport: Arc<dyn Transport>,
    pub worker_factory: Arc<dyn WorkerFactory>,
}

impl std::fmt::Debug for ClientDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientDeps").finish_non_exhaustive()
    }
}

/// Owns the worker groups and the router built from them.
pub struct LifecycleController {
    config: RootConfig,
    deps: ClientDeps,
    options: ClientOptions,
    state: ArcSwap<LifecycleState>,
    router: ArcSwapOption<Router>,
    groups: Mutex<Vec<Arc<WorkerGroupRuntime>>>,
    registrations: Mutex<Vec<Registration>>,
    start_claimed: AtomicBool,
    /// Held by `start` for its whole run and by teardown before it begins.
    transition: tokio::sync::Mutex<()>,
    /// Cancelled as soon as shutdown is requested.
    stop: CancellationToken,
    shutdown_once: Once,
    done: watch::Sender<bool>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl LifecycleController {
    /// Creates a controller. The configuration must already be validated.
    #[must_use]
    pub fn new(config: RootConfig, deps: ClientDeps, options: ClientOptions) -> Self {
        let (done, _rx) = watch::channel(false);
        Self {
            config,
            deps,
            options,
            state: ArcSwap::from_pointee(LifecycleState::NotStarted),
            router: ArcSwapOption::empty(),
            groups: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
            start_claimed: AtomicBool::new(false),
            transition: tokio::sync::Mutex::new(()),
            stop: CancellationToken::new(),
            shutdown_once: Once::new(),
            done,
            watcher: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        **self.state.load()
    }

    /// The router, while running.
    #[must_use]
    pub fn router(&self) -> Option<Arc<Router>> {
        self.router.load_full()
    }

    /// Records a workflow or activity registration for the workers.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyStarted`] once `start` has been called.
    pub fn register(&self, registration: Registration) -> Result<(), LifecycleError> {
        if self.start_claimed.load(Ordering::Acquire) {
            return Err(LifecycleError::AlreadyStarted);
        }
        self.registrations.lock().push(registration);
        Ok(())
    }

    /// Starts every enabled group and publishes the router.
    ///
    /// Groups start one after another; a failing group aborts the start but
    /// groups already started stay up until shutdown. Cancelling
    /// `shutdown_on` later shuts the client down.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyStarted`] on a second call,
    /// [`LifecycleError::ShutDown`] if shutdown was requested first or during
    /// start, and [`LifecycleError::GroupStart`] naming the failing group.
    pub async fn start(
        self: &Arc<Self>,
        shutdown_on: CancellationToken,
    ) -> Result<(), LifecycleError> {
        if self.start_claimed.swap(true, Ordering::AcqRel) {
            return Err(LifecycleError::AlreadyStarted);
        }
        let _transition = self.transition.lock().await;
        if self.stop.is_cancelled() {
            return Err(LifecycleError::ShutDown);
        }

        if self.config.disabled {
            warn!("workflow client is disabled - will not start any worker");
            self.state.store(Arc::new(LifecycleState::Running));
            return Ok(());
        }

        let logger = DiagnosticLogger::new(self.config.enable_error_stack_in_cadence_log);
        let registrations: Arc<[Registration]> = self.registrations.lock().clone().into();
        self.arm_watcher(shutdown_on);

        let mut started = Vec::new();
        for group in self.config.groups() {
            if group.disabled {
                warn!(group = %group.name, "worker group is disabled - skipping");
                continue;
            }
            if self.stop.is_cancelled() {
                return Err(LifecycleError::ShutDown);
            }

            let name = group.name.clone();
            let runtime = Arc::new(WorkerGroupRuntime::new(
                group,
                Arc::clone(&self.deps.transport),
                Arc::clone(&self.deps.worker_factory),
                logger,
                Arc::clone(&registrations),
                &self.options,
            ));
            self.groups.lock().push(Arc::clone(&runtime));

            // Start unwinds on its own when `stop` fires, so whatever it
            // acquired is either released there or recorded in `groups`.
            match runtime.start(&self.stop).await {
                Ok(()) => started.push(runtime),
                Err(err) if err.is_interrupted() => return Err(LifecycleError::ShutDown),
                Err(source) => return Err(LifecycleError::GroupStart { group: name, source }),
            }
        }

        let router = Router::new(&started);
        info!(
            groups = started.len(),
            task_lists = ?router.task_lists(),
            "workflow client started"
        );
        self.router.store(Some(Arc::new(router)));
        self.state.store(Arc::new(LifecycleState::Running));
        Ok(())
    }

    /// Requests shutdown and returns the completion signal.
    ///
    /// Only the first call schedules teardown; every call gets a signal.
    /// Outside a Tokio runtime nothing can be awaited, so the groups are
    /// dropped without stopping them and the signal fires at once.
    pub fn shutdown(self: &Arc<Self>) -> CompletionSignal {
        self.shutdown_once.call_once(|| {
            self.stop.cancel();
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let this = Arc::clone(self);
                    handle.spawn(async move { this.teardown().await });
                }
                Err(_) => self.abandon(),
            }
        });
        CompletionSignal::new(self.done.subscribe())
    }

    /// Waits for the context watcher to exit. It exits once shutdown has been
    /// requested, by either path.
    pub async fn join_watcher(&self) {
        let handle = self.watcher.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    fn arm_watcher(self: &Arc<Self>, shutdown_on: CancellationToken) {
        let controller = Arc::downgrade(self);
        let stop = self.stop.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                () = shutdown_on.cancelled() => {
                    if let Some(controller) = controller.upgrade() {
                        info!("start context cancelled - shutting down workflow client");
                        controller.shutdown().wait().await;
                    }
                }
                () = stop.cancelled() => {}
            }
        });
        *self.watcher.lock() = Some(handle);
    }

    fn abandon(&self) {
        self.router.store(None);
        let groups = std::mem::take(&mut *self.groups.lock());
        if !groups.is_empty() {
            warn!(
                groups = groups.len(),
                "shutdown outside a runtime - worker groups dropped without stopping"
            );
        }
        self.state.store(Arc::new(LifecycleState::Stopped));
        self.done.send_replace(true);
    }

    async fn teardown(&self) {
        let _transition = self.transition.lock().await;
        self.state.store(Arc::new(LifecycleState::ShuttingDown));
        self.router.store(None);

        let groups = std::mem::take(&mut *self.groups.lock());
        info!(groups = groups.len(), "shutting down workflow client");
        for group in groups {
            let (tx, rx) = oneshot::channel();
            group.shutdown(tx).await;
            let _ = rx.await;
        }

        self.state.store(Arc::new(LifecycleState::Stopped));
        self.done.send_replace(true);
        info!("workflow client stopped");
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("state", &self.state())
            .field("router", &self.router())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
