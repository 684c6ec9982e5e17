//! In-memory transport, service and worker doubles shared by the unit tests.
//!
//! Everything the doubles observe lands in one [`Tap`], so a test can
//! assert on binds, outbound routes, routed calls and worker lifecycles
//! without a network.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flowgate_core::{
    Dispatcher, DomainDescription, DomainStatus, GroupConfig, Payload, Registration, RemoteError,
    RootConfig, StartWorkflowRequest, Transport, WorkerConfig, WorkflowExecution, WorkflowService,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::config::ClientOptions;
use crate::lifecycle::ClientDeps;
use crate::observability::DiagnosticLogger;
use crate::runtime::{Worker, WorkerFactory, WorkerGroupRuntime, WorkerOptions};

/// `(group, domain, host_port, task lists)`.
pub(crate) type GroupSpec<'a> = (&'a str, &'a str, &'a str, &'a [&'a str]);

/// One call that reached a [`MemoryService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    /// `host:port` of the dispatcher the call went through.
    pub endpoint: String,
    pub domain: String,
    pub operation: &'static str,
    pub workflow_id: String,
    pub run_id: String,
}

/// A worker built by [`MemoryWorkerFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CreatedWorker {
    pub domain: String,
    pub task_list: String,
    pub pollers: u32,
    /// Number of registrations handed to the worker.
    pub registrations: usize,
}

/// Shared observation point and fault switchboard.
#[derive(Debug, Default)]
pub(crate) struct Tap {
    pub binds: AtomicUsize,
    pub dispatcher_starts: AtomicUsize,
    pub dispatcher_stops: AtomicUsize,
    pub describes: AtomicUsize,
    pub fail_bind: AtomicBool,
    pub fail_dispatcher_start: AtomicBool,
    pub fail_describe: AtomicBool,
    pub start_delay_ms: AtomicU64,
    pub call_delay_ms: AtomicU64,
    pub describe_delay_ms: AtomicU64,
    pub worker_start_delay_ms: AtomicU64,
    client_names: Mutex<Vec<String>>,
    outbounds: Mutex<Vec<(String, String)>>,
    calls: Mutex<Vec<Call>>,
    call_failure: Mutex<Option<RemoteError>>,
    failing_workers: Mutex<HashSet<String>>,
    created: Mutex<Vec<CreatedWorker>>,
    started: Mutex<Vec<String>>,
    stopped: Mutex<Vec<String>>,
}

impl Tap {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_start_delay_ms(&self, ms: u64) {
        self.start_delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Every service call fails with `err` from now on.
    pub fn fail_calls_with(&self, err: RemoteError) {
        *self.call_failure.lock() = Some(err);
    }

    /// Workers polling `task_list` fail to start.
    pub fn fail_worker(&self, task_list: &str) {
        self.failing_workers.lock().insert(task_list.to_string());
    }

    pub fn client_names(&self) -> Vec<String> {
        self.client_names.lock().clone()
    }

    pub fn outbounds(&self) -> Vec<(String, String)> {
        self.outbounds.lock().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn created_workers(&self) -> Vec<CreatedWorker> {
        self.created.lock().clone()
    }

    pub fn workers_started(&self) -> Vec<String> {
        self.started.lock().clone()
    }

    pub fn workers_stopped(&self) -> Vec<String> {
        self.stopped.lock().clone()
    }
}

async fn sleep_ms(delay: &AtomicU64) {
    let ms = delay.load(Ordering::SeqCst);
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

// ---------------------------------------------------------------------------
// Transport / Dispatcher
// ---------------------------------------------------------------------------

pub(crate) struct MemoryTransport {
    tap: Arc<Tap>,
}

impl MemoryTransport {
    pub fn new(tap: Arc<Tap>) -> Self {
        Self { tap }
    }
}

impl Transport for MemoryTransport {
    fn bind(&self, client_name: &str) -> Result<Box<dyn Dispatcher>, RemoteError> {
        self.tap.binds.fetch_add(1, Ordering::SeqCst);
        if self.tap.fail_bind.load(Ordering::SeqCst) {
            return Err(RemoteError::transport("bind refused"));
        }
        self.tap.client_names.lock().push(client_name.to_string());
        Ok(Box::new(MemoryDispatcher {
            tap: Arc::clone(&self.tap),
            outbound: None,
        }))
    }
}

struct MemoryDispatcher {
    tap: Arc<Tap>,
    /// `(service, host_port)`.
    outbound: Option<(String, String)>,
}

#[async_trait]
impl Dispatcher for MemoryDispatcher {
    fn add_outbound(&mut self, service: &str, host_port: &str) -> Result<(), RemoteError> {
        self.tap
            .outbounds
            .lock()
            .push((service.to_string(), host_port.to_string()));
        self.outbound = Some((service.to_string(), host_port.to_string()));
        Ok(())
    }

    async fn start(&mut self) -> Result<(), RemoteError> {
        self.tap.dispatcher_starts.fetch_add(1, Ordering::SeqCst);
        sleep_ms(&self.tap.start_delay_ms).await;
        if self.tap.fail_dispatcher_start.load(Ordering::SeqCst) {
            return Err(RemoteError::transport("connection refused"));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), RemoteError> {
        self.tap.dispatcher_stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn service_client(&self, service: &str) -> Result<Arc<dyn WorkflowService>, RemoteError> {
        match &self.outbound {
            Some((name, host_port)) if name == service => Ok(Arc::new(MemoryService {
                tap: Arc::clone(&self.tap),
                endpoint: host_port.clone(),
            })),
            _ => Err(RemoteError::internal(format!("no outbound for {service}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow service
// ---------------------------------------------------------------------------

struct MemoryService {
    tap: Arc<Tap>,
    endpoint: String,
}

impl MemoryService {
    async fn record(
        &self,
        operation: &'static str,
        domain: &str,
        execution: &WorkflowExecution,
    ) -> Result<(), RemoteError> {
        sleep_ms(&self.tap.call_delay_ms).await;
        self.tap.calls.lock().push(Call {
            endpoint: self.endpoint.clone(),
            domain: domain.to_string(),
            operation,
            workflow_id: execution.workflow_id.clone(),
            run_id: execution.run_id.clone(),
        });
        match self.tap.call_failure.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl WorkflowService for MemoryService {
    async fn start_workflow(
        &self,
        request: StartWorkflowRequest,
    ) -> Result<WorkflowExecution, RemoteError> {
        let execution = WorkflowExecution::new(
            request.workflow_id.clone(),
            format!("run-{}", request.workflow_id),
        );
        self.record("start_workflow", &request.domain, &execution)
            .await?;
        Ok(execution)
    }

    async fn await_workflow_result(
        &self,
        domain: &str,
        execution: &WorkflowExecution,
    ) -> Result<Payload, RemoteError> {
        self.record("await_workflow_result", domain, execution)
            .await?;
        Ok(json!({ "workflow_id": execution.workflow_id, "status": "completed" }))
    }

    async fn request_cancel_workflow(
        &self,
        domain: &str,
        execution: &WorkflowExecution,
    ) -> Result<(), RemoteError> {
        self.record("request_cancel_workflow", domain, execution)
            .await
    }

    async fn query_workflow(
        &self,
        domain: &str,
        execution: &WorkflowExecution,
        query_type: &str,
        _args: Vec<Payload>,
    ) -> Result<Payload, RemoteError> {
        self.record("query_workflow", domain, execution).await?;
        Ok(json!({ "query": query_type, "workflow_id": execution.workflow_id }))
    }

    async fn terminate_workflow(
        &self,
        domain: &str,
        execution: &WorkflowExecution,
        _reason: &str,
        _details: Vec<u8>,
    ) -> Result<(), RemoteError> {
        self.record("terminate_workflow", domain, execution).await
    }

    async fn describe_domain(&self, domain: &str) -> Result<DomainDescription, RemoteError> {
        self.tap.describes.fetch_add(1, Ordering::SeqCst);
        sleep_ms(&self.tap.describe_delay_ms).await;
        if self.tap.fail_describe.load(Ordering::SeqCst) {
            return Err(RemoteError::not_found(format!("domain {domain}")));
        }
        Ok(DomainDescription {
            name: domain.to_string(),
            status: DomainStatus::Registered,
            description: String::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

pub(crate) struct MemoryWorkerFactory {
    tap: Arc<Tap>,
}

impl MemoryWorkerFactory {
    pub fn new(tap: Arc<Tap>) -> Self {
        Self { tap }
    }
}

impl WorkerFactory for MemoryWorkerFactory {
    fn new_worker(
        &self,
        _service: Arc<dyn WorkflowService>,
        domain: &str,
        task_list: &str,
        options: WorkerOptions,
    ) -> Result<Box<dyn Worker>, RemoteError> {
        self.tap.created.lock().push(CreatedWorker {
            domain: domain.to_string(),
            task_list: task_list.to_string(),
            pollers: options.pollers,
            registrations: options.registrations.len(),
        });
        Ok(Box::new(MemoryWorker {
            tap: Arc::clone(&self.tap),
            task_list: task_list.to_string(),
        }))
    }
}

struct MemoryWorker {
    tap: Arc<Tap>,
    task_list: String,
}

#[async_trait]
impl Worker for MemoryWorker {
    async fn start(&mut self) -> Result<(), RemoteError> {
        sleep_ms(&self.tap.worker_start_delay_ms).await;
        if self.tap.failing_workers.lock().contains(&self.task_list) {
            return Err(RemoteError::internal(format!(
                "poller for {} refused to start",
                self.task_list
            )));
        }
        self.tap.started.lock().push(self.task_list.clone());
        Ok(())
    }

    async fn stop(&mut self) {
        self.tap.stopped.lock().push(self.task_list.clone());
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// A named group with two pollers per task list.
pub(crate) fn group(name: &str, domain: &str, host_port: &str, task_lists: &[&str]) -> GroupConfig {
    GroupConfig {
        disabled: false,
        name: name.to_string(),
        domain: domain.to_string(),
        host_port: host_port.to_string(),
        workers: task_lists
            .iter()
            .map(|t| WorkerConfig {
                disabled: false,
                task_list: (*t).to_string(),
                worker_count: 2,
            })
            .collect(),
    }
}

pub(crate) fn root_config(groups: &[GroupSpec<'_>]) -> RootConfig {
    RootConfig {
        worker_groups: groups
            .iter()
            .map(|(name, domain, host_port, task_lists)| {
                ((*name).to_string(), group(name, domain, host_port, task_lists))
            })
            .collect(),
        ..RootConfig::default()
    }
}

pub(crate) fn deps(tap: &Arc<Tap>) -> ClientDeps {
    ClientDeps {
        transport: Arc::new(MemoryTransport::new(Arc::clone(tap))),
        worker_factory: Arc::new(MemoryWorkerFactory::new(Arc::clone(tap))),
    }
}

/// Builds and starts one runtime per spec, in order.
pub(crate) async fn started_groups(
    tap: &Arc<Tap>,
    groups: &[GroupSpec<'_>],
) -> Vec<Arc<WorkerGroupRuntime>> {
    let deps = deps(tap);
    let mut started = Vec::new();
    for (name, domain, host_port, task_lists) in groups {
        let runtime = Arc::new(WorkerGroupRuntime::new(
            group(name, domain, host_port, task_lists),
            Arc::clone(&deps.transport),
            Arc::clone(&deps.worker_factory),
            DiagnosticLogger::default(),
            Arc::from(Vec::<Registration>::new()),
            &ClientOptions::default(),
        ));
        runtime
            .start(&CancellationToken::new())
            .await
            .expect("group starts");
        started.push(runtime);
    }
    started
}
