//! Hooks that let a host application drive the workflow client's start and
//! stop alongside its other components.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Context handed to services when the host application starts them.
#[derive(Debug, Clone, Default)]
pub struct ServiceContext {
    /// Cancelled when the host application begins to stop. The workflow
    /// client shuts itself down when it fires.
    pub shutdown: CancellationToken,
}

/// A component whose start/stop is driven by the host application.
#[async_trait]
pub trait ManagedService: Send + Sync {
    fn name(&self) -> &'static str;

    /// Starts the service.
    async fn init(&self, ctx: &ServiceContext) -> anyhow::Result<()>;

    /// Stops the service. If `terminate` is true, do not wait for cleanup.
    async fn shutdown(&self, terminate: bool) -> anyhow::Result<()>;
}

/// Ordered list of start/stop hooks.
///
/// Services start in registration order and stop in reverse order. The host
/// keeps its own handle to each service (a [`crate::WorkflowApi`] clone
/// shares the registered client's lifecycle), so there is no lookup.
#[derive(Default)]
pub struct ServiceRegistry {
    services: Mutex<Vec<Arc<dyn ManagedService>>>,
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, service: Arc<dyn ManagedService>) {
        debug!(service = service.name(), "service registered");
        self.services.lock().push(service);
    }

    /// Names in start order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.services.lock().iter().map(|s| s.name()).collect()
    }

    /// Starts all services in registration order.
    ///
    /// If one fails, the services already started are stopped in reverse
    /// order before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns the first `init()` failure.
    pub async fn init_all(&self, ctx: &ServiceContext) -> anyhow::Result<()> {
        let services = self.snapshot();
        for (started, service) in services.iter().enumerate() {
            if let Err(err) = service.init(ctx).await {
                warn!(service = service.name(), error = %err, "service failed to start - rolling back");
                Self::stop_each(&services[..started], false).await;
                return Err(err.context(format!("service {} failed to start", service.name())));
            }
        }
        Ok(())
    }

    /// Stops all services in reverse registration order. Every service is
    /// asked to stop even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns the first `shutdown()` failure.
    pub async fn shutdown_all(&self, terminate: bool) -> anyhow::Result<()> {
        match Self::stop_each(&self.snapshot(), terminate).await {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn ManagedService>> {
        self.services.lock().clone()
    }

    async fn stop_each(
        services: &[Arc<dyn ManagedService>],
        terminate: bool,
    ) -> Option<anyhow::Error> {
        let mut first = None;
        for service in services.iter().rev() {
            if let Err(err) = service.shutdown(terminate).await {
                warn!(service = service.name(), error = %err, "service failed to stop");
                first.get_or_insert(err);
            }
        }
        first
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::config::ClientOptions;
    use crate::lifecycle::LifecycleState;
    use crate::service::WorkflowApi;
    use crate::testing::{deps, root_config, Tap};

    type Log = Arc<Mutex<Vec<String>>>;

    /// Writes init/shutdown calls into a shared log.
    struct Journal {
        svc_name: &'static str,
        log: Log,
        fail_init: bool,
        fail_shutdown: bool,
    }

    #[async_trait]
    impl ManagedService for Journal {
        fn name(&self) -> &'static str {
            self.svc_name
        }

        async fn init(&self, _ctx: &ServiceContext) -> anyhow::Result<()> {
            self.log.lock().push(format!("init:{}", self.svc_name));
            if self.fail_init {
                anyhow::bail!("{} refused to start", self.svc_name);
            }
            Ok(())
        }

        async fn shutdown(&self, _terminate: bool) -> anyhow::Result<()> {
            self.log.lock().push(format!("shutdown:{}", self.svc_name));
            if self.fail_shutdown {
                anyhow::bail!("{} refused to stop", self.svc_name);
            }
            Ok(())
        }
    }

    fn journal(name: &'static str, log: &Log) -> Journal {
        Journal {
            svc_name: name,
            log: Arc::clone(log),
            fail_init: false,
            fail_shutdown: false,
        }
    }

    fn workflow_api(tap: &Arc<Tap>) -> WorkflowApi {
        WorkflowApi::new(
            root_config(&[("g1", "d1", "h1:1", &["a"])]),
            deps(tap),
            ClientOptions::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn init_forward_shutdown_reverse() {
        let log = Log::default();
        let registry = ServiceRegistry::new();
        registry.register(Arc::new(journal("first", &log)));
        registry.register(Arc::new(journal("second", &log)));
        assert_eq!(registry.names(), vec!["first", "second"]);

        registry.init_all(&ServiceContext::default()).await.unwrap();
        registry.shutdown_all(false).await.unwrap();

        assert_eq!(
            log.lock().clone(),
            vec!["init:first", "init:second", "shutdown:second", "shutdown:first"]
        );
    }

    #[tokio::test]
    async fn failed_init_stops_started_services() {
        let log = Log::default();
        let registry = ServiceRegistry::new();
        registry.register(Arc::new(journal("db", &log)));
        registry.register(Arc::new(Journal {
            fail_init: true,
            ..journal("broken", &log)
        }));
        registry.register(Arc::new(journal("never", &log)));

        let err = registry
            .init_all(&ServiceContext::default())
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("broken refused to start"));
        assert_eq!(
            log.lock().clone(),
            vec!["init:db", "init:broken", "shutdown:db"]
        );
    }

    #[tokio::test]
    async fn shutdown_continues_past_failure() {
        let log = Log::default();
        let registry = ServiceRegistry::new();
        registry.register(Arc::new(journal("first", &log)));
        registry.register(Arc::new(Journal {
            fail_shutdown: true,
            ..journal("second", &log)
        }));

        let err = registry.shutdown_all(false).await.unwrap_err();

        assert_eq!(err.to_string(), "second refused to stop");
        assert_eq!(log.lock().clone(), vec!["shutdown:second", "shutdown:first"]);
    }

    #[tokio::test]
    async fn workflow_api_follows_host_lifecycle() {
        let tap = Tap::new();
        let api = workflow_api(&tap);
        let registry = ServiceRegistry::new();
        registry.register(Arc::new(api.clone()));
        assert_eq!(registry.names(), vec!["workflow"]);

        registry.init_all(&ServiceContext::default()).await.unwrap();
        assert_eq!(api.state(), LifecycleState::Running);
        assert_eq!(tap.workers_started(), vec!["a"]);

        registry.shutdown_all(false).await.unwrap();
        assert_eq!(api.state(), LifecycleState::Stopped);
        assert_eq!(tap.dispatcher_stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn workflow_api_start_failure_surfaces() {
        let tap = Tap::new();
        tap.fail_bind.store(true, Ordering::SeqCst);
        let registry = ServiceRegistry::new();
        registry.register(Arc::new(workflow_api(&tap)));

        let err = registry
            .init_all(&ServiceContext::default())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("g1"));
    }
}
