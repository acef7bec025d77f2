//! Dependency wiring for the argos binary
//!
//! Builds every component from the loaded configuration:
//!
//! ```text
//! ResourceManager ──┐
//! HardwareScanner ──┼─> InProcessAdapter (built-in handlers)
//!                   │
//! ToolRegistry ─────┴─> ToolRouter (5 adapters) ─> ToolExecutor
//! ```

use anyhow::{Context, Result};
use argos_application::{
    ExecutionLogger, HardwareRegistry, HardwareScanner, NoExecutionLogger, ResourceManager, ToolExecutor,
    ToolRegistry, ToolRouter,
};
use argos_infrastructure::{
    FileConfig, HttpAdapter, InProcessAdapter, JsonSchemaToolConverter, JsonlExecutionLogger, NetworkProbe,
    ProcessAdapter, ProtocolAdapter, SocketAdapter, SystemDevicePresence, SystemProcessControl, build_catalog,
    builtin_tools, default_probes, register_builtin_handlers, spawn_resource_audit,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct Runtime {
    pub resources: Arc<ResourceManager>,
    pub scanner: Arc<HardwareScanner>,
    pub executor: ToolExecutor,
    audit: JoinHandle<()>,
}

impl Runtime {
    pub async fn build(config: &FileConfig) -> Result<Self> {
        let logger = Self::execution_logger(config);

        // Subscribe before reconciling so start-up adoptions reach the audit log
        let resources = Arc::new(ResourceManager::new(
            config.resources.to_resource_config(),
            Arc::new(SystemProcessControl::new()),
            Arc::new(SystemDevicePresence::new()),
        ));
        let audit = spawn_resource_audit(resources.subscribe(), Arc::clone(&logger));
        resources.reconcile_orphans().await;
        resources.spawn_refresh_loop();

        let hardware = &config.hardware;
        let network = NetworkProbe::new(hardware.probe_timeout())
            .with_service_timeout(hardware.service_timeout())
            .with_kismet_url(&hardware.kismet_url)
            .with_hackrf_api_url(&hardware.hackrf_api_url)
            .with_openwebrx_url(&hardware.openwebrx_url);
        let scanner = Arc::new(
            default_probes(hardware.probe_timeout(), network)
                .into_iter()
                .fold(HardwareScanner::new(Arc::new(HardwareRegistry::new())), |scanner, probe| {
                    scanner.with_probe(probe)
                }),
        );

        let registry = Arc::new(ToolRegistry::new());
        registry
            .register_all(builtin_tools())
            .context("Failed to register built-in tools")?;
        let catalog = build_catalog(&config.tools);
        for (name, reason) in &catalog.skipped {
            info!(tool = %name, reason = %reason, "Configured tool not available");
        }
        registry
            .register_all(catalog.available)
            .context("Failed to register configured tools")?;

        let timeout_ms = config.executor.default_timeout_ms;
        let in_process = InProcessAdapter::new().with_default_timeout_ms(timeout_ms);
        register_builtin_handlers(&in_process, Arc::clone(&resources), Arc::clone(&scanner));

        let mut router = ToolRouter::new(Arc::clone(&registry))
            .with_adapter(Arc::new(ProcessAdapter::new().with_default_timeout_ms(timeout_ms)))
            .with_adapter(Arc::new(HttpAdapter::new().with_default_timeout_ms(timeout_ms)))
            .with_adapter(Arc::new(SocketAdapter::new().with_default_timeout_ms(timeout_ms)))
            .with_adapter(Arc::new(ProtocolAdapter::new().with_default_timeout_ms(timeout_ms)))
            .with_adapter(Arc::new(in_process));
        let executor_config = config.executor.to_executor_config();
        if executor_config.auto_acquire {
            router = router.with_resource_manager(Arc::clone(&resources));
        }

        let executor = ToolExecutor::new(Arc::new(router), Arc::new(JsonSchemaToolConverter))
            .with_logger(logger)
            .with_config(executor_config);
        for error in executor.initialize().await {
            warn!(error = %error, "Backend adapter failed to initialize");
        }

        Ok(Self {
            resources,
            scanner,
            executor,
            audit,
        })
    }

    fn execution_logger(config: &FileConfig) -> Arc<dyn ExecutionLogger> {
        match &config.logging.execution_log {
            Some(path) => match JsonlExecutionLogger::new(path) {
                Some(logger) => {
                    info!(path = %path.display(), "Execution audit log enabled");
                    Arc::new(logger)
                }
                None => Arc::new(NoExecutionLogger),
            },
            None => Arc::new(NoExecutionLogger),
        }
    }

    /// Close backend connections and stop background tasks
    pub async fn shutdown(self) {
        for error in self.executor.cleanup().await {
            warn!(error = %error, "Backend adapter cleanup failed");
        }
        self.resources.shutdown();
        // Let the audit task drain events already queued
        tokio::task::yield_now().await;
        self.audit.abort();
    }
}
