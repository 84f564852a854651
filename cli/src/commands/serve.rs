// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Server command
//!
//! Wires the registry, simulated backend, reconciler and HTTP surface, then
//! serves until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use clap::Args;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use spark_proxy_core::{
    application::{SparkApplicationService, StandardSparkApplicationService, StatusReconciler},
    domain::config::{BackendType, ProxyConfigManifest},
    infrastructure::{identity_generator_for, EventBus, InMemoryApplicationRegistry, SimulatedBackend},
    presentation::app_with_layers,
};

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Bind host (overrides configuration)
    #[arg(long, env = "SPARK_PROXY_HOST")]
    pub host: Option<String>,

    /// Bind port (overrides configuration)
    #[arg(long, env = "SPARK_PROXY_PORT")]
    pub port: Option<u16>,
}

impl ServeArgs {
    /// Flags win over the file and environment overrides already applied to `config`.
    pub fn apply(&self, config: &mut ProxyConfigManifest) {
        if let Some(host) = &self.host {
            config.spec.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.spec.server.port = port;
        }
    }
}

pub async fn run(mut config: ProxyConfigManifest, args: ServeArgs) -> Result<()> {
    args.apply(&mut config);
    config
        .validate()
        .context("Configuration validation failed")?;

    info!(
        "Spark proxy starting: config={}, id_strategy={:?}",
        config.metadata.name, config.spec.registry.id_strategy
    );

    if let Some(addr) = config.spec.observability.metrics_listen {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Prometheus metrics exposed on {}", addr);
    }

    let (reports_tx, reports_rx) = mpsc::channel(config.spec.backend.status_channel_capacity);
    let backend = match config.spec.backend.backend_type {
        BackendType::Simulated => {
            if config.spec.backend.auto_progress {
                info!(
                    "Simulated backend will progress jobs every {:?}",
                    config.spec.backend.step_delay
                );
            }
            Arc::new(SimulatedBackend::from_config(&config.spec.backend, reports_tx))
        }
    };

    let registry = Arc::new(InMemoryApplicationRegistry::new(identity_generator_for(
        config.spec.registry.id_strategy,
    )));
    let service: Arc<dyn SparkApplicationService> = Arc::new(StandardSparkApplicationService::new(
        registry,
        backend,
        Arc::new(EventBus::with_default_capacity()),
    ));

    let shutdown = CancellationToken::new();
    let reconciler = StatusReconciler::new(service.clone()).spawn(reports_rx, shutdown.clone());

    let app = app_with_layers(service, config.spec.server.request_timeout);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Spark proxy listening on {}", addr);
    info!("  POST   /api/v1/namespaces/{{namespace}}/applications");
    info!("  GET    /api/v1/namespaces/{{namespace}}/applications");
    info!("  GET    /api/v1/namespaces/{{namespace}}/applications/{{name}}");
    info!("  DELETE /api/v1/namespaces/{{namespace}}/applications/{{name}}");
    info!("  POST   /api/v1/namespaces/{{namespace}}/applications/{{name}}/status");
    info!("  GET    /api/v1/namespaces/{{namespace}}/applications/{{name}}/events");
    info!("  GET    /health");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed");

    shutdown.cancel();
    if let Err(e) = reconciler.await {
        warn!("Status reconciler ended abnormally: {}", e);
    }

    info!("Spark proxy shut down");
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
