pub mod action;
pub mod api;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod metrics_defs;
pub mod operations;
pub mod params;
pub mod queue;
pub mod store;
pub mod trust;
pub mod types;
pub mod upload;

#[cfg(test)]
mod testutils;

use api::ConfigSetsService;
use config::{Config, CoordinationConfig, QueueConfig, StoreConfig};
use dispatcher::RequestDispatcher;
use queue::{HttpWorkQueue, QueueBridge};
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;
use store::{ConfigStore, FilesystemConfigStore, MemoryConfigStore};

#[derive(thiserror::Error, Debug)]
pub enum ConfigSetsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn build_store(config: &StoreConfig) -> Arc<dyn ConfigStore> {
    match config {
        StoreConfig::Memory => Arc::new(MemoryConfigStore::new()),
        StoreConfig::Filesystem { base_dir } => Arc::new(FilesystemConfigStore::new(base_dir)),
    }
}

pub fn build_bridge(config: &CoordinationConfig) -> QueueBridge {
    let queue = match &config.queue {
        QueueConfig::Http { url } => HttpWorkQueue::new(url.clone()),
    };
    QueueBridge::new(Arc::new(queue), config.timeout())
}

pub async fn run(config: Config) -> Result<(), ConfigSetsError> {
    let store = build_store(&config.store);
    let bridge = config.coordination.as_ref().map(build_bridge);
    if bridge.is_none() {
        tracing::warn!("No coordination configured, every configset action will be rejected");
    }

    let dispatcher = RequestDispatcher::new(store, bridge, config.handler.clone());
    let ready = dispatcher.is_coordinated();

    let api_service = ConfigSetsService::new(
        dispatcher,
        config.authentication.as_ref(),
        config.handler.max_upload_bytes,
    );
    let admin_service = AdminService::<_, ConfigSetsError>::new(move || ready);

    let api_task = run_http_service(&config.listener.host, config.listener.port, api_service);
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );

    tokio::try_join!(api_task, admin_task)?;
    Ok(())
}
