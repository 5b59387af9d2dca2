//! easyrpc runner - JSON-RPC peer over a WebSocket
//!
//! This binary:
//! - Loads configuration from `config.toml`
//! - Connects to the peer via WebSocket
//! - Answers `ping` and `subscribe` requests, pushing a notification on subscribe

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use easyrpc::core::observability::spawn_metrics_log_reporter;
use easyrpc::prelude::*;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{Level, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting easyrpc runner...");

    let store = if std::path::Path::new("config.toml").exists() {
        ConfigStore::from_file("config.toml")?
    } else {
        ConfigStore::empty()
    };
    let config: ChannelConfig = store.get()?;

    info!("WebSocket URL: {}", config.ws_url);
    if config.access_token.is_some() {
        info!("Access token configured");
    }

    let (outgoing_tx, outgoing_rx) = mpsc::channel(config.queue_capacity.max(1));
    let (incoming_tx, mut incoming_rx) = mpsc::channel::<String>(config.queue_capacity.max(1));

    let driver = WsDriver::from_config(&config, incoming_tx, outgoing_rx)?;
    let driver_handle = tokio::spawn(async move {
        if let Err(e) = Box::new(driver).run().await {
            warn!("Driver stopped: {}", e);
        }
    });

    let metrics = Arc::new(InMemoryMetrics::new());
    spawn_metrics_log_reporter(metrics.clone(), Duration::from_secs(60));

    let template = Arc::new(
        SendingTemplate::new(QueueChannel::new(outgoing_tx.clone())).with_metrics(metrics),
    );
    let registry = build_registry(template)?;
    info!("Serving methods: {:?}", registry.methods());

    while let Some(frame) = incoming_rx.recv().await {
        let request: RpcRequest = match serde_json::from_str(&frame) {
            Ok(request) => request,
            Err(e) => {
                warn!("Ignoring frame that is not a request: {}", e);
                continue;
            }
        };

        let response = registry.dispatch(&request);
        match serde_json::to_string(&response) {
            Ok(text) => {
                if outgoing_tx.send(text).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!("Failed to encode response {}: {}", response.id, e),
        }
    }

    driver_handle.abort();
    info!("easyrpc runner stopped");

    Ok(())
}

fn build_registry(template: Arc<SendingTemplate<QueueChannel>>) -> Result<MethodRegistry> {
    let mut registry = MethodRegistry::new();

    registry
        .register("ping", |_| Ok(json!("pong")))?
        .register("subscribe", move |request| {
            let topic = request
                .params
                .get("topic")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    JsonRequestError::new(RpcError::invalid_params(), Some(request.clone()))
                })?;

            template
                .convert_and_send("subscribe", &json!({ "topic": topic, "status": "subscribed" }))
                .map_err(|e| {
                    JsonRequestError::new(RpcError::internal_error(), Some(request.clone()))
                        .with_cause(e)
                })?;

            Ok(json!({ "topic": topic }))
        })?;

    Ok(registry)
}
