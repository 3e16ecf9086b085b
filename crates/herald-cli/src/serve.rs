//! Process wiring for `herald serve`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use herald_broadcast::{
    BroadcastExecutor, ConfirmationGate, ExecutorSettings, GateSettings, Scheduler,
    run_reaction_router,
};
use herald_config::BroadcastStore;
use herald_gateway::GatewayState;
use herald_transport::{BridgeTransport, Transport};

pub async fn run(config_path: Option<PathBuf>, port_override: Option<u16>) -> anyhow::Result<()> {
    // Only an absent config file falls back to defaults; a corrupt one
    // fails fast here.
    let config = match &config_path {
        Some(path) => herald_config::load_config_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => herald_config::load_config().context("loading config")?,
    };
    let offset = config.broadcast.offset()?;
    let data_dir = config.data_dir()?;
    let uploads_dir = data_dir.join("uploads");
    std::fs::create_dir_all(&uploads_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    if config.broadcast.approver.is_none() {
        warn!("No approver configured; scheduled broadcasts cannot be confirmed");
    }

    let store = BroadcastStore::in_dir(&data_dir);
    let transport = Arc::new(BridgeTransport::new(
        &config.bridge.base_url,
        config.bridge.auth_token.clone(),
    ));
    let transport_dyn: Arc<dyn Transport> = transport.clone();

    let cancel = CancellationToken::new();

    // Transport events: reactions and session state changes.
    let (event_tx, event_rx) = mpsc::channel(256);
    transport.spawn_event_pump(event_tx, cancel.child_token());

    // Broadcast worker: the single owner of every fan-out run.
    let executor = BroadcastExecutor::new(
        transport_dyn.clone(),
        store.clone(),
        ExecutorSettings::from(&config.broadcast),
    );
    let (broadcaster, _worker) = executor.spawn();

    // Confirmation gate, fed by the transport event stream.
    let gate = Arc::new(ConfirmationGate::new(
        transport_dyn.clone(),
        broadcaster.clone(),
        GateSettings::from(&config.broadcast),
    ));
    tokio::spawn(run_reaction_router(event_rx, gate.clone()));

    // Minute-tick scheduler.
    let scheduler = Scheduler::new(store.clone(), gate, offset);
    let scheduler_cancel = cancel.child_token();
    tokio::spawn(async move { scheduler.run(scheduler_cancel).await });

    // Control surface; blocks for the lifetime of the process.
    let state = Arc::new(GatewayState {
        transport: transport_dyn,
        store,
        broadcaster,
        uploads_dir,
    });
    let port = port_override.unwrap_or(config.gateway.port);
    let result = herald_gateway::start_gateway(&config.gateway.host, port, state)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"));

    cancel.cancel();
    result
}
