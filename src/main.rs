//! # meowtts
//!
//! Binary that wires the pipeline together: Twitch EventSub listener → event
//! bus → dispatcher → ElevenLabs → websocket broadcast to browser sources.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use meow_core::event_bus;
use meow_server::{
    ConnectionRegistry, DispatchRules, Dispatcher, MeowServer, ServerConfig, ShutdownCoordinator,
    StreamBroadcaster,
};
use meow_tts::{ElevenLabsClient, ElevenLabsConfig, SynthesisClient};
use meow_twitch::EventSubListener;
use tracing::{info, warn};

/// Chat-driven text-to-speech for browser sources.
#[derive(Parser, Debug)]
#[command(name = "meowtts", version, about)]
struct Cli {
    /// Settings file (defaults to `$MEOW_SETTINGS` or `./meowtts.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings; 0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Run without the Twitch EventSub listener.
    #[arg(long)]
    no_twitch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let dotenv = dotenvy::dotenv();

    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(meow_settings::settings_path);
    let mut settings = meow_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    let logging = meow_logging::init_logging(&settings.logging);
    info!(
        filter = logging.directive(),
        settings = %settings_path.display(),
        "meowtts starting"
    );
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "loaded environment file");
    }

    let synthesizer: Arc<dyn SynthesisClient> = Arc::new(
        ElevenLabsConfig::from_settings(&settings.tts)
            .and_then(ElevenLabsClient::new)
            .context("Failed to configure ElevenLabs")?,
    );

    let shutdown = ShutdownCoordinator::new();
    let (bus, events) = event_bus();
    let registry = Arc::new(ConnectionRegistry::new());
    let dispatcher = Dispatcher::new(
        DispatchRules::from_settings(&settings.dispatch),
        Dispatcher::catalog_from_settings(&settings.tts),
        synthesizer,
        Arc::new(StreamBroadcaster::new(Arc::clone(&registry))),
        Arc::clone(&registry),
    );
    if settings.dispatch.admin_users.is_empty() {
        warn!("no admin users configured; chat commands are disabled");
    }

    let server_config = ServerConfig::from_settings(&settings.server);
    let shutdown_timeout = server_config.shutdown_timeout;
    let server = MeowServer::new(
        server_config,
        registry,
        events.depth(),
        dispatcher.subscribe(),
        shutdown.token(),
    );

    let mut tasks = vec![tokio::spawn(dispatcher.run(events, shutdown.token()))];

    if args.no_twitch || !settings.twitch.enabled {
        info!("twitch listener disabled");
    } else {
        match EventSubListener::from_settings(&settings.twitch, bus.clone()) {
            Ok(listener) => tasks.push(tokio::spawn(listener.run(shutdown.token()))),
            Err(e) => warn!(error = %e, "twitch listener not started"),
        }
    }
    drop(bus);

    let (addr, server_handle) = server.listen().await.context("Failed to bind server")?;
    tasks.push(server_handle);
    info!("browser source at http://{addr}/");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    info!("Shutting down...");
    shutdown.graceful_shutdown(tasks, shutdown_timeout).await;
    info!("Shutdown complete");
    Ok(())
}
