use std::sync::Arc;

use {
    anyhow::Context,
    clap::Parser,
    relay_admin::AdminSessionMachine,
    relay_channels::AdminOutbound,
    relay_config::RelayConfig,
    relay_forward::{RelayEngine, ReplyLinkCache},
    relay_routing::{JsonFileBackend, RoutingStore},
    relay_telegram::{EventSinks, Role, TelegramOutbound, build_bot, connect, start_polling},
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

/// Queued events per stream. Admin polling waits for space, relay events
/// beyond it are dropped.
const EVENT_QUEUE: usize = 256;

#[derive(Parser)]
#[command(name = "relay", about = "Relay Telegram messages between chats")]
struct Cli {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[arg(long, env = "RELAY_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, env = "RELAY_JSON_LOGS", default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "relay starting");

    let config = RelayConfig::from_env()?;
    let routing = RoutingStore::open(JsonFileBackend::new(&config.routing_file))
        .await
        .with_context(|| {
            format!(
                "failed to load routing table from {}",
                config.routing_file.display()
            )
        })?;
    let routing = Arc::new(routing);

    let (admin_tx, admin_rx) = mpsc::channel(EVENT_QUEUE);
    let (relay_tx, relay_rx) = mpsc::channel(EVENT_QUEUE);
    let sinks = EventSinks {
        admin: admin_tx,
        relay: relay_tx,
    };
    let cancel = CancellationToken::new();

    let admin_bot = build_bot(&config.admin_token)?;
    let mut pollers = Vec::new();
    let relay_bot = match &config.relay_token {
        Some(token) if !config.single_bot() => {
            let relay_bot = build_bot(token)?;
            connect(&admin_bot, Role::Admin).await?;
            connect(&relay_bot, Role::Relay).await?;
            pollers.push(start_polling(
                admin_bot.clone(),
                Role::Admin,
                sinks.clone(),
                cancel.clone(),
            ));
            pollers.push(start_polling(
                relay_bot.clone(),
                Role::Relay,
                sinks,
                cancel.clone(),
            ));
            relay_bot
        },
        _ => {
            let role = Role::Combined {
                admin_id: config.admin_id,
            };
            info!("no separate relay token, one bot serves admin and relay");
            connect(&admin_bot, role).await?;
            pollers.push(start_polling(admin_bot.clone(), role, sinks, cancel.clone()));
            admin_bot.clone()
        },
    };

    let engine = RelayEngine::new(
        Arc::clone(&routing),
        Arc::new(TelegramOutbound::new(relay_bot)),
        ReplyLinkCache::new(config.link_capacity, config.link_ttl),
    );
    let relay_task = tokio::spawn(async move { engine.run(relay_rx).await });

    let admin = AdminSessionMachine::new(config.admin_id, Arc::clone(&routing), config.session_ttl);
    let admin_outbound: Arc<dyn AdminOutbound> = Arc::new(TelegramOutbound::new(admin_bot));
    let admin_task = tokio::spawn(async move { admin.run(admin_rx, admin_outbound).await });

    info!(
        admin_id = config.admin_id,
        routing_file = %config.routing_file.display(),
        "relay running"
    );

    let interrupted = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutting down");
            true
        },
        () = cancel.cancelled() => false,
    };
    cancel.cancel();

    for poller in pollers {
        if let Err(e) = poller.await {
            warn!(error = %e, "polling task panicked");
        }
    }
    // Pollers own the senders, so both consumers drain and stop here.
    for (name, task) in [("relay", relay_task), ("admin", admin_task)] {
        if let Err(e) = task.await {
            warn!(task = name, error = %e, "task panicked");
        }
    }
    info!("relay stopped");

    if interrupted {
        Ok(())
    } else {
        anyhow::bail!("telegram polling stopped: another instance is using the bot token")
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn config_defaults_match_components() {
        assert_eq!(
            relay_config::DEFAULT_ROUTING_FILE,
            relay_routing::backend_file::DEFAULT_ROUTING_FILE
        );
        assert_eq!(
            relay_config::DEFAULT_LINK_CAPACITY,
            relay_forward::DEFAULT_LINK_CAPACITY
        );
        assert_eq!(relay_config::DEFAULT_LINK_TTL, relay_forward::DEFAULT_LINK_TTL);
        assert_eq!(
            relay_config::DEFAULT_SESSION_TTL,
            relay_admin::DEFAULT_SESSION_TTL
        );
    }
}
