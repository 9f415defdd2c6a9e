use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use courier_chats::{
    BroadcastHub, ChatServices, DisabledMediaStore, HttpMediaStore, MediaStore, Notifier,
};
use courier_config::{AppConfig, NotifierConfig};
use courier_database::initialize_database;
use redis::aio::ConnectionManager;
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub mod fabric;

pub use fabric::{spawn_redis_bridge, RedisNotifier};

const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::DEBUG)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    /// Local fan-out point for WebSocket connections on this node
    pub hub: BroadcastHub,
    pub services: ChatServices,
    redis_bridge: Option<Arc<JoinHandle<()>>>,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let hub = BroadcastHub::new(config.notifier.channel_capacity);
        let (notifier, redis_bridge) = select_notifier(&config.notifier, &hub).await;
        let media = select_media_store(config)?;

        let services = ChatServices::new(db_pool.clone(), notifier, media);

        Ok(Self {
            db_pool,
            hub,
            services,
            redis_bridge: redis_bridge.map(Arc::new),
        })
    }

    /// Whether notifications travel through redis rather than staying on this node
    pub fn redis_enabled(&self) -> bool {
        self.redis_bridge.is_some()
    }

    /// Stop relaying redis notifications into the local hub
    pub fn shutdown(&self) {
        if let Some(bridge) = &self.redis_bridge {
            bridge.abort();
        }
    }
}

/// Redis when it is configured and reachable, otherwise the in-process hub.
async fn select_notifier(
    config: &NotifierConfig,
    hub: &BroadcastHub,
) -> (Arc<dyn Notifier>, Option<JoinHandle<()>>) {
    let Some(url) = config.redis_url.as_deref() else {
        info!("no redis configured, notifications stay in-process");
        return (Arc::new(hub.clone()), None);
    };

    match connect_redis(url, &config.channel_prefix, hub).await {
        Ok((notifier, bridge)) => {
            info!(prefix = %config.channel_prefix, "redis notification fabric ready");
            (Arc::new(notifier), Some(bridge))
        }
        Err(error) => {
            warn!(
                error = %format!("{error:#}"),
                "failed to connect to redis, proceeding with in-process notifications"
            );
            (Arc::new(hub.clone()), None)
        }
    }
}

async fn connect_redis(
    url: &str,
    prefix: &str,
    hub: &BroadcastHub,
) -> Result<(RedisNotifier, JoinHandle<()>)> {
    let client = redis::Client::open(url).context("invalid redis url")?;

    let connection =
        tokio::time::timeout(REDIS_CONNECT_TIMEOUT, ConnectionManager::new(client.clone()))
            .await
            .context("timed out connecting to redis")?
            .context("failed to connect to redis")?;

    let bridge = tokio::time::timeout(
        REDIS_CONNECT_TIMEOUT,
        spawn_redis_bridge(client, prefix.to_string(), hub.clone()),
    )
    .await
    .context("timed out subscribing to redis")?
    .context("failed to subscribe to redis")?;

    Ok((RedisNotifier::new(connection, prefix), bridge))
}

fn select_media_store(config: &AppConfig) -> Result<Arc<dyn MediaStore>> {
    let store = HttpMediaStore::from_config(&config.media).context("invalid media configuration")?;

    Ok(match store {
        Some(store) => {
            info!("attachment uploads enabled");
            Arc::new(store)
        }
        None => {
            warn!("media.upload_url not set, messages with attachments will be rejected");
            Arc::new(DisabledMediaStore)
        }
    })
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
