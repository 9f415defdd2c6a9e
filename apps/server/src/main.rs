use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use courier_config::load as load_config;
use courier_database::{UpsertUserRequest, UserRepository};
use courier_gateway::{create_router, GatewayState, TokenVerifier};
use courier_runtime::{telemetry, BackendServices};
use sqlx::Row;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Courier chat backend (serves by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and WebSocket server
    Serve,
    /// Print every chat with its participants and message counts
    DumpData,
    /// Upsert a few demo user profiles
    SeedData,
    /// Print a bearer token for a user, signed with the configured secret
    Token {
        user_id: String,
        #[arg(long, default_value_t = 24)]
        hours: u64,
    },
}

const DEMO_USERS: &[(&str, &str, &str)] = &[
    ("alice", "Alice Martin", "alice@example.com"),
    ("bob", "Bob Okafor", "bob@example.com"),
    ("carol", "Carol Weiss", "carol@example.com"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::DumpData => dump_data().await,
        Commands::SeedData => seed_data().await,
        Commands::Token { user_id, hours } => print_token(&user_id, hours),
    }
}

async fn run_server() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("starting Courier backend");

    let config = load_config().context("failed to load configuration")?;
    if config.auth.uses_development_secret() {
        warn!("auth.jwt_secret is not set, using the development secret");
    }

    let backend = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let state = GatewayState::new(backend.services.clone(), backend.hub.clone(), &config.auth);
    let app = create_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, redis = backend.redis_enabled(), "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(courier_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    backend.shutdown();
    info!("backend shut down");
    Ok(())
}

async fn dump_data() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;
    let backend = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let chats = sqlx::query(
        r#"
        SELECT c.public_id, c.is_group, c.name,
               (SELECT GROUP_CONCAT(p.user_id, ',') FROM chat_participants p
                    WHERE p.chat_id = c.id) AS participants,
               (SELECT COUNT(*) FROM messages m WHERE m.chat_id = c.id) AS message_count,
               (SELECT COUNT(*) FROM messages m WHERE m.chat_id = c.id AND m.seen = 0) AS unseen_count,
               c.created_at
        FROM chats c
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .fetch_all(&backend.db_pool)
    .await
    .context("failed to fetch chats")?;

    println!("=== CHATS ===");
    if chats.is_empty() {
        println!("No chats found in database");
        return Ok(());
    }

    println!("Found {} chats:", chats.len());
    println!(
        "{:<26} {:<7} {:<20} {:<40} {:<9} {:<7} {:<25}",
        "Public ID", "Group", "Name", "Participants", "Messages", "Unseen", "Created At"
    );
    println!("{}", "-".repeat(140));

    for chat in chats {
        let public_id: String = chat.get("public_id");
        let is_group: bool = chat.get("is_group");
        let name: Option<String> = chat.get("name");
        let participants: Option<String> = chat.get("participants");
        let message_count: i64 = chat.get("message_count");
        let unseen_count: i64 = chat.get("unseen_count");
        let created_at: String = chat.get("created_at");

        println!(
            "{:<26} {:<7} {:<20} {:<40} {:<9} {:<7} {:<25}",
            public_id,
            is_group,
            name.as_deref().unwrap_or("-"),
            participants.as_deref().unwrap_or(""),
            message_count,
            unseen_count,
            created_at
        );
    }

    Ok(())
}

async fn seed_data() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;
    let backend = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let users = UserRepository::new(backend.db_pool.clone());
    for (id, name, email) in DEMO_USERS {
        users
            .upsert(&UpsertUserRequest {
                id: id.to_string(),
                name: Some(name.to_string()),
                email: Some(email.to_string()),
                mobile: None,
                photo: None,
            })
            .await
            .with_context(|| format!("failed to seed user {id}"))?;
    }

    info!(count = DEMO_USERS.len(), "seeded demo users");
    println!("Seeded {} users", DEMO_USERS.len());
    Ok(())
}

fn print_token(user_id: &str, hours: u64) -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;

    let token = TokenVerifier::new(&config.auth.jwt_secret)
        .issue(user_id, Duration::from_secs(hours * 3600))
        .context("failed to issue token")?;

    println!("{token}");
    Ok(())
}
