use std::path::PathBuf;

use anyhow::{bail, Context};
use backstage_analytics::{generate_report, write_report};
use backstage_api::{build_router, AppState};
use backstage_auth::{Authenticator, RegisterUser};
use backstage_azuracast::AzuraCastClient;
use backstage_config::{load as load_config, AppConfig};
use backstage_database::{initialize_database, UserRole};
use backstage_runtime::{shutdown_signal, telemetry, BackendServices};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "backstage")]
#[command(about = "Backstage staff portal backend (serves HTTP by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Create a staff account
    CreateUser(CreateUserArgs),
    /// Pull song history from AzuraCast and write the analytics report
    BuildAnalytics(BuildAnalyticsArgs),
}

#[derive(Args)]
struct CreateUserArgs {
    #[arg(long)]
    username: String,
    /// Read from stdin when omitted
    #[arg(long)]
    password: Option<String>,
    /// admin, dj or staff
    #[arg(long, default_value = "staff")]
    role: String,
    #[arg(long)]
    display_name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    /// AzuraCast streamer id for DJ accounts
    #[arg(long)]
    streamer_id: Option<i64>,
}

#[derive(Args)]
struct BuildAnalyticsArgs {
    /// Days of history to cover; defaults to analytics.history_days
    #[arg(long)]
    days: Option<u32>,
    /// Output file; defaults to analytics.report_path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing().context("failed to initialise tracing")?;
    let config = load_config().context("failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(&config).await,
        Commands::Migrate => migrate(&config).await,
        Commands::CreateUser(args) => create_user(&config, args).await,
        Commands::BuildAnalytics(args) => build_analytics(&config, args).await,
    }
}

async fn run_server(config: &AppConfig) -> anyhow::Result<()> {
    info!("starting Backstage backend");

    let services = BackendServices::initialise(config)
        .await
        .context("failed to initialise backend services")?;

    let state = AppState::new(
        services.db_pool,
        services.authenticator,
        services.azuracast,
        services.assistant,
        services.report_path,
    );
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    initialize_database(&config.database)
        .await
        .context("failed to migrate database")?;
    println!("Database at {} is up to date", config.database.url);
    Ok(())
}

async fn create_user(config: &AppConfig, args: CreateUserArgs) -> anyhow::Result<()> {
    let role: UserRole = args
        .role
        .parse()
        .map_err(|error: String| anyhow::anyhow!(error))?;

    let password = match args.password {
        Some(password) => password,
        None => read_password().await?,
    };

    let pool = initialize_database(&config.database)
        .await
        .context("failed to open database")?;
    let authenticator = Authenticator::new(pool, config.auth.clone())
        .context("failed to set up authentication")?;

    let user = authenticator
        .register_user(RegisterUser {
            username: args.username,
            password,
            display_name: args.display_name,
            email: args.email,
            role,
            azuracast_streamer_id: args.streamer_id,
        })
        .await
        .context("failed to create user")?;

    info!(user = %user.public_id, role = %user.role, "user created");
    println!("Created {} '{}' ({})", user.role, user.username, user.public_id);
    Ok(())
}

async fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read password from stdin")?;

    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("no password given");
    }
    Ok(password)
}

async fn build_analytics(config: &AppConfig, args: BuildAnalyticsArgs) -> anyhow::Result<()> {
    let client =
        AzuraCastClient::new(&config.azuracast).context("failed to build AzuraCast client")?;
    if !client.is_configured() {
        bail!("azuracast.base_url must be set to build analytics");
    }

    let days = args.days.unwrap_or(config.analytics.history_days);
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(&config.analytics.report_path));

    let report = generate_report(&client, days, Utc::now())
        .await
        .context("failed to generate analytics report")?;
    write_report(&output, &report)
        .await
        .context("failed to write analytics report")?;

    println!(
        "Wrote {} plays over {} days to {}",
        report.totals.plays,
        days,
        output.display()
    );
    Ok(())
}
