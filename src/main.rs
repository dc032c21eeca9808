use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use user_profiles::{
    config::Config,
    database::Database,
    icons::{FallbackSource, FsIconStore, IconFetch, IconHashResolver},
    models::{NewUser, NewUserTheme},
    services::ProfileService,
};

#[derive(Parser)]
#[command(name = "user-profiles")]
#[command(version)]
#[command(about = "User profiles with a read-through cache and content-addressed icons")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Icon storage directory (overrides config file)
    #[arg(long, value_name = "DIR")]
    icon_path: Option<PathBuf>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a new user
    Register {
        name: String,
        #[arg(long, default_value = "")]
        display_name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        dark_mode: bool,
    },
    /// Print the profile of a user by id
    Show { id: i64 },
    /// Print the profiles of several users, in the given order
    ShowMany { ids: Vec<i64> },
    /// Print the profile of a user by name
    User { name: String },
    /// Replace a user's icon with the contents of a file
    SetIcon { name: String, file: PathBuf },
    /// Fetch a user's icon, honouring an entity tag
    Icon {
        name: String,
        #[arg(long, value_name = "ETAG")]
        if_none_match: Option<String>,
        /// Write the icon bytes to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete every stored icon
    ResetIcons,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("user_profiles={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    // Override config with CLI arguments
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }
    if let Some(icon_path) = cli.icon_path {
        config.storage.icon_path = icon_path;
    }

    info!("Using database: {}", config.database.url);
    let database = Database::new(&config.database).await?;
    database.migrate().await?;

    let icons = Arc::new(IconHashResolver::new(
        FsIconStore::new(config.storage.icon_path.clone()),
        FallbackSource::Path(config.storage.fallback_icon_path.clone()),
    ));
    let service = ProfileService::new(database, icons);

    match cli.command {
        Command::Register {
            name,
            display_name,
            description,
            dark_mode,
        } => {
            let profile = service
                .register(NewUser {
                    name,
                    display_name,
                    description,
                    theme: NewUserTheme { dark_mode },
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Command::Show { id } => {
            let profile = service.get_profile(id).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Command::ShowMany { ids } => {
            let profiles = service.get_profiles(&ids).await?;
            println!("{}", serde_json::to_string_pretty(&profiles)?);
        }
        Command::User { name } => {
            let profile = service.get_profile_by_name(&name).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Command::SetIcon { name, file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let hash = service.replace_icon(&name, Bytes::from(bytes)).await?;
            println!("{}", hash);
        }
        Command::Icon {
            name,
            if_none_match,
            output,
        } => match service.fetch_icon(&name, if_none_match.as_deref()).await? {
            IconFetch::NotModified { hash } => println!("not modified {}", hash.etag()),
            IconFetch::Icon { bytes, hash } => {
                if let Some(output) = output {
                    tokio::fs::write(&output, &bytes)
                        .await
                        .with_context(|| format!("failed to write {}", output.display()))?;
                }
                println!("{} ({} bytes)", hash.etag(), bytes.len());
            }
        },
        Command::ResetIcons => {
            let removed = service.reset_icons().await?;
            println!("removed {} icon directories", removed);
        }
    }

    Ok(())
}
