//! Feedline - command line client for the feedline social backend
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use feedline::{ApiClient, Config, CredentialStore, EncryptedFileStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG=debug for verbose output)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match parse_args()? {
        Command::Login { username } => login(&username).await,
        Command::Logout => logout(),
        Command::Whoami => whoami().await,
        Command::Feed { limit } => feed(limit).await,
        Command::Notifications { limit } => notifications(limit).await,
        Command::Status => status(),
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            println!("feedline {}", feedline::VERSION);
            Ok(())
        }
    }
}

/// CLI commands
enum Command {
    Login { username: String },
    Logout,
    Whoami,
    Feed { limit: u32 },
    Notifications { limit: u32 },
    Status,
    Help,
    Version,
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    let Some(command) = args.get(1) else {
        return Ok(Command::Help);
    };

    let limit = |default: u32| {
        args.iter()
            .position(|a| a == "--limit" || a == "-l")
            .and_then(|i| args.get(i + 1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(default)
    };

    match command.as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-v" | "--version" | "version" => Ok(Command::Version),
        "login" => {
            let username = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing username\nUsage: feedline login <username>"))?
                .clone();
            Ok(Command::Login { username })
        }
        "logout" => Ok(Command::Logout),
        "whoami" | "me" => Ok(Command::Whoami),
        "feed" => Ok(Command::Feed { limit: limit(10) }),
        "notifications" | "notifs" => Ok(Command::Notifications { limit: limit(20) }),
        "status" => Ok(Command::Status),
        other => Err(anyhow::anyhow!(
            "Unknown command: {other}\nRun 'feedline --help' for usage"
        )),
    }
}

fn print_help() {
    let config_path = Config::default_path()
        .map_or_else(|_| "Unknown".to_string(), |p| p.display().to_string());

    println!(
        r#"feedline {}

USAGE:
    feedline [COMMAND]

COMMANDS:
    login <username>                   Log in (password is read from stdin)
    logout                             Forget the stored session
    whoami                             Show the logged in user
    feed [-l <n>]                      Show the home feed
    notifications [-l <n>]             Show notifications
    status                             Show backend and session status

OPTIONS:
    -h, --help                         Show this help message
    -v, --version                      Show version information

ENVIRONMENT:
    FEEDLINE_BASE_URL                  Override the backend URL
    RUST_LOG                           Log filter (e.g. feedline=debug)

CONFIG:
    {}
"#,
        feedline::VERSION,
        config_path
    );
}

fn open_client() -> Result<ApiClient> {
    let config = Config::load()?;
    let store = EncryptedFileStore::open()?;
    ApiClient::from_config(&config, Arc::new(store)).context("Failed to create API client")
}

/// Client with a restored session, or an error asking the user to log in
async fn authenticated_client() -> Result<ApiClient> {
    let client = open_client()?;
    if !client.restore_session().await {
        anyhow::bail!("Not logged in. Run: feedline login <username>");
    }
    Ok(client)
}

async fn login(username: &str) -> Result<()> {
    let client = open_client()?;

    println!("Password for {}:", username);
    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']);

    let user = client.login(username, password).await?;

    println!("✓ Logged in as @{}", user.username);
    if user.is_new_user {
        client.complete_onboarding().await?;
        println!("✓ Onboarding completed");
    }

    Ok(())
}

fn logout() -> Result<()> {
    let client = open_client()?;
    client.logout()?;
    println!("✓ Logged out");
    Ok(())
}

async fn whoami() -> Result<()> {
    let client = authenticated_client().await?;
    let user = client.me().await?;

    println!("{} (@{})", user.name(), user.username);
    if let Some(bio) = &user.bio {
        println!("{}", bio);
    }
    if let (Some(followers), Some(following), Some(posts)) =
        (user.follower_count, user.following_count, user.post_count)
    {
        println!(
            "{} posts · {} followers · {} following",
            posts, followers, following
        );
    }

    Ok(())
}

async fn feed(limit: u32) -> Result<()> {
    let client = authenticated_client().await?;
    let page = client.feed(None, limit).await?;

    if page.posts.is_empty() {
        println!("Your feed is empty.");
        return Ok(());
    }

    for post in page.posts {
        println!(
            "\n@{} · {}",
            post.author.username,
            post.created_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(caption) = &post.caption {
            println!("{}", caption);
        }
        println!(
            "♥ {}  💬 {}  🖼 {}",
            post.like_count,
            post.comment_count,
            post.media.len()
        );
    }

    if page.has_more {
        println!("\n(more posts available)");
    }

    Ok(())
}

async fn notifications(limit: u32) -> Result<()> {
    let client = authenticated_client().await?;
    let list = client.notifications(limit).await?;

    println!("{} unread\n", list.unread_count);

    for follow in &list.follows {
        let who = follow
            .actor
            .as_ref()
            .map_or_else(|| format!("user {}", follow.actor_id), |a| format!("@{}", a.username));
        let marker = if follow.is_read { " " } else { "•" };
        println!("{} {} started following you", marker, who);
    }

    for group in &list.aggregated {
        let marker = if group.is_read { " " } else { "•" };
        let what = match group.kind {
            feedline::models::NotificationKind::Like => "liked",
            _ => "commented on",
        };
        println!(
            "{} {} people {} your post {}",
            marker,
            group.total_count,
            what,
            group.post_id.map_or_else(String::new, |id| format!("#{id}"))
        );
    }

    Ok(())
}

fn status() -> Result<()> {
    let config = Config::load()?;
    let store = EncryptedFileStore::open()?;

    println!("Backend:      {}", config.base_url());
    println!("Environment:  {:?}", config.environment);
    println!("Timeout:      {}s", config.timeout_secs);
    println!("Renew before: {}s", config.refresh_margin_secs);
    println!("Credentials:  {}", store.path().display());

    let logged_in = store.refresh_token()?.is_some();
    println!(
        "Session:      {}",
        if logged_in { "stored" } else { "none" }
    );

    Ok(())
}
