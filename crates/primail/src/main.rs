//! `Primail` - command-line front end for the Primail webmail store.
//!
//! Every command that needs a signed-in user logs in first, runs, and logs
//! out again; sessions never outlive the process.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use primail_core::{Config, Message, MessageId, SessionToken, Webmail};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "primail")]
#[command(about = "Local webmail store for a single organisation", long_about = None)]
struct Cli {
    /// Settings file (JSON)
    #[arg(short, long, env = "PRIMAIL_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the users and messages snapshots
    #[arg(short, long, env = "PRIMAIL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Login {
    /// Account email address
    #[arg(short, long)]
    email: String,

    /// Account password
    #[arg(short, long, env = "PRIMAIL_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account
    Register {
        #[command(flatten)]
        login: Login,
    },

    /// Send a message to another account
    Send {
        #[command(flatten)]
        login: Login,

        /// Recipient email address
        #[arg(long)]
        to: String,

        /// Subject line
        #[arg(long, default_value = "")]
        subject: String,

        /// Message body
        #[arg(long, default_value = "")]
        body: String,
    },

    /// List received messages, newest first
    Inbox {
        #[command(flatten)]
        login: Login,

        /// Only show subjects containing this text
        #[arg(short, long, default_value = "")]
        search: String,
    },

    /// List sent messages, newest first
    Sent {
        #[command(flatten)]
        login: Login,

        /// Only show subjects containing this text
        #[arg(short, long, default_value = "")]
        search: String,
    },

    /// Show a message, marking it read if you are the recipient
    Read {
        #[command(flatten)]
        login: Login,

        /// Message ID
        id: MessageId,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir.clone_from(dir);
    }
    Ok(config)
}

fn print_list(messages: &[Message], counterpart: fn(&Message) -> &str) {
    if messages.is_empty() {
        println!("No messages.");
        return;
    }
    for message in messages {
        let marker = if message.read { ' ' } else { '*' };
        println!(
            "{marker} {}  {}  {:<30}  {}",
            message.id,
            message.sent_at.format("%Y-%m-%d %H:%M"),
            counterpart(message),
            message.subject
        );
    }
}

async fn with_session<T, F, Fut>(mail: &Webmail, login: &Login, run: F) -> Result<T>
where
    F: FnOnce(SessionToken) -> Fut,
    Fut: Future<Output = primail_core::Result<T>>,
{
    let token = mail.login(&login.email, &login.password).await?;
    let result = run(token.clone()).await;
    mail.logout(&token).await;
    Ok(result?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "primail=info,primail_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let mail = Webmail::open(&config)
        .await
        .context("Failed to open mail store")?;

    match cli.command {
        Commands::Register { login } => {
            let id = mail.register(&login.email, &login.password).await?;
            info!("Registered {} as {id}", login.email);
            println!("Registered {}", login.email);
        }
        Commands::Send {
            login,
            to,
            subject,
            body,
        } => {
            let id = with_session(&mail, &login, |token| {
                let mail = &mail;
                async move { mail.send(&token, &to, &subject, &body).await }
            })
            .await?;
            println!("Sent {id}");
        }
        Commands::Inbox { login, search } => {
            let messages = with_session(&mail, &login, |token| {
                let mail = &mail;
                async move { mail.inbox(&token, &search).await }
            })
            .await?;
            print_list(&messages, |message| message.from.as_str());
        }
        Commands::Sent { login, search } => {
            let messages = with_session(&mail, &login, |token| {
                let mail = &mail;
                async move { mail.sent(&token, &search).await }
            })
            .await?;
            print_list(&messages, |message| message.to.as_str());
        }
        Commands::Read { login, id } => {
            let message = with_session(&mail, &login, |token| {
                let mail = &mail;
                async move { mail.read_message(&token, id).await }
            })
            .await?;
            println!("From:    {}", message.from);
            println!("To:      {}", message.to);
            println!("Date:    {}", message.sent_at.to_rfc2822());
            println!("Subject: {}", message.subject);
            println!();
            println!("{}", message.body);
        }
    }

    Ok(())
}
