//! devlink command line client.
//!
//! Sends one-off messages to an inspection server, or stays connected and
//! prints what the server sends.

use mimalloc::MiMalloc;

/// Global allocator configured per M-MIMALLOC-APPS guideline.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use devlink::{
    create_client, ArgType, Clearing, Client, ClientOptions, Config, CustomCommand, DisplayConfig,
    Logging, WebSocketTransport,
};

/// How long to wait for the socket to flush and close on exit.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "devlink")]
#[command(version)]
#[command(about = "Send diagnostics to a devlink inspection server")]
struct Cli {
    /// Server host (overrides config and DEVLINK_HOST)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Server port (overrides config and DEVLINK_PORT)
    #[arg(long, global = true)]
    port: Option<u32>,

    /// Client name shown by the server
    #[arg(long, global = true)]
    name: Option<String>,

    /// Use wss://
    #[arg(long, global = true)]
    secure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a log line
    Log {
        /// Message text
        message: String,
        /// Highlight the entry
        #[arg(long)]
        important: bool,
    },
    /// Display a named value
    Display {
        /// Heading
        #[arg(long)]
        name: String,
        /// Value; parsed as JSON when possible, otherwise sent as a string
        #[arg(long)]
        value: String,
        /// One-line summary
        #[arg(long)]
        preview: Option<String>,
    },
    /// Clear the server timeline
    Clear,
    /// Stay connected, print inbound commands and answer `ping`
    Listen,
    /// Print the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(long)]
        save: bool,
    },
}

fn init_logging() -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Ok(path) = std::env::var("DEVLINK_LOG_FILE") {
        let log_file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create log file at {path}"))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }
    builder.format_timestamp_secs().init();
    Ok(())
}

fn effective_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(host) = &cli.host {
        config.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(name) = &cli.name {
        config.name = Some(name.clone());
    }
    if cli.secure {
        config.secure = true;
    }
    Ok(config)
}

/// Build and connect a client, waiting until the server accepts it.
async fn connect(config: &Config, transport: &mut WebSocketTransport) -> Result<Client> {
    let mut options = ClientOptions::default().with_on_command(|command| {
        log::debug!("[CLI] <- {}", command.kind);
    });
    config.apply(&mut options);
    options.create_socket = Some(transport.socket_factory());

    let mut client = create_client(options).context("Invalid client options")?;
    client.connect().context("Failed to open socket")?;
    if !transport.run_until_ready(&mut client).await {
        bail!(
            "Could not connect to {}:{}",
            config.host,
            config.port
        );
    }
    Ok(client)
}

/// Close and give the socket task time to write what is already queued.
async fn finish(mut client: Client, transport: &mut WebSocketTransport) {
    client.close();
    if !transport.wait_for_close(CLOSE_GRACE).await {
        log::warn!("[CLI] Socket did not close within {}s", CLOSE_GRACE.as_secs());
    }
}

async fn listen(config: &Config) -> Result<()> {
    let mut transport = WebSocketTransport::new();
    let mut options = ClientOptions::default().with_on_command(|command| {
        println!("{} {}", command.kind, command.payload);
    });
    config.apply(&mut options);
    options.create_socket = Some(transport.socket_factory());

    let mut client = create_client(options).context("Invalid client options")?;
    client.on_custom_command(
        CustomCommand::new("ping", |client: &mut Client, args| {
            let note = args
                .as_ref()
                .and_then(|args| args.get_str("note").map(str::to_string));
            let message = note.map_or_else(|| "pong".to_string(), |note| format!("pong: {note}"));
            if let Err(e) = client.log(message) {
                log::warn!("[CLI] {}", e);
            }
        })
        .title("Ping")
        .description("Reply with a log line")
        .arg("note", ArgType::String),
    )?;
    client.connect().context("Failed to open socket")?;

    let interrupted = tokio::select! {
        () = transport.run_until_closed(&mut client) => false,
        _ = tokio::signal::ctrl_c() => true,
    };

    if interrupted {
        log::info!("[CLI] Interrupted");
        finish(client, &mut transport).await;
    } else {
        log::info!("[CLI] Server closed the connection");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let cli = Cli::parse();
    let config = effective_config(&cli)?;

    match &cli.command {
        Commands::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if *save {
                let path = config.save().context("Failed to save configuration")?;
                eprintln!("Saved to {}", path.display());
            }
        }
        Commands::Listen => listen(&config).await?,
        Commands::Log { message, important } => {
            let mut transport = WebSocketTransport::new();
            let mut client = connect(&config, &mut transport).await?;
            if *important {
                client.log_important(message.as_str())?;
            } else {
                client.log(message.as_str())?;
            }
            finish(client, &mut transport).await;
        }
        Commands::Display {
            name,
            value,
            preview,
        } => {
            let mut transport = WebSocketTransport::new();
            let mut client = connect(&config, &mut transport).await?;
            let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.clone()));
            let mut display = DisplayConfig::new(name.as_str()).value(value);
            if let Some(preview) = preview {
                display = display.preview(preview.as_str());
            }
            client.display(display);
            finish(client, &mut transport).await;
        }
        Commands::Clear => {
            let mut transport = WebSocketTransport::new();
            let mut client = connect(&config, &mut transport).await?;
            client.clear()?;
            finish(client, &mut transport).await;
        }
    }

    Ok(())
}
