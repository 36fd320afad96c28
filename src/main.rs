#[cfg(not(feature = "std"))]
fn main() {}

#[cfg(feature = "std")]
use gomoku::{
    config::{
        DEFAULT_BIND, DEFAULT_IDLE_TIMEOUT, DEFAULT_MATCH_INTERVAL, DEFAULT_STANDING_ROOMS,
        DEFAULT_SWEEP_INTERVAL, DEFAULT_DISCONNECT_TIMEOUT,
    },
    init_logging, GameServer, ServerConfig, TcpTransport, Transport,
};

#[cfg(feature = "std")]
use clap::Parser;
#[cfg(feature = "std")]
use tokio::io::{AsyncBufReadExt, BufReader};
#[cfg(feature = "std")]
use tokio::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[cfg(feature = "std")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
#[cfg(feature = "std")]
enum Commands {
    /// Run the gomoku server.
    Serve {
        #[arg(long, default_value = DEFAULT_BIND)]
        bind: String,
        #[arg(long, default_value_t = DEFAULT_STANDING_ROOMS, help = "Rooms kept open while empty")]
        rooms: usize,
        #[arg(long, default_value_t = DEFAULT_MATCH_INTERVAL.as_millis() as u64)]
        match_interval_ms: u64,
        #[arg(long, default_value_t = DEFAULT_SWEEP_INTERVAL.as_millis() as u64)]
        sweep_interval_ms: u64,
        #[arg(
            long,
            default_value_t = DEFAULT_DISCONNECT_TIMEOUT.as_secs(),
            help = "Seconds a dropped player may take to reconnect before forfeiting"
        )]
        disconnect_timeout_secs: u64,
        #[arg(long, default_value_t = DEFAULT_IDLE_TIMEOUT.as_secs())]
        idle_timeout_secs: u64,
    },
    /// Connect to a server and play from this terminal.
    Connect {
        #[arg(long, default_value = "127.0.0.1:8888")]
        server: String,
    },
}

#[cfg(feature = "std")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            rooms,
            match_interval_ms,
            sweep_interval_ms,
            disconnect_timeout_secs,
            idle_timeout_secs,
        } => {
            let config = ServerConfig {
                bind,
                standing_rooms: rooms,
                match_interval: Duration::from_millis(match_interval_ms.max(1)),
                sweep_interval: Duration::from_millis(sweep_interval_ms.max(1)),
                disconnect_timeout: Duration::from_secs(disconnect_timeout_secs),
                idle_timeout: Duration::from_secs(idle_timeout_secs.max(1)),
            };
            log::info!(
                "starting server on {} with {} rooms, reconnect window {:?}",
                config.bind,
                config.standing_rooms,
                config.disconnect_timeout
            );
            GameServer::new(config).serve().await?;
        }
        Commands::Connect { server } => {
            println!("Connecting to {}...", server);
            let transport = TcpTransport::connect(&server).await?;
            run_client(transport).await?;
        }
    }
    Ok(())
}

/// Relay stdin lines to the server and print whatever comes back.
#[cfg(feature = "std")]
async fn run_client(mut transport: TcpTransport) -> anyhow::Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            incoming = transport.recv() => match incoming {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    println!("Disconnected: {}", e);
                    break;
                }
            },
            line = stdin.next_line() => match line? {
                Some(line) => transport.send(&line).await?,
                None => break,
            },
        }
    }
    Ok(())
}
