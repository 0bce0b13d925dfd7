mod error;
mod repl;
mod session;
mod transport;

use clap::{Parser, Subcommand};
use frames::RoomCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::error::ClientError;
use crate::repl::Command as LineCommand;
use crate::session::ClientSession;

#[derive(Parser, Debug)]
#[command(name = "whiteboard-cli", about = "Terminal client for the collaborative whiteboard")]
struct Cli {
    #[arg(long, env = "COLLAB_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "COLLAB_USER_ID")]
    user_id: Option<String>,

    #[arg(long, env = "COLLAB_USER_NAME")]
    name: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the server answers `/healthz`.
    Ping,
    /// Create a room (random code unless given) and draw in it.
    Create { code: Option<String> },
    /// Join an existing room and draw in it.
    Join { code: String },
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Ping => run_ping(&cli.base_url).await,
        Command::Create { ref code } => {
            let room = match code {
                Some(raw) => RoomCode::parse(raw)?,
                None => RoomCode::generate(),
            };
            run_room(&cli, room, true).await
        }
        Command::Join { ref code } => run_room(&cli, RoomCode::parse(code)?, false).await,
    }
}

async fn run_ping(base_url: &str) -> Result<(), ClientError> {
    let url = format!("{}/healthz", base_url.trim_end_matches('/'));
    let status = reqwest::Client::new().get(url).send().await?.status();
    if !status.is_success() {
        return Err(ClientError::Unhealthy(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

async fn run_room(cli: &Cli, room: RoomCode, create: bool) -> Result<(), ClientError> {
    let user_id = cli.user_id.clone().unwrap_or_else(|| format!("guest-{}", RoomCode::generate()));
    let url = transport::ws_url(&cli.base_url, &user_id, cli.name.as_deref())?;

    println!("room {room} as {user_id}; type `help` for commands");
    let (tx, mut rx) = mpsc::channel::<LineCommand>(64);
    tokio::spawn(read_stdin(tx));

    let mut session = ClientSession::new(room, create);
    transport::run(&url, &mut session, &mut rx, |line| println!("{line}")).await;
    Ok(())
}

/// Parse stdin lines into commands until EOF, `leave` or `quit`.
async fn read_stdin(tx: mpsc::Sender<LineCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
        };
        match repl::parse_line(&line) {
            Ok(Some(command)) => {
                let done = command.ends_session();
                if tx.send(command).await.is_err() || done {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => println!("{e}"),
        }
    }
    if tx.send(LineCommand::Quit).await.is_err() {
        tracing::debug!("session already closed");
    }
}
