mod script;

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use canvas::engine::{Action, EngineCore};
use clap::{Args, Parser, Subcommand};
use frames::{ClientEvent, Rgb, ServerEvent, User};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket error: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("event decode failed: {0}")]
    Decode(#[from] frames::CodecError),
    #[error("timed out waiting for server event")]
    Timeout,
    #[error("server error {code}: {message}")]
    Server { code: String, message: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("{0}")]
    Script(#[from] script::ScriptError),
    #[error("cannot read {path}: {source}")]
    Input { path: String, source: io::Error },
}

impl From<tokio_tungstenite::tungstenite::Error> for CliError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Ws(Box::new(error))
    }
}

#[derive(Parser, Debug)]
#[command(name = "sketch-cli", about = "Terminal client for the sketchroom relay")]
struct Cli {
    #[arg(long, env = "SKETCH_BASE_URL", default_value = "http://127.0.0.1:3001")]
    base_url: String,

    /// Stable user id; a random one is generated when omitted.
    #[arg(long, env = "SKETCH_USER_ID")]
    user_id: Option<String>,

    #[arg(long, env = "SKETCH_USER_NAME", default_value = "cli")]
    user_name: String,

    #[arg(long, env = "SKETCH_USER_COLOR", default_value = "#ffffff")]
    user_color: Rgb,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check `/healthz`.
    Ping,
    /// List live rooms.
    Rooms,
    /// Show one room's members and shapes.
    Room { room_id: String },
    /// Join a room and print every event as a JSON line until the socket closes.
    Watch(RoomArgs),
    /// Replay a JSONL stroke script into a room.
    Draw(DrawArgs),
    /// Clear a room's canvas for every member.
    Clear(RoomArgs),
}

#[derive(Args, Debug)]
struct RoomArgs {
    #[arg(long)]
    room: String,

    /// Create the room instead of joining an existing one.
    #[arg(long, default_value_t = false)]
    create: bool,
}

#[derive(Args, Debug)]
struct DrawArgs {
    #[command(flatten)]
    room: RoomArgs,

    #[arg(long, default_value = "-", help = "Script path, or - for stdin")]
    input: String,

    /// Keep the connection open this long after the last stroke.
    #[arg(long, default_value_t = 250)]
    linger_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let user = User {
        id: cli.user_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string()),
        display_name: cli.user_name.clone(),
        color: cli.user_color,
    };

    match cli.command {
        Command::Ping => run_ping(&cli.base_url).await,
        Command::Rooms => print_json(&http_get(&cli.base_url, "/api/rooms").await?),
        Command::Room { ref room_id } => print_json(&http_get(&cli.base_url, &format!("/api/rooms/{room_id}")).await?),
        Command::Watch(ref args) => run_watch(&cli.base_url, user, args).await,
        Command::Draw(ref args) => run_draw(&cli.base_url, user, args).await,
        Command::Clear(ref args) => run_clear(&cli.base_url, user, args).await,
    }
}

// =============================================================================
// HTTP
// =============================================================================

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let url = format!("{}/healthz", base_url.trim_end_matches('/'));
    let status = reqwest::get(url).await?.status();
    if !status.is_success() {
        return Err(CliError::Server { code: format!("HTTP {}", status.as_u16()), message: "health check failed".into() });
    }
    println!("ok");
    Ok(())
}

async fn http_get(base_url: &str, path: &str) -> Result<Value, CliError> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), path);
    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Server { code: format!("HTTP {}", status.as_u16()), message: path.to_owned() });
    }
    Ok(response.json::<Value>().await?)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// WEBSOCKET COMMANDS
// =============================================================================

async fn run_watch(base_url: &str, user: User, args: &RoomArgs) -> Result<(), CliError> {
    let (mut stream, mut engine) = open_room(base_url, user, args).await?;

    while let Some(event) = next_event(&mut stream).await? {
        println!("{}", frames::encode(&event)?);
        engine.apply_server_event(event);
        eprintln!("room {}: {} shapes", args.room, engine.shapes().len());
    }
    Ok(())
}

async fn run_draw(base_url: &str, user: User, args: &DrawArgs) -> Result<(), CliError> {
    let reader: Box<dyn BufRead> = if args.input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(&args.input).map_err(|source| CliError::Input { path: args.input.clone(), source })?;
        Box::new(BufReader::new(file))
    };

    let (mut stream, mut engine) = open_room(base_url, user, &args.room).await?;

    let mut strokes = 0_usize;
    let mut sent = 0_usize;
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| CliError::Input { path: args.input.clone(), source })?;
        let Some(stroke) = script::parse_line(&line, index + 1)? else {
            continue;
        };
        sent += send_actions(&mut stream, script::play(&mut engine, &stroke)).await?;
        strokes += 1;
    }

    tokio::time::sleep(Duration::from_millis(args.linger_ms)).await;
    stream.close(None).await?;
    eprintln!("draw complete: room={} strokes={strokes} events={sent} shapes={}", args.room.room, engine.shapes().len());
    Ok(())
}

async fn run_clear(base_url: &str, user: User, args: &RoomArgs) -> Result<(), CliError> {
    let (mut stream, mut engine) = open_room(base_url, user, args).await?;
    send_actions(&mut stream, engine.clear()).await?;
    stream.close(None).await?;
    eprintln!("cleared room {}", args.room);
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

/// Connect, create or join, and wait until the room snapshot has been applied.
async fn open_room(base_url: &str, user: User, args: &RoomArgs) -> Result<(WsStream, EngineCore), CliError> {
    let (mut stream, _) = connect_async(ws_url(base_url)?).await?;
    let mut engine = EngineCore::new(user);

    let request = if args.create { engine.create_room(args.room.as_str()) } else { engine.join_room(args.room.as_str()) };
    send_actions(&mut stream, request).await?;

    // createRoom on a fresh room gets no snapshot; joins always do.
    let mut need_snapshot = !args.create;
    loop {
        let event = recv_event(&mut stream, Duration::from_secs(5)).await?;
        match &event {
            ServerEvent::Error { code, message } => {
                return Err(CliError::Server { code: code.clone(), message: message.clone() });
            }
            ServerEvent::RoomJoined { users, .. } => {
                eprintln!("joined room {} ({} members)", args.room, users.len());
            }
            ServerEvent::InitialShapes(shapes) => {
                eprintln!("snapshot: {} shapes", shapes.len());
                need_snapshot = false;
            }
            _ => {}
        }
        engine.apply_server_event(event);
        if !need_snapshot && engine.session().is_some_and(|s| s.joined) {
            return Ok((stream, engine));
        }
    }
}

async fn send_actions(stream: &mut WsStream, actions: Vec<Action>) -> Result<usize, CliError> {
    let mut sent = 0;
    for action in actions {
        if let Action::Send(event) = action {
            send_event(stream, &event).await?;
            sent += 1;
        }
    }
    Ok(sent)
}

async fn send_event(stream: &mut WsStream, event: &ClientEvent) -> Result<(), CliError> {
    let text = frames::encode(event)?;
    stream.send(Message::Text(text.into())).await?;
    Ok(())
}

/// Next server event, or `None` once the socket closes.
async fn next_event(stream: &mut WsStream) -> Result<Option<ServerEvent>, CliError> {
    loop {
        let Some(message) = stream.next().await else {
            return Ok(None);
        };
        match message? {
            Message::Text(text) => return Ok(Some(frames::decode(text.as_str())?)),
            Message::Close(_) => return Ok(None),
            _ => {}
        }
    }
}

async fn recv_event(stream: &mut WsStream, timeout: Duration) -> Result<ServerEvent, CliError> {
    tokio::time::timeout(timeout, next_event(stream))
        .await
        .map_err(|_| CliError::Timeout)??
        .ok_or(CliError::WsClosed)
}

fn ws_url(base_url: &str) -> Result<String, CliError> {
    let base = base_url.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("http://") {
        return Ok(format!("ws://{rest}/ws"));
    }
    if let Some(rest) = base.strip_prefix("https://") {
        return Ok(format!("wss://{rest}/ws"));
    }
    Err(CliError::InvalidBaseUrl(base_url.to_owned()))
}
