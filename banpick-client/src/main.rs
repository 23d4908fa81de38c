// Ban/pick client entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not the interactive terminal)
// 2. Load config
// 3. Create a room, or take an existing room code from argv
// 4. Join the lobby over REST and fetch the initial member list
// 5. Open the realtime session
// 6. Spawn the stdin command reader
// 7. Run the event loop until quit
//
// Usage: `banpick [room-code]`. With no argument a new room is created
// with the configured default settings.

use banpick_client::api::ApiClient;
use banpick_client::app::{self, AppState, UserCommand};
use banpick_client::config;
use banpick_client::realtime::{SessionClient, SessionConfig};

use anyhow::Context;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (file-backed; stdout belongs to the prompt)
    init_tracing()?;
    info!("ban/pick client starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "config loaded: server={}, nickname={}",
        config.server.base_url, config.profile.nickname
    );

    let api = ApiClient::new(&config.server.base_url);

    // 3. Resolve the room: join an existing code or create a fresh room
    let game_code = match std::env::args().nth(1) {
        Some(code) => code,
        None => {
            let code = api
                .create_room(&config.room.to_settings())
                .await
                .context("failed to create a room")?;
            info!(%code, "room created");
            code
        }
    };
    println!("room code: {game_code}");

    // 4. Join the lobby and seed the member list
    let user_id = api
        .join(&game_code, &config.profile.nickname)
        .await
        .context("failed to join the lobby")?;
    info!(%user_id, "joined lobby");

    let mut state = AppState::new(
        game_code.clone(),
        user_id.clone(),
        config.profile.language.clone(),
    );
    match api.status(&game_code).await {
        Ok(status) => state.lobby.replace_users(status.users),
        Err(e) => warn!(error = %e, "initial status fetch failed; waiting for broadcasts"),
    }

    // 5. Open the realtime session (failures here are retried by the
    // watchdog inside the event loop)
    let mut session_config = SessionConfig::new(&config.server.ws_base_url, &game_code);
    session_config.user_id = Some(user_id);
    session_config.connect_timeout = config.session.connect_timeout();
    session_config.retry = config.session.retry_policy();
    let mut session = SessionClient::with_tungstenite(session_config);
    if let Err(e) = session.connect().await {
        warn!(error = %e, "initial realtime connect failed; will keep retrying");
    }

    // 6. Spawn the stdin command reader
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let reader = tokio::spawn(read_commands(cmd_tx));

    println!("commands: team blue|red <seat> | spectate | ready | start | select <champion> | submit | quit");

    // 7. Run the event loop until quit
    app::run(
        session,
        api,
        cmd_rx,
        state,
        config.session.watchdog_interval(),
    )
    .await?;

    reader.abort();
    info!("shut down cleanly");
    Ok(())
}

/// Read stdin lines, parse them, and forward commands to the event loop.
async fn read_commands(tx: mpsc::Sender<UserCommand>) {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some(cmd) = app::parse_command(&line) else {
                    if !line.trim().is_empty() {
                        println!("unrecognized command: {line}");
                    }
                    continue;
                };
                let quit = cmd == UserCommand::Quit;
                if tx.send(cmd).await.is_err() || quit {
                    break;
                }
            }
            Ok(None) | Err(_) => break,
        }
    }
}

/// Initialize tracing to log to a file (the terminal is used for the
/// interactive prompt).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("banpick.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("banpick_client=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
