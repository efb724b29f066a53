use clap::Parser;
use client::bot::{self, Bot};
use client::game::ClientGameState;
use client::network::NetworkClient;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:5555")]
    server: String,

    /// Join or create the private room with this name
    #[arg(short, long)]
    room: Option<String>,

    /// Player limit for a newly created session
    #[arg(short, long, default_value_t = shared::MAX_PLAYERS)]
    max_players: u8,

    /// Number of frames to play before disconnecting
    #[arg(short, long, default_value = "600")]
    ticks: u32,

    /// Frame length in milliseconds
    #[arg(long, default_value = "16")]
    tick_ms: u64,

    /// Chance to fire on any given frame
    #[arg(long, default_value = "0.02")]
    shoot_chance: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting bot client...");
    if let Some(room) = &args.room {
        info!("Requesting private room '{}'", room);
    }

    let (mut client, player) =
        NetworkClient::connect(&args.server, args.room.as_deref(), args.max_players).await?;
    let mut state = ClientGameState::new(player);
    let mut bot = Bot::new(StdRng::from_entropy(), args.shoot_chance);

    let played = bot::play(
        &mut client,
        &mut state,
        &mut bot,
        args.ticks,
        Duration::from_millis(args.tick_ms),
    )
    .await;
    if let Err(e) = played {
        warn!("Lost connection to server: {}", e);
        return Err(e.into());
    }

    info!("Disconnecting from server...");
    client.disconnect(state.local_player_mut()).await?;

    Ok(())
}
