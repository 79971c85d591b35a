//! Tâb Server
//!
//! `tab-server [serve]` runs the match server, configured from `TAB_*`
//! environment variables. `tab-server selfplay [size] [tierA] [tierB] [seed]`
//! plays two AI tiers against each other locally and logs the result.

use std::sync::atomic::AtomicBool;

use anyhow::{bail, Context};
use chrono::Utc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use tab::{
    ai::Difficulty,
    game::{
        board::Side,
        state::{FirstPlayer, MatchState, TurnPhase},
    },
    network::{GameServer, ServerConfig},
    DeterministicRng, VERSION,
};

/// Hard stop for a self-play game that refuses to end.
const SELFPLAY_MAX_ACTIONS: usize = 20_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Tab Server v{}", VERSION);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("serve") => serve().await,
        Some("selfplay") => selfplay(&args[1..]),
        Some(other) => bail!("unknown command '{}', expected 'serve' or 'selfplay'", other),
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("reading configuration")?;
    info!(
        data = %config.data_path.display(),
        idle_timeout_secs = config.idle_timeout.as_secs(),
        "configuration loaded"
    );

    let server = GameServer::new(config).context("restoring snapshot")?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for Ctrl-C: {}", e);
            return;
        }
        info!("Ctrl-C received, shutting down");
        let _ = shutdown.send(());
    });

    server.run().await?;
    info!("Server stopped");
    Ok(())
}

/// Demo: two AI tiers play one match.
fn selfplay(args: &[String]) -> anyhow::Result<()> {
    let size: usize = match args.first() {
        Some(s) => s.parse().with_context(|| format!("invalid size '{}'", s))?,
        None => 9,
    };
    let tier = |i: usize, default: Difficulty| -> anyhow::Result<Difficulty> {
        match args.get(i) {
            Some(s) => Difficulty::parse(s).with_context(|| format!("invalid tier '{}'", s)),
            None => Ok(default),
        }
    };
    let blue_tier = tier(1, Difficulty::Hard)?;
    let red_tier = tier(2, Difficulty::Easy)?;
    let seed: u64 = match args.get(3) {
        Some(s) => s.parse().with_context(|| format!("invalid seed '{}'", s))?,
        None => uuid::Uuid::new_v4().as_u64_pair().0,
    };

    info!("=== Self-play: {} (blue) vs {} (red), size {}, seed {} ===", blue_tier, red_tier, size, seed);

    let blue = format!("blue:{}", blue_tier);
    let red = format!("red:{}", red_tier);
    let now = Utc::now();

    let mut state = MatchState::new("selfplay", 0, size, blue.as_str(), FirstPlayer::Blue, now, DeterministicRng::new(seed))?;
    state.attach_opponent(red.as_str(), now)?;

    let mut ai_rng = DeterministicRng::new(seed.rotate_left(32));
    let never = AtomicBool::new(false);
    let blue_strategy = blue_tier.strategy();
    let red_strategy = red_tier.strategy();
    let mut moves = 0usize;

    for _ in 0..SELFPLAY_MAX_ACTIONS {
        if state.is_finished() {
            break;
        }
        let Some(nick) = state.turn.clone() else {
            break;
        };
        let Some(side) = state.side_of(&nick) else {
            break;
        };

        match state.phase {
            TurnPhase::AwaitingRoll => {
                state.roll(&nick, now)?;
            }
            TurnPhase::AwaitingPass => {
                debug!(player = %nick, "no legal move, passing");
                state.pass(&nick, now)?;
            }
            TurnPhase::AwaitingOrigin | TurnPhase::AwaitingDestination => {
                let steps = state.dice.map(|d| d.value).unwrap_or_default();
                let strategy = if side == Side::Blue { &blue_strategy } else { &red_strategy };
                let Some(mv) = strategy.pick(&state.board, side, steps, &mut ai_rng, &never) else {
                    bail!("{} found no move with a legal throw of {}", nick, steps);
                };
                let events = state.play_move(&nick, mv, now)?;
                moves += 1;
                for event in events {
                    debug!(event = event.kind(), "{}", mv);
                }
            }
            TurnPhase::Finished => break,
        }
    }

    info!("=== Match Results ===");
    info!("Moves played: {}", moves);
    info!("Pieces left: blue {}, red {}", state.board.count(Side::Blue), state.board.count(Side::Red));
    match &state.winner {
        Some(winner) => info!("Winner: {}", winner),
        None => warn!("No winner after {} actions", SELFPLAY_MAX_ACTIONS),
    }
    info!("Final State Hash: {}", hex::encode(state.state_hash()));
    Ok(())
}
