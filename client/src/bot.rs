//! Scripted player used by the headless client binary

use crate::game::{ClientGameState, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::input::{Command, MovementInput};
use crate::network::NetworkClient;
use log::{debug, info};
use rand::Rng;
use shared::protocol::ProtocolError;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{interval, MissedTickBehavior};

/// Picks random movement, aim and shots.
pub struct Bot<R: Rng> {
    rng: R,
    input: MovementInput,
    ticks_left: u32,
    shoot_chance: f64,
}

impl<R: Rng> Bot<R> {
    pub fn new(rng: R, shoot_chance: f64) -> Self {
        Self {
            rng,
            input: MovementInput::default(),
            ticks_left: 0,
            shoot_chance: shoot_chance.clamp(0.0, 1.0),
        }
    }

    /// Commands for one tick. Movement changes every 20 to 60 ticks; the
    /// cursor moves every tick.
    pub fn next_commands(&mut self) -> Vec<Command> {
        let mut commands = Vec::new();

        if self.ticks_left == 0 {
            self.input = MovementInput {
                forward: self.rng.gen_bool(0.6),
                reverse: false,
                rotate_left: self.rng.gen_bool(0.3),
                rotate_right: self.rng.gen_bool(0.3),
                boost: self.rng.gen_bool(0.2),
            };
            self.ticks_left = self.rng.gen_range(20..60);
            commands.push(Command::Move(self.input));
        }
        self.ticks_left -= 1;

        let x = self.rng.gen_range(0.0..SCREEN_WIDTH);
        let y = self.rng.gen_range(0.0..SCREEN_HEIGHT);
        commands.push(Command::Aim { x, y });
        if self.rng.gen_bool(self.shoot_chance) {
            commands.push(Command::Shoot { x, y });
        }
        commands
    }
}

/// Drives a joined client for `ticks` frames: bot commands, a simulation
/// step, then one exchange with the server.
pub async fn play<S, R>(
    client: &mut NetworkClient<S>,
    state: &mut ClientGameState,
    bot: &mut Bot<R>,
    ticks: u32,
    tick_duration: Duration,
) -> Result<(), ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: Rng,
{
    let mut timer = interval(tick_duration);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    for tick in 0..ticks {
        timer.tick().await;

        for command in bot.next_commands() {
            if let Some(projectile) = state.apply_command(command) {
                client.send_projectile(&projectile).await?;
            }
        }

        state.tick();

        if state.should_share() {
            let delta = client.send_player(state.local_player()).await?;
            state.apply_delta(delta);
        }

        if tick % 60 == 0 {
            debug!("Tick {}: {}", tick, state.status_text());
        }
    }

    info!("Finished after {} ticks: {}", ticks, state.status_text());
    Ok(())
}
