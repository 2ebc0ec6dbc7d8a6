//! Input sources for the fixed-rate send loop.
//!
//! There is no real input device in this subsystem, so the direction comes
//! from a pluggable source. The default simulated source wanders randomly,
//! holding each direction for a few seconds before picking a new one.

use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use shared::Direction;
use std::time::{Duration, Instant};

const DIRECTIONS: [Direction; 5] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
    Direction::None,
];

/// Where the client's current movement intent comes from. Polled once per
/// input-send tick.
pub trait InputSource: Send {
    fn direction(&mut self) -> Direction;
}

/// Random walk: holds a direction for a fixed period, then picks a new one.
pub struct SimulatedInput {
    current: Direction,
    last_change: Instant,
    hold_for: Duration,
    rng: StdRng,
}

impl SimulatedInput {
    pub fn new() -> Self {
        Self::with_hold(Duration::from_secs(10))
    }

    pub fn with_hold(hold_for: Duration) -> Self {
        let mut rng = StdRng::from_entropy();
        let current = *DIRECTIONS.choose(&mut rng).unwrap_or(&Direction::None);
        Self {
            current,
            last_change: Instant::now(),
            hold_for,
            rng,
        }
    }
}

impl Default for SimulatedInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for SimulatedInput {
    fn direction(&mut self) -> Direction {
        if self.last_change.elapsed() >= self.hold_for {
            self.current = *DIRECTIONS.choose(&mut self.rng).unwrap_or(&Direction::None);
            self.last_change = Instant::now();
            info!("simulated input switched to {}", self.current.as_str());
        }
        self.current
    }
}

/// Constant intent, mainly for tests and scripted sessions.
pub struct FixedInput(pub Direction);

impl InputSource for FixedInput {
    fn direction(&mut self) -> Direction {
        self.0
    }
}
