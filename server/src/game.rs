//! Authoritative world state: the player map and the per-tick integration.

use log::debug;
use shared::{round2, Direction, PlayerView, PLAYER_SPEED};
use std::collections::HashMap;
use std::time::Instant;

/// The server-owned record for one player. Created on connection accept,
/// mutated only in response to that player's own messages, removed on
/// disconnect.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub last_update: Instant,
}

impl PlayerState {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            last_update: Instant::now(),
        }
    }

    /// Wire representation, rounded to 2 decimals. Lossy, one-way.
    pub fn to_view(&self) -> PlayerView {
        PlayerView {
            id: self.id.clone(),
            x: round2(self.x),
            y: round2(self.y),
            vx: round2(self.vx),
            vy: round2(self.vy),
        }
    }
}

/// The shared world state advanced by the tick loop.
#[derive(Debug, Default)]
pub struct GameState {
    players: HashMap<String, PlayerState>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_player(&mut self, id: &str) {
        self.players.insert(id.to_string(), PlayerState::new(id));
    }

    /// Returns whether the player was present. Removing an already-removed
    /// id is a no-op so disconnect handling stays idempotent.
    pub fn remove_player(&mut self, id: &str) -> bool {
        self.players.remove(id).is_some()
    }

    /// Applies a `MOVE` intent. Intents for ids with no live entry are
    /// dropped silently: the connection may have been removed while the
    /// message was in flight.
    pub fn apply_move(&mut self, id: &str, direction: Direction) {
        if let Some(player) = self.players.get_mut(id) {
            let (vx, vy) = direction.velocity(PLAYER_SPEED);
            player.vx = vx;
            player.vy = vy;
            player.last_update = Instant::now();
            debug!("player {} moved: ({}, {})", id, player.vx, player.vy);
        }
    }

    /// Integrates positions over `delta_time` seconds. Velocity is set
    /// exclusively by `MOVE` messages; there is no other physics here.
    pub fn update(&mut self, delta_time: f32) {
        for player in self.players.values_mut() {
            player.x += player.vx * delta_time;
            player.y += player.vy * delta_time;
        }
    }

    /// Full player list as it goes out in a `STATE` broadcast.
    pub fn snapshot(&self) -> Vec<PlayerView> {
        self.players.values().map(PlayerState::to_view).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_add_and_remove_player() {
        let mut game = GameState::new();
        game.add_player("p1");
        assert!(game.contains("p1"));
        assert_eq!(game.len(), 1);

        assert!(game.remove_player("p1"));
        assert!(!game.contains("p1"));
        assert!(game.is_empty());

        // Second removal is a no-op, not an error.
        assert!(!game.remove_player("p1"));
    }

    #[test]
    fn test_new_player_starts_at_origin_and_rest() {
        let player = PlayerState::new("p1");
        assert_eq!(player.x, 0.0);
        assert_eq!(player.y, 0.0);
        assert_eq!(player.vx, 0.0);
        assert_eq!(player.vy, 0.0);
    }

    #[test]
    fn test_move_sets_velocity_per_direction() {
        let mut game = GameState::new();
        game.add_player("p1");

        let cases = [
            (Direction::Up, 0.0, -PLAYER_SPEED),
            (Direction::Down, 0.0, PLAYER_SPEED),
            (Direction::Left, -PLAYER_SPEED, 0.0),
            (Direction::Right, PLAYER_SPEED, 0.0),
            (Direction::None, 0.0, 0.0),
        ];

        for (direction, vx, vy) in cases {
            game.apply_move("p1", direction);
            let view = &game.snapshot()[0];
            assert_eq!(view.vx, vx);
            assert_eq!(view.vy, vy);
        }
    }

    #[test]
    fn test_move_for_unknown_player_is_dropped() {
        let mut game = GameState::new();
        game.apply_move("ghost", Direction::Right);
        assert!(game.is_empty());
    }

    #[test]
    fn test_tick_integration() {
        let mut game = GameState::new();
        game.add_player("p1");
        game.apply_move("p1", Direction::Right);

        game.update(0.5);

        let view = &game.snapshot()[0];
        assert_approx_eq!(view.x, 5.0, 1e-4);
        assert_approx_eq!(view.y, 0.0, 1e-4);
    }

    #[test]
    fn test_update_with_no_velocity_holds_position() {
        let mut game = GameState::new();
        game.add_player("p1");
        game.update(1.0);

        let view = &game.snapshot()[0];
        assert_eq!(view.x, 0.0);
        assert_eq!(view.y, 0.0);
    }

    #[test]
    fn test_removed_player_absent_from_snapshot() {
        let mut game = GameState::new();
        game.add_player("p1");
        game.add_player("p2");
        game.apply_move("p1", Direction::Down);

        game.remove_player("p1");
        game.update(1.0 / 60.0);

        let snapshot = game.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "p2");
    }

    #[test]
    fn test_snapshot_rounds_to_two_decimals() {
        let mut game = GameState::new();
        game.add_player("p1");
        game.apply_move("p1", Direction::Right);
        game.update(1.0 / 60.0);

        let view = &game.snapshot()[0];
        // 10.0 / 60 = 0.1666... rounds to 0.17 on the wire.
        assert_approx_eq!(view.x, 0.17, 1e-6);
    }

    #[test]
    fn test_move_updates_last_update_timestamp() {
        let mut game = GameState::new();
        game.add_player("p1");
        let before = game.players["p1"].last_update;

        std::thread::sleep(std::time::Duration::from_millis(5));
        game.apply_move("p1", Direction::Left);

        assert!(game.players["p1"].last_update > before);
    }
}
