//! Client-side view of the world, replaced wholesale by each `STATE`
//! broadcast.

use log::info;
use shared::PlayerView;

/// Local snapshot of the server's world plus the client's own identity.
///
/// Identity is a bootstrap heuristic, not a handshake: the first id seen in
/// the first snapshot is adopted as "self" and kept for the session.
#[derive(Debug, Default)]
pub struct ClientWorld {
    players: Vec<PlayerView>,
    self_id: Option<String>,
}

impl ClientWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the snapshot (never merged) and adopts an identity from the
    /// first player entry if none is assigned yet.
    pub fn apply_state(&mut self, players: Vec<PlayerView>) {
        self.players = players;

        if self.self_id.is_none() {
            if let Some(first) = self.players.first() {
                info!("client assigned id: {}", first.id);
                self.self_id = Some(first.id.clone());
            }
        }
    }

    /// The player entry matching the adopted identity, if both exist.
    pub fn me(&self) -> Option<&PlayerView> {
        let self_id = self.self_id.as_deref()?;
        self.players.iter().find(|p| p.id == self_id)
    }

    pub fn players(&self) -> &[PlayerView] {
        &self.players
    }

    pub fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    /// Logs a one-line summary of the current snapshot.
    pub fn render(&self) {
        if self.players.is_empty() {
            return;
        }

        match self.me() {
            Some(me) => info!(
                "[RENDER] my position: ({:.2}, {:.2}) | total players: {}",
                me.x,
                me.y,
                self.players.len()
            ),
            None => info!(
                "[RENDER] waiting for initial state... | total players: {}",
                self.players.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: &str, x: f32) -> PlayerView {
        PlayerView {
            id: id.to_string(),
            x,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
        }
    }

    #[test]
    fn test_adopts_first_id_once() {
        let mut world = ClientWorld::new();
        assert!(world.self_id().is_none());

        world.apply_state(vec![view("a", 1.0), view("b", 2.0)]);
        assert_eq!(world.self_id(), Some("a"));

        // Later snapshots never re-assign identity, whatever their order.
        world.apply_state(vec![view("b", 2.0), view("a", 1.0)]);
        assert_eq!(world.self_id(), Some("a"));
    }

    #[test]
    fn test_snapshot_replaced_wholesale() {
        let mut world = ClientWorld::new();
        world.apply_state(vec![view("a", 1.0), view("b", 2.0)]);
        world.apply_state(vec![view("b", 3.0)]);

        assert_eq!(world.players().len(), 1);
        assert_eq!(world.players()[0].id, "b");
    }

    #[test]
    fn test_me_tracks_own_entry() {
        let mut world = ClientWorld::new();
        world.apply_state(vec![view("a", 1.0)]);
        world.apply_state(vec![view("b", 9.0), view("a", 4.5)]);

        let me = world.me().unwrap();
        assert_eq!(me.id, "a");
        assert_eq!(me.x, 4.5);
    }

    #[test]
    fn test_me_is_none_after_own_entry_vanishes() {
        let mut world = ClientWorld::new();
        world.apply_state(vec![view("a", 1.0)]);
        world.apply_state(vec![view("b", 2.0)]);

        assert!(world.me().is_none());
        assert_eq!(world.self_id(), Some("a"));
    }

    #[test]
    fn test_empty_state_does_not_assign_identity() {
        let mut world = ClientWorld::new();
        world.apply_state(Vec::new());
        assert!(world.self_id().is_none());
    }
}
