use super::agent::{AgentId, AgentSnapshot, MoveClass, PlayerId};
use super::position::CellPos;

/// Query surface of the surrounding simulation. The engine treats the
/// world as a black box and re-reads it every tick rather than trusting
/// any cached view.
///
/// Implementations must return snapshots only for agents that are alive
/// and in-world; `agent` returning `None` IS the liveness check, there is
/// no separate "is dead" query.
pub trait WorldView {
    /// Look up one agent, validating liveness and world membership.
    fn agent(&self, id: AgentId) -> Option<AgentSnapshot>;

    /// All live agents within `radius` cells of `center`.
    fn agents_in_radius(&self, center: CellPos, radius: i32) -> Vec<AgentSnapshot>;

    /// All live agents inside the axis-aligned box.
    fn agents_in_box(&self, top_left: CellPos, bottom_right: CellPos) -> Vec<AgentSnapshot>;

    /// Every live agent in the world.
    fn all_agents(&self) -> Vec<AgentSnapshot>;

    /// Terrain passability for a locomotion class.
    fn is_passable(&self, cell: CellPos, class: MoveClass) -> bool;

    /// Whether the cell holds a harvestable resource.
    fn is_resource(&self, cell: CellPos) -> bool {
        let _ = cell;
        false
    }

    /// Diplomatic stance between two owners.
    fn are_enemies(&self, a: PlayerId, b: PlayerId) -> bool;

    /// Whether `viewer` currently has sight of the agent (fog of war,
    /// cloaking and similar are the host's concern).
    fn is_visible(&self, viewer: PlayerId, agent: AgentId) -> bool;
}

/// Nearest-by-position selection over snapshot iterators. Ties break on
/// the lower agent id so results stay deterministic regardless of the
/// world implementation's iteration order.
pub trait ClosestItertools: Iterator<Item = AgentSnapshot> + Sized {
    fn closest_to(self, pos: CellPos) -> Option<AgentSnapshot> {
        self.min_by_key(|a| (a.pos.distance_squared(pos), a.id))
    }

    fn closest_distance_to(self, pos: CellPos) -> Option<i64> {
        self.map(|a| a.pos.distance_squared(pos)).min()
    }
}

impl<T> ClosestItertools for T where T: Iterator<Item = AgentSnapshot> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::agent::Capabilities;

    fn snap(id: u64, x: i32, y: i32) -> AgentSnapshot {
        AgentSnapshot {
            id: AgentId(id),
            owner: PlayerId(0),
            pos: CellPos::new(x, y),
            caps: Capabilities::MOBILE,
            archetype: "test".to_string(),
            offense: 0,
            defense: 0,
            speed: 5,
            is_idle: true,
        }
    }

    #[test]
    fn closest_to_picks_nearest_and_breaks_ties_by_id() {
        let agents = vec![snap(3, 5, 0), snap(1, 2, 0), snap(2, 2, 0)];
        let nearest = agents.into_iter().closest_to(CellPos::new(0, 0)).unwrap();
        assert_eq!(nearest.id, AgentId(1));
    }
}
