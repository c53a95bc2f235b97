pub mod cluster;
pub mod power;

use crate::game::{AgentSnapshot, CellPos, ClosestItertools, PlayerId, WorldView};

/// Whether an agent is a hostile the engine should consider engaging.
pub fn is_enemy_unit(world: &dyn WorldView, player: PlayerId, agent: &AgentSnapshot) -> bool {
    world.are_enemies(player, agent.owner)
}

/// Closest hostile to a position, regardless of whether anyone present
/// can actually hit it.
pub fn find_closest_enemy(
    world: &dyn WorldView,
    player: PlayerId,
    pos: CellPos,
) -> Option<AgentSnapshot> {
    world
        .all_agents()
        .into_iter()
        .filter(|a| is_enemy_unit(world, player, a))
        .closest_to(pos)
}

/// Closest hostile that at least one of the given units can engage.
/// `radius` limits the scan; `None` searches the whole world.
pub fn find_closest_attackable_enemy(
    world: &dyn WorldView,
    player: PlayerId,
    units: &[AgentSnapshot],
    pos: CellPos,
    radius: Option<i32>,
) -> Option<AgentSnapshot> {
    let candidates = match radius {
        Some(r) => world.agents_in_radius(pos, r),
        None => world.all_agents(),
    };
    candidates
        .into_iter()
        .filter(|a| is_enemy_unit(world, player, a))
        .filter(|a| units.iter().any(|u| u.can_attack_target(a)))
        .closest_to(pos)
}

/// Hostile combat agents within `radius` of a position.
pub fn hostiles_near(
    world: &dyn WorldView,
    player: PlayerId,
    pos: CellPos,
    radius: i32,
) -> Vec<AgentSnapshot> {
    world
        .agents_in_radius(pos, radius)
        .into_iter()
        .filter(|a| is_enemy_unit(world, player, a) && a.is_combatant())
        .collect()
}

/// How well guarded an agent is: the number of combat-capable agents in
/// its immediate surroundings. Capture targets are preferred undefended.
pub fn protection_level(world: &dyn WorldView, agent: &AgentSnapshot) -> usize {
    world
        .agents_in_radius(agent.pos, 5)
        .iter()
        .filter(|a| a.is_combatant() && a.id != agent.id)
        .count()
}
