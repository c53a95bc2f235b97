//! Per-squad tactical behaviors: the state variants for each squad kind
//! and the machinery that drives them.

pub mod machine;

mod air;
mod ground;
mod infiltration;
mod naval;
mod protection;

pub use machine::{StateMachine, Transition, MAX_STATE_TRANSITIONS};

pub use air::{AirAttack, AirFlee, AirIdle};
pub(crate) use air::position_is_air_safe;
pub use ground::{
    GroundAttack, GroundAttackMove, GroundDetour, GroundFlee, GroundGather, GroundIdle,
    GroundSiege,
};
pub use infiltration::InfiltrationDetour;
pub use naval::{NavalAttack, NavalAttackMove, NavalFlee, NavalIdle};
pub use protection::{Escort, ProtectionAttack, ProtectionFlee, ProtectionIdle};

use crate::config::AiConfig;
use crate::game::{
    Action, AgentSnapshot, Capabilities, CellPos, OrderQueue, PlayerId, WorldView,
};
use crate::military::power;
use crate::pathing::{PathProvider, ThreatRouter};
use crate::squad::{Squad, SquadKind};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Everything a state may touch during one tick. Built fresh by the
/// orchestrator per evaluation; nothing in here survives across ticks.
pub struct TickContext<'a> {
    pub world: &'a dyn WorldView,
    pub pathfinder: &'a dyn PathProvider,
    pub router: &'a ThreatRouter,
    pub config: &'a AiConfig,
    pub player: PlayerId,
    /// Last known own base location; the fallback flee destination when
    /// every own structure is gone.
    pub base_center: CellPos,
    /// Focus of the current offensive, when the orchestrator has one.
    pub attack_center: Option<CellPos>,
    pub orders: &'a mut OrderQueue,
    pub rng: &'a mut ChaCha8Rng,
}

/// Polymorphic lifecycle every state variant implements. `activate` runs
/// once on entry, `tick` repeatedly, `deactivate` exactly once on exit
/// (including reverts). A state must treat its working data as abandoned
/// once deactivated.
pub(crate) trait TacticState {
    fn name(&self) -> &'static str;

    fn activate(&mut self, _squad: &mut Squad, _ctx: &mut TickContext<'_>) {}

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition>;

    fn deactivate(&mut self, _squad: &mut Squad, _ctx: &mut TickContext<'_>) {}
}

/// Closed set of tactical states. Which variants a squad moves through is
/// determined by its kind's transition graph; the enum is shared so the
/// machine and diagnostics stay uniform.
pub enum SquadState {
    GroundIdle(GroundIdle),
    GroundDetour(GroundDetour),
    GroundAttackMove(GroundAttackMove),
    GroundGather(GroundGather),
    GroundSiege(GroundSiege),
    GroundAttack(GroundAttack),
    GroundFlee(GroundFlee),
    AirIdle(AirIdle),
    AirAttack(AirAttack),
    AirFlee(AirFlee),
    NavalIdle(NavalIdle),
    NavalAttackMove(NavalAttackMove),
    NavalAttack(NavalAttack),
    NavalFlee(NavalFlee),
    ProtectionIdle(ProtectionIdle),
    ProtectionAttack(ProtectionAttack),
    ProtectionFlee(ProtectionFlee),
    Escort(Escort),
    InfiltrationDetour(InfiltrationDetour),
    #[cfg(test)]
    Probe(machine::probe::ProbeState),
}

macro_rules! each_state {
    ($value:expr, $state:ident => $body:expr) => {
        match $value {
            SquadState::GroundIdle($state) => $body,
            SquadState::GroundDetour($state) => $body,
            SquadState::GroundAttackMove($state) => $body,
            SquadState::GroundGather($state) => $body,
            SquadState::GroundSiege($state) => $body,
            SquadState::GroundAttack($state) => $body,
            SquadState::GroundFlee($state) => $body,
            SquadState::AirIdle($state) => $body,
            SquadState::AirAttack($state) => $body,
            SquadState::AirFlee($state) => $body,
            SquadState::NavalIdle($state) => $body,
            SquadState::NavalAttackMove($state) => $body,
            SquadState::NavalAttack($state) => $body,
            SquadState::NavalFlee($state) => $body,
            SquadState::ProtectionIdle($state) => $body,
            SquadState::ProtectionAttack($state) => $body,
            SquadState::ProtectionFlee($state) => $body,
            SquadState::Escort($state) => $body,
            SquadState::InfiltrationDetour($state) => $body,
            #[cfg(test)]
            SquadState::Probe($state) => $body,
        }
    };
}

impl SquadState {
    /// Entry state for a freshly created squad of the given kind.
    pub fn initial_for(kind: SquadKind) -> SquadState {
        match kind {
            SquadKind::GroundAssault => SquadState::GroundIdle(GroundIdle::default()),
            SquadKind::Air => SquadState::AirIdle(AirIdle::default()),
            SquadKind::Naval => SquadState::NavalIdle(NavalIdle::default()),
            SquadKind::Protection => SquadState::ProtectionIdle(ProtectionIdle::default()),
            SquadKind::Escort => SquadState::Escort(Escort::default()),
            SquadKind::Infiltration => {
                SquadState::InfiltrationDetour(InfiltrationDetour::default())
            }
        }
    }

    pub fn name(&self) -> &'static str {
        each_state!(self, s => s.name())
    }

    pub(crate) fn activate(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) {
        each_state!(self, s => s.activate(squad, ctx))
    }

    pub(crate) fn tick(
        &mut self,
        squad: &mut Squad,
        ctx: &mut TickContext<'_>,
    ) -> Option<Transition> {
        each_state!(self, s => s.tick(squad, ctx))
    }

    pub(crate) fn deactivate(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) {
        each_state!(self, s => s.deactivate(squad, ctx))
    }
}

// ─── Helpers shared across state implementations ────────────────────────────

/// Radius inside which a squad of the given size counts as gathered.
/// Scales with squad size; the floor keeps tiny squads from demanding
/// cell-perfect stacking.
pub(crate) fn cohesion_radius(member_count: usize) -> i32 {
    ((member_count / 3) as i32).max(2)
}

/// Slowest mobile member; the squad cannot move faster than it, so it
/// anchors route following.
pub(crate) fn pick_leader(squad: &Squad, ctx: &TickContext<'_>) -> Option<AgentSnapshot> {
    squad
        .live_members(ctx.world)
        .into_iter()
        .filter(|m| m.caps.contains(Capabilities::MOBILE))
        .min_by_key(|m| (m.speed, m.id))
}

/// The flee decision: sample one member at random and look around it.
/// Own structures nearby mean home ground, never flee. Otherwise hostile
/// combat presence defers to the force comparison.
pub(crate) fn should_flee(squad: &Squad, ctx: &mut TickContext<'_>) -> bool {
    if !squad.is_valid() {
        return false;
    }
    let Some(member) = squad.random_member(ctx.world, ctx.rng) else {
        return false;
    };

    let around = ctx.world.agents_in_radius(member.pos, ctx.config.danger_radius);
    let own_structure_near = around
        .iter()
        .any(|a| a.owner == ctx.player && a.is_structure());
    if own_structure_near {
        return false;
    }

    let hostiles: Vec<AgentSnapshot> = around
        .into_iter()
        .filter(|a| ctx.world.are_enemies(ctx.player, a.owner) && a.is_combatant())
        .collect();
    if hostiles.is_empty() {
        return false;
    }

    power::evaluate(
        &squad.live_members(ctx.world),
        &hostiles,
        ctx.config.attack_confidence_percent,
    ) == power::Engagement::Avoid
}

/// Move the whole squad to a friendly structure: a random one near the
/// squad if any, else a random own structure anywhere, else the last
/// known base center.
pub(crate) fn go_to_home_building(squad: &Squad, ctx: &mut TickContext<'_>) {
    let center = squad.center(ctx.world).unwrap_or(ctx.base_center);

    let player = ctx.player;
    let own_structure = |a: &AgentSnapshot| a.owner == player && a.is_structure();

    let nearby: Vec<AgentSnapshot> = ctx
        .world
        .agents_in_radius(center, ctx.config.max_base_radius)
        .into_iter()
        .filter(own_structure)
        .collect();

    let location = if let Some(structure) = nearby.choose(ctx.rng) {
        structure.pos
    } else {
        let all: Vec<AgentSnapshot> = ctx
            .world
            .all_agents()
            .into_iter()
            .filter(own_structure)
            .collect();
        all.choose(ctx.rng).map(|s| s.pos).unwrap_or(ctx.base_center)
    };

    for member in squad.live_members(ctx.world) {
        ctx.orders.push(member.id, Action::Move(location));
    }
}
