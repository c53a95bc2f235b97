use crate::game::{Action, AgentId, AgentSnapshot, CellPos, WorldView};
use crate::tactics::{position_is_air_safe, SquadState, StateMachine, TickContext};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem;
use uuid::Uuid;

/// Stable squad identity, usable across ticks and in diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SquadId(Uuid);

impl SquadId {
    pub fn from_u128(value: u128) -> Self {
        SquadId(Uuid::from_u128(value))
    }
}

impl fmt::Display for SquadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "squad-{}", &self.0.to_string()[..8])
    }
}

/// Squad kind, fixed at creation; selects the state set the squad's
/// machine moves through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SquadKind {
    GroundAssault,
    Air,
    Naval,
    Protection,
    Escort,
    Infiltration,
}

/// What a squad is currently pursuing: a live agent or a map location.
/// Agent targets invalidate themselves when the agent dies or leaves the
/// world; location targets never expire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Agent(AgentId),
    Location(CellPos),
}

/// A managed group of agents sharing one tactical state machine. The
/// squad holds only weak identities; every member access re-validates
/// against the world.
pub struct Squad {
    id: SquadId,
    kind: SquadKind,
    members: Vec<AgentId>,
    target: Option<Target>,
    machine: StateMachine,
    released: Vec<AgentId>,
}

impl Squad {
    pub fn new(id: SquadId, kind: SquadKind) -> Self {
        Squad {
            id,
            kind,
            members: Vec::new(),
            target: None,
            machine: StateMachine::default(),
            released: Vec::new(),
        }
    }

    pub fn id(&self) -> SquadId {
        self.id
    }

    pub fn kind(&self) -> SquadKind {
        self.kind
    }

    /// A squad with no members is invalid: it receives no tactical ticks
    /// and is pruned by the orchestrator.
    pub fn is_valid(&self) -> bool {
        !self.members.is_empty()
    }

    pub fn members(&self) -> &[AgentId] {
        &self.members
    }

    pub fn has_member(&self, agent: AgentId) -> bool {
        self.members.contains(&agent)
    }

    pub fn add_member(&mut self, agent: AgentId) {
        if !self.has_member(agent) {
            self.members.push(agent);
        }
    }

    /// Drop members failing the predicate, returning the removed ids so
    /// the owner can update its bookkeeping.
    pub(crate) fn retain_members(
        &mut self,
        mut keep: impl FnMut(&AgentId) -> bool,
    ) -> Vec<AgentId> {
        let mut removed = Vec::new();
        self.members.retain(|id| {
            if keep(id) {
                true
            } else {
                removed.push(*id);
                false
            }
        });
        removed
    }

    pub fn target(&self) -> Option<Target> {
        self.target
    }

    pub fn set_target(&mut self, target: Target) {
        self.target = Some(target);
    }

    pub fn clear_target(&mut self) {
        self.target = None;
    }

    /// Whether the current target still exists. Location targets are
    /// always valid; agent targets die with their agent.
    pub fn target_valid(&self, world: &dyn WorldView) -> bool {
        match self.target {
            None => false,
            Some(Target::Agent(id)) => world.agent(id).is_some(),
            Some(Target::Location(_)) => true,
        }
    }

    pub fn target_agent(&self, world: &dyn WorldView) -> Option<AgentSnapshot> {
        match self.target {
            Some(Target::Agent(id)) => world.agent(id),
            _ => None,
        }
    }

    pub fn target_pos(&self, world: &dyn WorldView) -> Option<CellPos> {
        match self.target {
            Some(Target::Agent(id)) => world.agent(id).map(|a| a.pos),
            Some(Target::Location(pos)) => Some(pos),
            None => None,
        }
    }

    /// Fresh snapshots of every member still alive, in membership order.
    pub fn live_members(&self, world: &dyn WorldView) -> Vec<AgentSnapshot> {
        self.members
            .iter()
            .filter_map(|id| world.agent(*id))
            .collect()
    }

    /// Integer-average position of the living membership.
    pub fn center(&self, world: &dyn WorldView) -> Option<CellPos> {
        CellPos::average(self.live_members(world).iter().map(|m| m.pos))
    }

    pub fn random_member(
        &self,
        world: &dyn WorldView,
        rng: &mut rand_chacha::ChaCha8Rng,
    ) -> Option<AgentSnapshot> {
        self.live_members(world).choose(rng).cloned()
    }

    pub fn state_name(&self) -> Option<&'static str> {
        self.machine.current_name()
    }

    pub(crate) fn machine_mut(&mut self) -> &mut StateMachine {
        &mut self.machine
    }

    /// Release every member back to whoever owns the free pool. The
    /// squad becomes invalid and will be pruned.
    pub fn disband(&mut self) {
        self.released.append(&mut self.members);
    }

    pub(crate) fn take_released(&mut self) -> Vec<AgentId> {
        mem::take(&mut self.released)
    }

    /// Run one tactical tick. Invalid squads are skipped entirely; only
    /// membership cleanup (owned by the orchestrator) applies to them.
    pub fn update(&mut self, ctx: &mut TickContext<'_>) {
        if !self.is_valid() {
            return;
        }

        // The machine is swapped out while it runs so states can borrow
        // the squad mutably; transitions flow back through return values.
        let mut machine = mem::take(&mut self.machine);
        if !machine.is_active() {
            machine.change_state(self, ctx, SquadState::initial_for(self.kind), false);
        }
        machine.tick(self, ctx);
        self.machine = machine;
    }

    /// Reactive entry point for a member taking damage, relayed by the
    /// orchestrator. Aircraft get a reflex response that bypasses the
    /// normal cadence; ground assault squads punish attackers their
    /// current (non-combative) target cannot.
    pub fn on_damage(&mut self, ctx: &mut TickContext<'_>, attacker: &AgentSnapshot) {
        if !ctx.world.are_enemies(ctx.player, attacker.owner) {
            // Splash from friendly weapons; no reaction.
            return;
        }

        match self.kind {
            SquadKind::Air => {
                let Some(center) = self.center(ctx.world) else {
                    return;
                };
                let mut machine = mem::take(&mut self.machine);
                if position_is_air_safe(ctx, center) {
                    self.set_target(Target::Agent(attacker.id));
                    machine.change_state(
                        self,
                        ctx,
                        SquadState::AirAttack(crate::tactics::AirAttack::default()),
                        true,
                    );
                } else {
                    // Reflex avoidance: straight away from the attacker,
                    // faster than waiting for the flee state's pathing.
                    let dest = center.mirrored_away(attacker.pos);
                    for member in self.live_members(ctx.world) {
                        ctx.orders.push(member.id, Action::Move(dest));
                    }
                    machine.change_state(
                        self,
                        ctx,
                        SquadState::AirFlee(crate::tactics::AirFlee::default()),
                        true,
                    );
                }
                self.machine = machine;
            }
            SquadKind::GroundAssault => {
                let passive_target = self
                    .target_agent(ctx.world)
                    .map(|t| !t.is_combatant())
                    .unwrap_or(false);
                if passive_target {
                    self.set_target(Target::Agent(attacker.id));
                    for member in self.live_members(ctx.world) {
                        ctx.orders.push(member.id, Action::Stop);
                        ctx.orders.push(member.id, Action::Attack(attacker.id));
                    }
                }
            }
            _ => {}
        }
    }
}
