//! The per-player decision loop: maintains squad membership, runs the
//! periodic evaluations (rush, roles, defense, capture, production) on
//! jittered countdowns, ticks every live squad's state machine and
//! drains the order queue at a bounded rate.

use crate::config::AiConfig;
use crate::error::ConfigError;
use crate::game::{
    Action, AgentId, AgentSnapshot, Capabilities, CellPos, ClosestItertools, CommandSink,
    OrderQueue, PlayerId, WorldView,
};
use crate::military::{self, power};
use crate::pathing::{PathProvider, ThreatRouter};
use crate::squad::{Squad, SquadId, SquadKind, Target};
use crate::tactics::TickContext;
use log::debug;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeSet, HashMap};
use std::mem;

/// Repeating countdown. Initial values are jittered so that many
/// orchestrator instances sharing one simulation do not all evaluate on
/// the same tick.
#[derive(Debug)]
struct Countdown {
    remaining: u32,
    interval: u32,
}

impl Countdown {
    fn new(interval: u32, initial: u32) -> Self {
        Countdown {
            remaining: initial.max(1),
            interval,
        }
    }

    fn fire(&mut self) -> bool {
        if self.remaining <= 1 {
            self.remaining = self.interval;
            true
        } else {
            self.remaining -= 1;
            false
        }
    }
}

/// Tactical decision engine for one player. Owns the live squads, the
/// authoritative agent-to-squad mapping and the pending command queue;
/// everything else is read fresh from the world each tick.
pub struct Orchestrator {
    config: AiConfig,
    player: PlayerId,
    rng: ChaCha8Rng,
    router: ThreatRouter,

    squads: Vec<Squad>,
    /// Single authoritative "which squad owns this agent" mapping,
    /// updated only by membership mutations.
    assignments: HashMap<AgentId, SquadId>,
    /// Units observed but not yet assigned to any squad.
    free_pool: Vec<AgentId>,
    /// Units the engine has already given a role; ordered so evaluation
    /// passes stay deterministic.
    active: BTreeSet<AgentId>,
    orders: OrderQueue,

    rush_timer: Countdown,
    assign_timer: Countdown,
    attack_force_timer: Countdown,
    defense_timer: Countdown,
    capture_timer: Countdown,
    production_timer: Countdown,

    /// The one growing rush squad, when a rush is on.
    rush_squad: Option<SquadId>,
    base_center: CellPos,
    defense_center: CellPos,
    attack_center: Option<CellPos>,
    ticks: u64,
}

impl Orchestrator {
    pub fn new(
        config: AiConfig,
        player: PlayerId,
        base_center: CellPos,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        // Stagger the rush near its full interval and everything else
        // uniformly inside one period.
        let rush_slack = config.rush_interval / 20;
        let rush_initial = rng.gen_range(
            config.rush_interval.saturating_sub(rush_slack)..=config.rush_interval + rush_slack,
        );
        let assign_initial = rng.gen_range(1..=config.assign_roles_interval);
        let attack_force_initial = rng.gen_range(1..=config.attack_force_interval);
        let defense_initial = rng.gen_range(1..=config.defense_interval);
        let capture_initial = rng.gen_range(1..=config.capture_interval);
        let production_initial = rng.gen_range(1..=config.production_interval);

        let router = ThreatRouter::from_config(&config);

        Ok(Orchestrator {
            rush_timer: Countdown::new(config.rush_interval, rush_initial),
            assign_timer: Countdown::new(config.assign_roles_interval, assign_initial),
            attack_force_timer: Countdown::new(config.attack_force_interval, attack_force_initial),
            defense_timer: Countdown::new(config.defense_interval, defense_initial),
            capture_timer: Countdown::new(config.capture_interval, capture_initial),
            production_timer: Countdown::new(config.production_interval, production_initial),
            config,
            player,
            rng,
            router,
            squads: Vec::new(),
            assignments: HashMap::new(),
            free_pool: Vec::new(),
            active: BTreeSet::new(),
            orders: OrderQueue::new(),
            rush_squad: None,
            base_center,
            defense_center: base_center,
            attack_center: None,
            ticks: 0,
        })
    }

    // ─── Read-only surface ──────────────────────────────────────────────

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    pub fn squads(&self) -> impl Iterator<Item = &Squad> {
        self.squads.iter()
    }

    pub fn free_pool(&self) -> &[AgentId] {
        &self.free_pool
    }

    pub fn pending_orders(&self) -> usize {
        self.orders.len()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn attack_center(&self) -> Option<CellPos> {
        self.attack_center
    }

    pub fn squad_of(&self, agent: AgentId) -> Option<SquadId> {
        self.assignments.get(&agent).copied()
    }

    // ─── Lifecycle hooks ────────────────────────────────────────────────

    pub fn register_squad(&mut self, kind: SquadKind, target: Option<Target>) -> SquadId {
        let id = SquadId::from_u128(self.rng.gen());
        let mut squad = Squad::new(id, kind);
        if let Some(target) = target {
            squad.set_target(target);
        }
        debug!("registered {:?} squad {}", kind, id);
        self.squads.push(squad);
        id
    }

    pub fn disband(&mut self, id: SquadId) {
        if let Some(squad) = self.squads.iter_mut().find(|s| s.id() == id) {
            squad.disband();
            for agent in squad.take_released() {
                self.assignments.remove(&agent);
                self.free_pool.push(agent);
            }
        }
        self.squads.retain(|s| s.id() != id);
        if self.rush_squad == Some(id) {
            self.rush_squad = None;
        }
    }

    /// Move an agent into a squad, honoring the single-membership rule:
    /// the agent leaves its previous squad (and the free pool) first.
    pub fn assign_to_squad(&mut self, squad: SquadId, agent: AgentId) {
        if let Some(previous) = self.assignments.insert(agent, squad) {
            if previous != squad {
                if let Some(prior) = self.squads.iter_mut().find(|s| s.id() == previous) {
                    prior.retain_members(|m| *m != agent);
                }
            }
        }
        self.free_pool.retain(|a| *a != agent);

        match self.squads.iter_mut().find(|s| s.id() == squad) {
            Some(squad) => squad.add_member(agent),
            None => {
                self.assignments.remove(&agent);
            }
        }
    }

    // ─── The tick ───────────────────────────────────────────────────────

    /// Advance one decision step. Runs to completion; there is no
    /// suspension inside a tick.
    pub fn tick(
        &mut self,
        world: &dyn WorldView,
        pathfinder: &dyn PathProvider,
        sink: &mut dyn CommandSink,
    ) {
        self.ticks += 1;

        self.refresh_base_center(world);
        self.clean_squads(world);

        if self.rush_timer.fire() {
            self.evaluate_rush(world);
        }
        if self.assign_timer.fire() {
            self.assign_roles(world, pathfinder);
        }
        if self.defense_timer.fire() {
            self.evaluate_defense(world);
        }
        if self.capture_timer.fire() {
            self.evaluate_capture(world);
        }
        if self.production_timer.fire() {
            self.evaluate_production(world);
        }
        if self.attack_force_timer.fire() {
            self.create_attack_force(world);
        }

        self.update_squads(world, pathfinder);

        self.orders
            .drain_into(self.config.min_order_quotient_per_tick, sink);
    }

    /// Reactive damage relay from the host. Aircraft squads get their
    /// fast-reflex evaluation immediately rather than waiting for the
    /// next scheduled machine tick.
    pub fn damage(
        &mut self,
        world: &dyn WorldView,
        pathfinder: &dyn PathProvider,
        victim: AgentId,
        attacker: AgentId,
    ) {
        let Some(victim) = world.agent(victim) else {
            return;
        };
        if victim.owner != self.player {
            return;
        }
        let Some(attacker) = world.agent(attacker) else {
            return;
        };
        if !world.are_enemies(self.player, attacker.owner) {
            return;
        }

        // A harassed structure or harvester pulls a protection response.
        if victim.is_structure() || victim.caps.contains(Capabilities::HARVESTER) {
            self.defense_center = attacker.pos;
            self.protect_own(world, &victim, &attacker);
            return;
        }

        let Some(squad_id) = self.assignments.get(&victim.id).copied() else {
            return;
        };

        let mut squads = mem::take(&mut self.squads);
        {
            let mut ctx = TickContext {
                world,
                pathfinder,
                router: &self.router,
                config: &self.config,
                player: self.player,
                base_center: self.base_center,
                attack_center: self.attack_center,
                orders: &mut self.orders,
                rng: &mut self.rng,
            };
            if let Some(squad) = squads.iter_mut().find(|s| s.id() == squad_id) {
                if squad.kind() == SquadKind::Air {
                    squad.update(&mut ctx);
                }
                squad.on_damage(&mut ctx, &attacker);
            }
        }
        self.squads = squads;
    }

    // ─── Internals ──────────────────────────────────────────────────────

    fn refresh_base_center(&mut self, world: &dyn WorldView) {
        let anchor = self.base_center;
        if let Some(base) = world
            .all_agents()
            .into_iter()
            .filter(|a| {
                a.owner == self.player && a.caps.contains(Capabilities::BASE_BUILDER)
            })
            .closest_to(anchor)
        {
            self.base_center = base.pos;
        }
    }

    /// Membership maintenance: drop dead or foreign agents everywhere,
    /// collect disband releases, prune invalid squads.
    fn clean_squads(&mut self, world: &dyn WorldView) {
        let player = self.player;
        let alive_and_mine = |id: &AgentId| {
            world
                .agent(*id)
                .map(|a| a.owner == player)
                .unwrap_or(false)
        };

        let mut returned = Vec::new();
        for squad in self.squads.iter_mut() {
            for agent in squad.retain_members(&alive_and_mine) {
                self.assignments.remove(&agent);
            }
            for agent in squad.take_released() {
                self.assignments.remove(&agent);
                returned.push(agent);
            }
        }
        for agent in returned {
            if alive_and_mine(&agent) && !self.free_pool.contains(&agent) {
                self.free_pool.push(agent);
            }
        }

        self.squads.retain(|s| s.is_valid());
        if let Some(rush) = self.rush_squad {
            if !self.squads.iter().any(|s| s.id() == rush) {
                self.rush_squad = None;
            }
        }

        self.active.retain(alive_and_mine);
        self.free_pool.retain(alive_and_mine);
    }

    fn update_squads(&mut self, world: &dyn WorldView, pathfinder: &dyn PathProvider) {
        let mut squads = mem::take(&mut self.squads);
        {
            let mut ctx = TickContext {
                world,
                pathfinder,
                router: &self.router,
                config: &self.config,
                player: self.player,
                base_center: self.base_center,
                attack_center: self.attack_center,
                orders: &mut self.orders,
                rng: &mut self.rng,
            };
            for squad in squads.iter_mut() {
                squad.update(&mut ctx);
            }
        }
        self.squads = squads;
    }

    /// Discover newly observed units and give them a role: harvesters
    /// harvest, combat aircraft and naval hulls pool into their standing
    /// squads, everything else waits in the free pool.
    fn assign_roles(&mut self, world: &dyn WorldView, pathfinder: &dyn PathProvider) {
        let own_units: Vec<AgentSnapshot> = world
            .all_agents()
            .into_iter()
            .filter(|a| a.owner == self.player && a.caps.contains(Capabilities::MOBILE))
            .collect();

        for unit in &own_units {
            if self.config.exclude_from_squads.contains(&unit.archetype) {
                continue;
            }
            if !self.active.insert(unit.id) {
                continue;
            }

            if unit.caps.contains(Capabilities::HARVESTER) {
                self.orders.push(unit.id, Action::Harvest(None));
            } else if unit.is_aircraft() && unit.is_combatant() {
                let squad = self.standing_squad(SquadKind::Air);
                self.assign_to_squad(squad, unit.id);
            } else if unit.caps.contains(Capabilities::NAVAL) {
                let squad = self.standing_squad(SquadKind::Naval);
                self.assign_to_squad(squad, unit.id);
            } else {
                self.free_pool.push(unit.id);
            }
        }

        // Idle harvesters get a destination that stays clear of hostiles.
        for unit in &own_units {
            if !unit.caps.contains(Capabilities::HARVESTER) || !unit.is_idle {
                continue;
            }
            if !self.active.contains(&unit.id) {
                continue;
            }
            if let Some(destination) = self.router.safe_resource_path(
                world,
                pathfinder,
                self.player,
                unit.pos,
                unit.move_class(),
                self.config.harvester_avoidance_radius,
            ) {
                self.orders.push(unit.id, Action::Harvest(Some(destination)));
            }
        }
    }

    /// The single standing squad of a kind (air, naval, protection),
    /// registering one when none is live.
    fn standing_squad(&mut self, kind: SquadKind) -> SquadId {
        self.squads
            .iter()
            .find(|s| s.kind() == kind)
            .map(|s| s.id())
            .unwrap_or_else(|| self.register_squad(kind, None))
    }

    /// Form an assault squad once the free pool clears a randomized
    /// threshold, absorbing every eligible pooled unit at once.
    fn create_attack_force(&mut self, world: &dyn WorldView) {
        let bonus = if self.config.squad_size_random_bonus > 0 {
            self.rng.gen_range(0..self.config.squad_size_random_bonus)
        } else {
            0
        };
        let threshold = self.config.squad_size + bonus as usize;
        if self.free_pool.len() < threshold {
            return;
        }

        let pool = mem::take(&mut self.free_pool);
        let squad = self.register_squad(SquadKind::GroundAssault, None);
        let mut absorbed = 0usize;
        for agent in pool {
            let Some(snapshot) = world.agent(agent) else {
                continue;
            };
            if snapshot.is_aircraft() || snapshot.caps.contains(Capabilities::NAVAL) {
                continue;
            }
            if self
                .config
                .exclude_from_attack_squads
                .contains(&snapshot.archetype)
            {
                continue;
            }
            self.assign_to_squad(squad, agent);
            absorbed += 1;
        }
        debug!("assault squad {} formed with {} members", squad, absorbed);
    }

    /// Opportunistic rush: when enough idle ground combat strength is
    /// standing around and some enemy base looks soft, merge everyone
    /// into the single growing rush squad and point it there.
    fn evaluate_rush(&mut self, world: &dyn WorldView) {
        let own: Vec<AgentSnapshot> = self
            .active
            .iter()
            .filter_map(|id| world.agent(*id))
            .filter(|a| {
                a.is_idle
                    && a.is_combatant()
                    && !a.is_aircraft()
                    && !a.caps.contains(Capabilities::NAVAL)
                    && !a.caps.contains(Capabilities::HARVESTER)
            })
            .collect();

        if own.len() < self.config.squad_size {
            return;
        }

        let enemy_bases: Vec<AgentSnapshot> = world
            .all_agents()
            .into_iter()
            .filter(|a| {
                world.are_enemies(self.player, a.owner)
                    && a.caps.contains(Capabilities::BASE_BUILDER)
            })
            .collect();

        for base in &enemy_bases {
            let defenders = military::hostiles_near(
                world,
                self.player,
                base.pos,
                self.config.rush_attack_scan_radius,
            );
            if !power::can_attack(&own, &defenders, self.config.rush_confidence_percent) {
                continue;
            }

            let target = defenders
                .choose(&mut self.rng)
                .map(|d| d.id)
                .unwrap_or(base.id);

            // One big rush squad, restarted once it has outgrown the base
            // squad size.
            let reusable = self.rush_squad.filter(|id| {
                self.squads
                    .iter()
                    .any(|s| s.id() == *id && s.members().len() <= self.config.squad_size)
            });
            let squad_id = match reusable {
                Some(id) => id,
                None => {
                    let id =
                        self.register_squad(SquadKind::GroundAssault, Some(Target::Agent(target)));
                    self.rush_squad = Some(id);
                    id
                }
            };
            if let Some(squad) = self.squads.iter_mut().find(|s| s.id() == squad_id) {
                if !squad.target_valid(world) {
                    squad.set_target(Target::Agent(target));
                }
            }

            for unit in &own {
                self.assign_to_squad(squad_id, unit.id);
            }
            self.attack_center = Some(base.pos);
            debug!("rushing {} with {} units", base.id, own.len());
            return;
        }
    }

    /// Scan own bases for visible intruders and raise a protection
    /// response around the closest one.
    fn evaluate_defense(&mut self, world: &dyn WorldView) {
        let bases: Vec<AgentSnapshot> = world
            .all_agents()
            .into_iter()
            .filter(|a| {
                a.owner == self.player && a.caps.contains(Capabilities::BASE_BUILDER)
            })
            .collect();

        for base in &bases {
            let intruder = world
                .agents_in_radius(base.pos, self.config.max_base_radius)
                .into_iter()
                .filter(|a| {
                    world.are_enemies(self.player, a.owner)
                        && world.is_visible(self.player, a.id)
                })
                .closest_to(base.pos);
            if let Some(intruder) = intruder {
                self.defense_center = intruder.pos;
                self.protect_own(world, base, &intruder);
            }
        }
    }

    fn protect_own(&mut self, world: &dyn WorldView, victim: &AgentSnapshot, attacker: &AgentSnapshot) {
        let squad_id = self
            .squads
            .iter()
            .find(|s| s.kind() == SquadKind::Protection && s.is_valid())
            .map(|s| s.id())
            .unwrap_or_else(|| {
                self.register_squad(SquadKind::Protection, Some(Target::Agent(attacker.id)))
            });

        let needs_recruits = match self.squads.iter_mut().find(|s| s.id() == squad_id) {
            Some(squad) => {
                if !squad.target_valid(world) {
                    squad.set_target(Target::Agent(attacker.id));
                }
                !squad.is_valid()
            }
            None => return,
        };

        if needs_recruits {
            let recruits: Vec<AgentId> = world
                .agents_in_radius(victim.pos, self.config.protect_unit_scan_radius)
                .into_iter()
                .filter(|a| {
                    a.owner == self.player
                        && a.is_combatant()
                        && !a.is_structure()
                        && !a.caps.contains(Capabilities::HARVESTER)
                })
                .map(|a| a.id)
                .collect();
            for recruit in recruits {
                self.assign_to_squad(squad_id, recruit);
            }
        }
    }

    /// Idle capture-capable units in the pool become an infiltration
    /// squad; the squad itself picks its victims on arrival.
    fn evaluate_capture(&mut self, world: &dyn WorldView) {
        let capturers: Vec<AgentId> = self
            .free_pool
            .iter()
            .filter_map(|id| world.agent(*id))
            .filter(|a| a.caps.contains(Capabilities::CAPTURER) && a.is_idle)
            .map(|a| a.id)
            .collect();
        if capturers.is_empty() {
            return;
        }

        let squad = self
            .squads
            .iter()
            .find(|s| s.kind() == SquadKind::Infiltration && s.is_valid())
            .map(|s| s.id())
            .unwrap_or_else(|| self.register_squad(SquadKind::Infiltration, None));
        for capturer in capturers {
            self.assign_to_squad(squad, capturer);
        }
    }

    /// Nudge idle production structures while the base is not already
    /// saturated with unemployed units. What gets produced is the
    /// production bookkeeping's concern, not ours.
    fn evaluate_production(&mut self, world: &dyn WorldView) {
        if self.free_pool.len() >= self.config.idle_base_units_maximum {
            return;
        }
        let factories: Vec<AgentId> = world
            .all_agents()
            .into_iter()
            .filter(|a| {
                a.owner == self.player && a.caps.contains(Capabilities::PRODUCTION) && a.is_idle
            })
            .map(|a| a.id)
            .collect();
        for factory in factories {
            self.orders.push(factory, Action::Produce);
        }
    }
}
