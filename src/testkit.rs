//! Shared test fixtures: a scriptable in-memory world, a call-counting
//! pathfinder and snapshot builders for the common unit archetypes.

use crate::config::AiConfig;
use crate::game::{
    AgentId, AgentSnapshot, Capabilities, CellPos, Command, CommandSink, MoveClass, OrderQueue,
    PlayerId, WorldView,
};
use crate::pathing::{GridPathfinder, PathProvider, PathQuery, ThreatRouter};
use crate::tactics::TickContext;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::cell::Cell;
use std::collections::{HashMap, HashSet};

// ─── Snapshot builders ──────────────────────────────────────────────────────

fn snapshot(
    id: u64,
    owner: PlayerId,
    pos: CellPos,
    caps: Capabilities,
    archetype: &str,
    offense: i32,
    defense: i32,
    speed: i32,
) -> AgentSnapshot {
    AgentSnapshot {
        id: AgentId(id),
        owner,
        pos,
        caps,
        archetype: archetype.to_string(),
        offense,
        defense,
        speed,
        is_idle: true,
    }
}

pub(crate) fn combat_unit(id: u64, owner: PlayerId, pos: CellPos) -> AgentSnapshot {
    snapshot(
        id,
        owner,
        pos,
        Capabilities::COMBAT | Capabilities::MOBILE,
        "fighter",
        10,
        5,
        5,
    )
}

pub(crate) fn mobile_unit(id: u64, owner: PlayerId, pos: CellPos) -> AgentSnapshot {
    snapshot(id, owner, pos, Capabilities::MOBILE, "transport", 0, 5, 6)
}

pub(crate) fn structure(id: u64, owner: PlayerId, pos: CellPos) -> AgentSnapshot {
    snapshot(id, owner, pos, Capabilities::STRUCTURE, "depot", 0, 20, 0)
}

pub(crate) fn defense_structure(id: u64, owner: PlayerId, pos: CellPos) -> AgentSnapshot {
    snapshot(
        id,
        owner,
        pos,
        Capabilities::STRUCTURE
            | Capabilities::POINT_DEFENSE
            | Capabilities::COMBAT
            | Capabilities::ANTI_AIR,
        "turret",
        10,
        10,
        0,
    )
}

pub(crate) fn base_builder(id: u64, owner: PlayerId, pos: CellPos) -> AgentSnapshot {
    snapshot(
        id,
        owner,
        pos,
        Capabilities::STRUCTURE | Capabilities::BASE_BUILDER,
        "conyard",
        0,
        20,
        0,
    )
}

pub(crate) fn production_structure(id: u64, owner: PlayerId, pos: CellPos) -> AgentSnapshot {
    snapshot(
        id,
        owner,
        pos,
        Capabilities::STRUCTURE | Capabilities::PRODUCTION,
        "factory",
        0,
        20,
        0,
    )
}

pub(crate) fn harvester_unit(id: u64, owner: PlayerId, pos: CellPos) -> AgentSnapshot {
    snapshot(
        id,
        owner,
        pos,
        Capabilities::MOBILE | Capabilities::HARVESTER,
        "harvester",
        0,
        8,
        4,
    )
}

pub(crate) fn aircraft_unit(id: u64, owner: PlayerId, pos: CellPos) -> AgentSnapshot {
    snapshot(
        id,
        owner,
        pos,
        Capabilities::AIRCRAFT | Capabilities::COMBAT | Capabilities::MOBILE,
        "fighter-jet",
        12,
        2,
        10,
    )
}

pub(crate) fn anti_air_unit(id: u64, owner: PlayerId, pos: CellPos) -> AgentSnapshot {
    snapshot(
        id,
        owner,
        pos,
        Capabilities::COMBAT | Capabilities::MOBILE | Capabilities::ANTI_AIR,
        "flak",
        10,
        5,
        5,
    )
}

pub(crate) fn naval_unit(id: u64, owner: PlayerId, pos: CellPos) -> AgentSnapshot {
    snapshot(
        id,
        owner,
        pos,
        Capabilities::NAVAL | Capabilities::COMBAT | Capabilities::MOBILE,
        "gunboat",
        10,
        5,
        5,
    )
}

pub(crate) fn naval_yard(id: u64, owner: PlayerId, pos: CellPos) -> AgentSnapshot {
    snapshot(
        id,
        owner,
        pos,
        Capabilities::STRUCTURE | Capabilities::NAVAL_PRODUCTION,
        "naval-yard",
        0,
        20,
        0,
    )
}

pub(crate) fn siege_unit(id: u64, owner: PlayerId, pos: CellPos) -> AgentSnapshot {
    snapshot(
        id,
        owner,
        pos,
        Capabilities::COMBAT | Capabilities::MOBILE | Capabilities::SIEGE,
        "artillery",
        25,
        5,
        3,
    )
}

pub(crate) fn capturer_unit(id: u64, owner: PlayerId, pos: CellPos) -> AgentSnapshot {
    snapshot(
        id,
        owner,
        pos,
        Capabilities::MOBILE | Capabilities::CAPTURER,
        "spy",
        0,
        2,
        6,
    )
}

pub(crate) fn capturable_structure(id: u64, owner: PlayerId, pos: CellPos) -> AgentSnapshot {
    snapshot(
        id,
        owner,
        pos,
        Capabilities::STRUCTURE | Capabilities::CAPTURABLE,
        "outpost",
        0,
        15,
        0,
    )
}

// ─── Fake world ─────────────────────────────────────────────────────────────

/// In-memory WorldView with scriptable agents, terrain and stances.
/// Query results are sorted by agent id so tests are order-stable no
/// matter how the backing map iterates.
pub(crate) struct GridWorld {
    width: i32,
    height: i32,
    agents: HashMap<AgentId, AgentSnapshot>,
    blocked: HashSet<CellPos>,
    resources: HashSet<CellPos>,
    hostilities: HashSet<(PlayerId, PlayerId)>,
    hidden: HashSet<(PlayerId, AgentId)>,
}

impl GridWorld {
    pub fn new(width: i32, height: i32) -> Self {
        GridWorld {
            width,
            height,
            agents: HashMap::new(),
            blocked: HashSet::new(),
            resources: HashSet::new(),
            hostilities: HashSet::new(),
            hidden: HashSet::new(),
        }
    }

    pub fn add_agent(&mut self, snapshot: AgentSnapshot) -> AgentId {
        let id = snapshot.id;
        self.agents.insert(id, snapshot);
        id
    }

    pub fn kill(&mut self, id: AgentId) {
        self.agents.remove(&id);
    }

    pub fn move_agent(&mut self, id: AgentId, pos: CellPos) {
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.pos = pos;
        }
    }

    pub fn set_idle(&mut self, id: AgentId, idle: bool) {
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.is_idle = idle;
        }
    }

    pub fn set_enemies(&mut self, a: PlayerId, b: PlayerId) {
        self.hostilities.insert((a, b));
        self.hostilities.insert((b, a));
    }

    pub fn block(&mut self, cell: CellPos) {
        self.blocked.insert(cell);
    }

    pub fn add_resource(&mut self, cell: CellPos) {
        self.resources.insert(cell);
    }

    pub fn hide_from(&mut self, viewer: PlayerId, agent: AgentId) {
        self.hidden.insert((viewer, agent));
    }

    fn sorted(&self, mut agents: Vec<AgentSnapshot>) -> Vec<AgentSnapshot> {
        agents.sort_by_key(|a| a.id);
        agents
    }
}

impl WorldView for GridWorld {
    fn agent(&self, id: AgentId) -> Option<AgentSnapshot> {
        self.agents.get(&id).cloned()
    }

    fn agents_in_radius(&self, center: CellPos, radius: i32) -> Vec<AgentSnapshot> {
        self.sorted(
            self.agents
                .values()
                .filter(|a| a.pos.in_range(center, radius))
                .cloned()
                .collect(),
        )
    }

    fn agents_in_box(&self, top_left: CellPos, bottom_right: CellPos) -> Vec<AgentSnapshot> {
        self.sorted(
            self.agents
                .values()
                .filter(|a| {
                    a.pos.x >= top_left.x
                        && a.pos.x <= bottom_right.x
                        && a.pos.y >= top_left.y
                        && a.pos.y <= bottom_right.y
                })
                .cloned()
                .collect(),
        )
    }

    fn all_agents(&self) -> Vec<AgentSnapshot> {
        self.sorted(self.agents.values().cloned().collect())
    }

    fn is_passable(&self, cell: CellPos, class: MoveClass) -> bool {
        let in_bounds =
            cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height;
        match class {
            MoveClass::Air => in_bounds,
            _ => in_bounds && !self.blocked.contains(&cell),
        }
    }

    fn is_resource(&self, cell: CellPos) -> bool {
        self.resources.contains(&cell)
    }

    fn are_enemies(&self, a: PlayerId, b: PlayerId) -> bool {
        self.hostilities.contains(&(a, b))
    }

    fn is_visible(&self, viewer: PlayerId, agent: AgentId) -> bool {
        self.agents.contains_key(&agent) && !self.hidden.contains(&(viewer, agent))
    }
}

// ─── Instrumented collaborators ─────────────────────────────────────────────

/// Pathfinder wrapper that counts invocations; used to assert that
/// routes are computed once per activation and never on fall-through.
#[derive(Default)]
pub(crate) struct RecordingPathfinder {
    inner: GridPathfinder,
    calls: Cell<usize>,
}

impl RecordingPathfinder {
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl PathProvider for RecordingPathfinder {
    fn find_path(&self, query: PathQuery<'_>) -> Vec<CellPos> {
        self.calls.set(self.calls.get() + 1);
        self.inner.find_path(query)
    }
}

#[derive(Default)]
pub(crate) struct SinkVec {
    pub commands: Vec<Command>,
}

impl CommandSink for SinkVec {
    fn accept(&mut self, command: Command) {
        self.commands.push(command);
    }
}

// ─── Harness ────────────────────────────────────────────────────────────────

/// Bundles a world, config and context plumbing for state-level tests.
pub(crate) struct Harness {
    pub world: GridWorld,
    pub config: AiConfig,
    pub router: ThreatRouter,
    pub pathfinder: RecordingPathfinder,
    pub orders: OrderQueue,
    pub rng: ChaCha8Rng,
    pub player: PlayerId,
    pub base_center: CellPos,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut AiConfig)) -> Self {
        let mut config = AiConfig::default();
        adjust(&mut config);
        let router = ThreatRouter::from_config(&config);
        Harness {
            world: GridWorld::new(80, 60),
            config,
            router,
            pathfinder: RecordingPathfinder::default(),
            orders: OrderQueue::new(),
            rng: ChaCha8Rng::seed_from_u64(11),
            player: PlayerId(0),
            base_center: CellPos::new(1, 1),
        }
    }

    pub fn ctx(&mut self) -> TickContext<'_> {
        TickContext {
            world: &self.world,
            pathfinder: &self.pathfinder,
            router: &self.router,
            config: &self.config,
            player: self.player,
            base_center: self.base_center,
            attack_center: None,
            orders: &mut self.orders,
            rng: &mut self.rng,
        }
    }

    pub fn queued_commands(&self) -> Vec<Command> {
        self.orders.iter().cloned().collect()
    }
}
