use super::position::CellPos;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable external identity of a simulation entity. The engine never owns
/// agent lifetime; an id is only useful through `WorldView::agent`, which
/// revalidates liveness on every lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u16);

bitflags! {
    /// Capability tags reported by the host simulation for each agent.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        const MOBILE           = 1 << 0;
        const COMBAT           = 1 << 1;
        const AIRCRAFT         = 1 << 2;
        const NAVAL            = 1 << 3;
        const STRUCTURE        = 1 << 4;
        const POINT_DEFENSE    = 1 << 5;
        const SIEGE            = 1 << 6;
        const HARVESTER        = 1 << 7;
        const CAPTURER         = 1 << 8;
        const CAPTURABLE       = 1 << 9;
        const PRODUCTION       = 1 << 10;
        const BASE_BUILDER     = 1 << 11;
        const NAVAL_PRODUCTION = 1 << 12;
        const ANTI_AIR         = 1 << 13;
    }
}

/// Locomotion class used to restrict path passability to cells the
/// representative unit can actually enter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveClass {
    Ground,
    Naval,
    Air,
}

/// Point-in-time copy of an agent as reported by the world query service.
/// Snapshots are never cached across ticks; holding one does not keep the
/// underlying agent alive.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub owner: PlayerId,
    pub pos: CellPos,
    pub caps: Capabilities,
    /// Unit archetype name, used for configured exclusion lists.
    pub archetype: String,
    pub offense: i32,
    pub defense: i32,
    /// Nominal movement speed; slower units anchor squad movement.
    pub speed: i32,
    /// Whether the simulation reports the agent as having no current
    /// activity. Commands are applied asynchronously, so a freshly ordered
    /// agent may keep reporting non-idle for several ticks.
    pub is_idle: bool,
}

impl AgentSnapshot {
    pub fn is_combatant(&self) -> bool {
        self.caps.contains(Capabilities::COMBAT)
    }

    pub fn is_structure(&self) -> bool {
        self.caps.contains(Capabilities::STRUCTURE)
    }

    pub fn is_aircraft(&self) -> bool {
        self.caps.contains(Capabilities::AIRCRAFT)
    }

    /// Whether this agent's weapons can engage the given target at all.
    /// Airborne targets need an anti-air capable attacker.
    pub fn can_attack_target(&self, target: &AgentSnapshot) -> bool {
        if !self.is_combatant() {
            return false;
        }
        if target.is_aircraft() && !self.caps.contains(Capabilities::ANTI_AIR) {
            return false;
        }
        true
    }

    pub fn move_class(&self) -> MoveClass {
        if self.is_aircraft() {
            MoveClass::Air
        } else if self.caps.contains(Capabilities::NAVAL) {
            MoveClass::Naval
        } else {
            MoveClass::Ground
        }
    }
}
