//! vanguard -- a reactive tactical layer for RTS bots: groups units into
//! goal-directed squads, drives each squad through a per-kind state
//! machine, routes advances around known point defenses and keeps
//! per-tick command issuance bounded.
//!
//! The host simulation stays in charge of the world: it implements
//! [`WorldView`] and [`CommandSink`] (and optionally [`PathProvider`]),
//! constructs an [`Orchestrator`] per bot player, and calls
//! [`Orchestrator::tick`] once per decision step plus
//! [`Orchestrator::damage`] for reactive events.

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod game;
pub mod logging;
pub mod memory;
pub mod military;
pub mod orchestrator;
pub mod pathing;
pub mod squad;
pub mod tactics;

#[cfg(test)]
pub(crate) mod testkit;

pub use config::AiConfig;
pub use error::{ConfigError, SnapshotError};
pub use game::{
    Action, AgentId, AgentSnapshot, Capabilities, CellPos, Command, CommandSink, MoveClass,
    OrderQueue, PlayerId, WorldView,
};
pub use memory::{SquadRecord, SquadsSnapshot};
pub use orchestrator::Orchestrator;
pub use pathing::{GridPathfinder, InfluenceMap, PathProvider, PathQuery, Route, ThreatRouter};
pub use squad::{Squad, SquadId, SquadKind, Target};
pub use tactics::{SquadState, StateMachine, TickContext, Transition};
