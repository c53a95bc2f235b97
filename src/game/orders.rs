use super::agent::AgentId;
use super::position::CellPos;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A discrete named command addressed to one agent, matching what the
/// host simulation's order pipeline accepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Move(CellPos),
    AttackMove(CellPos),
    Attack(AgentId),
    Guard(AgentId),
    Capture(AgentId),
    Harvest(Option<CellPos>),
    Produce,
    Stop,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub agent: AgentId,
    pub action: Action,
}

impl Command {
    pub fn new(agent: AgentId, action: Action) -> Self {
        Command { agent, action }
    }
}

/// Receiver for drained commands. The sink applies them on its own
/// schedule and does not promise to preserve within-tick ordering.
pub trait CommandSink {
    fn accept(&mut self, command: Command);
}

/// Pending command buffer owned by the orchestrator. Decisions enqueue
/// here freely; delivery to the sink is rate-limited so a burst of squad
/// activity cannot flood a single simulation step.
#[derive(Debug, Default)]
pub struct OrderQueue {
    pending: VecDeque<Command>,
}

impl OrderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, agent: AgentId, action: Action) {
        self.pending.push_back(Command::new(agent, action));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Inspect pending commands without disturbing the queue.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.pending.iter()
    }

    /// Deliver `ceil(pending / quotient)` commands to the sink, so at
    /// least a fixed fraction of the backlog clears every tick while the
    /// per-tick burst stays bounded. Returns the number delivered.
    pub fn drain_into(&mut self, quotient: u32, sink: &mut dyn CommandSink) -> usize {
        let quotient = quotient.max(1) as usize;
        let batch = (self.pending.len() + quotient - 1) / quotient;
        let batch = batch.min(self.pending.len());
        for _ in 0..batch {
            if let Some(command) = self.pending.pop_front() {
                sink.accept(command);
            }
        }
        batch
    }
}
