pub mod agent;
pub mod orders;
pub mod position;
pub mod world;

pub use agent::{AgentId, AgentSnapshot, Capabilities, MoveClass, PlayerId};
pub use orders::{Action, Command, CommandSink, OrderQueue};
pub use position::CellPos;
pub use world::{ClosestItertools, WorldView};
