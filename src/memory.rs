//! Compressed diagnostic snapshots of the orchestrator's squad state,
//! for host UIs and persistence tooling: serde -> bincode -> gzip ->
//! base64, decodable on the other side.

use crate::error::SnapshotError;
use crate::game::PlayerId;
use crate::orchestrator::Orchestrator;
use crate::squad::{SquadId, SquadKind, Target};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SquadRecord {
    pub id: SquadId,
    pub kind: SquadKind,
    pub state: Option<String>,
    pub member_count: usize,
    pub target: Option<Target>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SquadsSnapshot {
    pub tick: u64,
    pub player: PlayerId,
    pub free_pool: usize,
    pub pending_orders: usize,
    pub squads: Vec<SquadRecord>,
}

impl SquadsSnapshot {
    pub fn capture(orchestrator: &Orchestrator) -> Self {
        SquadsSnapshot {
            tick: orchestrator.ticks(),
            player: orchestrator.player(),
            free_pool: orchestrator.free_pool().len(),
            pending_orders: orchestrator.pending_orders(),
            squads: orchestrator
                .squads()
                .map(|squad| SquadRecord {
                    id: squad.id(),
                    kind: squad.kind(),
                    state: squad.state_name().map(str::to_string),
                    member_count: squad.members().len(),
                    target: squad.target(),
                })
                .collect(),
        }
    }
}

/// Encode a snapshot into a single printable string.
pub fn encode(snapshot: &SquadsSnapshot) -> Result<String, SnapshotError> {
    let raw = bincode::serialize(snapshot)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    let compressed = encoder.finish()?;
    Ok(STANDARD.encode(compressed))
}

/// Inverse of `encode`.
pub fn decode(text: &str) -> Result<SquadsSnapshot, SnapshotError> {
    let compressed = STANDARD.decode(text)?;
    let mut raw = Vec::new();
    GzDecoder::new(compressed.as_slice()).read_to_end(&mut raw)?;
    Ok(bincode::deserialize(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::CellPos;

    #[test]
    fn snapshot_survives_the_encode_decode_pipeline() {
        let snapshot = SquadsSnapshot {
            tick: 412,
            player: PlayerId(2),
            free_pool: 7,
            pending_orders: 3,
            squads: vec![SquadRecord {
                id: SquadId::from_u128(99),
                kind: SquadKind::GroundAssault,
                state: Some("ground_attack_move".to_string()),
                member_count: 9,
                target: Some(Target::Location(CellPos::new(40, 12))),
            }],
        };

        let text = encode(&snapshot).unwrap();
        assert!(!text.is_empty());
        let back = decode(&text).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn garbage_input_is_rejected_not_panicked() {
        assert!(decode("!!not base64!!").is_err());
        assert!(decode("AAAA").is_err());
    }
}
