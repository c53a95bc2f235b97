//! Force comparison backing the attack-or-flee and rush-worthiness
//! decisions. The exact weights are policy, not contract: the only
//! guarantee callers rely on is monotonicity -- adding strength to one
//! side never shifts the verdict in that side's disfavor.

use crate::game::AgentSnapshot;

/// Engagement verdict for a prospective fight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Engagement {
    Attack,
    Avoid,
}

/// Contribution of a single agent to its side's aggregate strength.
/// Offense counts fully, defense at half; non-combatants contribute
/// nothing no matter how tough they are.
pub fn combat_strength(agent: &AgentSnapshot) -> i64 {
    if !agent.is_combatant() {
        return 0;
    }
    let offense = agent.offense.max(0) as i64;
    let defense = agent.defense.max(0) as i64;
    offense * 2 + defense
}

pub fn force_strength(agents: &[AgentSnapshot]) -> i64 {
    agents.iter().map(combat_strength).sum()
}

/// Compare forces at the given confidence level. Attack when
/// `own * 100 >= enemy * confidence_percent`; a confidence above 100
/// demands an outright advantage (used for rushes), below 100 tolerates
/// a slight disadvantage.
pub fn evaluate(
    own: &[AgentSnapshot],
    enemies: &[AgentSnapshot],
    confidence_percent: u32,
) -> Engagement {
    if can_attack(own, enemies, confidence_percent) {
        Engagement::Attack
    } else {
        Engagement::Avoid
    }
}

pub fn can_attack(
    own: &[AgentSnapshot],
    enemies: &[AgentSnapshot],
    confidence_percent: u32,
) -> bool {
    let own_power = force_strength(own);
    if own_power == 0 {
        return false;
    }
    let enemy_power = force_strength(enemies);
    own_power * 100 >= enemy_power * confidence_percent as i64
}
