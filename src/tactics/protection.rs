//! Protection and escort squads: short-lived formations raised around a
//! threatened asset. Both kinds dissolve back into the free pool once
//! their reason to exist is gone.

use super::{go_to_home_building, SquadState, TacticState, TickContext, Transition};
use crate::game::{Action, Capabilities};
use crate::military;
use crate::squad::{Squad, Target};

/// Radius scanned around the squad when hunting for the intruder.
const INTRUDER_SCAN_RADIUS: i32 = 8;

#[derive(Debug, Default)]
pub struct ProtectionIdle;

impl TacticState for ProtectionIdle {
    fn name(&self) -> &'static str {
        "protection_idle"
    }

    fn tick(&mut self, _squad: &mut Squad, _ctx: &mut TickContext<'_>) -> Option<Transition> {
        Some(Transition::to(SquadState::ProtectionAttack(
            ProtectionAttack::default(),
        )))
    }
}

#[derive(Debug, Default)]
pub struct ProtectionAttack {
    /// Remaining grace ticks for a target we cannot currently justify
    /// attacking (lost from sight and not a siege threat).
    backoff: Option<u32>,
}

impl ProtectionAttack {
    fn should_attack(&self, squad: &Squad, ctx: &TickContext<'_>) -> Option<bool> {
        let target = squad.target_agent(ctx.world)?;
        Some(
            ctx.world.is_visible(ctx.player, target.id)
                || target.caps.contains(Capabilities::SIEGE),
        )
    }
}

impl TacticState for ProtectionAttack {
    fn name(&self) -> &'static str {
        "protection_attack"
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        let members = squad.live_members(ctx.world);

        if !squad.target_valid(ctx.world) {
            let center = squad.center(ctx.world)?;
            match military::find_closest_attackable_enemy(
                ctx.world,
                ctx.player,
                &members,
                center,
                Some(INTRUDER_SCAN_RADIUS),
            ) {
                Some(intruder) => squad.set_target(Target::Agent(intruder.id)),
                None => {
                    return Some(Transition::to(SquadState::ProtectionFlee(ProtectionFlee)))
                }
            }
        }

        match self.should_attack(squad, ctx) {
            Some(true) => {
                self.backoff = None;
                let target_pos = squad.target_pos(ctx.world)?;
                for member in &members {
                    ctx.orders.push(member.id, Action::AttackMove(target_pos));
                }
                None
            }
            Some(false) => {
                let left = self
                    .backoff
                    .get_or_insert(ctx.config.protection_backoff_ticks);
                if *left == 0 {
                    self.backoff = None;
                    return Some(Transition::to(SquadState::ProtectionFlee(ProtectionFlee)));
                }
                *left -= 1;
                None
            }
            // Target vanished between the validity check and here; the
            // next tick re-acquires.
            None => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ProtectionFlee;

impl TacticState for ProtectionFlee {
    fn name(&self) -> &'static str {
        "protection_flee"
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        go_to_home_building(squad, ctx);
        Some(Transition::to(SquadState::ProtectionIdle(ProtectionIdle)))
    }

    fn deactivate(&mut self, squad: &mut Squad, _ctx: &mut TickContext<'_>) {
        // Protection duty is over; hand everyone back to the free pool.
        squad.disband();
    }
}

/// Station-keeping escort for a vulnerable friendly (typically a base
/// vehicle moving to an expansion site): the squad rides between its
/// charge and the nearest known enemy.
#[derive(Debug, Default)]
pub struct Escort {
    reference_enemy: Option<crate::game::AgentId>,
}

impl TacticState for Escort {
    fn name(&self) -> &'static str {
        "escort"
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        let members = squad.live_members(ctx.world);

        let Some(protected) = squad.target_agent(ctx.world) else {
            return Some(Transition::to(SquadState::ProtectionFlee(ProtectionFlee)));
        };
        if ctx.world.are_enemies(ctx.player, protected.owner) {
            return Some(Transition::to(SquadState::ProtectionFlee(ProtectionFlee)));
        }

        let center = squad.center(ctx.world)?;
        let reference = match self
            .reference_enemy
            .and_then(|id| ctx.world.agent(id))
            .filter(|a| ctx.world.are_enemies(ctx.player, a.owner))
        {
            Some(agent) => Some(agent),
            None => military::find_closest_attackable_enemy(
                ctx.world,
                ctx.player,
                &members,
                center,
                None,
            ),
        };
        // No enemy left anywhere: nothing to screen against.
        let Some(reference) = reference else {
            return None;
        };
        self.reference_enemy = Some(reference.id);

        if reference.pos == protected.pos {
            return None;
        }

        let station = protected
            .pos
            .toward(reference.pos, ctx.config.escort_lead_cells);
        for member in &members {
            ctx.orders.push(member.id, Action::AttackMove(station));
        }
        None
    }

    fn deactivate(&mut self, squad: &mut Squad, _ctx: &mut TickContext<'_>) {
        squad.disband();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{CellPos, PlayerId};
    use crate::squad::{SquadId, SquadKind};
    use crate::testkit::{combat_unit, mobile_unit, Harness};

    const ME: PlayerId = PlayerId(0);
    const FOE: PlayerId = PlayerId(1);

    #[test]
    fn protection_squad_attacks_visible_intruder() {
        let mut harness = Harness::new();
        harness.world.set_enemies(ME, FOE);
        let intruder = harness.world.add_agent(combat_unit(200, FOE, CellPos::new(12, 10)));

        let mut squad = Squad::new(SquadId::from_u128(4), SquadKind::Protection);
        for i in 0..2 {
            let id = harness
                .world
                .add_agent(combat_unit(140 + i, ME, CellPos::new(10, 10 + i as i32)));
            squad.add_member(id);
        }
        squad.set_target(Target::Agent(intruder));

        squad.update(&mut harness.ctx());

        assert_eq!(squad.state_name(), Some("protection_attack"));
        assert!(harness
            .queued_commands()
            .iter()
            .any(|c| matches!(c.action, Action::AttackMove(_))));
    }

    #[test]
    fn protection_backs_off_unseen_target_then_disbands() {
        let mut harness = Harness::with_config(|config| {
            config.protection_backoff_ticks = 2;
        });
        harness.world.set_enemies(ME, FOE);
        let intruder = harness.world.add_agent(combat_unit(200, FOE, CellPos::new(12, 10)));
        harness.world.hide_from(ME, intruder);

        let mut squad = Squad::new(SquadId::from_u128(4), SquadKind::Protection);
        let member = harness.world.add_agent(combat_unit(140, ME, CellPos::new(10, 10)));
        squad.add_member(member);
        squad.set_target(Target::Agent(intruder));

        // Backoff of 2 gives way on the third evaluation; the flee state
        // then disbands the squad on its way back to idle.
        for _ in 0..4 {
            squad.update(&mut harness.ctx());
        }
        assert!(!squad.is_valid());
        assert_eq!(squad.take_released(), vec![member]);
    }

    #[test]
    fn escort_stations_between_charge_and_threat() {
        let mut harness = Harness::new();
        harness.world.set_enemies(ME, FOE);
        let charge = harness.world.add_agent(mobile_unit(300, ME, CellPos::new(20, 20)));
        harness.world.add_agent(combat_unit(200, FOE, CellPos::new(40, 20)));

        let mut squad = Squad::new(SquadId::from_u128(5), SquadKind::Escort);
        let guard = harness.world.add_agent(combat_unit(140, ME, CellPos::new(19, 20)));
        squad.add_member(guard);
        squad.set_target(Target::Agent(charge));

        squad.update(&mut harness.ctx());

        let station = CellPos::new(30, 20);
        assert!(harness
            .queued_commands()
            .iter()
            .any(|c| c.agent == guard && c.action == Action::AttackMove(station)));
    }
}
