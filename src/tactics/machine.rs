use super::{SquadState, TickContext};
use crate::squad::Squad;
use log::{error, warn};

/// Hard cap on transitions a single tick may chain through. A squad
/// bouncing between states faster than this is a logic bug, not a
/// tactical situation.
pub const MAX_STATE_TRANSITIONS: u32 = 20;

/// Requested state change, returned by a state's tick instead of being
/// applied in place so activation and deactivation stay under the
/// machine's control.
pub enum Transition {
    To {
        state: SquadState,
        record_previous: bool,
    },
    Revert {
        record_current: bool,
    },
}

impl Transition {
    pub fn to(state: SquadState) -> Self {
        Transition::To {
            state,
            record_previous: true,
        }
    }
}

/// Per-squad state machine: exactly one active state, plus a single-slot
/// memory of the previous state for revert-style sub-routines.
/// Activate/deactivate calls are strictly paired, including across
/// reverts.
#[derive(Default)]
pub struct StateMachine {
    current: Option<SquadState>,
    previous: Option<SquadState>,
}

impl StateMachine {
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_name(&self) -> Option<&'static str> {
        self.current.as_ref().map(|s| s.name())
    }

    /// Deactivate the current state (stashing it when `record_previous`),
    /// then activate and install `new_state`. The new state receives its
    /// first tick on the same machine tick.
    pub fn change_state(
        &mut self,
        squad: &mut Squad,
        ctx: &mut TickContext<'_>,
        new_state: SquadState,
        record_previous: bool,
    ) {
        if let Some(mut old) = self.current.take() {
            old.deactivate(squad, ctx);
            if record_previous {
                self.previous = Some(old);
            }
        }

        let mut new_state = new_state;
        new_state.activate(squad, ctx);
        self.current = Some(new_state);
    }

    /// Swap back to the recorded previous state. Returns false (leaving
    /// the current state in place) when there is nothing to revert to.
    pub fn revert_to_previous(
        &mut self,
        squad: &mut Squad,
        ctx: &mut TickContext<'_>,
        record_current: bool,
    ) -> bool {
        let Some(mut resumed) = self.previous.take() else {
            return false;
        };

        if let Some(mut old) = self.current.take() {
            old.deactivate(squad, ctx);
            if record_current {
                self.previous = Some(old);
            }
        }

        resumed.activate(squad, ctx);
        self.current = Some(resumed);
        true
    }

    /// Drive the current state, applying any requested transitions until
    /// the active state settles for this tick.
    pub fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) {
        let mut transitions = 0u32;
        loop {
            let Some(current) = self.current.as_mut() else {
                return;
            };
            let Some(transition) = current.tick(squad, ctx) else {
                return;
            };

            match transition {
                Transition::To {
                    state,
                    record_previous,
                } => self.change_state(squad, ctx, state, record_previous),
                Transition::Revert { record_current } => {
                    if !self.revert_to_previous(squad, ctx, record_current) {
                        warn!("squad {} tried to revert with no previous state", squad.id());
                        return;
                    }
                }
            }

            transitions += 1;
            if transitions >= MAX_STATE_TRANSITIONS {
                error!(
                    "State machine '{}' exceeded {} transitions in a single tick, breaking to prevent infinite loop",
                    squad.id(),
                    MAX_STATE_TRANSITIONS
                );
                return;
            }
        }
    }
}

#[cfg(test)]
pub mod probe {
    use super::*;
    use crate::squad::Squad;
    use crate::tactics::TickContext;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Lifecycle bookkeeping shared by every probe state in a test.
    #[derive(Debug, Default)]
    pub struct ProbeLog {
        pub activations: u32,
        pub deactivations: u32,
        pub active_now: u32,
        pub max_active: u32,
        pub ticks: Vec<&'static str>,
    }

    /// Scriptable state used to exercise the machine itself: records
    /// activate/tick/deactivate calls and plays back a fixed sequence of
    /// transitions.
    pub struct ProbeState {
        pub label: &'static str,
        pub log: Rc<RefCell<ProbeLog>>,
        pub script: VecDeque<Transition>,
    }

    impl ProbeState {
        pub fn new(label: &'static str, log: Rc<RefCell<ProbeLog>>) -> Self {
            ProbeState {
                label,
                log,
                script: VecDeque::new(),
            }
        }

        pub fn scripted(
            label: &'static str,
            log: Rc<RefCell<ProbeLog>>,
            script: Vec<Transition>,
        ) -> Self {
            ProbeState {
                label,
                log,
                script: script.into(),
            }
        }

        pub fn on_activate(&mut self) {
            let mut log = self.log.borrow_mut();
            log.activations += 1;
            log.active_now += 1;
            log.max_active = log.max_active.max(log.active_now);
        }

        pub fn on_deactivate(&mut self) {
            let mut log = self.log.borrow_mut();
            log.deactivations += 1;
            log.active_now -= 1;
        }

        pub fn on_tick(&mut self) -> Option<Transition> {
            self.log.borrow_mut().ticks.push(self.label);
            self.script.pop_front()
        }
    }

    impl crate::tactics::TacticState for ProbeState {
        fn name(&self) -> &'static str {
            "probe"
        }

        fn activate(&mut self, _squad: &mut Squad, _ctx: &mut TickContext<'_>) {
            self.on_activate();
        }

        fn tick(&mut self, _squad: &mut Squad, _ctx: &mut TickContext<'_>) -> Option<Transition> {
            self.on_tick()
        }

        fn deactivate(&mut self, _squad: &mut Squad, _ctx: &mut TickContext<'_>) {
            self.on_deactivate();
        }
    }
}
