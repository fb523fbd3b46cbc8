//! Weak-fairness semantics on small hand-built models.

use stateright::Model;

use super::*;
use crate::{
    explorer::{ExploreOptions, check},
    verdict::{Verdict, ViolationKind},
};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
enum Class {
    Step,
    Finish,
    Flip,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum Move {
    /// 0 -> 1, fair.
    Advance,
    /// 1 -> 0, unfair.
    Retreat,
    /// -> 2, fair.
    Finish,
}

/// Shuttles between 0 and 1 until it finishes in 2.
///
/// With `finish_from_start` unset, finishing is only possible from 1, so the
/// shuttle can dodge it forever without being unfair.
struct Shuttle {
    finish_from_start: bool,
}

impl Model for Shuttle {
    type State = u8;
    type Action = Move;

    fn init_states(&self) -> Vec<Self::State> { vec![0] }

    fn actions(&self, state: &Self::State, actions: &mut Vec<Self::Action>) {
        match *state {
            0 => {
                actions.push(Move::Advance);
                if self.finish_from_start {
                    actions.push(Move::Finish);
                }
            }
            1 => actions.extend([Move::Retreat, Move::Finish]),
            _ => {}
        }
    }

    fn next_state(&self, _state: &Self::State, action: Self::Action) -> Option<Self::State> {
        Some(match action {
            Move::Advance => 1,
            Move::Retreat => 0,
            Move::Finish => 2,
        })
    }
}

impl FairModel for Shuttle {
    type Fairness = Class;

    fn fairness(&self, action: &Self::Action) -> Option<Self::Fairness> {
        match action {
            Move::Advance => Some(Class::Step),
            Move::Finish => Some(Class::Finish),
            Move::Retreat => None,
        }
    }

    fn action_label(&self, action: &Self::Action) -> String { format!("{action:?}") }

    fn temporal_properties(&self) -> Vec<TemporalProperty<Self>> {
        vec![
            TemporalProperty::infinitely_often("finishes", |_, state| *state == 2),
            TemporalProperty::not_forever("shuttles forever", |_, state| *state < 2),
        ]
    }
}

/// Flips a bit forever; a separate `Park` move stops in a dead end.
struct Toggle {
    can_park: bool,
}

impl Model for Toggle {
    type State = u8;
    type Action = u8;

    fn init_states(&self) -> Vec<Self::State> { vec![0] }

    fn actions(&self, state: &Self::State, actions: &mut Vec<Self::Action>) {
        if *state < 2 {
            actions.push(1 - *state);
            if self.can_park {
                actions.push(2);
            }
        }
    }

    fn next_state(&self, _state: &Self::State, action: Self::Action) -> Option<Self::State> {
        Some(action)
    }
}

impl FairModel for Toggle {
    type Fairness = Class;

    fn fairness(&self, action: &Self::Action) -> Option<Self::Fairness> {
        (*action < 2).then_some(Class::Flip)
    }

    fn action_label(&self, action: &Self::Action) -> String { format!("goto {action}") }

    fn temporal_properties(&self) -> Vec<TemporalProperty<Self>> {
        vec![TemporalProperty::infinitely_often("visits one", |_, state| *state == 1)]
    }
}

#[test]
fn intermittently_enabled_exit_admits_fair_cycle() {
    let report = check(
        &Shuttle {
            finish_from_start: false,
        },
        &ExploreOptions::default(),
    );
    let violation = report.verdict.violation("finishes").expect("liveness violated");
    assert_eq!(violation.kind, ViolationKind::Liveness);
    assert_eq!(violation.trace.depth(), 0);
    let labels: Vec<Option<&str>> = violation
        .trace
        .cycle
        .iter()
        .map(|step| step.action.as_deref())
        .collect();
    assert_eq!(labels, vec![Some("Advance"), Some("Retreat")]);
    assert_eq!(violation.trace.cycle.last().map(|step| step.state), Some(0));
    assert!(!violation.trace.stutters);
}

#[test]
fn safety_uses_the_same_cycle_test() {
    let report = check(
        &Shuttle {
            finish_from_start: false,
        },
        &ExploreOptions::default(),
    );
    let violation = report
        .verdict
        .violation("shuttles forever")
        .expect("safety violated");
    assert_eq!(violation.kind, ViolationKind::Safety);
    assert_eq!(violation.trace.cycle.len(), 2);
}

#[test]
fn continuously_enabled_exit_excludes_unfair_cycle() {
    let report = check(
        &Shuttle {
            finish_from_start: true,
        },
        &ExploreOptions::default(),
    );
    assert_eq!(report.verdict, Verdict::Verified);
}

#[test]
fn dead_end_in_bad_region_is_fair_stutter() {
    let report = check(&Toggle { can_park: true }, &ExploreOptions::default());
    let violation = report.verdict.violation("visits one").expect("liveness violated");
    assert!(violation.trace.stutters);
    assert!(violation.trace.cycle.is_empty());
    assert_eq!(violation.trace.last_state(), Some(&2));
    assert_eq!(violation.trace.depth(), 1);
}

#[test]
fn fair_toggle_keeps_returning() {
    let report = check(&Toggle { can_park: false }, &ExploreOptions::default());
    assert!(report.verdict.is_verified());
}

#[test]
fn temporal_properties_can_be_deselected() {
    let options = ExploreOptions {
        properties: crate::explorer::PropertySelection::INVARIANTS,
        ..ExploreOptions::default()
    };
    let report = check(&Toggle { can_park: true }, &options);
    assert!(report.verdict.is_verified());
}

#[test]
fn bad_region_excludes_unexpanded_states() {
    let options = ExploreOptions {
        max_depth: Some(0),
        ..ExploreOptions::default()
    };
    let report = check(&Toggle { can_park: true }, &options);
    assert!(matches!(report.verdict, Verdict::Inconclusive(_)));
}

#[test]
fn bad_region_kinds_are_complementary() {
    let model = Toggle { can_park: false };
    let recurring = TemporalProperty::<Toggle>::infinitely_often("one", |_, state| *state == 1);
    let persistent = TemporalProperty::<Toggle>::not_forever("one", |_, state| *state == 1);
    assert!(recurring.in_bad_region(&model, &0));
    assert!(!recurring.in_bad_region(&model, &1));
    assert!(persistent.in_bad_region(&model, &1));
    assert!(!persistent.in_bad_region(&model, &0));
}
