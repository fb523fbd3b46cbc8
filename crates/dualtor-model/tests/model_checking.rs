//! Integration tests for the dual-ToR model across all three search modes.


use dualtor_model::{
    ExplorationRequest,
    Outcome,
    RunReport,
    explorer::{ExploreOptions, PropertySelection, check, explore},
    request::ExplorationMode,
    run,
    simulation::{RoundRobin, Simulation},
    tor_model::{
        DualTorModel,
        actions::{Action, FairnessClass},
        faults::{Fault, FaultSet},
        heartbeat::HeartbeatSignal,
        properties::{
            CAN_CRASH_A_TOR_NAME,
            CAN_REACH_GOAL_ACTIVE_NAME,
            CAN_SCHEDULE_SWITCH_NAME,
            NOT_FOREVER_BOTH_ACTIVE_NAME,
            REPEATEDLY_ONE_ACTIVE_NAME,
            is_channel_exclusive,
            moves_cable_only_on_command,
        },
        state::{MuxState, TorId},
    },
    verdict::{Verdict, ViolationKind},
};
use rstest::rstest;
use verification_harness::{MIN_STATE_COUNT, verify_model};

/// Brings both controllers up with torA settled active and torB standby.
const SETTLE_WITH_A_ACTIVE: [Action; 9] = [
    Action::LinkUp { tor: TorId::A },
    Action::LinkUp { tor: TorId::B },
    Action::TriggerCheck { tor: TorId::A },
    Action::AckCheck { tor: TorId::A },
    Action::TriggerCheck { tor: TorId::B },
    Action::AckCheck { tor: TorId::B },
    Action::SendHeartbeat { tor: TorId::A },
    Action::ProbeLink {
        tor: TorId::A,
        signal: HeartbeatSignal::From(TorId::A),
    },
    Action::ProbeLink {
        tor: TorId::B,
        signal: HeartbeatSignal::From(TorId::A),
    },
];

fn booted_at_a(faults: FaultSet) -> DualTorModel {
    DualTorModel {
        initial_active: vec![TorId::A],
        ..DualTorModel::with_faults(faults)
    }
}

#[test]
fn fault_free_model_reaches_every_protocol_goal() {
    let outcome = verify_model(&DualTorModel::fault_free(), &[
        CAN_REACH_GOAL_ACTIVE_NAME,
        CAN_SCHEDULE_SWITCH_NAME,
    ]);
    assert!(
        outcome.is_verified(),
        "reachability missing: {}, safety counterexamples: {}",
        outcome.missing_reachability,
        outcome.safety_counterexamples
    );
    assert!(outcome.unique_state_count >= MIN_STATE_COUNT);
}

#[test]
fn faulty_model_can_crash_a_controller() {
    let outcome = verify_model(&DualTorModel::default(), &[CAN_CRASH_A_TOR_NAME]);
    assert!(
        outcome.is_verified(),
        "reachability missing: {}, safety counterexamples: {}",
        outcome.missing_reachability,
        outcome.safety_counterexamples
    );
}

#[test]
fn standby_takes_over_after_active_crash() {
    let model = booted_at_a(FaultSet::FAIL_TOR);
    let mut sim = Simulation::from_initial(&model).expect("initial state");
    let settled = sim.replay(SETTLE_WITH_A_ACTIVE).expect("script enabled");
    assert!(settled.tor_a.is_goal_active());
    assert_eq!(settled.tor_b.mux_state, MuxState::Standby);

    sim.step(Action::Fault(Fault::FailTor { tor: TorId::A }))
        .expect("crash enabled");
    let mut scheduler = RoundRobin::new(FairnessClass::ROUND_ROBIN.to_vec());
    let steps = sim
        .run_fair_until(&mut scheduler, |state| state.tor_b.is_goal_active(), 50)
        .expect("standby recovers");

    assert!(steps > 0);
    assert_eq!(sim.state().mux.active, TorId::B);
    assert!(!sim.state().tor_a.alive);
    let trace = sim.into_trace();
    assert_eq!(trace.depth(), SETTLE_WITH_A_ACTIVE.len() + 1 + steps);
    assert!(
        trace
            .steps
            .iter()
            .any(|step| step.action.as_deref() == Some("ExecSwitch"))
    );
}

#[test]
fn crashed_controller_cannot_be_scripted() {
    let model = booted_at_a(FaultSet::FAIL_TOR);
    let mut sim = Simulation::from_initial(&model).expect("initial state");
    sim.step(Action::Fault(Fault::FailTor { tor: TorId::A }))
        .expect("crash enabled");
    let err = sim
        .step(Action::LinkUp { tor: TorId::A })
        .expect_err("dead controller is inert");
    assert_eq!(
        err.to_string(),
        "step 1: action LinkUp(torA) is not enabled"
    );
}

#[rstest]
#[case(FaultSet::empty(), None)]
#[case(FaultSet::FAIL_TOR, Some(1))]
#[case(FaultSet::FAIL_XCVRD | FaultSet::FAIL_LINK_STATE, Some(1))]
fn invariants_hold_under_bounded_faults(#[case] faults: FaultSet, #[case] max_faults: Option<u8>) {
    let model = DualTorModel {
        max_faults,
        ..booted_at_a(faults)
    };
    let options = ExploreOptions {
        max_states: 50_000,
        properties: PropertySelection::INVARIANTS,
        ..ExploreOptions::default()
    };
    let report = check(&model, &options);
    assert!(
        !matches!(report.verdict, Verdict::Violated(_)),
        "unexpected violation: {:?}",
        report.verdict.violations().first().map(|v| v.property)
    );
    assert!(report.stats.states >= MIN_STATE_COUNT);
}

#[test]
fn exhaustive_search_covers_goal_active() {
    let options = ExploreOptions {
        max_states: 50_000,
        properties: PropertySelection::INVARIANTS,
        ..ExploreOptions::default()
    };
    let report = check(&booted_at_a(FaultSet::empty()), &options);
    let goal = report
        .coverage
        .iter()
        .find(|coverage| coverage.property == CAN_REACH_GOAL_ACTIVE_NAME)
        .expect("goal-active coverage reported");
    assert!(goal.reached);
    let crash = report
        .coverage
        .iter()
        .find(|coverage| coverage.property == CAN_CRASH_A_TOR_NAME)
        .expect("crash coverage reported");
    assert!(!crash.reached);
}

#[test]
fn random_walks_keep_the_channel_exclusive() {
    let request = ExplorationRequest {
        mode: ExplorationMode::Sample,
        seed: Some(7),
        walks: 20,
        walk_length: 60,
        properties: PropertySelection::INVARIANTS,
        ..ExplorationRequest::default()
    };
    let report = run(&request).expect("valid request");
    assert_eq!(report.outcome(), Outcome::Verified);
    let RunReport::Sample(sampled) = report else {
        panic!("expected a sampling report");
    };
    assert_eq!(sampled.seed, 7);
    assert!(sampled.distinct_states > 1);
}

#[test]
fn depth_bound_run_is_inconclusive() {
    let request = ExplorationRequest {
        max_depth: Some(3),
        properties: PropertySelection::INVARIANTS,
        ..ExplorationRequest::default()
    };
    let report = run(&request).expect("valid request");
    assert_eq!(report.outcome(), Outcome::Inconclusive);
    let RunReport::Exhaustive(checked) = report else {
        panic!("expected an exhaustive report");
    };
    assert_eq!(checked.stats.max_depth, 3);
    let deepest = checked.deepest_trace.expect("partial trace kept");
    assert!(deepest.steps.iter().all(|step| is_channel_exclusive(&step.state)));
}

#[test]
fn fault_free_model_verifies_every_property() {
    let report = check(&DualTorModel::fault_free(), &ExploreOptions::default());
    assert!(
        matches!(report.verdict, Verdict::Verified),
        "unexpected violations: {:?}",
        report
            .verdict
            .violations()
            .iter()
            .map(|violation| violation.property)
            .collect::<Vec<_>>()
    );
    assert!(report.stats.complete);
    assert!(report.stats.states >= MIN_STATE_COUNT);
}

#[test]
fn crash_holding_the_channel_blocks_recovery() {
    let model = DualTorModel {
        max_faults: Some(1),
        ..booted_at_a(FaultSet::FAIL_TOR)
    };
    let report = check(&model, &ExploreOptions::default());

    assert!(report.verdict.violation(NOT_FOREVER_BOTH_ACTIVE_NAME).is_none());
    let violation = report
        .verdict
        .violation(REPEATEDLY_ONE_ACTIVE_NAME)
        .expect("a crash can strand the survivor");
    assert_eq!(violation.kind, ViolationKind::Liveness);
    let crashed = violation
        .trace
        .steps
        .iter()
        .chain(&violation.trace.cycle)
        .filter_map(|step| step.action.as_deref())
        .any(|action| action.starts_with("FailTor("));
    assert!(crashed, "lasso must include the crash");
}

#[rstest]
#[case(FaultSet::FAIL_MUX)]
#[case(FaultSet::FAIL_HEARTBEAT)]
#[case(FaultSet::FAIL_MUX | FaultSet::FAIL_HEARTBEAT)]
fn single_fault_never_leaves_both_sides_active(#[case] faults: FaultSet) {
    let model = DualTorModel {
        max_faults: Some(1),
        ..DualTorModel::with_faults(faults)
    };
    let options = ExploreOptions {
        max_states: 100_000,
        properties: PropertySelection::SAFETY,
        ..ExploreOptions::default()
    };
    let report = check(&model, &options);
    assert!(
        report.verdict.violation(NOT_FOREVER_BOTH_ACTIVE_NAME).is_none(),
        "both controllers can stay active"
    );
}

#[rstest]
#[case(FaultSet::empty())]
#[case(FaultSet::all())]
fn cable_moves_only_on_command_along_every_step(#[case] faults: FaultSet) {
    let model = DualTorModel {
        max_faults: Some(1),
        ..DualTorModel::with_faults(faults)
    };
    let options = ExploreOptions {
        max_states: 50_000,
        ..ExploreOptions::default()
    };
    let exploration = explore(&model, &options);
    let graph = &exploration.graph;
    for node in graph.node_ids() {
        let before = graph.state(node);
        for edge in graph.edges(node) {
            assert!(
                moves_cable_only_on_command(before, &edge.action, graph.state(edge.target)),
                "{} moved the cable",
                edge.action
            );
        }
    }
}
