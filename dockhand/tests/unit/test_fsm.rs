//! FSM unit tests

use dockhand::deploy::fsm::{DeployEvent, DeployFsm, DeployPhase};
use dockhand::errors::DeployError;

const PHASES: [DeployPhase; 8] = [
    DeployPhase::SyncingSource,
    DeployPhase::SnapshottingImage,
    DeployPhase::Building,
    DeployPhase::TearingDown,
    DeployPhase::PurgingLogs,
    DeployPhase::Starting,
    DeployPhase::PruningImages,
    DeployPhase::Verifying,
];

#[test]
fn test_fsm_initial_state() {
    let fsm = DeployFsm::new();
    assert_eq!(fsm.phase(), DeployPhase::Pending);
    assert!(fsm.error().is_none());
    assert!(fsm.failed_at().is_none());
    assert!(fsm.completed().is_empty());
}

#[test]
fn test_fsm_success_flow() {
    let mut fsm = DeployFsm::new();
    assert_eq!(fsm.process(DeployEvent::Start).unwrap(), DeployPhase::SyncingSource);

    for expected in PHASES {
        assert_eq!(fsm.phase(), expected);
        fsm.process(DeployEvent::PhaseDone).unwrap();
    }

    assert!(fsm.is_complete());
    assert_eq!(fsm.completed(), &PHASES[..]);
}

#[test]
fn test_fsm_failure_is_terminal() {
    let mut fsm = DeployFsm::new();
    fsm.process(DeployEvent::Start).unwrap();
    fsm.process(DeployEvent::PhaseDone).unwrap();
    fsm.process(DeployEvent::PhaseDone).unwrap();
    fsm.process(DeployEvent::PhaseFailed("compile error".to_string()))
        .unwrap();

    assert_eq!(fsm.phase(), DeployPhase::Failed);
    assert_eq!(fsm.failed_at(), Some(DeployPhase::Building));
    assert_eq!(fsm.error(), Some("compile error"));
    assert_eq!(
        fsm.completed(),
        &[DeployPhase::SyncingSource, DeployPhase::SnapshottingImage]
    );

    let result = fsm.process(DeployEvent::PhaseDone);
    assert!(matches!(result, Err(DeployError::InvalidTransition(_))));
    assert_eq!(fsm.phase(), DeployPhase::Failed);
}

#[test]
fn test_fsm_invalid_transition() {
    let mut fsm = DeployFsm::new();

    // Cannot finish a phase before starting
    let result = fsm.process(DeployEvent::PhaseDone);
    assert!(result.is_err());
    assert_eq!(fsm.phase(), DeployPhase::Pending);

    // Cannot start twice
    fsm.process(DeployEvent::Start).unwrap();
    assert!(fsm.process(DeployEvent::Start).is_err());
    assert_eq!(fsm.phase(), DeployPhase::SyncingSource);
}

#[test]
fn test_fsm_completed_rejects_events() {
    let mut fsm = DeployFsm::new();
    fsm.process(DeployEvent::Start).unwrap();
    for _ in PHASES {
        fsm.process(DeployEvent::PhaseDone).unwrap();
    }
    assert!(fsm.process(DeployEvent::PhaseFailed("late".to_string())).is_err());
    assert!(fsm.is_complete());
    assert!(fsm.error().is_none());
}

#[test]
fn test_phase_serializes_snake_case() {
    let json = serde_json::to_string(&DeployPhase::PruningImages).unwrap();
    assert_eq!(json, "\"pruning_images\"");
    assert_eq!(DeployPhase::TearingDown.to_string(), "teardown");
}
