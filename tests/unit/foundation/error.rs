use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        RasterError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        RasterError::interrupted("x")
            .to_string()
            .contains("interrupted:")
    );
    assert!(
        RasterError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert!(
        RasterError::AlreadyDispatched
            .to_string()
            .contains("only once")
    );
}

#[test]
fn stale_epoch_reports_both_values() {
    let err = RasterError::StaleEpoch {
        captured: 3,
        current: 5,
    };
    let msg = err.to_string();
    assert!(msg.contains('3'));
    assert!(msg.contains('5'));
    assert!(err.is_cancellation());
}

#[test]
fn invalid_state_names_operation_and_state() {
    let err = RasterError::InvalidState {
        op: "register a pass",
        state: DispatchState::Completed,
    };
    let msg = err.to_string();
    assert!(msg.contains("register a pass"));
    assert!(msg.contains("Completed"));
    assert!(!err.is_cancellation());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = RasterError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert!(!err.is_cancellation());
}
