use serde::Serialize;

// ── Cycle states ──

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Submitting,
    Rendering,
    Failed,
}

// ── Valid transitions ──

const VALID_TRANSITIONS: &[(CycleState, &[CycleState])] = &[
    (
        CycleState::Idle,
        // Rendering directly: history replay
        &[CycleState::Submitting, CycleState::Rendering],
    ),
    (
        CycleState::Submitting,
        // Idle: cycle abandoned (new chat or dropped submission)
        &[CycleState::Rendering, CycleState::Failed, CycleState::Idle],
    ),
    (CycleState::Rendering, &[CycleState::Idle]),
    (CycleState::Failed, &[CycleState::Idle]),
];

pub fn is_valid_transition(from: CycleState, to: CycleState) -> bool {
    VALID_TRANSITIONS
        .iter()
        .any(|(f, targets)| *f == from && targets.contains(&to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use CycleState::*;

    #[test]
    fn query_and_error_paths() {
        assert!(is_valid_transition(Idle, Submitting));
        assert!(is_valid_transition(Submitting, Rendering));
        assert!(is_valid_transition(Rendering, Idle));
        assert!(is_valid_transition(Submitting, Failed));
        assert!(is_valid_transition(Failed, Idle));
    }

    #[test]
    fn replay_skips_submitting() {
        assert!(is_valid_transition(Idle, Rendering));
    }

    #[test]
    fn rejected_transitions() {
        assert!(!is_valid_transition(Idle, Failed));
        assert!(!is_valid_transition(Rendering, Submitting));
        assert!(!is_valid_transition(Failed, Rendering));
        assert!(!is_valid_transition(Rendering, Failed));
        assert!(!is_valid_transition(Idle, Idle));
    }
}
