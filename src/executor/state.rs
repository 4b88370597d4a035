//! Lifecycle of one supervised process.

use thiserror::Error;

/// Where a supervised process is in its lifecycle.
///
/// `NotStarted -> Running -> {Completed | Cancelled}` and
/// `NotStarted -> FailedToStart`. Terminal states never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Running,
    /// Exited on its own with this code (`-1` when killed by a signal).
    Completed(i32),
    Cancelled,
    FailedToStart(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid process state transition from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: ProcessState,
    pub to: ProcessState,
}

impl ProcessState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessState::Completed(_) | ProcessState::Cancelled | ProcessState::FailedToStart(_)
        )
    }

    /// Move to `next` if the lifecycle allows it.
    pub fn advance(self, next: ProcessState) -> Result<ProcessState, InvalidTransition> {
        use ProcessState::*;

        let allowed = matches!(
            (&self, &next),
            (NotStarted, Running)
                | (NotStarted, FailedToStart(_))
                | (Running, Completed(_))
                | (Running, Cancelled)
        );

        if allowed {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = ProcessState::NotStarted
            .advance(ProcessState::Running)
            .unwrap()
            .advance(ProcessState::Completed(0))
            .unwrap();
        assert_eq!(state, ProcessState::Completed(0));
        assert!(state.is_terminal());
    }

    #[test]
    fn test_start_failure_skips_running() {
        let state = ProcessState::NotStarted
            .advance(ProcessState::FailedToStart("missing".to_string()))
            .unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let terminals = [
            ProcessState::Completed(2),
            ProcessState::Cancelled,
            ProcessState::FailedToStart("denied".to_string()),
        ];
        for terminal in terminals {
            for next in [
                ProcessState::Running,
                ProcessState::Completed(0),
                ProcessState::Cancelled,
            ] {
                assert!(terminal.clone().advance(next).is_err());
            }
        }
    }

    #[test]
    fn test_cannot_complete_before_running() {
        let err = ProcessState::NotStarted
            .advance(ProcessState::Completed(0))
            .unwrap_err();
        assert_eq!(err.from, ProcessState::NotStarted);
        assert!(err.to_string().contains("invalid process state transition"));
    }
}
