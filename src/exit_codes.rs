//! Exit code constants for the bimbridge CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unreadable record)
//! - 2: Pipeline failure (processor exited nonzero)
//! - 3: Start failure (executable missing, precondition violated)
//! - 4: Cancelled (user or deadline)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid local state.
pub const USER_ERROR: i32 = 1;

/// The external processor ran and exited with a nonzero code.
pub const PIPELINE_FAILURE: i32 = 2;

/// The external processor could not be started.
pub const START_FAILURE: i32 = 3;

/// The run was cancelled before the processor exited.
pub const CANCELLED: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, PIPELINE_FAILURE, START_FAILURE, CANCELLED];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(SUCCESS, 0);
    }
}
