//! Pure target resolution for the priority ladder.

use crate::error::Violation;
use crate::state::Priority;

/// Priority an escalation should land on.
///
/// `None` steps one rung up; an explicit target must strictly outrank
/// `current`.
pub fn resolve_target(current: Priority, target: Option<Priority>) -> Result<Priority, Violation> {
    match target {
        None => current
            .next()
            .ok_or(Violation::AlreadyMaximumPriority { current }),
        Some(target) if target.rank() <= current.rank() => {
            Err(Violation::NonIncreasingPriority { current, target })
        }
        Some(target) => Ok(target),
    }
}
