use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// Smallest window handed to a single attempt while time allows.
pub const MIN_ATTEMPT_WINDOW: Duration = Duration::from_secs(2);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("i/o timeout")]
pub struct DeadlineExceeded;

/// Deadline for the next attempt when `remaining` candidates are left.
///
/// The time left is split evenly, but a slice is never smaller than
/// [`MIN_ATTEMPT_WINDOW`] unless the whole budget already is, in which case
/// the attempt gets everything that is left. `None` means no deadline.
pub fn partial_deadline(
    now: Instant,
    deadline: Option<Instant>,
    remaining: usize,
) -> Result<Option<Instant>, DeadlineExceeded> {
    let Some(deadline) = deadline else {
        return Ok(None);
    };
    let time_remaining = deadline
        .checked_duration_since(now)
        .filter(|d| !d.is_zero())
        .ok_or(DeadlineExceeded)?;

    let mut timeout = time_remaining / remaining.max(1) as u32;
    if timeout < MIN_ATTEMPT_WINDOW {
        timeout = time_remaining.min(MIN_ATTEMPT_WINDOW);
    }
    Ok(Some(now + timeout))
}
