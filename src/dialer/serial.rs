use tokio::time::Instant;
use tracing::{debug, trace};

use crate::common::{DialContext, DialError};

use super::deadline::partial_deadline;
use super::socket::{context_error, Connect};
use super::Network;

/// Try each candidate in order and return the first connection.
///
/// The context's remaining time is shared across the candidates that have
/// not been attempted yet. When every candidate fails, the first error seen
/// is returned.
pub async fn dial_serial<C>(
    connector: &C,
    ctx: &DialContext,
    network: Network,
    addrs: &[String],
) -> Result<C::Conn, DialError>
where
    C: Connect + ?Sized,
{
    let mut first_err: Option<DialError> = None;

    for (i, addr) in addrs.iter().enumerate() {
        if let Some(err) = ctx.err() {
            return Err(context_error(err, network, addr));
        }

        let deadline = ctx.deadline();
        let attempt_deadline = match partial_deadline(Instant::now(), deadline, addrs.len() - i) {
            Ok(d) => d,
            Err(_) => {
                // Ran out of time.
                first_err.get_or_insert_with(|| DialError::Timeout {
                    network,
                    addr: addr.clone(),
                });
                break;
            }
        };

        let attempt_ctx = match (attempt_deadline, deadline) {
            (Some(partial), Some(overall)) if partial < overall => ctx.child().with_deadline(partial),
            _ => ctx.clone(),
        };

        trace!(network = %network, addr = %addr, remaining = addrs.len() - i, "dial attempt");
        match connector.connect(&attempt_ctx, network, addr).await {
            Ok(conn) => return Ok(conn),
            Err(err) => {
                debug!(network = %network, addr = %addr, error = %err, "dial attempt failed");
                first_err.get_or_insert(err);
            }
        }
    }

    Err(first_err.unwrap_or(DialError::MissingAddress { network }))
}
