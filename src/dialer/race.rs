//! Dual-stack racing (RFC 6555 fast fallback).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::common::{DialContext, DialError};

use super::serial::dial_serial;
use super::socket::Connect;
use super::Network;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Primary,
    Fallback,
}

struct Outcome<T> {
    branch: Branch,
    result: Result<T, DialError>,
}

/// Race a serial dial over `primaries` against one over `fallbacks`.
///
/// The fallback branch starts after `fallback_delay`, or as soon as the
/// primary branch fails. The first connection delivered wins and the other
/// branch is cancelled; a connection that shows up after the race was
/// decided is closed. If both branches fail, the primary error is returned.
pub async fn dial_parallel<C: Connect>(
    connector: Arc<C>,
    ctx: &DialContext,
    network: Network,
    primaries: Vec<String>,
    fallbacks: Vec<String>,
    fallback_delay: Duration,
) -> Result<C::Conn, DialError> {
    let returned = CancellationToken::new();
    let _returned = returned.clone().drop_guard();
    let (tx, mut rx) = mpsc::channel(2);

    let primary_ctx = ctx.child();
    let _primary_guard = primary_ctx.drop_guard();
    spawn_racer(
        connector.clone(),
        primary_ctx,
        network,
        Branch::Primary,
        primaries,
        tx.clone(),
        returned.clone(),
    );

    let fallback_timer = tokio::time::sleep(fallback_delay);
    tokio::pin!(fallback_timer);
    let mut pending_fallbacks = Some(fallbacks);
    let mut _fallback_guard = None;

    let mut primary_err: Option<DialError> = None;
    let mut fallback_failed = false;

    loop {
        tokio::select! {
            biased;
            // `tx` lives for the whole loop, so the channel never closes.
            Some(Outcome { branch, result }) = rx.recv() => {
                match (branch, result) {
                    (_, Ok(conn)) => {
                        debug!(network = %network, branch = ?branch, "dual-stack race decided");
                        return Ok(conn);
                    }
                    (Branch::Primary, Err(err)) => {
                        debug!(network = %network, error = %err, "primary branch failed");
                        primary_err = Some(err);
                        if pending_fallbacks.is_some() {
                            // Fallback has not started yet: start it now.
                            fallback_timer.as_mut().reset(Instant::now());
                        }
                    }
                    (Branch::Fallback, Err(err)) => {
                        debug!(network = %network, error = %err, "fallback branch failed");
                        fallback_failed = true;
                    }
                }
                if fallback_failed {
                    if let Some(err) = primary_err.take() {
                        return Err(err);
                    }
                }
            }
            _ = &mut fallback_timer, if pending_fallbacks.is_some() => {
                let addrs = pending_fallbacks.take().unwrap_or_default();
                let fallback_ctx = ctx.child();
                _fallback_guard = Some(fallback_ctx.drop_guard());
                spawn_racer(
                    connector.clone(),
                    fallback_ctx,
                    network,
                    Branch::Fallback,
                    addrs,
                    tx.clone(),
                    returned.clone(),
                );
            }
        }
    }
}

fn spawn_racer<C: Connect>(
    connector: Arc<C>,
    ctx: DialContext,
    network: Network,
    branch: Branch,
    addrs: Vec<String>,
    tx: mpsc::Sender<Outcome<C::Conn>>,
    returned: CancellationToken,
) {
    tokio::spawn(async move {
        let result = dial_serial(connector.as_ref(), &ctx, network, &addrs).await;
        if returned.is_cancelled() {
            if let Ok(conn) = result {
                debug!(network = %network, branch = ?branch, "closing connection from decided race");
                drop(conn);
            }
            return;
        }
        // A send that loses against the decision hands the outcome back;
        // dropping it closes any connection inside.
        if let Err(mpsc::error::SendError(outcome)) = tx.send(Outcome { branch, result }).await {
            if let Ok(conn) = outcome.result {
                debug!(network = %network, branch = ?branch, "closing connection from decided race");
                drop(conn);
            }
        }
    });
}
