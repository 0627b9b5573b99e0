//! Signal handling for cycle triggers and shutdown.
//!
//! SIGHUP requests a cycle. SIGTERM and SIGINT request graceful shutdown.

use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::shutdown::ShutdownCoordinator;
use crate::renewal::{Trigger, TriggerSender};

/// What a received signal asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalType {
    /// Run a cycle now (SIGHUP)
    Reload,
    /// Graceful shutdown (SIGTERM/SIGINT)
    Shutdown,
}

/// Act on a received signal.
pub fn dispatch(signal: SignalType, sender: &TriggerSender, shutdown: &ShutdownCoordinator) {
    debug!(signal = ?signal, "Received signal");
    match signal {
        SignalType::Reload => {
            info!("SIGHUP received, scheduling certificate check");
            sender.fire(Trigger::Signal);
        }
        SignalType::Shutdown => {
            info!("Termination signal received, finishing current domain before exit");
            shutdown.request_shutdown();
        }
    }
}

/// Install signal handlers and spawn the task that dispatches them.
///
/// The task ends after the first shutdown signal.
///
/// # Errors
///
/// Fails if a handler cannot be registered.
#[cfg(unix)]
pub fn spawn_signal_listener(
    sender: TriggerSender,
    shutdown: ShutdownCoordinator,
) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                _ = hangup.recv() => SignalType::Reload,
                _ = terminate.recv() => SignalType::Shutdown,
                _ = interrupt.recv() => SignalType::Shutdown,
            };
            dispatch(received, &sender, &shutdown);
            if received == SignalType::Shutdown {
                break;
            }
        }
    }))
}

/// Install the Ctrl-C handler and spawn the task that dispatches it.
///
/// # Errors
///
/// Never fails on this platform; the signature matches the Unix variant.
#[cfg(not(unix))]
pub fn spawn_signal_listener(
    sender: TriggerSender,
    shutdown: ShutdownCoordinator,
) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            dispatch(SignalType::Shutdown, &sender, &shutdown);
        }
    }))
}
