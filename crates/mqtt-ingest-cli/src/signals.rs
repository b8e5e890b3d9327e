// crates/mqtt-ingest-cli/src/signals.rs
// ============================================================================
// Module: Shutdown Signals
// Description: Waits for the process termination signals.
// Purpose: Turn SIGINT, SIGTERM, and SIGQUIT into one shutdown future.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! [`wait_for_shutdown_signal`] completes on the first SIGINT, SIGTERM, or
//! SIGQUIT. Non-Unix builds only observe Ctrl-C.

// ============================================================================
// SECTION: Signal Wait
// ============================================================================

/// Completes when the process receives a termination signal.
///
/// # Errors
///
/// Returns an I/O error when a signal handler cannot be installed.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::SignalKind;
    use tokio::signal::unix::signal;

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Completes when the process receives Ctrl-C.
///
/// # Errors
///
/// Returns an I/O error when the handler cannot be installed.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
