use std::fmt;
use std::io;

use tokio::signal;

/// What ended the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Interrupt,
    Terminate,
}

impl fmt::Display for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
        })
    }
}

/// Resolve on the first Ctrl+C or SIGTERM.
///
/// # Errors
/// Returns the I/O error if a handler cannot be installed.
pub async fn next_shutdown() -> io::Result<Shutdown> {
    #[cfg(unix)]
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    #[cfg(unix)]
    let terminated = async move {
        terminate.recv().await;
    };
    #[cfg(not(unix))]
    let terminated = std::future::pending::<()>();

    tokio::select! {
        res = signal::ctrl_c() => res.map(|()| Shutdown::Interrupt),
        () = terminated => Ok(Shutdown::Terminate),
    }
}

/// Future for `axum::serve(..).with_graceful_shutdown`.
///
/// A handler that fails to install also triggers shutdown.
pub async fn graceful() {
    match next_shutdown().await {
        Ok(reason) => tracing::info!(%reason, "draining connections"),
        Err(e) => tracing::error!(error = %e, "cannot listen for shutdown signals, stopping"),
    }
}
