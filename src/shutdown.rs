use std::io;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

// Ctrl-C everywhere, plus SIGTERM on unix (docker stop, systemd, kubernetes)
pub struct ShutdownSignal {
    #[cfg(unix)]
    terminate: Signal,
}

// Registers the handlers up front so a signal arriving before `wait` is not lost
pub fn install() -> io::Result<ShutdownSignal> {
    Ok(ShutdownSignal {
        #[cfg(unix)]
        terminate: signal(SignalKind::terminate())?,
    })
}

impl ShutdownSignal {
    /// Resolves with the name of the first shutdown signal received.
    pub async fn wait(self) -> &'static str {
        #[cfg(unix)]
        {
            let mut terminate = self.terminate;
            tokio::select! {
                _ = ctrl_c() => "SIGINT",
                _ = terminate.recv() => "SIGTERM",
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c().await;
            "ctrl-c"
        }
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
