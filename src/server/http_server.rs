use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

/// Wrapper binding an axum application to a TCP listener.
pub struct HttpServer(pub axum::Router);

/// Handle to a running HTTP server
///
/// The server stops on SIGINT/SIGTERM or when [`ServerHandle::stop`] is called,
/// letting in-flight requests finish.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    /// Address the listener is bound to (resolves port `0`).
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop the server gracefully and wait for it to finish.
    ///
    /// # Errors
    ///
    /// Returns the serve loop's I/O error, if any.
    pub async fn stop(mut self) -> io::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _receiver_gone = tx.send(()).is_err();
        }
        self.join().await
    }

    /// Stop accepting immediately without draining connections.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Wait for the server to exit.
    ///
    /// # Errors
    ///
    /// Returns the serve loop's I/O error; a panicked or aborted task is
    /// reported as [`io::ErrorKind::Other`].
    pub async fn join(self) -> io::Result<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(io::Error::other(e)),
        }
    }
}

impl HttpServer {
    /// Bind `addr` and start serving in a background task.
    ///
    /// # Errors
    ///
    /// Fails when the address cannot be bound.
    pub async fn start(self, addr: &str) -> io::Result<ServerHandle> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel();

        info!(addr = %addr, "HTTP listener bound");
        let app = self.0;
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal(rx))
                .await
        });

        Ok(ServerHandle {
            addr,
            shutdown: Some(tx),
            handle,
        })
    }
}

/// Resolves on SIGINT, SIGTERM (unix) or an explicit stop request.
async fn shutdown_signal(stop: oneshot::Receiver<()>) {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("SIGINT received; shutting down"),
        () = terminate => info!("SIGTERM received; shutting down"),
        _ = stop => info!("Shutdown requested"),
    }
}
