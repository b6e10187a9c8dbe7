//! Test utilities for apres-client
//!
//! Runs an axum router (typically the `apres-sim` device simulator) on a
//! loopback port and hands out a client pointed at it.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::settings::{ClientSettings, ClientSettingsBuilder};
use crate::{ApresClient, Result};

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: ApresClient,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve `router` with short client timeouts and a fast poll interval
    ///
    /// # Example
    ///
    /// ```ignore
    /// use apres_client::testing::TestServer;
    /// use apres_sim::{create_router, SimState};
    ///
    /// let server = TestServer::start(create_router(SimState::new(settings)?)).await?;
    /// let config = server.client.radar_config().get().await?;
    /// ```
    pub async fn start(router: axum::Router) -> Result<Self> {
        Self::start_with(router, |settings| settings).await
    }

    /// Serve `router`, letting the caller adjust the client settings
    pub async fn start_with<F>(router: axum::Router, configure: F) -> Result<Self>
    where
        F: FnOnce(ClientSettingsBuilder) -> ClientSettingsBuilder,
    {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let builder = ClientSettings::builder(format!("http://{}", addr))
            .request_timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(2))
            .poll_interval(Duration::from_millis(20));
        let client = ApresClient::with_settings(configure(builder).build())?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get a reference to the client
    pub fn client(&self) -> &ApresClient {
        &self.client
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // Abort the task if still running
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
