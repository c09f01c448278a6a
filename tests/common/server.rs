//! Test server management.
//!
//! Spawns the gateway in-process on an ephemeral port so tests never
//! depend on fixed port numbers or a prebuilt binary.

use std::net::SocketAddr;
use std::sync::Arc;

use roomd::config::Config;
use roomd::network::Gateway;
use roomd::state::room::Room;
use tokio::task::JoinHandle;

use super::client::TestClient;

/// An in-process test server instance.
pub struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Spawn a test server with default configuration.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(Config::default()).await
    }

    /// Spawn a test server with custom configuration. The listen address is
    /// always overridden to an ephemeral local port.
    pub async fn spawn_with(mut config: Config) -> anyhow::Result<Self> {
        config.listen.address = "127.0.0.1:0".parse()?;

        let config = Arc::new(config);
        let room = Arc::new(Room::new(config.session.slow_consumer));
        let gateway = Gateway::bind(Arc::clone(&config), room).await?;
        let addr = gateway.local_addr()?;

        let handle = tokio::spawn(async move {
            let _ = gateway.run().await;
        });

        Ok(Self { addr, handle })
    }

    /// Address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Create a new test client connected to this server.
    pub async fn connect(&self) -> anyhow::Result<TestClient> {
        TestClient::connect(self.addr).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
