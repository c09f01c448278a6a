//! Gateway - TCP listener that accepts incoming connections.
//!
//! The Gateway binds the listen socket and spawns a Connection task for
//! each incoming client.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, instrument};

use crate::config::Config;
use crate::network::Connection;
use crate::state::ids::IdGenerator;
use crate::state::room::Room;

/// Accepts incoming TCP connections and spawns a session task for each.
pub struct Gateway {
    listener: TcpListener,
    room: Arc<Room>,
    ids: IdGenerator,
    config: Arc<Config>,
}

impl Gateway {
    /// Bind the gateway to the configured address.
    pub async fn bind(config: Arc<Config>, room: Arc<Room>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.listen.address).await?;
        info!(addr = %listener.local_addr()?, room = %config.server.room, "Listener bound");
        Ok(Self {
            listener,
            room,
            ids: IdGenerator::new(),
            config,
        })
    }

    /// Address actually bound, for callers that bind port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the gateway, accepting connections forever.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let id = self.ids.next();
                    info!(%id, %addr, "Connection accepted");

                    let connection = Connection::new(
                        id,
                        stream,
                        addr,
                        Arc::clone(&self.room),
                        Arc::clone(&self.config),
                    );
                    tokio::spawn(async move {
                        if let Err(e) = connection.run().await {
                            error!(%id, %addr, error = %e, "Connection error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}
