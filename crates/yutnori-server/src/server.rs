//! The TCP listener and accept loop.

use tokio::net::TcpListener;

use crate::error::ServerError;
use crate::hub::{spawn_hub, HubHandle};

/// A bound Yutnori server: call [`run`](Self::run) to start serving.
pub struct Server {
    listener: TcpListener,
    hub: HubHandle,
}

impl Server {
    /// Binds the listener and starts the hub actor.
    pub async fn bind(addr: &str) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        Ok(Self {
            listener,
            hub: spawn_hub(),
        })
    }

    /// The address the listener actually bound, useful with port 0.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, handing each to the hub.
    pub async fn run(self) -> Result<(), ServerError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    tracing::debug!(%addr, "accepted connection");
                    self.hub.register(stream);
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
