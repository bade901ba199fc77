//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! ## Concurrency-Modell
//! Die Repository-Traits verwenden async fn ohne Send-Garantie
//! (async_fn_in_trait). Alle Verbindungs-Tasks laufen deshalb in einer
//! `tokio::task::LocalSet`.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::LocalSet;
use treffpunkt_auth::IdentityProvider;
use treffpunkt_db::RecordStore;

use crate::connection::ClientConnection;
use crate::server_state::SignalingState;

pub struct SignalingServer<S, I> {
    state: Arc<SignalingState<S, I>>,
    bind_addr: SocketAddr,
}

impl<S, I> SignalingServer<S, I>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    pub fn neu(state: Arc<SignalingState<S, I>>, bind_addr: SocketAddr) -> Self {
        Self { state, bind_addr }
    }

    /// Bindet den Socket und akzeptiert Verbindungen bis `shutdown_rx` `true` meldet
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.starten_mit_listener(listener, shutdown_rx).await
    }

    /// Wie [`starten`](Self::starten), mit bereits gebundenem Listener
    pub async fn starten_mit_listener(
        self,
        listener: TcpListener,
        shutdown_rx: watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let local = LocalSet::new();
        local.run_until(self.accept_loop(listener, shutdown_rx)).await
    }

    async fn accept_loop(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        tracing::info!(adresse = %listener.local_addr()?, "Echtzeit-Server gestartet");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let aktiv = self.state.registry.anzahl() as u32;
                            if aktiv >= self.state.config.max_verbindungen {
                                tracing::warn!(
                                    peer = %peer_addr,
                                    max = self.state.config.max_verbindungen,
                                    "Server voll, Verbindung abgelehnt"
                                );
                                drop(stream);
                                continue;
                            }
                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::debug!(peer = %peer_addr, fehler = %e, "TCP_NODELAY nicht gesetzt");
                            }

                            let verbindung = ClientConnection::neu(Arc::clone(&self.state), Some(peer_addr));
                            let shutdown = shutdown_rx.clone();
                            tokio::task::spawn_local(async move {
                                verbindung.verarbeiten(stream, shutdown).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Echtzeit-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("Echtzeit-Server gestoppt");
        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
