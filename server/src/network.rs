//! Server network layer handling UDP communications and the event loop

use crate::broadcast::Recipient;
use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::game::{Command, MatchController};
use crate::session::ConnectionId;
use log::{debug, error, info, warn};
use shared::{Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: ConnectionId },
    Shutdown,
}

/// A packet queued for the sender task
#[derive(Debug)]
pub struct OutboundMessage {
    pub packet: Packet,
    pub addrs: Vec<SocketAddr>,
}

/// Session server: owns the match controller and feeds it one event at a time
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    controller: MatchController,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    out_rx: Option<mpsc::UnboundedReceiver<OutboundMessage>>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let controller = MatchController::new(config.r#match.clone(), config.max_catch_up_ticks);
        Self::with_controller(config, controller).await
    }

    /// Builds a server around an existing controller, e.g. one with a fixed seed
    pub async fn with_controller(
        config: ServerConfig,
        controller: MatchController,
    ) -> Result<Self, ServerError> {
        let socket = UdpSocket::bind(&config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind_addr.clone(),
                source,
            })?;
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket: Arc::new(socket),
            clients: Arc::new(RwLock::new(ClientManager::new(config.client_timeout))),
            controller,
            server_tx,
            server_rx,
            out_tx,
            out_rx: Some(out_rx),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.socket.local_addr()?)
    }

    /// Sender for injecting messages, e.g. `ServerMessage::Shutdown`
    pub fn message_sender(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match Packet::decode(&buffer[..len]) {
                        Ok(packet) => {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(_) => warn!("Failed to deserialize packet from {}", addr),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        })
    }

    /// Spawns task that processes the outgoing packet queue
    fn spawn_network_sender(&mut self) -> Option<JoinHandle<()>> {
        let socket = Arc::clone(&self.socket);
        let mut out_rx = self.out_rx.take()?;

        Some(tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                for addr in &message.addrs {
                    if let Err(e) = send_packet_impl(&socket, &message.packet, *addr).await {
                        error!("{}", e);
                    }
                }
            }
        }))
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) -> JoinHandle<()> {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = clients.read().await.check_timeouts();

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        })
    }

    /// Translates an incoming packet into a controller command
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        let now = Instant::now();

        if let Packet::Join { client_version } = packet {
            if client_version != PROTOCOL_VERSION {
                warn!(
                    "Client at {} speaks protocol {}, expected {}",
                    addr, client_version, PROTOCOL_VERSION
                );
            }

            let (connection, created) = {
                let mut clients = self.clients.write().await;
                clients.get_or_insert(addr)
            };
            if !created {
                debug!("Repeated join from {} (connection {})", addr, connection);
            }
            self.controller.handle(Command::Join { connection }, now);

            // The rejection has to go out before the address is forgotten
            self.flush().await;
            if self.controller.registry().slot_of(connection).is_none() {
                self.clients.write().await.remove_client(connection);
            }
            return;
        }

        let connection = {
            let mut clients = self.clients.write().await;
            clients.touch(addr)
        };
        let Some(connection) = connection else {
            debug!("Ignoring {:?} from unseated address {}", packet, addr);
            return;
        };

        match packet {
            Packet::PaddleMove { x } => {
                self.controller
                    .handle(Command::PaddleMove { connection, x }, now);
            }
            Packet::PlayerReady => {
                self.controller.handle(Command::Ready { connection }, now);
            }
            Packet::Heartbeat => {}
            Packet::Leave => {
                self.controller.handle(Command::Leave { connection }, now);
                self.flush().await;
                self.clients.write().await.remove_client(connection);
            }
            other => warn!("Unexpected packet {:?} from {}", other, addr),
        }
    }

    /// Drops a silent connection and vacates its seat in the same step, so
    /// the address cannot rejoin while its old identifier still holds a slot
    async fn handle_timeout(&mut self, client_id: ConnectionId) {
        if !self.clients.write().await.expire(client_id) {
            debug!("Connection {} was heard from again, keeping it", client_id);
            return;
        }

        warn!("Connection {} timed out", client_id);
        self.controller
            .handle(Command::Leave { connection: client_id }, Instant::now());
    }

    /// Hands every queued notification to the sender task
    async fn flush(&mut self) {
        let envelopes = self.controller.drain_outbox();
        if envelopes.is_empty() {
            return;
        }

        let clients = self.clients.read().await;
        if clients.is_empty() {
            return;
        }

        for envelope in envelopes {
            let addrs: Vec<SocketAddr> = match envelope.recipient {
                Recipient::Connection(id) => clients.addr_of(id).into_iter().collect(),
                Recipient::All => self
                    .controller
                    .registry()
                    .connections()
                    .filter_map(|id| clients.addr_of(id))
                    .collect(),
            };

            if addrs.is_empty() {
                continue;
            }

            if let Err(e) = self.out_tx.send(OutboundMessage {
                packet: envelope.packet,
                addrs,
            }) {
                error!("Failed to queue packet for sending: {}", e);
            }
        }
    }

    /// Main server loop: one inbound event or timer deadline at a time
    pub async fn run(&mut self) -> Result<(), ServerError> {
        let mut tasks = vec![self.spawn_network_receiver(), self.spawn_timeout_checker()];
        tasks.extend(self.spawn_network_sender());

        info!("Server started successfully");

        loop {
            let deadline = self.controller.next_deadline();

            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        }
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            self.handle_timeout(client_id).await;
                        }
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                }
                _ = wait_until(deadline) => {
                    self.controller.on_timer(Instant::now());
                }
            }

            self.flush().await;
        }

        for task in tasks {
            task.abort();
        }

        Ok(())
    }
}

async fn send_packet_impl(
    socket: &UdpSocket,
    packet: &Packet,
    addr: SocketAddr,
) -> Result<(), ServerError> {
    let data = packet
        .encode()
        .map_err(|source| ServerError::Encode { addr, source })?;
    socket.send_to(&data, addr).await?;
    Ok(())
}

/// Sleeps until `deadline`, or forever if there is none
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
