//! `ClawClient`: the public handle.
//!
//! The handle is cheap to share behind an `Arc` and every method takes
//! `&self`. All real work happens in the driver task spawned by
//! [`ClawClient::connect`]; the handle only forwards commands to it and
//! registers handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use clawlink_protocol::{
    ArmSide, Codec, Direction, EncodingError, Envelope, MachineId, PackageType, ProtobufCodec,
    UserId,
};
use clawlink_session::{SessionContext, SessionSecret};
use clawlink_transport::{Connector, WebSocketConnector};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::dispatch::Request;
use crate::driver::{Command, Driver, Shared};
use crate::events::{CloseEvent, EnterRoomResult, GameResult};
use crate::handlers::HandlerSlots;
use crate::{ClientConfig, ClientError, ConnectionStatus};

/// The running driver, as seen from the handle.
struct DriverHandle {
    /// Which `connect()` call spawned this driver.
    generation: u64,
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

/// A real-time control client for one player.
///
/// # Example
///
/// ```rust,ignore
/// use clawlink::prelude::*;
///
/// let client = ClawClient::new(ClientConfig::new("wss://arcade.example/ws"));
/// client.on_game_result(|result| println!("{result:?}"));
///
/// client.connect("u1", "s1", None).await?;
/// client.enter_room("M42").await?;
/// client.start_game().await?;
/// client.send_move(Direction::Grab).await?;
/// ```
///
/// The generic parameters pick the transport and the wire format; the
/// defaults are WebSocket and protobuf. Tests swap in
/// [`LoopbackConnector`](clawlink_transport::LoopbackConnector).
pub struct ClawClient<C: Connector = WebSocketConnector, K: Codec = ProtobufCodec> {
    config: ClientConfig,
    connector: Arc<C>,
    codec: Arc<K>,
    handlers: Arc<HandlerSlots>,
    status: Arc<watch::Sender<ConnectionStatus>>,
    driver: Mutex<Option<DriverHandle>>,
    generations: AtomicU64,
}

impl ClawClient {
    /// A WebSocket + protobuf client.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_parts(config, WebSocketConnector::new(), ProtobufCodec)
    }
}

impl<C: Connector, K: Codec> ClawClient<C, K> {
    /// A client over any transport and codec.
    pub fn with_parts(config: ClientConfig, connector: C, codec: K) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            config: config.validated(),
            connector: Arc::new(connector),
            codec: Arc::new(codec),
            handlers: Arc::new(HandlerSlots::default()),
            status: Arc::new(status),
            driver: Mutex::new(None),
            generations: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Opens the connection and logs in.
    ///
    /// Resolves once the server accepts the login (`Ready`), or with the
    /// error that stopped it: the socket could not open
    /// ([`ClientError::Transport`]), or the server refused or ignored the
    /// credentials ([`ClientError::AuthenticationFailed`]). The first
    /// connect is not retried; reconnection only kicks in after a session
    /// has reached `Ready` once.
    ///
    /// `machine` pre-selects the active machine without entering it.
    pub async fn connect(
        &self,
        user_id: impl Into<UserId>,
        secret: impl Into<SessionSecret>,
        machine: Option<MachineId>,
    ) -> Result<(), ClientError> {
        let user_id = user_id.into();
        if user_id.0.is_empty() {
            return Err(EncodingError::MissingField {
                tag: PackageType::Login,
                field: "userID",
            }
            .into());
        }

        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let first_ready = {
            let mut driver = self.driver.lock().await;
            if driver.as_ref().is_some_and(|d| !d.task.is_finished()) {
                return Err(ClientError::AlreadyConnected);
            }

            let (commands_tx, commands_rx) = mpsc::unbounded_channel();
            let (ready_tx, ready_rx) = oneshot::channel();
            let session = SessionContext::new(user_id, secret, machine);
            let shared = Shared {
                config: self.config.clone(),
                connector: Arc::clone(&self.connector),
                codec: Arc::clone(&self.codec),
                handlers: Arc::clone(&self.handlers),
                status: Arc::clone(&self.status),
            };
            let task = tokio::spawn(Driver::new(shared, session, commands_rx, ready_tx).run());
            *driver = Some(DriverHandle {
                generation,
                commands: commands_tx,
                task,
            });
            ready_rx
        };
        // The lock is released here so disconnect() can cancel a pending connect.

        let result = first_ready
            .await
            .unwrap_or_else(|_| Err(ClientError::Cancelled));
        if result.is_err() {
            self.reap(generation).await;
        }
        result
    }

    /// Closes the connection and stops reconnecting.
    ///
    /// Safe to call at any time and any number of times. Waits up to
    /// `shutdown_timeout` for the driver to close the socket cleanly, then
    /// aborts it. No handler fires and no heartbeat is sent afterwards.
    pub async fn disconnect(&self) {
        let Some(DriverHandle { commands, mut task, .. }) = self.driver.lock().await.take() else {
            tracing::debug!("disconnect: not connected");
            return;
        };

        let _ = commands.send(Command::Disconnect);
        drop(commands);

        if tokio::time::timeout(self.config.shutdown_timeout, &mut task)
            .await
            .is_err()
        {
            let timeout = self.config.shutdown_timeout;
            tracing::warn!(?timeout, "driver did not stop in time, aborting");
            task.abort();
            let _ = task.await;
        }
        self.status.send_replace(ConnectionStatus::Disconnected);
    }

    /// Clears out the driver spawned by `connect()` call `generation` once
    /// it has stopped on its own.
    ///
    /// A handler may already have started a newer session in the slot
    /// (re-login from `on_error`); that one is left alone.
    async fn reap(&self, generation: u64) {
        let handle = {
            let mut driver = self.driver.lock().await;
            if driver.as_ref().is_some_and(|d| d.generation == generation) {
                driver.take()
            } else {
                None
            }
        };
        if let Some(handle) = handle {
            let _ = handle.task.await;
        }
    }

    /// The current connection status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// A receiver that sees every status change.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// The machine room-scoped commands currently target.
    pub async fn active_machine(&self) -> Option<MachineId> {
        let commands = self.commands().await?;
        let (reply_tx, reply_rx) = oneshot::channel();
        commands.send(Command::ActiveMachine { reply: reply_tx }).ok()?;
        reply_rx.await.ok().flatten()
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Enters `machine`'s room and makes it the active machine.
    pub async fn enter_room(&self, machine: impl Into<MachineId>) -> Result<(), ClientError> {
        self.request(Request::EnterRoom(machine.into())).await
    }

    /// Leaves the active machine's room. Does nothing if there is none.
    pub async fn exit_room(&self) -> Result<(), ClientError> {
        self.request(Request::ExitRoom).await
    }

    /// Starts a round on the active machine.
    pub async fn start_game(&self) -> Result<(), ClientError> {
        self.request(Request::StartGame).await
    }

    /// Moves the claw. [`Direction::Grab`] drops it and ends the round's
    /// control.
    pub async fn send_move(&self, direction: Direction) -> Result<(), ClientError> {
        self.request(Request::Move(direction)).await
    }

    /// Drives one of the auxiliary arms.
    pub async fn send_arm_move(&self, side: ArmSide) -> Result<(), ClientError> {
        self.request(Request::ArmMove(side)).await
    }

    /// Sends a chat line to the other players in the active machine's room.
    pub async fn send_to_roommate(&self, content: impl Into<String>) -> Result<(), ClientError> {
        self.request(Request::Roommate(content.into())).await
    }

    async fn request(&self, request: Request) -> Result<(), ClientError> {
        // Fast path: no point queueing if the status already says no.
        let status = self.status();
        if !status.is_ready() {
            tracing::debug!(command = request.name(), %status, "command while not ready");
            return Err(ClientError::NotReady(status));
        }

        let not_ready = || ClientError::NotReady(ConnectionStatus::Disconnected);
        let commands = self.commands().await.ok_or_else(not_ready)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        commands
            .send(Command::Execute {
                request,
                reply: reply_tx,
            })
            .map_err(|_| not_ready())?;
        reply_rx.await.unwrap_or_else(|_| Err(not_ready()))
    }

    async fn commands(&self) -> Option<mpsc::UnboundedSender<Command>> {
        self.driver
            .lock()
            .await
            .as_ref()
            .map(|d| d.commands.clone())
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------
    //
    // Each registration replaces the previous handler for that event.
    // Handlers run on the driver task: keep them short and never block.

    /// Called each time a connection reaches `Ready`, including after a
    /// reconnect.
    pub fn on_open(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.handlers.open.set(Arc::new(move |_: &()| handler()));
    }

    /// Called when an opened connection closes, for any reason.
    pub fn on_close(&self, handler: impl Fn(&CloseEvent) + Send + Sync + 'static) {
        self.handlers.close.set(Arc::new(handler));
    }

    /// Called for malformed frames, transport failures and session-ending
    /// errors.
    pub fn on_error(&self, handler: impl Fn(&ClientError) + Send + Sync + 'static) {
        self.handlers.error.set(Arc::new(handler));
    }

    /// Called for every decoded inbound frame, before any typed handler.
    pub fn on_message(&self, handler: impl Fn(&Envelope) + Send + Sync + 'static) {
        self.handlers.message.set(Arc::new(handler));
    }

    /// Called when the room's player count changes.
    pub fn on_player_count(&self, handler: impl Fn(u32) + Send + Sync + 'static) {
        self.handlers
            .player_count
            .set(Arc::new(move |count: &u32| handler(*count)));
    }

    /// Called for both settlement and catch-outcome frames.
    pub fn on_game_result(&self, handler: impl Fn(&GameResult) + Send + Sync + 'static) {
        self.handlers.game_result.set(Arc::new(handler));
    }

    /// Called when the server answers an `enter_room`.
    pub fn on_enter_room_result(
        &self,
        handler: impl Fn(&EnterRoomResult) + Send + Sync + 'static,
    ) {
        self.handlers.enter_room_result.set(Arc::new(handler));
    }
}

impl<C: Connector, K: Codec> Drop for ClawClient<C, K> {
    fn drop(&mut self) {
        if let Some(handle) = self.driver.get_mut().take() {
            handle.task.abort();
        }
    }
}
