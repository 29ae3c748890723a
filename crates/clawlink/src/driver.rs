//! The background task that owns the socket.
//!
//! One driver runs per `connect()` call. It is the only code that touches
//! the connection, the session context, or the status, so none of them
//! need locks. The `ClawClient` handle talks to it over a command channel.
//!
//! Lifecycle of one driver:
//!   1. Connect → send LOGIN → wait for the verdict
//!   2. Serve: inbound frames, user commands, heartbeats
//!   3. On a drop: wait `reconnect_delay`, go back to 1 (bounded)
//!   4. Stop on `disconnect()`, rejected login, or an exhausted budget

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;

use clawlink_protocol::{Codec, Envelope, MachineId};
use clawlink_session::SessionContext;
use clawlink_transport::{Connection, Connector, TransportError};
use tokio::sync::{mpsc, oneshot, watch};

use crate::dispatch::{self, Request, SessionUpdate};
use crate::events::{CloseEvent, CloseReason};
use crate::handlers::HandlerSlots;
use crate::heartbeat::Heartbeat;
use crate::reconnect::ReconnectBudget;
use crate::{ClientConfig, ClientError, ConnectionStatus};

/// Messages from the client handle to its driver.
pub(crate) enum Command {
    Execute {
        request: Request,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    ActiveMachine {
        reply: oneshot::Sender<Option<MachineId>>,
    },
    Disconnect,
}

/// How one connect-and-serve attempt ended.
enum Attempt {
    /// `disconnect()` was called, or the handle was dropped.
    Shutdown,
    /// The server refused the credentials. Never retried.
    Rejected(ClientError),
    /// The socket failed to open, failed during login, or dropped while
    /// serving.
    Failed {
        reached_ready: bool,
        error: ClientError,
    },
}

enum LoginOutcome {
    Accepted,
    Rejected(String),
    Failed(ClientError),
    Shutdown,
}

enum ServeEnd {
    Shutdown,
    Dropped(String),
}

/// Everything shared between the handle and the driver.
pub(crate) struct Shared<C, K> {
    pub(crate) config: ClientConfig,
    pub(crate) connector: Arc<C>,
    pub(crate) codec: Arc<K>,
    pub(crate) handlers: Arc<HandlerSlots>,
    pub(crate) status: Arc<watch::Sender<ConnectionStatus>>,
}

pub(crate) struct Driver<C: Connector, K: Codec> {
    shared: Shared<C, K>,
    session: SessionContext,
    commands: mpsc::UnboundedReceiver<Command>,
    /// Resolves the caller's `connect()`. Taken on the first `Ready` or on
    /// the first failure, whichever comes first.
    first_ready: Option<oneshot::Sender<Result<(), ClientError>>>,
    budget: ReconnectBudget,
}

impl<C: Connector, K: Codec> Driver<C, K> {
    pub(crate) fn new(
        shared: Shared<C, K>,
        session: SessionContext,
        commands: mpsc::UnboundedReceiver<Command>,
        first_ready: oneshot::Sender<Result<(), ClientError>>,
    ) -> Self {
        let budget = ReconnectBudget::from_config(&shared.config);
        Self {
            shared,
            session,
            commands,
            first_ready: Some(first_ready),
            budget,
        }
    }

    /// Runs until the session is over.
    pub(crate) async fn run(mut self) {
        tracing::debug!(
            user_id = %self.session.user_id(),
            endpoint = %self.shared.config.endpoint,
            "driver started"
        );

        loop {
            match self.attempt().await {
                Attempt::Shutdown => {
                    tracing::info!(user_id = %self.session.user_id(), "disconnected by request");
                    self.resolve_first(Err(ClientError::Cancelled));
                    break;
                }
                Attempt::Rejected(error) => {
                    tracing::warn!(
                        user_id = %self.session.user_id(),
                        %error,
                        "login rejected, not retrying"
                    );
                    self.fail(error);
                    break;
                }
                Attempt::Failed {
                    reached_ready,
                    error,
                } => {
                    // The first connect() fails fast; retries only protect a
                    // session that has already been established.
                    if self.first_ready.is_some() {
                        tracing::warn!(%error, "initial connect failed");
                        self.fail(error);
                        break;
                    }
                    if !reached_ready {
                        let attempt = self.budget.used();
                        tracing::debug!(%error, attempt, "reconnect attempt failed");
                    }

                    let Some(delay) = self.budget.next_delay() else {
                        let attempts = self.budget.used();
                        tracing::error!(attempts, "reconnect budget exhausted");
                        self.fail(ClientError::ConnectionLost { attempts });
                        break;
                    };
                    tracing::info!(attempt = self.budget.used(), ?delay, "reconnecting");
                    if self.idle(tokio::time::sleep(delay)).await.is_none() {
                        tracing::info!("disconnected while waiting to reconnect");
                        break;
                    }
                }
            }
        }

        self.set_status(ConnectionStatus::Disconnected);
        tracing::debug!(user_id = %self.session.user_id(), "driver stopped");
    }

    /// One full connect → login → serve cycle.
    async fn attempt(&mut self) -> Attempt {
        // --- Step 1: Open the socket ---
        self.set_status(ConnectionStatus::Connecting);
        let connector = Arc::clone(&self.shared.connector);
        let endpoint = self.shared.config.endpoint.clone();
        let conn = match self.idle(async move { connector.connect(&endpoint).await }).await {
            None => return Attempt::Shutdown,
            Some(Err(e)) => {
                self.set_status(ConnectionStatus::Disconnected);
                return Attempt::Failed {
                    reached_ready: false,
                    error: e.into(),
                };
            }
            Some(Ok(conn)) => conn,
        };
        let conn_id = conn.id();
        tracing::debug!(%conn_id, "socket open");

        // --- Step 2: Login ---
        self.set_status(ConnectionStatus::AwaitingLogin);
        match self.login(&conn).await {
            LoginOutcome::Accepted => {}
            LoginOutcome::Rejected(reason) => {
                self.close(&conn, CloseReason::LoginRejected, Some(reason.clone()), false).await;
                return Attempt::Rejected(ClientError::AuthenticationFailed(reason));
            }
            LoginOutcome::Failed(error) => {
                let will_reconnect = self.first_ready.is_none() && self.budget.has_remaining();
                self.close(
                    &conn,
                    CloseReason::Dropped,
                    Some(error.to_string()),
                    will_reconnect,
                )
                .await;
                return Attempt::Failed {
                    reached_ready: false,
                    error,
                };
            }
            LoginOutcome::Shutdown => {
                self.set_status(ConnectionStatus::Closing);
                self.close(&conn, CloseReason::Requested, None, false).await;
                return Attempt::Shutdown;
            }
        }

        // --- Step 3: Ready ---
        self.budget.reset();
        self.set_status(ConnectionStatus::Ready);
        tracing::info!(%conn_id, user_id = %self.session.user_id(), "ready");
        self.resolve_first(Ok(()));
        self.shared.handlers.open.fire(&());

        // --- Step 4: Serve until something ends it ---
        match self.serve(&conn).await {
            ServeEnd::Shutdown => {
                self.set_status(ConnectionStatus::Closing);
                self.close(&conn, CloseReason::Requested, None, false).await;
                Attempt::Shutdown
            }
            ServeEnd::Dropped(detail) => {
                tracing::warn!(%conn_id, %detail, "connection dropped");
                let will_reconnect = self.budget.has_remaining();
                self.close(&conn, CloseReason::Dropped, Some(detail.clone()), will_reconnect).await;
                Attempt::Failed {
                    reached_ready: true,
                    error: TransportError::ConnectionClosed(detail).into(),
                }
            }
        }
    }

    /// Sends LOGIN and waits for the server's verdict.
    async fn login(&mut self, conn: &C::Connection) -> LoginOutcome {
        let login = Envelope::Login(self.session.login_message());
        let frame = match self.shared.codec.encode(&login) {
            Ok(frame) => frame,
            Err(e) => return LoginOutcome::Failed(e.into()),
        };
        if let Err(e) = conn.send(&frame).await {
            return LoginOutcome::Failed(e.into());
        }
        tracing::debug!(user_id = %self.session.user_id(), "login sent");

        let deadline = tokio::time::sleep(self.shared.config.login_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    return LoginOutcome::Rejected("no login reply within timeout".into());
                }
                frame = conn.recv() => match frame {
                    Ok(Some(bytes)) => match self.shared.codec.decode(&bytes) {
                        Ok(Envelope::Login(reply)) if reply.login_result => {
                            return LoginOutcome::Accepted;
                        }
                        Ok(Envelope::Login(_)) => {
                            return LoginOutcome::Rejected("server rejected credentials".into());
                        }
                        Ok(other) => {
                            let tag = other.tag();
                            tracing::debug!(%tag, "ignoring frame before login reply");
                        }
                        Err(e) => self.report_malformed(e.into()),
                    },
                    Ok(None) => {
                        return LoginOutcome::Failed(
                            TransportError::ConnectionClosed("closed during login".into()).into(),
                        );
                    }
                    Err(e) => return LoginOutcome::Failed(e.into()),
                },
                command = self.commands.recv() => {
                    if self.answer_offline(command).is_break() {
                        return LoginOutcome::Shutdown;
                    }
                }
            }
        }
    }

    /// The `Ready` loop.
    async fn serve(&mut self, conn: &C::Connection) -> ServeEnd {
        let mut heartbeat = Heartbeat::start(self.shared.config.heartbeat_interval);

        loop {
            tokio::select! {
                frame = conn.recv() => match frame {
                    Ok(Some(bytes)) => self.inbound(&bytes),
                    Ok(None) => return ServeEnd::Dropped("server closed the connection".into()),
                    Err(e) => {
                        let detail = e.to_string();
                        self.shared.handlers.error.fire(&ClientError::Transport(e));
                        return ServeEnd::Dropped(detail);
                    }
                },
                beat = heartbeat.tick() => {
                    let heart = Envelope::Heart(self.session.heart_message());
                    match self.shared.codec.encode(&heart) {
                        Ok(frame) => {
                            if let Err(e) = conn.send(&frame).await {
                                let detail = e.to_string();
                                self.shared.handlers.error.fire(&ClientError::Transport(e));
                                return ServeEnd::Dropped(detail);
                            }
                            tracing::trace!(beat, "heartbeat sent");
                        }
                        Err(e) => tracing::warn!(error = %e, "failed to encode heartbeat"),
                    }
                }
                command = self.commands.recv() => match command {
                    None | Some(Command::Disconnect) => return ServeEnd::Shutdown,
                    Some(Command::ActiveMachine { reply }) => {
                        let _ = reply.send(self.session.active_machine().cloned());
                    }
                    Some(Command::Execute { request, reply }) => {
                        match self.execute(conn, &request).await {
                            Ok(()) => {
                                let _ = reply.send(Ok(()));
                            }
                            Err(ClientError::Transport(e)) => {
                                // The socket is gone; the caller hears about it
                                // and the driver starts recovering.
                                let detail = e.to_string();
                                let _ = reply.send(Err(ClientError::Transport(e)));
                                return ServeEnd::Dropped(detail);
                            }
                            Err(e) => {
                                let command = request.name();
                                tracing::debug!(command, error = %e, "command refused");
                                let _ = reply.send(Err(e));
                            }
                        }
                    }
                },
            }
        }
    }

    /// Encodes and sends one command, keeping the session in step.
    async fn execute(
        &mut self,
        conn: &C::Connection,
        request: &Request,
    ) -> Result<(), ClientError> {
        let Some(plan) = dispatch::plan(request, &self.session)? else {
            tracing::debug!(command = request.name(), "no active machine, nothing to send");
            return Ok(());
        };
        let frame = self.shared.codec.encode(&plan.envelope)?;

        if let SessionUpdate::Enter(machine) = &plan.update {
            self.session.enter(machine.clone());
        }
        conn.send(&frame).await?;
        if let SessionUpdate::Exit = plan.update {
            self.session.exit();
        }

        tracing::debug!(command = request.name(), tag = %plan.envelope.tag(), "command sent");
        Ok(())
    }

    fn inbound(&self, bytes: &[u8]) {
        match self.shared.codec.decode(bytes) {
            Ok(envelope) => {
                tracing::trace!(tag = %envelope.tag(), "frame received");
                dispatch::route(&envelope, &self.shared.handlers);
            }
            Err(e) => self.report_malformed(e.into()),
        }
    }

    fn report_malformed(&self, error: ClientError) {
        tracing::warn!(%error, "dropping malformed frame");
        self.shared.handlers.error.fire(&error);
    }

    /// Runs `fut` while answering commands as "not ready".
    ///
    /// Returns `None` if a shutdown arrived first.
    async fn idle<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        tokio::pin!(fut);
        loop {
            tokio::select! {
                out = &mut fut => return Some(out),
                command = self.commands.recv() => {
                    if self.answer_offline(command).is_break() {
                        return None;
                    }
                }
            }
        }
    }

    /// Handles a command received while not `Ready`.
    fn answer_offline(&self, command: Option<Command>) -> ControlFlow<()> {
        match command {
            None | Some(Command::Disconnect) => ControlFlow::Break(()),
            Some(Command::ActiveMachine { reply }) => {
                let _ = reply.send(self.session.active_machine().cloned());
                ControlFlow::Continue(())
            }
            Some(Command::Execute { request, reply }) => {
                let status = *self.shared.status.borrow();
                tracing::debug!(command = request.name(), %status, "command while not ready");
                let _ = reply.send(Err(ClientError::NotReady(status)));
                ControlFlow::Continue(())
            }
        }
    }

    async fn close(
        &self,
        conn: &C::Connection,
        reason: CloseReason,
        detail: Option<String>,
        will_reconnect: bool,
    ) {
        if let Err(e) = conn.close().await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "close failed");
        }
        if reason != CloseReason::Requested {
            self.set_status(ConnectionStatus::Disconnected);
        }
        self.shared.handlers.close.fire(&CloseEvent {
            reason,
            detail,
            will_reconnect,
        });
    }

    /// Reports a session-ending error to `on_error` and, if it is still
    /// waiting, to the `connect()` caller.
    fn fail(&mut self, error: ClientError) {
        self.shared.handlers.error.fire(&error);
        self.resolve_first(Err(error));
    }

    fn resolve_first(&mut self, result: Result<(), ClientError>) {
        if let Some(tx) = self.first_ready.take() {
            let _ = tx.send(result);
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        let previous = self.shared.status.send_replace(status);
        if previous != status {
            tracing::debug!(from = %previous, to = %status, "status changed");
        }
    }
}
