use super::data::PendingTransfer;
use super::error::ConnectionError;
use super::pool::{Connection, ConnectionId};
use super::port::DataConnectionInitiator;
use crate::constants::{
    REPLY_IDLE_TIMEOUT, REPLY_NOT_IMPLEMENTED, REPLY_SERVICE_CLOSING,
    REPLY_TRANSFER_ABORTED, REPLY_TRANSFER_COMPLETE,
};
use crate::core_ftpcommand::command::Command;
use crate::core_ftpcommand::local_error::local_error_reply;
use crate::core_ftpcommand::reply::Reply;
use crate::server::ServerContext;
use crate::session::{AttributeValue, Session, SessionKey, TransferOutcome};
use log::{debug, error, info, trace, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    Normal,
    /// A transfer owns the connection; only a few commands get through
    Interrupt,
}

/// Server side of one client's control channel.
///
/// Replies are queued on a channel drained by the socket writer, so commands and pool
/// ticks never wait on the network.
pub struct ControlConnection {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    context: Arc<ServerContext>,
    session: Session,
    state: ProtocolState,
    initiator: Box<dyn DataConnectionInitiator>,
    bytes_written: u64,
    outbound: Option<UnboundedSender<Reply>>,
    pending_transfer: Option<PendingTransfer>,
    transfer: Option<AbortHandle>,
    last_activity: Instant,
    closing: bool,
    poisoned: bool,
    destroyed: bool,
}

impl ControlConnection {
    pub fn new(
        id: ConnectionId,
        peer: Option<SocketAddr>,
        context: Arc<ServerContext>,
        initiator: Box<dyn DataConnectionInitiator>,
    ) -> (Self, UnboundedReceiver<Reply>) {
        let (outbound, replies) = mpsc::unbounded_channel();
        let connection = Self {
            id,
            peer,
            context,
            session: Session::new(),
            state: ProtocolState::Normal,
            initiator,
            bytes_written: 0,
            outbound: Some(outbound),
            pending_transfer: None,
            transfer: None,
            last_activity: Instant::now(),
            closing: false,
            poisoned: false,
            destroyed: false,
        };
        (connection, replies)
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn is_interrupted(&self) -> bool {
        self.state == ProtocolState::Interrupt
    }

    /// Bytes of replies sent on the control channel so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn data_connection_initiator(&self) -> &dyn DataConnectionInitiator {
        self.initiator.as_ref()
    }

    pub fn data_connection_initiator_mut(&mut self) -> &mut dyn DataConnectionInitiator {
        self.initiator.as_mut()
    }

    /// Runs one line from the client and queues the reply.
    pub fn dispatch(&mut self, line: &str) {
        self.last_activity = Instant::now();
        let context = Arc::clone(&self.context);

        let Some(command) = context.commands.resolve(line) else {
            if self.is_interrupted() {
                debug!("Connection {}: ignored unknown command while interrupted", self.id);
                return;
            }
            debug!("Connection {}: command not implemented: {}", self.id, line.trim());
            self.reply(Reply::system("502", REPLY_NOT_IMPLEMENTED));
            return;
        };

        if self.is_interrupted() && !command.process_in_interrupt_state() {
            debug!(
                "Connection {}: command {} dropped in INTERRUPT state",
                self.id,
                command.name()
            );
            return;
        }

        trace!("Connection {}: executing {}", self.id, command.name());
        let reply = match command.execute(self) {
            Ok(reply) => reply,
            Err(e) => {
                error!(
                    "Connection {}: command {} failed: {}",
                    self.id,
                    command.name(),
                    e
                );
                self.pending_transfer = None;
                local_error_reply(&Command::local_error())
            }
        };
        self.reply(reply);
    }

    /// Queues a reply. A reply allowed to clear the INTERRUPT state does so.
    pub fn reply(&mut self, reply: Reply) {
        let wire_len = reply.to_wire().len() as u64;

        if self.is_interrupted() && reply.can_clear_interrupt_state() {
            self.state = ProtocolState::Normal;
            self.session.remove_attribute(&SessionKey::InterruptCommand);
            trace!("Connection {}: INTERRUPT state cleared by {}", self.id, reply.code());
        }

        trace!("Connection {}: reply {}", self.id, reply);
        match &self.outbound {
            Some(outbound) if outbound.send(reply).is_ok() => self.bytes_written += wire_len,
            _ => debug!("Connection {}: reply dropped, writer is gone", self.id),
        }
    }

    /// Hands the connection to a transfer: INTERRUPT state until the transfer reply.
    pub fn begin_transfer(&mut self, command: &Command, transfer: PendingTransfer) {
        self.last_activity = Instant::now();
        self.state = ProtocolState::Interrupt;
        self.session.set_attribute(
            SessionKey::InterruptCommand,
            AttributeValue::Command(command.to_ref()),
        );
        debug!(
            "Connection {}: {:?} transfer prepared by {}",
            self.id,
            transfer.mode,
            command.name()
        );
        self.pending_transfer = Some(transfer);
    }

    pub fn take_pending_transfer(&mut self) -> Option<PendingTransfer> {
        self.pending_transfer.take()
    }

    pub fn set_transfer_handle(&mut self, handle: AbortHandle) {
        self.transfer = Some(handle);
    }

    /// Stops the transfer in progress, if any. Returns whether there was one.
    pub fn abort_transfer(&mut self) -> bool {
        let mut aborted = self.pending_transfer.take().is_some();
        if let Some(handle) = self.transfer.take() {
            aborted |= !handle.is_finished();
            handle.abort();
        }
        if self.initiator.is_active() {
            self.initiator.abort();
            aborted = true;
        }
        self.session.remove_attribute(&SessionKey::TransferOutcome);
        if aborted {
            self.context.listeners.release_all(self.id);
        }
        aborted
    }

    /// Closes the connection on the next tick, after queued replies are sent.
    pub fn close(&mut self) {
        self.closing = true;
    }

    fn finish_transfer(&mut self, outcome: TransferOutcome) {
        // The idle clock restarts once the data channel goes quiet
        self.last_activity = Instant::now();
        self.transfer = None;
        self.context.listeners.release_all(self.id);
        let reply = match outcome {
            TransferOutcome::Completed { mode, bytes } => {
                info!("Connection {}: {:?} transfer done, {} bytes", self.id, mode, bytes);
                Reply::system(mode.final_reply_code(), REPLY_TRANSFER_COMPLETE)
            }
            TransferOutcome::Failed { mode, reason } => {
                warn!("Connection {}: {:?} transfer failed: {}", self.id, mode, reason);
                Reply::system("426", REPLY_TRANSFER_ABORTED)
            }
        };
        self.reply(reply);
    }

    fn idle_timeout(&self) -> Option<Duration> {
        match self.context.config.server.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Connection for ControlConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn service(&mut self) -> Result<(), ConnectionError> {
        if self.destroyed || self.closing {
            return Err(ConnectionError::Closed);
        }
        if self.outbound.as_ref().map_or(true, |outbound| outbound.is_closed()) {
            return Err(ConnectionError::Closed);
        }

        match self.session.remove_attribute(&SessionKey::TransferOutcome) {
            Some(AttributeValue::Outcome(outcome)) => self.finish_transfer(outcome),
            Some(other) => warn!("Connection {}: unexpected transfer outcome {:?}", self.id, other),
            None => {}
        }

        if self.poisoned {
            self.reply(Reply::system("421", REPLY_SERVICE_CLOSING));
            return Err(ConnectionError::Poisoned);
        }

        if let Some(timeout) = self.idle_timeout() {
            if !self.is_interrupted() && self.last_activity.elapsed() > timeout {
                self.reply(Reply::system("421", REPLY_IDLE_TIMEOUT));
                return Err(ConnectionError::IdleTimeout(timeout.as_secs()));
            }
        }
        Ok(())
    }

    fn poison(&mut self) {
        self.poisoned = true;
    }

    fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.abort_transfer();
        self.context.listeners.release_all(self.id);
        self.outbound = None;
        self.destroyed = true;
        debug!("Connection {} destroyed", self.id);
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}
