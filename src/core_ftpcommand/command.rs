use super::error::CommandError;
use super::ftpcommand::FtpCommand;
use super::reply::{CommandRef, Reply};
use super::{local_error, size};
use crate::core_network::ControlConnection;

/// One command line received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    kind: FtpCommand,
    name: String,
    parameter: String,
}

impl Command {
    /// Name is trimmed and upper-cased, the parameter trimmed.
    pub fn new(kind: FtpCommand, name: &str, parameter: &str) -> Self {
        Self {
            kind,
            name: name.trim().to_uppercase(),
            parameter: parameter.trim().to_string(),
        }
    }

    pub fn local_error() -> Self {
        Self::new(FtpCommand::LocalError, FtpCommand::LocalError.as_str(), "")
    }

    pub fn kind(&self) -> FtpCommand {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    pub fn process_in_interrupt_state(&self) -> bool {
        self.kind.process_in_interrupt_state()
    }

    pub fn can_clear_interrupt_state(&self) -> bool {
        self.kind.can_clear_interrupt_state()
    }

    pub fn to_ref(&self) -> CommandRef {
        CommandRef {
            name: self.name.clone(),
            can_clear_interrupt_state: self.can_clear_interrupt_state(),
        }
    }

    /// A reply answering this command.
    pub fn reply(&self, code: &str, text: impl Into<String>) -> Reply {
        Reply::new(Some(self.to_ref()), code, text)
    }

    pub fn execute(&self, conn: &mut ControlConnection) -> Result<Reply, CommandError> {
        if self.kind == FtpCommand::LocalError {
            return Ok(local_error::local_error_reply(self));
        }
        let handler = conn
            .context()
            .commands
            .handler(self.kind)
            .ok_or_else(|| CommandError::Unregistered(self.name.clone()))?;
        handler(self, conn)
    }

    /// Lets this command answer on behalf of `parent`, e.g. a FEAT line. `None` means the
    /// parent supplies its own default.
    pub fn execute_on_parent(&self, parent: &Command, conn: &mut ControlConnection) -> Option<Reply> {
        match self.kind {
            FtpCommand::Size => size::execute_on_parent(self, parent, conn),
            _ => None,
        }
    }
}
