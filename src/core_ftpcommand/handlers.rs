use crate::core_ftpcommand::command::Command;
use crate::core_ftpcommand::error::CommandError;
use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::{
    abor, cwd, dele, feat, list, mkd, noop, pass, pwd, quit, retr, rmd, rnfr, rnto, size, stat,
    stor, user,
};
use crate::core_network::{pasv, port, ControlConnection};
use std::collections::HashMap;
use std::fmt;

pub type CommandHandler = fn(&Command, &mut ControlConnection) -> Result<Reply, CommandError>;

pub fn initialize_command_handlers() -> HashMap<FtpCommand, CommandHandler> {
    let mut handlers: HashMap<FtpCommand, CommandHandler> = HashMap::new();

    handlers.insert(FtpCommand::User, user::handle_user_command);
    handlers.insert(FtpCommand::Pass, pass::handle_pass_command);
    handlers.insert(FtpCommand::Quit, quit::handle_quit_command);
    handlers.insert(FtpCommand::Noop, noop::handle_noop_command);
    handlers.insert(FtpCommand::Pwd, pwd::handle_pwd_command);
    handlers.insert(FtpCommand::Cwd, cwd::handle_cwd_command);
    handlers.insert(FtpCommand::Pasv, pasv::handle_pasv_command);
    handlers.insert(FtpCommand::Port, port::handle_port_command);
    handlers.insert(FtpCommand::Retr, retr::handle_retr_command);
    handlers.insert(FtpCommand::Stor, stor::handle_stor_command);
    handlers.insert(FtpCommand::Appe, stor::handle_appe_command);
    handlers.insert(FtpCommand::Stou, stor::handle_stou_command);
    handlers.insert(FtpCommand::List, list::handle_list_command);
    handlers.insert(FtpCommand::Size, size::handle_size_command);
    handlers.insert(FtpCommand::Feat, feat::handle_feat_command);
    handlers.insert(FtpCommand::Dele, dele::handle_dele_command);
    handlers.insert(FtpCommand::Mkd, mkd::handle_mkd_command);
    handlers.insert(FtpCommand::Rmd, rmd::handle_rmd_command);
    handlers.insert(FtpCommand::Rnfr, rnfr::handle_rnfr_command);
    handlers.insert(FtpCommand::Rnto, rnto::handle_rnto_command);
    handlers.insert(FtpCommand::Abor, abor::handle_abor_command);
    handlers.insert(FtpCommand::Stat, stat::handle_stat_command);

    handlers
}

/// Maps command lines to the commands the server knows.
pub struct CommandRegistry {
    handlers: HashMap<FtpCommand, CommandHandler>,
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: initialize_command_handlers(),
        }
    }

    /// Builds the command for a raw line, `None` for verbs without a handler.
    pub fn resolve(&self, line: &str) -> Option<Command> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (name, parameter) = line.trim_start().split_once(' ').unwrap_or((line.trim(), ""));
        let kind = FtpCommand::from_str(name)?;
        self.handlers
            .contains_key(&kind)
            .then(|| Command::new(kind, name, parameter))
    }

    pub fn handler(&self, kind: FtpCommand) -> Option<CommandHandler> {
        self.handlers.get(&kind).copied()
    }

    /// Registered commands in a stable order.
    pub fn kinds(&self) -> Vec<FtpCommand> {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn unregister(&mut self, kind: FtpCommand) -> bool {
        self.handlers.remove(&kind).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_command_has_a_handler() {
        let registry = CommandRegistry::new();
        assert_eq!(registry.kinds(), FtpCommand::ALL.to_vec());
        assert!(registry.handler(FtpCommand::LocalError).is_none());
    }

    #[test]
    fn test_resolve() {
        let registry = CommandRegistry::new();

        let command = registry.resolve("retr  my file.txt\r\n").unwrap();
        assert_eq!(command.kind(), FtpCommand::Retr);
        assert_eq!(command.name(), "RETR");
        assert_eq!(command.parameter(), "my file.txt");

        let command = registry.resolve("pasv").unwrap();
        assert_eq!(command.kind(), FtpCommand::Pasv);
        assert_eq!(command.parameter(), "");

        assert!(registry.resolve("XMKD dir").is_none());
        assert!(registry.resolve("").is_none());
    }

    #[test]
    fn test_unregistered_verbs_do_not_resolve() {
        let mut registry = CommandRegistry::new();
        assert!(registry.unregister(FtpCommand::Stou));
        assert!(!registry.unregister(FtpCommand::Stou));
        assert!(registry.resolve("STOU").is_none());
    }
}
