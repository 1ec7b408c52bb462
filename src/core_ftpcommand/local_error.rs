use crate::constants::REPLY_LOCAL_ERROR;
use crate::core_ftpcommand::{Command, Reply};

/// The reply sent in place of a command that faulted.
pub fn local_error_reply(command: &Command) -> Reply {
    command.reply("451", REPLY_LOCAL_ERROR)
}
