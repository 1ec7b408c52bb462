use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::ControlConnection;

pub fn handle_noop_command(
    command: &Command,
    _conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    Ok(command.reply("200", "Command okay."))
}
