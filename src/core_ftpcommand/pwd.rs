use crate::core_ftpcommand::utils::test_login;
use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::ControlConnection;

pub fn handle_pwd_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    try_reply!(test_login(command, conn.session()));
    let current = conn.session().current_directory().replace('"', "\"\"");
    Ok(command.reply("257", format!("\"{}\" is the current directory.", current)))
}
