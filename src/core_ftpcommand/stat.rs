use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::ControlConnection;

pub fn handle_stat_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    if conn.is_interrupted() {
        return Ok(command.reply("211", "Transfer in progress."));
    }
    let status = match conn.session().login_state() {
        Some(state) => format!("Logged in as {}", state.username),
        None => "Not logged in".to_string(),
    };
    Ok(command.reply(
        "211",
        format!("FTP server status:\n {}\nEnd of status", status),
    ))
}
