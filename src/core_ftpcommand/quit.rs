use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::ControlConnection;
use log::info;

/// Handles the QUIT FTP command. The connection closes once the goodbye is sent.
pub fn handle_quit_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    let user = conn
        .session()
        .login_state()
        .map(|state| state.username.clone())
        .unwrap_or_else(|| "<not logged in>".to_string());
    info!("QUIT from {}", user);
    conn.close();
    Ok(command.reply("221", "Goodbye."))
}
