use crate::core_ftpcommand::{Command, CommandError, FtpCommand, Reply};
use crate::core_network::ControlConnection;
use std::sync::Arc;

/// Handles the FEAT FTP command: every registered command may contribute a line.
pub fn handle_feat_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    let context = Arc::clone(conn.context());
    let features: Vec<String> = context
        .commands
        .kinds()
        .into_iter()
        .filter(|kind| *kind != FtpCommand::Feat)
        .filter_map(|kind| Command::new(kind, kind.as_str(), "").execute_on_parent(command, conn))
        .map(|reply| format!(" {}", reply.text()))
        .collect();

    if features.is_empty() {
        return Ok(command.reply("211", "No extensions supported."));
    }
    Ok(command.reply(
        "211",
        format!("Extensions supported:\n{}\nEnd", features.join("\n")),
    ))
}
