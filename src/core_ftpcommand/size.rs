use crate::core_ftpcommand::utils::{logged_in_user, permission_denied, required_path};
use crate::core_ftpcommand::{Command, CommandError, FtpCommand, Reply};
use crate::core_network::ControlConnection;
use std::fs;
use std::sync::Arc;

/// Handles the SIZE FTP command.
///
/// # Arguments
///
/// * `command` - The SIZE command, its parameter names the file.
/// * `conn` - The control connection of the logged in user.
///
/// # Returns
///
/// 213 with the size in bytes, 550 for a directory or a missing file.
pub fn handle_size_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    let context = Arc::clone(conn.context());
    let user = try_reply!(logged_in_user(command, conn.session(), &context));
    let target = try_reply!(required_path(command, &context, conn.session(), &user.home));

    if !context
        .permissions
        .can_access_file(&target.real_path, &user.home)
    {
        return Ok(permission_denied(command));
    }
    match fs::metadata(&target.real_path) {
        Ok(metadata) if metadata.is_file() => Ok(command.reply("213", metadata.len().to_string())),
        _ => Ok(command.reply("550", "Could not get file size.")),
    }
}

/// SIZE is advertised as a FEAT line.
pub fn execute_on_parent(
    command: &Command,
    parent: &Command,
    _conn: &mut ControlConnection,
) -> Option<Reply> {
    (parent.kind() == FtpCommand::Feat).then(|| command.reply("211", "SIZE"))
}
