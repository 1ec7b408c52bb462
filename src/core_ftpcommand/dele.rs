use crate::constants::REPLY_FILE_ACTION_OKAY;
use crate::core_ftpcommand::utils::{logged_in_user, permission_denied, required_path};
use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::ControlConnection;
use log::{info, warn};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Handles the DELE (Delete File) FTP command.
///
/// Deleting a file needs the whole permission chain up to delete: access, create, append,
/// overwrite and rename must all be allowed on the file as well.
///
/// # Arguments
///
/// * `command` - The DELE command, its parameter names the file.
/// * `conn` - The control connection of the logged in user.
///
/// # Returns
///
/// The reply to send: 250 once the file is gone, 550 when it may not or cannot be removed.
pub fn handle_dele_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    // Only a logged in user gets this far, and the argument names the target.
    let context = Arc::clone(conn.context());
    let user = try_reply!(logged_in_user(command, conn.session(), &context));
    let target = try_reply!(required_path(command, &context, conn.session(), &user.home));

    if !context
        .permissions
        .can_delete_file(&target.real_path, &user.home)
    {
        return Ok(permission_denied(command));
    }
    // Directories go through RMD.
    if !Path::new(&target.real_path).is_file() {
        return Ok(command.reply("550", "File does not exist."));
    }

    match fs::remove_file(&target.real_path) {
        Ok(()) => {
            info!("{} deleted {}", user.username, target.real_path);
            Ok(command.reply("250", REPLY_FILE_ACTION_OKAY))
        }
        Err(e) => {
            warn!("Failed to delete {}: {}", target.real_path, e);
            Ok(command.reply("550", "Failed to delete file."))
        }
    }
}
