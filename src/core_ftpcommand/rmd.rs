use crate::constants::REPLY_FILE_ACTION_OKAY;
use crate::core_ftpcommand::utils::{logged_in_user, permission_denied, required_path};
use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::ControlConnection;
use log::{info, warn};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Handles the RMD (Remove Directory) FTP command.
///
/// Only empty directories are removed, and never the home itself.
///
/// # Arguments
///
/// * `command` - The RMD command, its parameter names the directory.
/// * `conn` - The control connection of the logged in user.
///
/// # Returns
///
/// 250 once the directory is gone, 550 otherwise.
pub fn handle_rmd_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    // Only a logged in user gets this far, and the argument names the target.
    let context = Arc::clone(conn.context());
    let user = try_reply!(logged_in_user(command, conn.session(), &context));
    let target = try_reply!(required_path(command, &context, conn.session(), &user.home));

    // The home is the root of the user's tree.
    if target.real_path == user.home.path() {
        return Ok(permission_denied(command));
    }
    if !context
        .permissions
        .can_delete_directory(&target.real_path, &user.home)
    {
        return Ok(permission_denied(command));
    }
    if !Path::new(&target.real_path).is_dir() {
        return Ok(command.reply("550", "Directory does not exist."));
    }

    // remove_dir refuses directories that still hold entries.
    match fs::remove_dir(&target.real_path) {
        Ok(()) => {
            info!("{} removed directory {}", user.username, target.real_path);
            Ok(command.reply("250", REPLY_FILE_ACTION_OKAY))
        }
        Err(e) => {
            warn!("Failed to remove directory {}: {}", target.real_path, e);
            Ok(command.reply("550", "Remove directory operation failed."))
        }
    }
}
