use crate::core_ftpcommand::utils::{logged_in_user, permission_denied, required_path};
use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::ControlConnection;
use crate::session::{AttributeValue, SessionKey};
use log::debug;
use std::path::Path;
use std::sync::Arc;

/// Handles the CWD (Change Working Directory) FTP command.
///
/// The working directory is virtual, it is kept in the session and every later path
/// argument is resolved against it.
pub fn handle_cwd_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    let context = Arc::clone(conn.context());
    let user = try_reply!(logged_in_user(command, conn.session(), &context));
    let target = try_reply!(required_path(command, &context, conn.session(), &user.home));

    if !context
        .permissions
        .can_access_directory(&target.real_path, &user.home)
    {
        return Ok(permission_denied(command));
    }
    if !Path::new(&target.real_path).is_dir() {
        return Ok(command.reply("550", "Failed to change directory."));
    }

    debug!("{} changed directory to {}", user.username, target.virtual_path);
    conn.session_mut().set_attribute(
        SessionKey::CurrentDirectory,
        AttributeValue::Text(target.virtual_path),
    );
    Ok(command.reply("250", "Directory successfully changed."))
}
