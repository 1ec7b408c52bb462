use crate::core_ftpcommand::utils::{logged_in_user, permission_denied, required_path};
use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::ControlConnection;
use crate::session::{AttributeValue, SessionKey};
use log::debug;
use std::path::Path;
use std::sync::Arc;

/// Handles the RNFR (Rename From) FTP command.
///
/// Checks the rename permission on the source and remembers it for RNTO.
///
/// # Arguments
///
/// * `command` - The RNFR command, its parameter names the source.
/// * `conn` - The control connection of the logged in user.
///
/// # Returns
///
/// 350 when RNTO may follow, 550 when the source is missing or may not be renamed.
pub fn handle_rnfr_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    let context = Arc::clone(conn.context());
    let user = try_reply!(logged_in_user(command, conn.session(), &context));
    let source = try_reply!(required_path(command, &context, conn.session(), &user.home));
    // A refused RNFR must not leave an older source behind.
    conn.session_mut().remove_attribute(&SessionKey::RenameFrom);

    let path = Path::new(&source.real_path);
    let allowed = if path.is_dir() {
        source.real_path != user.home.path()
            && context
                .permissions
                .can_rename_directory(&source.real_path, &user.home)
    } else if path.is_file() {
        context
            .permissions
            .can_rename_file(&source.real_path, &user.home)
    } else {
        return Ok(command.reply("550", "File not found."));
    };
    if !allowed {
        return Ok(permission_denied(command));
    }

    debug!("Rename from {}", source.real_path);
    conn.session_mut().set_attribute(
        SessionKey::RenameFrom,
        AttributeValue::Text(source.real_path),
    );
    Ok(command.reply("350", "Ready for RNTO."))
}
