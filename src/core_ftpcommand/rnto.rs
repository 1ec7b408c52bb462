use crate::constants::REPLY_BAD_SEQUENCE;
use crate::core_ftpcommand::utils::{logged_in_user, permission_denied, required_path};
use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::ControlConnection;
use crate::session::{AttributeValue, SessionKey};
use log::{info, warn};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Handles the RNTO (Rename To) FTP command.
///
/// The target must not exist and must be creatable.
///
/// # Arguments
///
/// * `command` - The RNTO command, its parameter names the target.
/// * `conn` - The control connection holding the source from RNFR.
///
/// # Returns
///
/// 250 after the rename, 503 without a preceding RNFR, 550 otherwise.
pub fn handle_rnto_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    let context = Arc::clone(conn.context());
    let user = try_reply!(logged_in_user(command, conn.session(), &context));
    // The source is consumed whatever happens next.
    let Some(AttributeValue::Text(source)) =
        conn.session_mut().remove_attribute(&SessionKey::RenameFrom)
    else {
        return Ok(command.reply("503", REPLY_BAD_SEQUENCE));
    };
    let target = try_reply!(required_path(command, &context, conn.session(), &user.home));

    if Path::new(&target.real_path).exists() {
        return Ok(command.reply("550", "Target already exists."));
    }
    // The target is a new entry, so it needs the create permission.
    let allowed = if Path::new(&source).is_dir() {
        context
            .permissions
            .can_create_directory(&target.real_path, &user.home)
    } else {
        context
            .permissions
            .can_create_file(&target.real_path, &user.home)
    };
    if !allowed {
        return Ok(permission_denied(command));
    }

    match fs::rename(&source, &target.real_path) {
        Ok(()) => {
            info!("{} renamed {} to {}", user.username, source, target.real_path);
            Ok(command.reply("250", "Rename successful."))
        }
        Err(e) => {
            warn!("Failed to rename {}: {}", source, e);
            Ok(command.reply("550", "Rename failed."))
        }
    }
}
