use crate::core_ftpcommand::utils::{logged_in_user, permission_denied, required_path};
use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::ControlConnection;
use log::{info, warn};
use std::fs;
use std::sync::Arc;

/// Handles the MKD (Make Directory) FTP command.
///
/// # Arguments
///
/// * `command` - The MKD command, its parameter names the new directory.
/// * `conn` - The control connection of the logged in user.
///
/// # Returns
///
/// 257 with the quoted virtual path of the new directory, or 550.
pub fn handle_mkd_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    // Only a logged in user gets this far, and the argument names the target.
    let context = Arc::clone(conn.context());
    let user = try_reply!(logged_in_user(command, conn.session(), &context));
    let target = try_reply!(required_path(command, &context, conn.session(), &user.home));

    if !context
        .permissions
        .can_create_directory(&target.real_path, &user.home)
    {
        return Ok(permission_denied(command));
    }

    match fs::create_dir(&target.real_path) {
        Ok(()) => {
            info!("{} created directory {}", user.username, target.real_path);
            // RFC 959 doubles quotes inside the quoted path.
            let quoted = target.virtual_path.replace('"', "\"\"");
            Ok(command.reply("257", format!("\"{}\" created.", quoted)))
        }
        Err(e) => {
            warn!("Failed to create directory {}: {}", target.real_path, e);
            Ok(command.reply("550", "Create directory operation failed."))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{connection, drain, last_code, login, test_server_with};

    #[tokio::test]
    async fn test_mkd() {
        let server = test_server_with(
            r#"
            [[file_system.users.home.properties]]
            create = [{ folder_regexp = "tmp.*", allow = false }]
            "#,
        );
        let (mut conn, mut replies, _) = connection(&server);
        login(&mut conn, "bob");

        conn.dispatch("MKD tmpdir");
        assert_eq!(last_code(&mut replies), "550");

        conn.dispatch("MKD music");
        assert_eq!(drain(&mut replies), vec!["257 \"/music\" created.\r\n"]);
        assert!(std::path::Path::new(&server.path("bob/music")).is_dir());

        conn.dispatch("MKD music");
        assert_eq!(last_code(&mut replies), "550");
    }
}
