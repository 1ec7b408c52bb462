use crate::constants::{REPLY_BAD_SEQUENCE, REPLY_NOT_LOGGED_IN};
use crate::core_auth::verify_password;
use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::ControlConnection;
use crate::session::{AttributeValue, LoginState, SessionKey};
use log::{info, warn};
use std::sync::Arc;

/// Handles the PASS FTP command.
///
/// Names without a configured user log in as the default user. Users without a password
/// hash accept any password.
pub fn handle_pass_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    if conn.session().login_state().is_some() {
        return Ok(command.reply("503", "Already logged in."));
    }
    let Some(username) = conn
        .session()
        .text(&SessionKey::Username)
        .map(str::to_string)
    else {
        return Ok(command.reply("503", REPLY_BAD_SEQUENCE));
    };

    let context = Arc::clone(conn.context());
    let Some(user) = context.users.find(&username) else {
        warn!("Login refused for {}: no such user and no default user", username);
        return Ok(command.reply("530", REPLY_NOT_LOGGED_IN));
    };
    if let Some(hash) = &user.password_hash {
        if !verify_password(command.parameter(), hash) {
            warn!("Wrong password for user {}", username);
            return Ok(command.reply("530", REPLY_NOT_LOGGED_IN));
        }
    }

    info!("User {} logged in as {}", username, user.username);
    let session = conn.session_mut();
    session.set_attribute(
        SessionKey::LoginState,
        AttributeValue::Login(LoginState {
            username,
            account: user.username.clone(),
        }),
    );
    session.set_attribute(
        SessionKey::CurrentDirectory,
        AttributeValue::Text("/".to_string()),
    );
    Ok(command.reply("230", "User logged in, proceed."))
}
