use crate::constants::REPLY_SYNTAX_ERROR;
use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::ControlConnection;
use crate::session::{AttributeValue, SessionKey};
use log::info;

/// Handles the USER FTP command.
///
/// Starts a new login: any previous login is dropped and the name is kept in the session
/// until PASS arrives.
pub fn handle_user_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    let username = command.parameter();
    if username.is_empty() {
        return Ok(command.reply("501", REPLY_SYNTAX_ERROR));
    }
    info!("Received USER command with username: {}", username);

    let session = conn.session_mut();
    session.remove_attribute(&SessionKey::LoginState);
    session.remove_attribute(&SessionKey::RenameFrom);
    session.set_attribute(
        SessionKey::Username,
        AttributeValue::Text(username.to_string()),
    );

    let text = if username.eq_ignore_ascii_case("anonymous") {
        "Anonymous login okay, send your complete email address as password."
    } else {
        "User name okay, need password."
    };
    Ok(command.reply("331", text))
}

#[cfg(test)]
mod tests {
    use crate::session::SessionKey;
    use crate::test_support::{connection, drain, login, test_server};

    #[tokio::test]
    async fn test_user_resets_the_login() {
        let server = test_server();
        let (mut conn, mut replies, _) = connection(&server);
        login(&mut conn, "bob");

        conn.dispatch("USER alice");
        assert_eq!(
            drain(&mut replies),
            vec!["331 User name okay, need password.\r\n"]
        );
        assert!(conn.session().login_state().is_none());
        assert_eq!(conn.session().text(&SessionKey::Username), Some("alice"));

        conn.dispatch("USER");
        assert!(drain(&mut replies)[0].starts_with("501"));
    }
}
