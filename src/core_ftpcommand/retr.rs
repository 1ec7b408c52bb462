use crate::core_ftpcommand::utils::{
    logged_in_user, permission_denied, prepare_for_data_connection, required_path,
};
use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::data::PendingTransfer;
use crate::core_network::{ControlConnection, DataConnectionMode};
use std::path::Path;
use std::sync::Arc;

/// Handles the RETR FTP command.
///
/// Checks run in order: login, path, permission, file, and only then the data connection,
/// so a refused command never opens one.
pub fn handle_retr_command(
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
    if !Path::new(&target.real_path).is_file() {
        return Ok(command.reply("550", "File not found."));
    }

    let opener = try_reply!(prepare_for_data_connection(command, conn));
    conn.begin_transfer(
        command,
        PendingTransfer::file(DataConnectionMode::Retr, opener, target.real_path),
    );
    Ok(command.reply(
        "150",
        format!(
            "Opening BINARY mode data connection for {}.",
            command.parameter()
        ),
    ))
}

#[cfg(test)]
mod tests {
    use crate::core_network::data::{DataOpener, PendingTransfer};
    use crate::core_network::DataConnectionMode;
    use crate::session::{AttributeValue, DataOpenerType, SessionKey};
    use crate::test_support::{connection, drain, last_code, login, test_server_with};

    const SECRETS: &str = r#"
        [[file_system.users.home.properties]]
        access = [{ file_regexp = "secret.*", allow = false }]
    "#;

    #[tokio::test]
    async fn test_retr_with_port() {
        let server = test_server_with(SECRETS);
        std::fs::write(server.path("bob/report.txt"), b"data").unwrap();
        let (mut conn, mut replies, initiator) = connection(&server);
        login(&mut conn, "bob");

        conn.dispatch("PORT 127,0,0,1,4,1");
        drain(&mut replies);
        let marker = conn.bytes_written();

        conn.dispatch("RETR report.txt");
        assert_eq!(
            drain(&mut replies),
            vec!["150 Opening BINARY mode data connection for report.txt.\r\n"]
        );
        assert!(conn.is_interrupted());
        assert_eq!(initiator.activations(), 1);
        assert_eq!(
            conn.session().integer(&SessionKey::ByteMarker150Reply),
            Some(marker)
        );
        assert_eq!(
            conn.take_pending_transfer(),
            Some(PendingTransfer::file(
                DataConnectionMode::Retr,
                DataOpener::Active,
                server.path("bob/report.txt")
            ))
        );
    }

    #[tokio::test]
    async fn test_retr_refusals_keep_the_data_connection_unopened() {
        let server = test_server_with(SECRETS);
        std::fs::write(server.path("bob/secret.txt"), b"data").unwrap();
        std::fs::write(server.path("bob/open.txt"), b"data").unwrap();
        let (mut conn, mut replies, initiator) = connection(&server);
        login(&mut conn, "bob");
        conn.session_mut().set_attribute(
            SessionKey::DataOpenerType,
            AttributeValue::Opener(DataOpenerType::Port),
        );

        conn.dispatch("RETR secret.txt");
        assert_eq!(last_code(&mut replies), "550");
        conn.dispatch("RETR missing.txt");
        assert_eq!(last_code(&mut replies), "550");
        conn.dispatch("RETR");
        assert_eq!(last_code(&mut replies), "501");

        assert_eq!(initiator.activations(), 0);
        assert!(!conn.is_interrupted());
        assert!(conn.take_pending_transfer().is_none());

        conn.session_mut()
            .remove_attribute(&SessionKey::DataOpenerType);
        conn.dispatch("RETR open.txt");
        assert_eq!(last_code(&mut replies), "425");
        assert!(!conn.is_interrupted());
    }
}
