use crate::constants::REPLY_SYNTAX_ERROR;
use crate::core_fs::FileAdapter;
use crate::core_ftpcommand::utils::{
    logged_in_user, permission_denied, prepare_for_data_connection, required_path, resolve_path,
};
use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::data::PendingTransfer;
use crate::core_network::{ControlConnection, DataConnectionMode};
use log::debug;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreKind {
    Store,
    Append,
    Unique,
}

/// Handles the STOR FTP command: creates a file, or overwrites an existing one.
pub fn handle_stor_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    store(command, conn, StoreKind::Store)
}

/// Handles the APPE FTP command: appends to a file, creating it when missing.
pub fn handle_appe_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    store(command, conn, StoreKind::Append)
}

/// Handles the STOU FTP command: stores under a name no file uses yet.
pub fn handle_stou_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    store(command, conn, StoreKind::Unique)
}

/// Shared by STOR, APPE and STOU.
///
/// A missing file needs the create permission. An existing one needs append for APPE and
/// overwrite otherwise. The data connection is prepared last, so a refused command never
/// opens one.
fn store(
    command: &Command,
    conn: &mut ControlConnection,
    kind: StoreKind,
) -> Result<Reply, CommandError> {
    let context = Arc::clone(conn.context());
    let user = try_reply!(logged_in_user(command, conn.session(), &context));

    let real_path = if kind == StoreKind::Unique {
        let directory = resolve_path(&context, conn.session(), &user.home, "");
        let base = match command.parameter() {
            "" => "file",
            name => context.file_adapter.file_name(name),
        };
        if base.is_empty() || base == "." || base == ".." {
            return Ok(command.reply("501", REPLY_SYNTAX_ERROR));
        }
        unique_path(context.file_adapter.as_ref(), &directory.real_path, base)
    } else {
        try_reply!(required_path(command, &context, conn.session(), &user.home)).real_path
    };

    // Pick the permission from what is on disk now.
    let path = Path::new(&real_path);
    if path.is_dir() {
        return Ok(command.reply("550", "Cannot store over a directory."));
    }
    let exists = path.is_file();
    let permissions = &context.permissions;
    let allowed = match (kind, exists) {
        (_, false) => permissions.can_create_file(&real_path, &user.home),
        (StoreKind::Append, true) => permissions.can_append_file(&real_path, &user.home),
        (_, true) => permissions.can_overwrite_file(&real_path, &user.home),
    };
    if !allowed {
        return Ok(permission_denied(command));
    }

    // Everything checked, hand the connection to the transfer.
    let opener = try_reply!(prepare_for_data_connection(command, conn));
    let name = context.file_adapter.file_name(&real_path).to_string();
    debug!("{} stores {} ({:?})", user.username, real_path, kind);

    let reply = match kind {
        StoreKind::Unique => {
            let transfer = PendingTransfer::file(DataConnectionMode::Stou, opener, real_path);
            conn.begin_transfer(command, transfer);
            command.reply("150", format!("FILE: {}", name))
        }
        StoreKind::Append => {
            let transfer =
                PendingTransfer::file(DataConnectionMode::Stor, opener, real_path).appending();
            conn.begin_transfer(command, transfer);
            command.reply("150", format!("Ok to append to {}.", name))
        }
        StoreKind::Store => {
            let transfer = PendingTransfer::file(DataConnectionMode::Stor, opener, real_path);
            conn.begin_transfer(command, transfer);
            command.reply("150", format!("Ok to send data for {}.", name))
        }
    };
    Ok(reply)
}

/// `base`, or `base.N` with the first N not taken.
fn unique_path(adapter: &dyn FileAdapter, directory: &str, base: &str) -> String {
    let mut candidate = adapter.join(directory, base);
    let mut suffix = 1;
    while Path::new(&candidate).exists() {
        candidate = adapter.join(directory, &format!("{}.{}", base, suffix));
        suffix += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use crate::core_network::data::PendingTransfer;
    use crate::core_network::DataConnectionMode;
    use crate::session::{AttributeValue, DataOpenerType, SessionKey};
    use crate::core_network::ControlConnection;
    use crate::test_support::{connection, drain, last_code, login, test_server_with, TestServer};

    const LOCKED: &str = r#"
        [[file_system.users.home.properties]]
        create = [{ file_regexp = ".*\\.exe", allow = false }]
        overwrite = [{ file_regexp = "locked.*", allow = false }]
        append = [{ file_regexp = "journal.*", allow = false }]
    "#;

    fn with_port(conn: &mut ControlConnection) {
        conn.session_mut().set_attribute(
            SessionKey::DataOpenerType,
            AttributeValue::Opener(DataOpenerType::Port),
        );
    }

    fn setup() -> TestServer {
        let server = test_server_with(LOCKED);
        std::fs::write(server.path("bob/locked.txt"), b"x").unwrap();
        std::fs::write(server.path("bob/notes.txt"), b"x").unwrap();
        std::fs::write(server.path("bob/journal.txt"), b"x").unwrap();
        std::fs::write(server.path("bob/log.txt"), b"x").unwrap();
        server
    }

    #[tokio::test]
    async fn test_stor_checks_create_or_overwrite() {
        let server = setup();
        let (mut conn, mut replies, _) = connection(&server);
        login(&mut conn, "bob");
        with_port(&mut conn);

        conn.dispatch("STOR tool.exe");
        assert_eq!(last_code(&mut replies), "550");
        conn.dispatch("STOR locked.txt");
        assert_eq!(last_code(&mut replies), "550");
        assert!(conn.take_pending_transfer().is_none());

        conn.dispatch("STOR notes.txt");
        assert_eq!(
            drain(&mut replies),
            vec!["150 Ok to send data for notes.txt.\r\n"]
        );
        assert_eq!(
            conn.take_pending_transfer().unwrap().path,
            server.path("bob/notes.txt")
        );
    }

    #[tokio::test]
    async fn test_appe_checks_append() {
        let server = setup();
        let (mut conn, mut replies, _) = connection(&server);
        login(&mut conn, "bob");
        with_port(&mut conn);

        conn.dispatch("APPE journal.txt");
        assert_eq!(last_code(&mut replies), "550");

        conn.dispatch("APPE log.txt");
        assert_eq!(last_code(&mut replies), "150");
        let transfer = conn.take_pending_transfer().unwrap();
        assert!(transfer.append);
        assert_eq!(transfer.mode, DataConnectionMode::Stor);
    }

    #[tokio::test]
    async fn test_stou_picks_a_free_name() {
        let server = setup();
        let (mut conn, mut replies, _) = connection(&server);
        login(&mut conn, "bob");
        with_port(&mut conn);

        conn.dispatch("STOU notes.txt");
        assert_eq!(drain(&mut replies), vec!["150 FILE: notes.txt.1\r\n"]);
        let transfer: PendingTransfer = conn.take_pending_transfer().unwrap();
        assert_eq!(transfer.mode, DataConnectionMode::Stou);
        assert_eq!(transfer.path, server.path("bob/notes.txt.1"));
    }
}
