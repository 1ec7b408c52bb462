use crate::core_ftpcommand::utils::{
    logged_in_user, permission_denied, prepare_for_data_connection, resolve_path, ResolvedPath,
};
use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::data::PendingTransfer;
use crate::core_network::ControlConnection;
use crate::core_permissions::UserHome;
use crate::server::ServerContext;
use chrono::{DateTime, Local};
use std::fs::{self, Metadata};
use std::path::Path;
use std::sync::Arc;

/// Handles the LIST FTP command.
///
/// The listing is built before the data connection opens. Entries the user may not list
/// are left out. At the root the virtual folders show up as directories.
pub fn handle_list_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    let context = Arc::clone(conn.context());
    let user = try_reply!(logged_in_user(command, conn.session(), &context));

    // Options such as -la are accepted and ignored, what is left names the target.
    // An empty target lists the working directory.
    let argument = command
        .parameter()
        .split_whitespace()
        .filter(|part| !part.starts_with('-'))
        .collect::<Vec<_>>()
        .join(" ");
    let target = resolve_path(&context, conn.session(), &user.home, &argument);
    let permissions = &context.permissions;
    let path = Path::new(&target.real_path);

    let listing = if path.is_dir() {
        if !permissions.can_list_directory(&target.real_path, &user.home) {
            return Ok(permission_denied(command));
        }
        directory_listing(&context, &user.home, &target)?
    } else if path.is_file() {
        if !permissions.can_list_file(&target.real_path, &user.home) {
            return Ok(permission_denied(command));
        }
        let name = context.file_adapter.file_name(&target.real_path);
        format_entry(name, &fs::metadata(path)?)
    } else {
        return Ok(command.reply("550", "No such file or directory."));
    };

    let opener = try_reply!(prepare_for_data_connection(command, conn));
    conn.begin_transfer(command, PendingTransfer::listing(opener, listing));
    Ok(command.reply("150", "Here comes the directory listing."))
}

fn directory_listing(
    context: &ServerContext,
    home: &UserHome,
    target: &ResolvedPath,
) -> Result<String, CommandError> {
    let adapter = context.file_adapter.as_ref();
    let permissions = &context.permissions;
    let mut entries: Vec<(String, Metadata)> = Vec::new();

    for entry in fs::read_dir(&target.real_path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let metadata = entry.metadata()?;
        let real_path = adapter.join(&target.real_path, &name);
        let allowed = if metadata.is_dir() {
            permissions.can_list_directory(&real_path, home)
        } else {
            permissions.can_list_file(&real_path, home)
        };
        if allowed {
            entries.push((name, metadata));
        }
    }

    if target.virtual_path == adapter.separator() {
        for folder in home.virtual_folders() {
            if entries.iter().any(|(name, _)| name == folder.name()) {
                continue;
            }
            if !permissions.can_list_directory(folder.path(), home) {
                continue;
            }
            if let Ok(metadata) = fs::metadata(folder.path()) {
                entries.push((folder.name().to_string(), metadata));
            }
        }
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries
        .iter()
        .map(|(name, metadata)| format_entry(name, metadata))
        .collect())
}

/// One `ls -l` style line.
fn format_entry(name: &str, metadata: &Metadata) -> String {
    let mode = if metadata.is_dir() {
        "drwxr-xr-x"
    } else {
        "-rw-r--r--"
    };
    let modified: DateTime<Local> = metadata
        .modified()
        .map(DateTime::from)
        .unwrap_or_else(|_| Local::now());
    format!(
        "{} 1 ftp ftp {:>12} {} {}\r\n",
        mode,
        metadata.len(),
        modified.format("%b %d %H:%M"),
        name
    )
}
