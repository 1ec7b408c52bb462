use crate::constants::REPLY_TRANSFER_ABORTED;
use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::ControlConnection;
use log::info;

/// Handles the ABOR FTP command, one of the few accepted during a transfer.
pub fn handle_abor_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    if conn.abort_transfer() {
        info!("Transfer aborted by the client");
        conn.reply(Reply::system("426", REPLY_TRANSFER_ABORTED));
    }
    Ok(command.reply("226", "ABOR command successful."))
}
