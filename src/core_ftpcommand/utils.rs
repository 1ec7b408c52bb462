use crate::constants::{
    REPLY_CANT_OPEN_DATA_CONNECTION, REPLY_NOT_LOGGED_IN, REPLY_PERMISSION_DENIED,
    REPLY_SYNTAX_ERROR,
};
use crate::core_fs::FileAdapter;
use crate::core_ftpcommand::command::Command;
use crate::core_ftpcommand::reply::Reply;
use crate::core_network::data::DataOpener;
use crate::core_network::ControlConnection;
use crate::core_permissions::UserHome;
use crate::server::ServerContext;
use crate::session::{AttributeValue, DataOpenerType, Session, SessionKey};
use crate::users::User;
use log::{trace, warn};

/// A client path, as the client sees it and on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub virtual_path: String,
    pub real_path: String,
}

/// Ok when the session is logged in, otherwise the 530 reply to send.
pub fn test_login(command: &Command, session: &Session) -> Result<(), Reply> {
    match session.login_state() {
        Some(_) => Ok(()),
        None => Err(command.reply("530", REPLY_NOT_LOGGED_IN)),
    }
}

/// The configured user behind a logged in session.
pub fn logged_in_user<'a>(
    command: &Command,
    session: &Session,
    context: &'a ServerContext,
) -> Result<&'a User, Reply> {
    test_login(command, session)?;
    let account = session
        .login_state()
        .map(|state| state.account.as_str())
        .unwrap_or_default();
    context.users.get(account).ok_or_else(|| {
        warn!("Logged in account {} is not configured", account);
        command.reply("530", REPLY_NOT_LOGGED_IN)
    })
}

/// Gets the data connection ready for a transfer command.
///
/// PASV consumes the opener and hands over the acquired port. PORT keeps the opener,
/// records how many reply bytes were sent so far and starts connecting to the client.
pub fn prepare_for_data_connection(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<DataOpener, Reply> {
    let opener = match conn.session().attribute(&SessionKey::DataOpenerType) {
        None => return Err(command.reply("425", REPLY_CANT_OPEN_DATA_CONNECTION)),
        Some(AttributeValue::Opener(opener)) => *opener,
        Some(other) => panic!("BUG: Unknown data opener type provided: {:?}", other),
    };

    match opener {
        DataOpenerType::Pasv => {
            let session = conn.session_mut();
            session.remove_attribute(&SessionKey::DataOpenerType);
            match session.remove_attribute(&SessionKey::DataPort) {
                Some(AttributeValue::Integer(port)) => match u16::try_from(port) {
                    Ok(port) => Ok(DataOpener::Passive { port }),
                    Err(_) => {
                        warn!("Data port attribute out of range: {}", port);
                        Err(command.reply("425", REPLY_CANT_OPEN_DATA_CONNECTION))
                    }
                },
                _ => Err(command.reply("425", REPLY_CANT_OPEN_DATA_CONNECTION)),
            }
        }
        DataOpenerType::Port => {
            let marker = conn.bytes_written();
            conn.session_mut()
                .set_attribute(SessionKey::ByteMarker150Reply, AttributeValue::Integer(marker));
            conn.data_connection_initiator_mut().activate();
            trace!("Data connection initiator activated at byte {}", marker);
            Ok(DataOpener::Active)
        }
    }
}

/// Absolute virtual path of a client supplied path.
pub fn virtual_path(adapter: &dyn FileAdapter, session: &Session, parameter: &str) -> String {
    if parameter.starts_with(adapter.separator()) {
        adapter.normalize_path(parameter)
    } else {
        adapter.join(session.current_directory(), parameter)
    }
}

/// Maps a virtual path onto the disk. A first component naming a virtual folder lands in
/// that folder, anything else under the home.
pub fn real_path(adapter: &dyn FileAdapter, home: &UserHome, virtual_path: &str) -> String {
    let sep = adapter.separator();
    let normalized = adapter.normalize_path(virtual_path);
    let relative = normalized.trim_start_matches(sep);
    let (first, rest) = relative.split_once(sep).unwrap_or((relative, ""));

    match home.virtual_folder(first) {
        Some(folder) if !first.is_empty() => adapter.join(folder.path(), rest),
        _ => adapter.join(home.path(), relative),
    }
}

pub fn resolve_path(
    context: &ServerContext,
    session: &Session,
    home: &UserHome,
    parameter: &str,
) -> ResolvedPath {
    let adapter = context.file_adapter.as_ref();
    let virtual_path = virtual_path(adapter, session, parameter);
    let real_path = real_path(adapter, home, &virtual_path);
    ResolvedPath {
        virtual_path,
        real_path,
    }
}

/// Like `resolve_path`, with a 501 reply for a missing argument.
pub fn required_path(
    command: &Command,
    context: &ServerContext,
    session: &Session,
    home: &UserHome,
) -> Result<ResolvedPath, Reply> {
    if command.parameter().is_empty() {
        return Err(command.reply("501", REPLY_SYNTAX_ERROR));
    }
    Ok(resolve_path(context, session, home, command.parameter()))
}

pub fn permission_denied(command: &Command) -> Reply {
    command.reply("550", REPLY_PERMISSION_DENIED)
}
