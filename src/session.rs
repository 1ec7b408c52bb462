use crate::core_ftpcommand::reply::CommandRef;
use crate::core_network::DataConnectionMode;
use std::collections::HashMap;

/// Well known session attributes. `Custom` keeps the store open for extensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKey {
    LoginState,
    Username,
    DataOpenerType,
    DataPort,
    ByteMarker150Reply,
    InterruptCommand,
    CurrentDirectory,
    RenameFrom,
    TransferOutcome,
    Custom(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOpenerType {
    Pasv,
    Port,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginState {
    /// Name typed by the client
    pub username: String,
    /// Configured user the login resolved to
    pub account: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed { mode: DataConnectionMode, bytes: u64 },
    Failed { mode: DataConnectionMode, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Login(LoginState),
    Text(String),
    Opener(DataOpenerType),
    Integer(u64),
    Command(CommandRef),
    Outcome(TransferOutcome),
    Flag(bool),
}

/// Per user attribute store, owned by exactly one control connection.
#[derive(Debug, Default)]
pub struct Session {
    attributes: HashMap<SessionKey, AttributeValue>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_attribute(&mut self, key: SessionKey, value: AttributeValue) {
        self.attributes.insert(key, value);
    }

    pub fn attribute(&self, key: &SessionKey) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn remove_attribute(&mut self, key: &SessionKey) -> Option<AttributeValue> {
        self.attributes.remove(key)
    }

    pub fn attribute_names(&self) -> Vec<SessionKey> {
        self.attributes.keys().cloned().collect()
    }

    pub fn login_state(&self) -> Option<&LoginState> {
        match self.attribute(&SessionKey::LoginState) {
            Some(AttributeValue::Login(state)) => Some(state),
            _ => None,
        }
    }

    pub fn text(&self, key: &SessionKey) -> Option<&str> {
        match self.attribute(key) {
            Some(AttributeValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn integer(&self, key: &SessionKey) -> Option<u64> {
        match self.attribute(key) {
            Some(AttributeValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    /// Virtual working directory, `/` until changed.
    pub fn current_directory(&self) -> &str {
        self.text(&SessionKey::CurrentDirectory).unwrap_or("/")
    }
}
