// src/constants.rs

pub const VARIABLE_REGEX: &str = r"\$\{(\w+)\}";

pub const DEFAULT_CONFIG_PATH: &str = "/etc/ferroftpd.conf";
pub const DEFAULT_CONFIG_PATH_WINDOWS: &str = "C:\\ferroftpd\\etc\\ferroftpd.conf";

pub const REPLY_NOT_LOGGED_IN: &str = "Not logged in.";
pub const REPLY_CANT_OPEN_DATA_CONNECTION: &str = "Can't open data connection.";
pub const REPLY_LOCAL_ERROR: &str = "Requested action aborted. Local error in processing.";
pub const REPLY_PERMISSION_DENIED: &str = "Permission denied.";
pub const REPLY_SYNTAX_ERROR: &str = "Syntax error in parameters or arguments.";
pub const REPLY_NOT_IMPLEMENTED: &str = "Command not implemented.";
pub const REPLY_IDLE_TIMEOUT: &str = "Idle timeout, closing control connection.";
pub const REPLY_SERVICE_CLOSING: &str = "Service not available, closing control connection.";
pub const REPLY_TRANSFER_COMPLETE: &str = "Closing data connection. Transfer complete.";
pub const REPLY_TRANSFER_ABORTED: &str = "Connection closed; transfer aborted.";
pub const REPLY_FILE_ACTION_OKAY: &str = "Requested file action okay, completed.";
pub const REPLY_BAD_SEQUENCE: &str = "Bad sequence of commands.";

/// How long a PASV listener waits for the client to connect
pub const DATA_CONNECTION_TIMEOUT_SECS: u64 = 30;
