/// Why a data connection was opened, independent of how (PASV or PORT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataConnectionMode {
    /// Read data from the user and save it into a file
    Stor,
    /// Same as STOR, only the final reply is "250"
    Stou,
    /// Read a file and send it to the user
    Retr,
    /// Send directory content to the user
    List,
}

impl DataConnectionMode {
    pub fn is_upload(self) -> bool {
        matches!(self, DataConnectionMode::Stor | DataConnectionMode::Stou)
    }

    /// Code of the reply sent once the transfer succeeded.
    pub fn final_reply_code(self) -> &'static str {
        match self {
            DataConnectionMode::Stou => "250",
            _ => "226",
        }
    }
}
