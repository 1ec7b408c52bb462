use std::fmt;

#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy, PartialOrd, Ord)]
pub enum FtpCommand {
    User,
    Pass,
    Quit,
    Noop,
    Pwd,
    Cwd,
    Pasv,
    Port,
    Retr,
    Stor,
    Appe,
    Stou,
    List,
    Size,
    Feat,
    Dele,
    Mkd,
    Rmd,
    Rnfr,
    Rnto,
    Abor,
    Stat,
    /// Stands in for a command that faulted; never parsed from the wire
    LocalError,
}

impl FtpCommand {
    pub const ALL: [FtpCommand; 22] = [
        FtpCommand::User,
        FtpCommand::Pass,
        FtpCommand::Quit,
        FtpCommand::Noop,
        FtpCommand::Pwd,
        FtpCommand::Cwd,
        FtpCommand::Pasv,
        FtpCommand::Port,
        FtpCommand::Retr,
        FtpCommand::Stor,
        FtpCommand::Appe,
        FtpCommand::Stou,
        FtpCommand::List,
        FtpCommand::Size,
        FtpCommand::Feat,
        FtpCommand::Dele,
        FtpCommand::Mkd,
        FtpCommand::Rmd,
        FtpCommand::Rnfr,
        FtpCommand::Rnto,
        FtpCommand::Abor,
        FtpCommand::Stat,
    ];

    pub fn from_str(cmd: &str) -> Option<FtpCommand> {
        match cmd.trim().to_ascii_uppercase().as_str() {
            "USER" => Some(FtpCommand::User),
            "PASS" => Some(FtpCommand::Pass),
            "QUIT" => Some(FtpCommand::Quit),
            "NOOP" => Some(FtpCommand::Noop),
            "PWD" => Some(FtpCommand::Pwd),
            "CWD" => Some(FtpCommand::Cwd),
            "PASV" => Some(FtpCommand::Pasv),
            "PORT" => Some(FtpCommand::Port),
            "RETR" => Some(FtpCommand::Retr),
            "STOR" => Some(FtpCommand::Stor),
            "APPE" => Some(FtpCommand::Appe),
            "STOU" => Some(FtpCommand::Stou),
            "LIST" => Some(FtpCommand::List),
            "SIZE" => Some(FtpCommand::Size),
            "FEAT" => Some(FtpCommand::Feat),
            "DELE" => Some(FtpCommand::Dele),
            "MKD" => Some(FtpCommand::Mkd),
            "RMD" => Some(FtpCommand::Rmd),
            "RNFR" => Some(FtpCommand::Rnfr),
            "RNTO" => Some(FtpCommand::Rnto),
            "ABOR" => Some(FtpCommand::Abor),
            "STAT" => Some(FtpCommand::Stat),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FtpCommand::User => "USER",
            FtpCommand::Pass => "PASS",
            FtpCommand::Quit => "QUIT",
            FtpCommand::Noop => "NOOP",
            FtpCommand::Pwd => "PWD",
            FtpCommand::Cwd => "CWD",
            FtpCommand::Pasv => "PASV",
            FtpCommand::Port => "PORT",
            FtpCommand::Retr => "RETR",
            FtpCommand::Stor => "STOR",
            FtpCommand::Appe => "APPE",
            FtpCommand::Stou => "STOU",
            FtpCommand::List => "LIST",
            FtpCommand::Size => "SIZE",
            FtpCommand::Feat => "FEAT",
            FtpCommand::Dele => "DELE",
            FtpCommand::Mkd => "MKD",
            FtpCommand::Rmd => "RMD",
            FtpCommand::Rnfr => "RNFR",
            FtpCommand::Rnto => "RNTO",
            FtpCommand::Abor => "ABOR",
            FtpCommand::Stat => "STAT",
            FtpCommand::LocalError => "SYSTEM (LOCAL ERROR)",
        }
    }

    /// Whether the command still runs while a transfer holds the connection.
    pub fn process_in_interrupt_state(self) -> bool {
        matches!(self, FtpCommand::Abor | FtpCommand::Quit | FtpCommand::Stat)
    }

    /// Whether the reply to this command ends the INTERRUPT state.
    pub fn can_clear_interrupt_state(self) -> bool {
        matches!(self, FtpCommand::Abor)
    }
}

impl fmt::Display for FtpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
