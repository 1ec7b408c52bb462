/// Unwraps a guard's value or returns its reply from the handler.
macro_rules! try_reply {
    ($guard:expr) => {
        match $guard {
            Ok(value) => value,
            Err(reply) => return Ok(reply),
        }
    };
}

pub mod command;
pub mod error;
pub mod ftpcommand;
pub mod handlers;
pub mod reply;

// Here's the list of the FTP commands implemented
pub mod abor;
pub mod cwd;
pub mod dele;
pub mod feat;
pub mod list;
pub mod local_error;
pub mod mkd;
pub mod noop;
pub mod pass;
pub mod pwd;
pub mod quit;
pub mod retr;
pub mod rmd;
pub mod rnfr;
pub mod rnto;
pub mod size;
pub mod stat;
pub mod stor;
pub mod user;

// The utils and common functions are here
pub mod utils;

pub use command::Command;
pub use error::CommandError;
pub use ftpcommand::FtpCommand;
pub use handlers::CommandRegistry;
pub use reply::{CommandRef, Reply};
