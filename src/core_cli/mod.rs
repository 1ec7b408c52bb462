use clap::Parser;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "ferroftpd", about = "A FTP server written in Rust.")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Print the bcrypt hash of a password for the configuration, then exit
    #[arg(long, value_name = "PASSWORD")]
    pub hash_password: Option<String>,

    /// Enable verbose mode
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The configuration file to load, the platform default when none was given.
    pub fn config_path(&self) -> &str {
        if !self.config.is_empty() {
            &self.config
        } else if cfg!(target_os = "windows") {
            crate::constants::DEFAULT_CONFIG_PATH_WINDOWS
        } else {
            crate::constants::DEFAULT_CONFIG_PATH
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::parse_from(["ferroftpd", "-c", "/tmp/ftp.conf", "-v"]);
        assert_eq!(cli.config_path(), "/tmp/ftp.conf");
        assert!(cli.verbose);
        assert!(cli.hash_password.is_none());

        let cli = Cli::parse_from(["ferroftpd", "--hash-password", "secret"]);
        assert_eq!(cli.hash_password.as_deref(), Some("secret"));
        assert!(!cli.config_path().is_empty());
    }
}
