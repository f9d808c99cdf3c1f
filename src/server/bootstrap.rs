//! Maintenance commands for the server binary.
//!
//! ```text
//! ukasir_server                 # run the HTTP server
//! ukasir_server serve           # same
//! ukasir_server migrate         # create the token table and exit
//! ukasir_server seed [TOKEN]    # insert an active, unbound token and exit
//! ```
//!
//! Seeding never modifies an existing row.

use tracing::info;

use crate::errors::TokenResult;
use crate::server::database::Database;

/// Token inserted by `seed` when none is given.
pub const DEFAULT_SEED_TOKEN: &str = "9999-0000-1111-2222";

pub const USAGE: &str = "usage: ukasir_server [serve | migrate | seed [TOKEN]]";

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server
    Serve,
    /// Create the schema and exit
    Migrate,
    /// Create the schema, insert a token and exit
    Seed { token: String },
    /// Unrecognised input; print usage
    Invalid(String),
}

/// Parse `std::env::args()`-style arguments (program name first).
pub fn parse_command(args: &[String]) -> Command {
    match args.get(1).map(String::as_str) {
        None | Some("serve") => Command::Serve,
        Some("migrate") => Command::Migrate,
        Some("seed") => Command::Seed {
            token: args
                .get(2)
                .cloned()
                .unwrap_or_else(|| DEFAULT_SEED_TOKEN.to_string()),
        },
        Some(other) => Command::Invalid(other.to_string()),
    }
}

/// Execute a maintenance command.
///
/// Returns `true` when the command was handled and the process should exit,
/// `false` when the server should start.
pub async fn execute_command(db: &Database, cmd: &Command) -> TokenResult<bool> {
    match cmd {
        Command::Serve => Ok(false),
        Command::Migrate => {
            db.ensure_schema().await?;
            info!("Table \"ukasir_token\" is ready");
            Ok(true)
        }
        Command::Seed { token } => {
            db.ensure_schema().await?;
            if db.insert_token(token, true).await? {
                info!("Seeded token: {token}");
            } else {
                info!("Token {token} already exists, skipped");
            }
            Ok(true)
        }
        Command::Invalid(_) => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_arguments_serves() {
        assert_eq!(parse_command(&args(&["ukasir_server"])), Command::Serve);
        assert_eq!(parse_command(&args(&["ukasir_server", "serve"])), Command::Serve);
    }

    #[test]
    fn seed_defaults_token() {
        assert_eq!(
            parse_command(&args(&["ukasir_server", "seed"])),
            Command::Seed {
                token: DEFAULT_SEED_TOKEN.to_string()
            }
        );
        assert_eq!(
            parse_command(&args(&["ukasir_server", "seed", "1234-5678-9012-3456"])),
            Command::Seed {
                token: "1234-5678-9012-3456".to_string()
            }
        );
    }

    #[test]
    fn unknown_command_is_invalid() {
        assert_eq!(
            parse_command(&args(&["ukasir_server", "backfill"])),
            Command::Invalid("backfill".to_string())
        );
        assert_eq!(parse_command(&args(&["ukasir_server", "migrate"])), Command::Migrate);
    }
}
