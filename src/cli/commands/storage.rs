use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::vigil::users::UserStore;

pub const ARG_DSN: &str = "dsn";
pub const ARG_USER_STORE: &str = "user-store";
pub const ARG_CREATE_TOKEN_TABLE: &str = "create-token-table";

#[derive(Debug, Clone)]
pub struct Options {
    pub dsn: String,
    pub user_store: UserStore,
    pub create_token_table: bool,
}

impl Options {
    /// Parse storage arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the DSN is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let dsn = matches
            .get_one::<String>(ARG_DSN)
            .cloned()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_DSN}"))?;

        Ok(Self {
            dsn,
            user_store: matches
                .get_one::<UserStore>(ARG_USER_STORE)
                .copied()
                .unwrap_or_default(),
            create_token_table: matches.get_flag(ARG_CREATE_TOKEN_TABLE),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .env("VIGIL_DSN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_USER_STORE)
                .long(ARG_USER_STORE)
                .help("Where users are looked up: database or demo (any username, password 123456)")
                .env("VIGIL_USER_STORE")
                .default_value("database")
                .value_parser(clap::value_parser!(UserStore)),
        )
        .arg(
            Arg::new(ARG_CREATE_TOKEN_TABLE)
                .long(ARG_CREATE_TOKEN_TABLE)
                .help("Create the persistent_logins table at startup if it does not exist")
                .env("VIGIL_CREATE_TOKEN_TABLE")
                .action(ArgAction::SetTrue),
        )
}
