//! Maps validated CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{browser, storage};
use crate::vigil::properties::SecurityProperties;
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let storage_opts = storage::Options::parse(matches)?;
    let properties = SecurityProperties::new(browser::parse(matches));

    Ok(Action::Server(Args {
        port,
        dsn: storage_opts.dsn,
        user_store: storage_opts.user_store,
        create_token_table: storage_opts.create_token_table,
        properties,
    }))
}
