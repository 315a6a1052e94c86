use crate::{
    cli::telemetry,
    vigil::{self, properties::SecurityProperties, users::UserStore},
};
use anyhow::Result;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub user_store: UserStore,
    pub create_token_table: bool,
    pub properties: SecurityProperties,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!(
        "Starting with login page {}, login type {}, user store {}",
        args.properties.browser().login_page(),
        args.properties.browser().login_type(),
        args.user_store
    );

    let options = vigil::Options {
        user_store: args.user_store,
        create_token_table: args.create_token_table,
    };

    let result = vigil::new(args.port, args.dsn, args.properties, options).await;

    telemetry::shutdown_tracer();

    result
}
