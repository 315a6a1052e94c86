use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::vigil::properties::{BrowserProperties, LoginType, DEFAULT_LOGIN_PAGE_URL};

pub const ARG_LOGIN_PAGE: &str = "login-page";
pub const ARG_LOGIN_TYPE: &str = "login-type";
pub const ARG_REMEMBER_ME_SECONDS: &str = "remember-me-seconds";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SECURE_COOKIES: &str = "secure-cookies";

/// Read the browser settings from matches; unset values keep their defaults.
#[must_use]
pub fn parse(matches: &ArgMatches) -> BrowserProperties {
    let defaults = BrowserProperties::default();

    BrowserProperties::default()
        .with_login_page(
            matches
                .get_one::<String>(ARG_LOGIN_PAGE)
                .cloned()
                .unwrap_or_else(|| defaults.login_page().to_string()),
        )
        .with_login_type(
            matches
                .get_one::<LoginType>(ARG_LOGIN_TYPE)
                .copied()
                .unwrap_or(defaults.login_type()),
        )
        .with_remember_me_seconds(
            matches
                .get_one::<i64>(ARG_REMEMBER_ME_SECONDS)
                .copied()
                .unwrap_or(defaults.remember_me_seconds()),
        )
        .with_session_ttl_seconds(
            matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(defaults.session_ttl_seconds()),
        )
        .with_secure_cookies(matches.get_flag(ARG_SECURE_COOKIES))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LOGIN_PAGE)
                .long(ARG_LOGIN_PAGE)
                .help("Path of the sign-in page; HTML navigations are redirected here")
                .env("VIGIL_LOGIN_PAGE")
                .default_value(DEFAULT_LOGIN_PAGE_URL),
        )
        .arg(
            Arg::new(ARG_LOGIN_TYPE)
                .long(ARG_LOGIN_TYPE)
                .help("How login results are reported: json or redirect")
                .env("VIGIL_LOGIN_TYPE")
                .default_value("json")
                .value_parser(clap::value_parser!(LoginType)),
        )
        .arg(
            Arg::new(ARG_REMEMBER_ME_SECONDS)
                .long(ARG_REMEMBER_ME_SECONDS)
                .help("Lifetime of remember-me tokens in seconds")
                .env("VIGIL_REMEMBER_ME_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Idle timeout of browser sessions in seconds")
                .env("VIGIL_SESSION_TTL_SECONDS")
                .default_value("1800")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SECURE_COOKIES)
                .long(ARG_SECURE_COOKIES)
                .help("Mark session and remember-me cookies as Secure")
                .env("VIGIL_SECURE_COOKIES")
                .action(ArgAction::SetTrue),
        )
}
