//! Ant-style path patterns for the public allow-list.
//!
//! `?` matches one character and `*` matches within a single path segment.
//! `**` matches across segments, including none at all when written as `/**/`.
//! Anything else is literal.

use anyhow::{Context, Result};
use regex::Regex;

#[derive(Clone, Debug)]
pub struct AntMatcher {
    regex: Regex,
}

impl AntMatcher {
    /// Compile an Ant pattern.
    ///
    /// # Errors
    /// Returns an error if the generated expression does not compile.
    pub fn new(pattern: &str) -> Result<Self> {
        let mut expression = String::from("^");
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' if chars.peek() == Some(&'*') => {
                    chars.next();
                    if chars.peek() == Some(&'/') {
                        // `/**/x` also matches `/x`.
                        chars.next();
                        expression.push_str("(?:.*/)?");
                    } else {
                        expression.push_str(".*");
                    }
                }
                '*' => expression.push_str("[^/]*"),
                '?' => expression.push_str("[^/]"),
                other => expression.push_str(&regex::escape(&other.to_string())),
            }
        }
        expression.push('$');

        let regex = Regex::new(&expression)
            .with_context(|| format!("invalid path pattern: {pattern}"))?;

        Ok(Self { regex })
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Paths reachable without authentication.
#[derive(Clone, Debug, Default)]
pub struct PermitAll {
    matchers: Vec<AntMatcher>,
}

impl PermitAll {
    /// # Errors
    /// Returns an error if any pattern is invalid.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matchers = patterns
            .into_iter()
            .map(|pattern| AntMatcher::new(pattern.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { matchers })
    }

    #[must_use]
    pub fn permits(&self, path: &str) -> bool {
        self.matchers.iter().any(|matcher| matcher.matches(path))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn exact_patterns_match_only_themselves() {
        let matcher = AntMatcher::new("/authentication/require").unwrap();
        assert!(matcher.matches("/authentication/require"));
        assert!(!matcher.matches("/authentication/required"));
        assert!(!matcher.matches("/authentication"));
    }

    #[test]
    fn literal_dots_are_escaped() {
        let matcher = AntMatcher::new("/signIn.html").unwrap();
        assert!(matcher.matches("/signIn.html"));
        assert!(!matcher.matches("/signInxhtml"));
    }

    #[test]
    fn single_star_stays_within_a_segment() {
        let matcher = AntMatcher::new("/code/*").unwrap();
        assert!(matcher.matches("/code/image"));
        assert!(matcher.matches("/code/sms"));
        assert!(!matcher.matches("/code/sms/extra"));
        assert!(!matcher.matches("/codes/sms"));
    }

    #[test]
    fn double_star_crosses_segments() {
        let matcher = AntMatcher::new("/static/**").unwrap();
        assert!(matcher.matches("/static/css/site.css"));
        assert!(!matcher.matches("/other/site.css"));
    }

    #[test]
    fn leading_double_star_matches_zero_segments() {
        let matcher = AntMatcher::new("/**/favicon.*").unwrap();
        assert!(matcher.matches("/favicon.ico"));
        assert!(matcher.matches("/static/img/favicon.png"));
        assert!(!matcher.matches("/favicon"));
        assert!(!matcher.matches("/favicon.ico/page.html"));
    }

    #[test]
    fn question_mark_matches_one_character() {
        let matcher = AntMatcher::new("/v?/ping").unwrap();
        assert!(matcher.matches("/v1/ping"));
        assert!(!matcher.matches("/v10/ping"));
    }

    #[test]
    fn permit_all_checks_every_pattern() {
        let permit = PermitAll::new(["/a", "/code/*"]).unwrap();
        assert!(permit.permits("/a"));
        assert!(permit.permits("/code/sms"));
        assert!(!permit.permits("/b"));
    }
}
