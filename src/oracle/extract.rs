//! Field extraction from raw oracle text.
//!
//! The oracle prints a human-oriented key/value dump, not a grammar we can
//! rely on. Each scalar is a best-effort scrape of the first
//! `"<key>" "<digits>"` pair; a missing or unparseable value is `None`.
use regex::Regex;
use std::sync::OnceLock;

/// Key holding the build identifier.
pub const BUILD_ID_KEY: &str = "buildid";
/// Key holding the oracle's own update timestamp (epoch seconds).
pub const TIME_UPDATED_KEY: &str = "timeupdated";

/// Typed fields scraped from one oracle response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: Option<u64>,
    pub observed_at: Option<i64>,
}

/// Scrape the build identifier and update timestamp from oracle output.
pub fn extract(raw: &str) -> BuildInfo {
    BuildInfo {
        version: first_value(build_id_pattern(), raw),
        observed_at: first_value(time_updated_pattern(), raw),
    }
}

fn first_value<T: std::str::FromStr>(pattern: &Regex, raw: &str) -> Option<T> {
    pattern
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|value| value.as_str().parse().ok())
}

fn field_pattern(key: &str) -> String {
    format!(r#""{}"\s+"(\d+)""#, regex::escape(key))
}

fn build_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| compile(BUILD_ID_KEY))
}

fn time_updated_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| compile(TIME_UPDATED_KEY))
}

fn compile(key: &str) -> Regex {
    // Keys are crate constants run through regex::escape.
    Regex::new(&field_pattern(key)).expect("static field pattern compiles")
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP_INFO: &str = r#"
AppID : 100, change number : 2300/0, last change : Mon Jan  1 00:00:00 2024
"100"
{
	"common"
	{
		"name"		"Alpha"
	}
	"depots"
	{
		"branches"
		{
			"public"
			{
				"buildid"		"42"
				"timeupdated"		"1700000000"
			}
			"beta"
			{
				"buildid"		"57"
				"timeupdated"		"1710000000"
			}
		}
	}
}
"#;

    #[test]
    fn extracts_first_build_id_and_timestamp() {
        let info = extract(APP_INFO);
        assert_eq!(info.version, Some(42));
        assert_eq!(info.observed_at, Some(1_700_000_000));
    }

    #[test]
    fn single_space_separator_matches() {
        let info = extract(r#"noise "buildid" "42" trailing"#);
        assert_eq!(info.version, Some(42));
        assert_eq!(info.observed_at, None);
    }

    #[test]
    fn missing_fields_are_none() {
        let info = extract("Redirecting stderr to 'logs/stderr.txt'\nError! App '100' state is 0x202");
        assert_eq!(info, BuildInfo::default());
    }

    #[test]
    fn key_match_is_case_sensitive() {
        assert_eq!(extract(r#""BuildID" "42""#).version, None);
    }

    #[test]
    fn non_numeric_values_do_not_match() {
        assert_eq!(extract(r#""buildid" "abc" "buildid" "7""#).version, Some(7));
    }

    #[test]
    fn overflowing_values_yield_none() {
        let raw = r#""buildid" "99999999999999999999999999""#;
        assert_eq!(extract(raw).version, None);
    }
}
