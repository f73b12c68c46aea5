//! Session path convention
//!
//! Files are registered under relative paths following the
//! `<subject-nickname>/<date>/<session-number>[/...]` convention, e.g.
//! `mouse1/2021-03-04/002/alf`. Parsing is pure; resolving the nickname to a
//! subject happens in the command handler.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// The identifying triple extracted from a relative path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPath {
    pub nickname: String,
    pub date: NaiveDate,
    pub number: i32,
}

/// The path does not follow the `nickname/YYYY-MM-DD/n[/...]` convention
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("The path '{path}' should be `nickname/YYYY-MM-DD/n[/...]`")]
pub struct InvalidPathFormat {
    pub path: String,
}

fn path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<nickname>[a-zA-Z0-9_-]+)/(?P<date>[0-9-]{10})/(?P<number>[0-9]+)(?P<trailing>.*)$",
        )
        .expect("session path regex is valid")
    })
}

/// Normalize backslashes and doubled slashes to single forward slashes
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/").replace("//", "/")
}

/// Parse a normalized relative path into its session triple
pub fn parse_session_path(path: &str) -> Result<SessionPath, InvalidPathFormat> {
    let invalid = || InvalidPathFormat {
        path: path.to_string(),
    };

    let captures = path_regex().captures(path).ok_or_else(invalid)?;

    let date = NaiveDate::parse_from_str(&captures["date"], "%Y-%m-%d").map_err(|_| invalid())?;
    let number: i32 = captures["number"].parse().map_err(|_| invalid())?;

    Ok(SessionPath {
        nickname: captures["nickname"].to_string(),
        date,
        number,
    })
}
