//! Connection string handling and driver override options.
//!
//! A connection string is recognized only when it starts with
//! [`URL_PREFIX`]. Two optional keys pick the real driver explicitly:
//! [`DRIVER_PATH`] and [`DRIVER_CLASS`]. They may appear as query parameters
//! of the connection string or in the properties map; keys match
//! case-insensitively and query parameters win on conflict.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{DriverError, DriverResult};

/// Prefix that routes a connection string to this driver.
pub const URL_PREFIX: &str = "jdbc:insight:";

/// What [`URL_PREFIX`] is replaced with before handing the string on.
pub const TARGET_PREFIX: &str = "jdbc:";

/// Location of the binary that provides the real driver.
pub const DRIVER_PATH: &str = "jdbcpath";

/// Name of the real driver within [`DRIVER_PATH`].
pub const DRIVER_CLASS: &str = "jdbcclass";

const SUPPORTED_KEYS: [&str; 2] = [DRIVER_PATH, DRIVER_CLASS];

/// String properties passed alongside a connection string.
pub type Properties = HashMap<String, String>;

/// Whether `url` is addressed to this driver.
pub fn accepts_prefix(url: &str) -> bool {
    url.starts_with(URL_PREFIX)
}

/// Turn `jdbc:insight:pg://host/db` into `jdbc:pg://host/db`.
pub fn strip_prefix(url: &str) -> Option<String> {
    url.strip_prefix(URL_PREFIX)
        .map(|rest| format!("{TARGET_PREFIX}{rest}"))
}

/// Driver override settings merged from a connection string and properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverOptions {
    pub driver_path: Option<PathBuf>,
    pub driver_class: Option<String>,
}

impl DriverOptions {
    /// Merge the override keys of `target_url` and `properties`.
    ///
    /// `target_url` is the connection string after prefix stripping.
    pub fn parse(target_url: &str, properties: &Properties) -> DriverResult<Self> {
        let mut merged = supported_entries(
            properties
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        );
        merged.extend(query_entries(target_url)?);

        Ok(Self {
            driver_path: merged.remove(DRIVER_PATH).map(PathBuf::from),
            driver_class: merged.remove(DRIVER_CLASS),
        })
    }

    /// The `(path, class)` pair, only when both are set.
    pub fn explicit_driver(&self) -> Option<(&Path, &str)> {
        match (&self.driver_path, &self.driver_class) {
            (Some(path), Some(class)) => Some((path.as_path(), class.as_str())),
            _ => None,
        }
    }
}

/// Keep the override keys of `entries`, normalized to lowercase.
///
/// When several spellings of one key are present, the exact lowercase key
/// wins, then the lexically smallest spelling. Repeats of one spelling keep
/// their last value.
fn supported_entries<'a>(
    entries: impl Iterator<Item = (&'a str, &'a str)>,
) -> HashMap<&'static str, String> {
    let mut matched: Vec<(&'static str, &'a str, &'a str)> = entries
        .filter_map(|(key, value)| {
            SUPPORTED_KEYS
                .iter()
                .find(|supported| key.eq_ignore_ascii_case(supported))
                .map(|supported| (*supported, key, value))
        })
        .collect();
    matched.sort_by_key(|(supported, key, _)| (*key == *supported, Reverse(*key)));

    matched
        .into_iter()
        .map(|(supported, _, value)| (supported, value.to_owned()))
        .collect()
}

fn query_entries(target_url: &str) -> DriverResult<HashMap<&'static str, String>> {
    let without_scheme = target_url.strip_prefix(TARGET_PREFIX).unwrap_or(target_url);
    if !without_scheme.contains('?') {
        return Ok(HashMap::new());
    }

    let url = Url::parse(without_scheme).map_err(|e| DriverError::InvalidUrl {
        url: target_url.to_owned(),
        reason: e.to_string(),
    })?;
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    Ok(supported_entries(
        pairs.iter().map(|(key, value)| (key.as_str(), value.as_str())),
    ))
}
