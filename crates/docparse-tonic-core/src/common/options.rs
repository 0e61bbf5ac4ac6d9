//! Typed parse options with an explicit default table.
//!
//! The wire request carries options as an open `map<string, string>`.
//! Two keys are recognized and defaulted when absent:
//!
//! - `parse_method` (default `"auto"`)
//! - `debug_enabled` (default `false`)
//!
//! Every other key is deliberately passed through to the engine
//! unexamined. This preserves the lenient behavior of the wire
//! contract: callers may attach engine-specific knobs without the
//! router rejecting or interpreting them.

use std::collections::{BTreeMap, HashMap};

/// Wire key for the parse method option.
pub const PARSE_METHOD_KEY: &str = "parse_method";
/// Wire key for the debug flag option.
pub const DEBUG_ENABLED_KEY: &str = "debug_enabled";
/// Default parse method applied when the caller sends none.
pub const DEFAULT_PARSE_METHOD: &str = "auto";

/// The normalized option set handed to a worker slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSet {
    pub parse_method: String,
    pub debug_enabled: bool,
    /// Unrecognized options, retained untouched.
    pub extra: BTreeMap<String, String>,
}

impl Default for OptionSet {
    fn default() -> Self {
        Self {
            parse_method: DEFAULT_PARSE_METHOD.to_string(),
            debug_enabled: false,
            extra: BTreeMap::new(),
        }
    }
}

impl OptionSet {
    /// Builds an option set from the wire mapping, filling in defaults
    /// for absent recognized keys.
    pub fn from_map(mut kwargs: HashMap<String, String>) -> Self {
        let parse_method = kwargs
            .remove(PARSE_METHOD_KEY)
            .unwrap_or_else(|| DEFAULT_PARSE_METHOD.to_string());
        let debug_enabled = kwargs
            .remove(DEBUG_ENABLED_KEY)
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        Self {
            parse_method,
            debug_enabled,
            extra: kwargs.into_iter().collect(),
        }
    }

    /// Converts the option set back into its wire mapping.
    pub fn into_map(self) -> HashMap<String, String> {
        let mut map: HashMap<String, String> = self.extra.into_iter().collect();
        map.insert(PARSE_METHOD_KEY.to_string(), self.parse_method);
        map.insert(
            DEBUG_ENABLED_KEY.to_string(),
            self.debug_enabled.to_string(),
        );
        map
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "true" | "True" | "1")
}
