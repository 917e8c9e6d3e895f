// ── Variable resolvers ──
//
// A `Resolver` turns a NUT variable into a string using the proxy
// configuration and the current telemetry snapshot. Resolvers are plain
// data (serializable, comparable) rather than closures, so the registry can
// be built from a catalog, overlaid from a config file, and inspected in
// tests. Composite variants own their children.

use serde::{Deserialize, Serialize};

use crate::config::ProxyConfig;
use crate::error::CoreError;
use crate::telemetry::Snapshot;

/// Status substrings mapped to NUT status prefixes, in priority order.
/// The first rule whose substring occurs in `STATUS` wins.
const STATUS_RULES: &[(&str, &str)] = &[
    ("ONLINE", "OL"),
    ("ONBATT", "OB DISCHRG"),
    ("LOWBATT", "LB"),
    ("CAL", "CAL"),
    ("OVERLOAD", "OVER"),
    ("TRIM", "TRIM"),
    ("BOOST", "BOOST"),
    ("REPLACEBATT", "RB"),
    ("SHUTTING DOWN", "SD"),
    ("COMMLOST", "OFF"),
];

/// Self-test substrings mapped to NUT `ups.test.result` text, in priority order.
const SELFTEST_RULES: &[(&str, &str)] = &[
    ("OK", "OK - Battery GOOD"),
    ("BT", "FAILED - Battery Capacity LOW"),
    ("NG", "FAILED - Overload"),
    ("NO", "No Test in the last 5mins"),
];

/// How to compute the value of one NUT variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolver {
    /// Always the given value.
    Fixed { value: String },

    /// Raw apcaccess value for `key`, or `fallback` when absent.
    Apc {
        key: String,
        #[serde(default = "Resolver::boxed_ignore")]
        fallback: Box<Resolver>,
    },

    /// `template` with each `{}` replaced by the next argument's value.
    Formatted {
        template: String,
        #[serde(default)]
        args: Vec<Resolver>,
    },

    /// apcaccess value in minutes, reported as whole seconds.
    ApcMinutesToSeconds {
        key: String,
        #[serde(default = "Resolver::boxed_ignore")]
        fallback: Box<Resolver>,
    },

    UpsName,
    UpsDescription,
    /// `MODEL`, suffixed with `NOMPOWER` watts when known.
    UpsModel,
    /// `STATUS` translated into NUT status flags.
    UpsStatus,
    /// `SELFTEST` translated into a human readable result.
    UpsSelfTest,
}

impl Resolver {
    pub fn fixed(value: impl Into<String>) -> Self {
        Self::Fixed {
            value: value.into(),
        }
    }

    /// A resolver that always yields the empty string. Variables resolving
    /// to an empty string are left out of `LIST VAR`.
    pub fn ignore() -> Self {
        Self::fixed("")
    }

    fn boxed_ignore() -> Box<Self> {
        Box::new(Self::ignore())
    }

    pub fn apc(key: impl Into<String>, fallback: Resolver) -> Self {
        Self::Apc {
            key: key.into(),
            fallback: Box::new(fallback),
        }
    }

    /// Shorthand for `apc(key, ignore())`.
    pub fn apc_or_ignore(key: impl Into<String>) -> Self {
        Self::apc(key, Self::ignore())
    }

    pub fn formatted(template: impl Into<String>, args: Vec<Resolver>) -> Self {
        Self::Formatted {
            template: template.into(),
            args,
        }
    }

    pub fn apc_minutes_to_seconds(key: impl Into<String>, fallback: Resolver) -> Self {
        Self::ApcMinutesToSeconds {
            key: key.into(),
            fallback: Box::new(fallback),
        }
    }

    /// Remaining runtime on battery, in seconds.
    pub fn battery_runtime() -> Self {
        Self::apc_minutes_to_seconds("TIMELEFT", Self::ignore())
    }

    /// Runtime threshold for the low battery condition, in seconds.
    pub fn battery_runtime_low() -> Self {
        Self::apc_minutes_to_seconds("DLOWBATT", Self::ignore())
    }

    /// Compute the value of variable `name`.
    pub fn resolve(
        &self,
        name: &str,
        config: &ProxyConfig,
        snapshot: &Snapshot,
    ) -> Result<String, CoreError> {
        match self {
            Self::Fixed { value } => Ok(value.clone()),
            Self::Apc { key, fallback } => match snapshot.get(key) {
                Some(value) => Ok(value.to_owned()),
                None => fallback.resolve(name, config, snapshot),
            },
            Self::Formatted { template, args } => {
                let values = args
                    .iter()
                    .map(|arg| arg.resolve(name, config, snapshot))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format_template(template, &values))
            }
            Self::ApcMinutesToSeconds { key, fallback } => {
                let raw = match snapshot.get(key) {
                    Some(value) => value.to_owned(),
                    None => fallback.resolve(name, config, snapshot)?,
                };
                minutes_to_seconds(key, &raw)
            }
            Self::UpsName => Ok(config.ups.name.clone()),
            Self::UpsDescription => Ok(config.ups.description.clone()),
            Self::UpsModel => Ok(ups_model(snapshot)),
            Self::UpsStatus => Ok(ups_status(snapshot)),
            Self::UpsSelfTest => Ok(ups_self_test(snapshot)),
        }
    }
}

// ── Domain conversions ──────────────────────────────────────────────

fn apc_value<'a>(snapshot: &'a Snapshot, key: &str) -> &'a str {
    snapshot.get(key).unwrap_or_default()
}

fn minutes_to_seconds(key: &str, raw: &str) -> Result<String, CoreError> {
    if raw.is_empty() {
        return Ok(String::new());
    }

    let format_error = || CoreError::Format {
        key: key.to_owned(),
        value: raw.to_owned(),
    };

    let minutes: f64 = raw.trim().parse().map_err(|_| format_error())?;
    if !minutes.is_finite() {
        return Err(format_error());
    }

    #[allow(clippy::cast_possible_truncation)]
    let seconds = (minutes * 60.0).trunc() as i64;
    Ok(seconds.to_string())
}

fn ups_model(snapshot: &Snapshot) -> String {
    let model = apc_value(snapshot, "MODEL");
    if model.is_empty() {
        return String::new();
    }

    match apc_value(snapshot, "NOMPOWER") {
        "" => model.to_owned(),
        watts => format!("{model} ({watts} W)"),
    }
}

fn ups_status(snapshot: &Snapshot) -> String {
    let status = apc_value(snapshot, "STATUS");
    if status.is_empty() {
        return String::new();
    }

    if status.contains("ONLINE") {
        let charging = apc_value(snapshot, "BCHARGE")
            .parse::<f64>()
            .is_ok_and(|charge| charge < 100.0);
        let prefix = if charging { "CHRG" } else { "OL" };
        return format!("{prefix} {status}");
    }

    STATUS_RULES
        .iter()
        .find(|(needle, _)| status.contains(needle))
        .map(|(_, prefix)| format!("{prefix} {status}"))
        .unwrap_or_default()
}

fn ups_self_test(snapshot: &Snapshot) -> String {
    let result = apc_value(snapshot, "SELFTEST");
    if result.is_empty() {
        return String::new();
    }

    SELFTEST_RULES
        .iter()
        .find(|(needle, _)| result.contains(needle))
        .map(|(_, text)| (*text).to_owned())
        .unwrap_or_default()
}

/// Substitute `{}` slots left to right. `{{` and `}}` produce literal
/// braces; slots beyond the supplied values render empty.
fn format_template(template: &str, values: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut values = values.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('{', Some('{')) | ('}', Some('}')) => {
                out.push(c);
                chars.next();
            }
            ('{', Some('}')) => {
                chars.next();
                if let Some(value) = values.next() {
                    out.push_str(value);
                }
            }
            _ => out.push(c),
        }
    }

    out
}
