//! Renderer option schema and the validated, ordered option set built from it.

use crate::error::{ExportError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Value kind accepted by a renderer option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    StringValue,
    Integer,
    EnumSet(&'static [&'static str]),
}

/// One entry of the renderer's command-line option table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererOption {
    pub name: &'static str,
    pub kind: OptionKind,
}

const fn option(name: &'static str, kind: OptionKind) -> RendererOption {
    RendererOption { name, kind }
}

/// Static table of recognized renderer options.
pub const OPTION_SCHEMA: &[RendererOption] = &[
    option("debug", OptionKind::Bool),
    option("cookies-file", OptionKind::StringValue),
    option("disk-cache", OptionKind::Bool),
    option("load-images", OptionKind::Bool),
    option("local-storage-path", OptionKind::StringValue),
    option("local-storage-quota", OptionKind::Integer),
    option("local-to-remote-url-access", OptionKind::Bool),
    // in KB
    option("max-disk-cache-size", OptionKind::Integer),
    option("output-encoding", OptionKind::StringValue),
    option("proxy", OptionKind::StringValue),
    option("proxy-type", OptionKind::EnumSet(&["http", "socks5", "none"])),
    option("proxy-auth", OptionKind::StringValue),
    option("script-encoding", OptionKind::StringValue),
    option(
        "ssl-protocol",
        OptionKind::EnumSet(&["sslv3", "sslv2", "tlsv1", "any"]),
    ),
    option("ssl-certificates-path", OptionKind::StringValue),
    option("web-security", OptionKind::Bool),
    option("webdriver", OptionKind::StringValue),
    option("webdriver-selenium-grid-hub", OptionKind::StringValue),
];

/// Looks up an option by name in [`OPTION_SCHEMA`].
pub fn lookup(name: &str) -> Option<&'static RendererOption> {
    OPTION_SCHEMA.iter().find(|opt| opt.name == name)
}

/// A renderer option value as supplied by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
    Int(i64),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(true) => write!(f, "true"),
            OptionValue::Bool(false) => write!(f, "false"),
            OptionValue::Str(s) => write!(f, "{}", s),
            OptionValue::Int(n) => write!(f, "{}", n),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl TryFrom<&serde_json::Value> for OptionValue {
    type Error = String;

    fn try_from(value: &serde_json::Value) -> std::result::Result<Self, Self::Error> {
        match value {
            serde_json::Value::Bool(b) => Ok(OptionValue::Bool(*b)),
            serde_json::Value::String(s) => Ok(OptionValue::Str(s.clone())),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(OptionValue::Int)
                .ok_or_else(|| format!("number {} is not an integer", n)),
            other => Err(format!("unsupported value {}", other)),
        }
    }
}

/// What to do with an option that fails validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionPolicy {
    /// Reject with [`ExportError::InvalidOption`].
    #[default]
    Strict,
    /// Log a warning and leave the set untouched.
    Lenient,
}

/// Checks `value` against the declared kind of `opt`.
fn check_kind(opt: &RendererOption, value: &OptionValue) -> std::result::Result<(), String> {
    match (opt.kind, value) {
        (OptionKind::Bool, OptionValue::Bool(_)) => Ok(()),
        (OptionKind::Bool, other) => Err(format!("expected a boolean, got `{}`", other)),
        (OptionKind::StringValue, OptionValue::Str(s)) if !s.is_empty() => Ok(()),
        (OptionKind::StringValue, OptionValue::Str(_)) => Err("value must not be empty".into()),
        (OptionKind::StringValue, other) => Err(format!("expected a string, got `{}`", other)),
        (OptionKind::Integer, OptionValue::Int(_)) => Ok(()),
        (OptionKind::Integer, other) => Err(format!("expected an integer, got `{}`", other)),
        (OptionKind::EnumSet(allowed), OptionValue::Str(s)) if allowed.contains(&s.as_str()) => {
            Ok(())
        }
        (OptionKind::EnumSet(allowed), other) => Err(format!(
            "`{}` is not one of {}",
            other,
            allowed.join(", ")
        )),
    }
}

/// Insertion-ordered set of validated renderer options.
///
/// Every entry satisfies its schema kind; names outside [`OPTION_SCHEMA`]
/// are never admitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptionSet {
    policy: OptionPolicy,
    entries: Vec<(&'static str, OptionValue)>,
}

impl CommandOptionSet {
    pub fn new(policy: OptionPolicy) -> Self {
        Self {
            policy,
            entries: Vec::new(),
        }
    }

    /// Admits `name = value` if both are valid against the schema.
    ///
    /// Re-adding a name replaces its value in its original position. Under
    /// [`OptionPolicy::Lenient`] invalid pairs are logged and dropped.
    pub fn add(&mut self, name: &str, value: impl Into<OptionValue>) -> Result<&mut Self> {
        let value = value.into();
        let verdict = match lookup(name) {
            None => Err(ExportError::invalid_option(name, "unknown option")),
            Some(opt) => check_kind(opt, &value)
                .map(|()| opt.name)
                .map_err(|reason| ExportError::invalid_option(name, reason)),
        };

        match verdict {
            Ok(key) => {
                match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
                    Some(entry) => entry.1 = value,
                    None => self.entries.push((key, value)),
                }
                Ok(self)
            }
            Err(err) if self.policy == OptionPolicy::Lenient => {
                warn!(option = name, error = %err, "Dropping invalid renderer option");
                Ok(self)
            }
            Err(err) => Err(err),
        }
    }

    /// Builds a set from a configuration object, keeping its key order.
    pub fn from_config(
        options: &serde_json::Map<String, serde_json::Value>,
        policy: OptionPolicy,
    ) -> Result<Self> {
        let mut set = Self::new(policy);
        for (name, raw) in options {
            match OptionValue::try_from(raw) {
                Ok(value) => {
                    set.add(name, value)?;
                }
                Err(reason) if policy == OptionPolicy::Lenient => {
                    warn!(option = %name, error = %reason, "Dropping invalid renderer option");
                }
                Err(reason) => return Err(ExportError::invalid_option(name, reason)),
            }
        }
        Ok(set)
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the set as `--name=value` tokens in insertion order.
    pub fn serialize(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(name, value)| format!("--{}={}", name, value))
            .collect()
    }
}
