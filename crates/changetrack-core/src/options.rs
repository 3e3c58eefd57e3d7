//! Tracker option layers and their resolution.
//!
//! Options arrive in layers: built-in defaults, the process-wide layer, and
//! the per-type layer declared on the record model. Later layers win per key.
//! Resolution is pure: it never touches caches or records.

use crate::error::ConfigError;
use serde_json::{Map, Value};

/// Every option key the resolver accepts.
pub const KNOWN_OPTIONS: [&str; 6] = [
    "only",
    "except",
    "track_has_many",
    "auto",
    "enable_is_dirty",
    "ordered_has_many",
];

///
/// OptionLayer
///
/// Raw key/value options as declared by one configuration source.
/// Keys are kept unvalidated until resolution so that unknown keys can be
/// reported together with the model that triggered setup.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OptionLayer {
    entries: Map<String, Value>,
}

impl OptionLayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one option, replacing any earlier value for the key.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn only<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set("only", field_list(fields))
    }

    #[must_use]
    pub fn except<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set("except", field_list(fields))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).filter(|value| !value.is_null())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlay `other` on top of this layer; keys in `other` win.
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in &other.entries {
            if value.is_null() {
                continue;
            }
            self.entries.insert(key.clone(), value.clone());
        }
    }
}

impl From<Map<String, Value>> for OptionLayer {
    fn from(entries: Map<String, Value>) -> Self {
        Self { entries }
    }
}

fn field_list<I, S>(fields: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Value::Array(
        fields
            .into_iter()
            .map(|field| Value::String(field.into()))
            .collect(),
    )
}

///
/// HasManyOrder
///
/// Comparison policy for to-many associations.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum HasManyOrder {
    /// Same member set means unchanged, regardless of iteration order.
    #[default]
    Unordered,
    /// Members must match position by position.
    Positional,
}

///
/// TrackerOptions
/// Effective, validated options for one record type.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrackerOptions {
    pub only: Option<Vec<String>>,
    pub except: Option<Vec<String>>,
    pub track_has_many: bool,
    pub auto: bool,
    pub enable_is_dirty: bool,
    pub has_many_order: HasManyOrder,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            only: None,
            except: None,
            track_has_many: true,
            auto: false,
            enable_is_dirty: false,
            has_many_order: HasManyOrder::Unordered,
        }
    }
}

impl TrackerOptions {
    /// Whether the inclusion policy admits this field key.
    #[must_use]
    pub fn tracks_key(&self, key: &str) -> bool {
        if let Some(only) = &self.only {
            return only.iter().any(|field| field == key);
        }
        if let Some(except) = &self.except {
            return !except.iter().any(|field| field == key);
        }

        true
    }
}

/// Merge defaults, the process-wide layer, and the per-type layer into one
/// validated option set.
pub fn resolve_options(
    model: &str,
    process: &OptionLayer,
    per_type: &OptionLayer,
) -> Result<TrackerOptions, ConfigError> {
    let mut merged = process.clone();
    merged.merge(per_type);

    let mut unknown: Vec<String> = merged
        .keys()
        .filter(|key| !KNOWN_OPTIONS.contains(key))
        .map(ToString::to_string)
        .collect();
    if !unknown.is_empty() {
        unknown.sort();
        return Err(ConfigError::UnknownOptions {
            model: model.to_string(),
            keys: unknown,
        });
    }

    let only = field_option(model, &merged, "only")?;
    let except = field_option(model, &merged, "except")?;
    if only.is_some() && except.is_some() {
        return Err(ConfigError::ConflictingFilters {
            model: model.to_string(),
        });
    }

    let defaults = TrackerOptions::default();
    let ordered = flag_option(model, &merged, "ordered_has_many")?.unwrap_or(false);

    Ok(TrackerOptions {
        only,
        except,
        track_has_many: flag_option(model, &merged, "track_has_many")?
            .unwrap_or(defaults.track_has_many),
        auto: flag_option(model, &merged, "auto")?.unwrap_or(defaults.auto),
        enable_is_dirty: flag_option(model, &merged, "enable_is_dirty")?
            .unwrap_or(defaults.enable_is_dirty),
        has_many_order: if ordered {
            HasManyOrder::Positional
        } else {
            defaults.has_many_order
        },
    })
}

fn flag_option(model: &str, layer: &OptionLayer, key: &str) -> Result<Option<bool>, ConfigError> {
    match layer.get(key) {
        None => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(_) => Err(invalid(model, key, "a boolean")),
    }
}

fn field_option(
    model: &str,
    layer: &OptionLayer,
    key: &str,
) -> Result<Option<Vec<String>>, ConfigError> {
    let Some(value) = layer.get(key) else {
        return Ok(None);
    };
    let Value::Array(items) = value else {
        return Err(invalid(model, key, "a list of field names"));
    };

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(ToString::to_string)
                .ok_or_else(|| invalid(model, key, "a list of field names"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn invalid(model: &str, key: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidOptionValue {
        model: model.to_string(),
        key: key.to_string(),
        expected,
    }
}

///
/// TESTS
///
