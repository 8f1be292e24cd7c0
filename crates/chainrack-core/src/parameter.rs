//! Plugin parameter values, domains and clamping.
//!
//! Every plugin exposes its settings as a flat [`ParameterMap`]. Writes are never
//! rejected: each incoming value is coerced into its declared domain by
//! [`ParameterSet::apply`].
//!
//! # Example
//!
//! ```
//! use chainrack_core::{params, ParamKind, ParameterRange, ParameterSet};
//!
//! let mut set = ParameterSet::new()
//!     .with("gain", ParamKind::Float(ParameterRange::linear(-60.0, 0.0, 0.0)));
//!
//! set.apply(&params! { "gain" => 5.0 });
//! assert_eq!(set.float("gain"), 0.0);
//!
//! set.apply(&params! { "gain" => -200.0 });
//! assert_eq!(set.float("gain"), -60.0);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of a plugin's parameters, keyed by parameter name.
///
/// Ordered so that serialized snapshots are deterministic.
pub type ParameterMap = BTreeMap<String, ParamValue>;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.as_f64().map(|f| f as f32)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.is_finite() => Some(f.round() as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Loose numeric reading used by clamping: booleans are 0/1 and numeric
    /// strings are parsed.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::String(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<f32> for ParamValue {
    fn from(f: f32) -> Self {
        Self::Float(f as f64)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for ParamValue {
    fn from(i: i32) -> Self {
        Self::Int(i as i64)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// Taper of a [`ParameterRange`], kept for hosts that draw controls.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ParameterScale {
    #[default]
    Linear,

    /// Frequency-like domain. Requires `min > 0`.
    Logarithmic,
}

/// Numeric parameter domain.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub scale: ParameterScale,
}

impl ParameterRange {
    pub fn new(min: f64, max: f64, default: f64, scale: ParameterScale) -> Self {
        debug_assert!(max > min, "max must be greater than min");

        Self {
            min,
            max,
            default: default.clamp(min, max),
            scale,
        }
    }

    pub fn linear(min: f64, max: f64, default: f64) -> Self {
        Self::new(min, max, default, ParameterScale::Linear)
    }

    /// # Panics
    ///
    /// Panics in debug mode if `min <= 0`.
    pub fn logarithmic(min: f64, max: f64, default: f64) -> Self {
        debug_assert!(min > 0.0, "logarithmic scale requires min > 0");
        Self::new(min, max, default, ParameterScale::Logarithmic)
    }

    /// Coerce any number into the domain. NaN maps to the lower bound.
    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    #[inline]
    pub fn db_to_linear(db: f64) -> f64 {
        10.0_f64.powf(db / 20.0)
    }
}

impl Default for ParameterRange {
    fn default() -> Self {
        Self::linear(0.0, 1.0, 0.5)
    }
}

/// Declared domain of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Float(ParameterRange),
    Int { min: i64, max: i64, default: i64 },
    /// One of a fixed set of integers. Anything else, including integers
    /// between two steps, takes the default.
    Stepped { steps: Vec<i64>, default: i64 },
    Toggle { default: bool },
    /// One of a fixed list of labels. The first option is the lower bound.
    Choice {
        options: Vec<String>,
        default: String,
    },
    Text { default: String },
}

impl ParamKind {
    pub fn choice(options: &[&str], default: &str) -> Self {
        Self::Choice {
            options: options.iter().map(|s| s.to_string()).collect(),
            default: default.to_string(),
        }
    }

    pub fn default_value(&self) -> ParamValue {
        match self {
            Self::Float(range) => ParamValue::Float(range.default),
            Self::Int { default, .. } | Self::Stepped { default, .. } => {
                ParamValue::Int(*default)
            }
            Self::Toggle { default } => ParamValue::Bool(*default),
            Self::Choice { default, .. } => ParamValue::String(default.clone()),
            Self::Text { default } => ParamValue::String(default.clone()),
        }
    }

    /// Coerce `value` into this domain.
    ///
    /// Out-of-range numbers clamp to the nearest bound; values that cannot be
    /// read as the expected type (including NaN) take the lower bound.
    pub fn coerce(&self, value: &ParamValue) -> ParamValue {
        match self {
            Self::Float(range) => {
                let number = value.to_number().unwrap_or(f64::NAN);
                ParamValue::Float(range.clamp(number))
            }
            Self::Int { min, max, .. } => match value.to_number() {
                Some(n) if !n.is_nan() => {
                    ParamValue::Int((n.round().clamp(*min as f64, *max as f64)) as i64)
                }
                _ => ParamValue::Int(*min),
            },
            Self::Stepped { steps, default } => {
                let step = value
                    .to_number()
                    .filter(|n| n.fract() == 0.0)
                    .map(|n| n as i64)
                    .filter(|n| steps.contains(n))
                    .unwrap_or(*default);
                ParamValue::Int(step)
            }
            Self::Toggle { .. } => {
                let on = match value {
                    ParamValue::Bool(b) => *b,
                    ParamValue::String(s) => s.eq_ignore_ascii_case("true"),
                    other => other.to_number().is_some_and(|n| !n.is_nan() && n != 0.0),
                };
                ParamValue::Bool(on)
            }
            Self::Choice { options, .. } => {
                let picked = match value {
                    ParamValue::String(s) if options.iter().any(|o| o == s) => s.clone(),
                    other => other
                        .as_i64()
                        .and_then(|i| usize::try_from(i).ok())
                        .and_then(|i| options.get(i).cloned())
                        .or_else(|| options.first().cloned())
                        .unwrap_or_default(),
                };
                ParamValue::String(picked)
            }
            Self::Text { .. } => match value {
                ParamValue::String(s) => ParamValue::String(s.clone()),
                ParamValue::Float(f) => ParamValue::String(f.to_string()),
                ParamValue::Int(i) => ParamValue::String(i.to_string()),
                ParamValue::Bool(b) => ParamValue::String(b.to_string()),
            },
        }
    }
}

/// Named parameter declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub key: String,
    pub kind: ParamKind,
}

/// A plugin's declared parameters together with their current values.
///
/// Values always satisfy their declared domains.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    specs: Vec<ParamSpec>,
    values: ParameterMap,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter, initialized to its default.
    pub fn with(mut self, key: impl Into<String>, kind: ParamKind) -> Self {
        let key = key.into();
        self.values.insert(key.clone(), kind.default_value());
        self.specs.push(ParamSpec { key, kind });
        self
    }

    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    pub fn spec(&self, key: &str) -> Option<&ParamSpec> {
        self.specs.iter().find(|s| s.key == key)
    }

    /// Current values.
    pub fn snapshot(&self) -> ParameterMap {
        self.values.clone()
    }

    /// Apply a partial update. Unknown keys are ignored.
    ///
    /// Returns `true` if any stored value changed.
    pub fn apply(&mut self, partial: &ParameterMap) -> bool {
        let mut changed = false;
        for spec in &self.specs {
            let Some(incoming) = partial.get(&spec.key) else {
                continue;
            };
            let coerced = spec.kind.coerce(incoming);
            if self.values.get(&spec.key) != Some(&coerced) {
                self.values.insert(spec.key.clone(), coerced);
                changed = true;
            }
        }
        changed
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// Float value, or 0.0 if `key` is not a numeric parameter.
    pub fn float(&self, key: &str) -> f64 {
        self.values.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0)
    }

    pub fn int(&self, key: &str) -> i64 {
        self.values.get(key).and_then(|v| v.as_i64()).unwrap_or(0)
    }

    pub fn toggle(&self, key: &str) -> bool {
        self.values.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    pub fn text(&self, key: &str) -> &str {
        self.values.get(key).and_then(|v| v.as_str()).unwrap_or("")
    }
}
