//! Synthesized values and their storage encoding.

use serde::Serialize;

/// The shape of a synthesized value, fixed by the field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTag {
    String,
    Boolean,
    Integer,
    KeySet,
    SingleKey,
}

/// A value produced for one field of one user.
///
/// Created and written immediately; never retained across iterations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SynthesizedValue {
    Text(String),
    Boolean(bool),
    Integer(i64),
    /// Option keys, at most as many as the field has options.
    Keys(Vec<String>),
    /// A single option key; `None` when the option set has no entry at the chosen position.
    Key(Option<String>),
}

impl SynthesizedValue {
    pub fn tag(&self) -> ValueTag {
        match self {
            SynthesizedValue::Text(_) => ValueTag::String,
            SynthesizedValue::Boolean(_) => ValueTag::Boolean,
            SynthesizedValue::Integer(_) => ValueTag::Integer,
            SynthesizedValue::Keys(_) => ValueTag::KeySet,
            SynthesizedValue::Key(_) => ValueTag::SingleKey,
        }
    }

    /// Encodes the value for the user meta table.
    ///
    /// Checkboxes store `"1"`, key sets a JSON array, a missing single key the empty string.
    pub fn to_meta_value(&self) -> String {
        match self {
            SynthesizedValue::Text(text) => text.clone(),
            SynthesizedValue::Boolean(true) => "1".to_string(),
            SynthesizedValue::Boolean(false) => String::new(),
            SynthesizedValue::Integer(n) => n.to_string(),
            SynthesizedValue::Keys(keys) => serde_json::Value::from(keys.clone()).to_string(),
            SynthesizedValue::Key(key) => key.clone().unwrap_or_default(),
        }
    }
}
