//! Custom profile field definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::value::ValueTag;

/// The closed set of field type tags that can be synthesized.
///
/// Field definitions carry their type as a raw string so that definitions
/// with unknown tags can still be loaded and skipped during synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Url,
    Editor,
    Textarea,
    Multiselect,
    Multicheckbox,
    Radio,
    Select,
    Checkbox,
    Number,
}

impl FieldType {
    /// Every recognized field type, in declaration order.
    pub const ALL: [FieldType; 11] = [
        FieldType::Text,
        FieldType::Email,
        FieldType::Url,
        FieldType::Editor,
        FieldType::Textarea,
        FieldType::Multiselect,
        FieldType::Multicheckbox,
        FieldType::Radio,
        FieldType::Select,
        FieldType::Checkbox,
        FieldType::Number,
    ];

    /// Parses a raw type tag. Matching ignores case and surrounding whitespace.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|field_type| field_type.as_str().eq_ignore_ascii_case(tag))
    }

    /// Returns the canonical lower-case tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::Editor => "editor",
            FieldType::Textarea => "textarea",
            FieldType::Multiselect => "multiselect",
            FieldType::Multicheckbox => "multicheckbox",
            FieldType::Radio => "radio",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Number => "number",
        }
    }

    /// Whether values of this type are drawn from the field's option set.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            FieldType::Multiselect | FieldType::Multicheckbox | FieldType::Radio | FieldType::Select
        )
    }

    /// The value tag a synthesized value of this type carries.
    pub fn value_tag(&self) -> ValueTag {
        match self {
            FieldType::Text
            | FieldType::Email
            | FieldType::Url
            | FieldType::Editor
            | FieldType::Textarea => ValueTag::String,
            FieldType::Multiselect | FieldType::Multicheckbox => ValueTag::KeySet,
            FieldType::Radio | FieldType::Select => ValueTag::SingleKey,
            FieldType::Checkbox => ValueTag::Boolean,
            FieldType::Number => ValueTag::Integer,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a choice field's option set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    /// Stored value when this option is chosen.
    pub key: String,
    /// Human-readable label.
    pub label: String,
}

impl FieldOption {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// A custom profile field as configured in the user directory.
///
/// Loaded once per run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Human-readable field name.
    #[serde(default)]
    pub name: String,
    /// Raw type tag as stored; see [`FieldType::from_tag`].
    #[serde(rename = "type")]
    pub field_type: String,
    /// Unique key the field's value is stored under.
    pub metakey: String,
    /// Ordered option set; only meaningful for choice types.
    #[serde(default)]
    pub options: Vec<FieldOption>,
    /// Built-in fields are never synthesized.
    #[serde(default)]
    pub is_default: bool,
}

impl FieldDefinition {
    /// Creates a non-default field with no options.
    pub fn new(metakey: impl Into<String>, field_type: impl Into<String>) -> Self {
        let metakey = metakey.into();
        Self {
            name: metakey.clone(),
            field_type: field_type.into(),
            metakey,
            options: Vec::new(),
            is_default: false,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the option set, keeping the given order.
    pub fn with_options<K, L>(mut self, options: impl IntoIterator<Item = (K, L)>) -> Self
    where
        K: Into<String>,
        L: Into<String>,
    {
        self.options = options
            .into_iter()
            .map(|(key, label)| FieldOption::new(key, label))
            .collect();
        self
    }

    /// Marks the field as a built-in default field.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// The parsed type tag, or `None` when the tag is not recognized.
    pub fn kind(&self) -> Option<FieldType> {
        FieldType::from_tag(&self.field_type)
    }

    /// Option keys in declaration order.
    pub fn option_keys(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.key.as_str()).collect()
    }
}
