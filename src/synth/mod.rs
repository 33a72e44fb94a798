//! Field-driven random data synthesis.
//!
//! This module turns custom profile field definitions into type-appropriate
//! random values:
//!
//! 1. **Field model** - [`FieldDefinition`] and the closed set of [`FieldType`] tags
//! 2. **Values** - [`SynthesizedValue`], the tagged result written to user meta
//! 3. **Synthesis** - [`ValueSynthesizer`], a dispatch table from type tag to strategy
//! 4. **Identities** - [`IdentityGenerator`] for usernames, emails, passwords and names
//!
//! # Example
//!
//! ```ignore
//! use userforge::synth::{FieldDefinition, ValueSynthesizer};
//!
//! let field = FieldDefinition::new("favourite_colour", "select")
//!     .with_options([("red", "Red"), ("green", "Green"), ("blue", "Blue")]);
//!
//! let mut synthesizer = ValueSynthesizer::new();
//! let value = synthesizer.synthesize_field(&field);
//! // Always the second option: Some(SynthesizedValue::Key(Some("green")))
//! ```

pub mod field;
pub mod identity;
pub mod synthesizer;
pub mod value;

pub use field::{FieldDefinition, FieldOption, FieldType};
pub use identity::{AccountIdentity, IdentityGenerator, PersonName};
pub use synthesizer::{
    ValueSynthesizer, MULTI_CHOICE_PICKS, PLACEHOLDER_URL, SENTENCE_WORDS,
    SINGLE_CHOICE_POSITION, TEXT_PARAGRAPHS,
};
pub use value::{SynthesizedValue, ValueTag};
