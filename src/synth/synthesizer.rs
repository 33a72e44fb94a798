//! Type-dispatched value synthesis.
//!
//! Each recognized [`FieldType`] maps to exactly one strategy in a static
//! table. Strategies never fail: an empty or short option set degrades to an
//! empty selection instead of an error, and an unrecognized tag yields no value.

use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::{Paragraphs, Sentence};
use fake::Fake;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::field::{FieldDefinition, FieldOption, FieldType};
use super::value::SynthesizedValue;

/// Fixed value written to every `url` field.
pub const PLACEHOLDER_URL: &str = "https://example.com";

/// Word count of a `text` value.
pub const SENTENCE_WORDS: usize = 10;

/// Paragraph count of `editor` and `textarea` values.
pub const TEXT_PARAGRAPHS: usize = 2;

/// Upper bound on the number of keys picked for multi-choice fields.
pub const MULTI_CHOICE_PICKS: usize = 2;

/// Ordinal of the option chosen for single-choice fields. Position 0 is
/// usually a placeholder or default entry, so it is skipped.
pub const SINGLE_CHOICE_POSITION: usize = 1;

type Strategy = fn(&mut ChaCha8Rng, &[FieldOption]) -> SynthesizedValue;

static STRATEGIES: [(FieldType, Strategy); 11] = [
    (FieldType::Url, placeholder_url),
    (FieldType::Email, random_email),
    (FieldType::Text, random_sentence),
    (FieldType::Editor, random_paragraphs),
    (FieldType::Textarea, random_paragraphs),
    (FieldType::Multiselect, random_key_subset),
    (FieldType::Multicheckbox, random_key_subset),
    (FieldType::Radio, positional_key),
    (FieldType::Select, positional_key),
    (FieldType::Checkbox, checked),
    (FieldType::Number, random_number),
];

fn placeholder_url(_: &mut ChaCha8Rng, _: &[FieldOption]) -> SynthesizedValue {
    SynthesizedValue::Text(PLACEHOLDER_URL.to_string())
}

fn random_email(_: &mut ChaCha8Rng, _: &[FieldOption]) -> SynthesizedValue {
    SynthesizedValue::Text(SafeEmail().fake())
}

fn random_sentence(_: &mut ChaCha8Rng, _: &[FieldOption]) -> SynthesizedValue {
    SynthesizedValue::Text(Sentence(SENTENCE_WORDS..SENTENCE_WORDS + 1).fake())
}

fn random_paragraphs(_: &mut ChaCha8Rng, _: &[FieldOption]) -> SynthesizedValue {
    let paragraphs: Vec<String> = Paragraphs(TEXT_PARAGRAPHS..TEXT_PARAGRAPHS + 1).fake();
    SynthesizedValue::Text(paragraphs.join("\n\n"))
}

/// Draws `min(MULTI_CHOICE_PICKS, |options|)` keys without replacement,
/// returned in option order.
fn random_key_subset(rng: &mut ChaCha8Rng, options: &[FieldOption]) -> SynthesizedValue {
    let amount = MULTI_CHOICE_PICKS.min(options.len());
    let mut picked = rand::seq::index::sample(rng, options.len(), amount).into_vec();
    picked.sort_unstable();

    SynthesizedValue::Keys(picked.into_iter().map(|i| options[i].key.clone()).collect())
}

fn positional_key(_: &mut ChaCha8Rng, options: &[FieldOption]) -> SynthesizedValue {
    SynthesizedValue::Key(
        options
            .get(SINGLE_CHOICE_POSITION)
            .map(|option| option.key.clone()),
    )
}

fn checked(_: &mut ChaCha8Rng, _: &[FieldOption]) -> SynthesizedValue {
    SynthesizedValue::Boolean(true)
}

fn random_number(rng: &mut ChaCha8Rng, _: &[FieldOption]) -> SynthesizedValue {
    SynthesizedValue::Integer(rng.random_range(0..=i64::MAX))
}

/// Produces values for custom fields by dispatching on the field type tag.
///
/// Structural choices (which keys a multi-choice field gets, numeric values)
/// come from a ChaCha8 generator that can be seeded for reproducible runs.
/// Free text comes from `fake`.
pub struct ValueSynthesizer {
    rng: ChaCha8Rng,
}

impl Default for ValueSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueSynthesizer {
    /// Creates a synthesizer seeded from the thread RNG.
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }

    /// Creates a synthesizer with a fixed seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Synthesizes a value for a raw type tag and option set.
    ///
    /// Returns `None` for tags outside [`FieldType`]; such fields are skipped.
    pub fn synthesize(
        &mut self,
        field_type: &str,
        options: &[FieldOption],
    ) -> Option<SynthesizedValue> {
        let strategy = FieldType::from_tag(field_type).and_then(Self::strategy_for)?;
        Some(strategy(&mut self.rng, options))
    }

    /// Synthesizes a value for a field definition.
    pub fn synthesize_field(&mut self, field: &FieldDefinition) -> Option<SynthesizedValue> {
        self.synthesize(&field.field_type, &field.options)
    }

    fn strategy_for(field_type: FieldType) -> Option<Strategy> {
        STRATEGIES
            .iter()
            .find(|(candidate, _)| *candidate == field_type)
            .map(|(_, strategy)| *strategy)
    }
}
