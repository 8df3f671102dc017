use std::{collections::BTreeSet, fmt, str::FromStr};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::normalizer::lookup_key;

/// The closed set of allergens the engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalAllergen {
    Milk,
    Gluten,
    Soy,
    Nuts,
    Fish,
    Shellfish,
    Egg,
    Celery,
    Mustard,
    Sesame,
}

impl CanonicalAllergen {
    pub const ALL: [CanonicalAllergen; 10] = [
        CanonicalAllergen::Milk,
        CanonicalAllergen::Gluten,
        CanonicalAllergen::Soy,
        CanonicalAllergen::Nuts,
        CanonicalAllergen::Fish,
        CanonicalAllergen::Shellfish,
        CanonicalAllergen::Egg,
        CanonicalAllergen::Celery,
        CanonicalAllergen::Mustard,
        CanonicalAllergen::Sesame,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CanonicalAllergen::Milk => "Milk",
            CanonicalAllergen::Gluten => "Gluten",
            CanonicalAllergen::Soy => "Soy",
            CanonicalAllergen::Nuts => "Nuts",
            CanonicalAllergen::Fish => "Fish",
            CanonicalAllergen::Shellfish => "Shellfish",
            CanonicalAllergen::Egg => "Egg",
            CanonicalAllergen::Celery => "Celery",
            CanonicalAllergen::Mustard => "Mustard",
            CanonicalAllergen::Sesame => "Sesame",
        }
    }

    /// Orders by display label, the order used for conflict lists and history rows.
    pub fn cmp_by_label(a: &CanonicalAllergen, b: &CanonicalAllergen) -> std::cmp::Ordering {
        a.label().cmp(b.label())
    }
}

impl fmt::Display for CanonicalAllergen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CanonicalAllergen {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let wanted = value.trim();
        if wanted.eq_ignore_ascii_case("wheat") || wanted.eq_ignore_ascii_case("wheat/gluten") {
            return Ok(CanonicalAllergen::Gluten);
        }

        CanonicalAllergen::ALL
            .iter()
            .copied()
            .find(|allergen| allergen.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow!("unknown allergen '{value}'"))
    }
}

impl Serialize for CanonicalAllergen {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for CanonicalAllergen {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Multilingual keyword table. Tokens are lowercase and use spaces as separators so that
/// normalized taxonomy tags (`en:sesame-seeds` -> `sesame seeds`) match them exactly.
///
/// Free-text scanning uses plain substring containment, so short tokens can hit unrelated
/// words ("egg" in "eggplant"). That imprecision is accepted.
static TOKENS: &[(&str, CanonicalAllergen)] = &[
    // Milk
    ("milk", CanonicalAllergen::Milk),
    ("lactose", CanonicalAllergen::Milk),
    ("whey", CanonicalAllergen::Milk),
    ("casein", CanonicalAllergen::Milk),
    ("butter", CanonicalAllergen::Milk),
    ("cream", CanonicalAllergen::Milk),
    ("cheese", CanonicalAllergen::Milk),
    ("lait", CanonicalAllergen::Milk),
    ("beurre", CanonicalAllergen::Milk),
    ("fromage", CanonicalAllergen::Milk),
    ("milch", CanonicalAllergen::Milk),
    ("sahne", CanonicalAllergen::Milk),
    ("käse", CanonicalAllergen::Milk),
    ("leche", CanonicalAllergen::Milk),
    ("queso", CanonicalAllergen::Milk),
    ("latte", CanonicalAllergen::Milk),
    ("formaggio", CanonicalAllergen::Milk),
    ("melk", CanonicalAllergen::Milk),
    ("leite", CanonicalAllergen::Milk),
    // Wheat / gluten
    ("gluten", CanonicalAllergen::Gluten),
    ("wheat", CanonicalAllergen::Gluten),
    ("barley", CanonicalAllergen::Gluten),
    ("rye", CanonicalAllergen::Gluten),
    ("spelt", CanonicalAllergen::Gluten),
    ("blé", CanonicalAllergen::Gluten),
    ("seigle", CanonicalAllergen::Gluten),
    ("weizen", CanonicalAllergen::Gluten),
    ("gerste", CanonicalAllergen::Gluten),
    ("roggen", CanonicalAllergen::Gluten),
    ("dinkel", CanonicalAllergen::Gluten),
    ("trigo", CanonicalAllergen::Gluten),
    ("cebada", CanonicalAllergen::Gluten),
    ("centeno", CanonicalAllergen::Gluten),
    ("frumento", CanonicalAllergen::Gluten),
    ("orzo", CanonicalAllergen::Gluten),
    ("tarwe", CanonicalAllergen::Gluten),
    ("glúten", CanonicalAllergen::Gluten),
    // Soy
    ("soy", CanonicalAllergen::Soy),
    ("soya", CanonicalAllergen::Soy),
    ("soybeans", CanonicalAllergen::Soy),
    ("soja", CanonicalAllergen::Soy),
    ("soia", CanonicalAllergen::Soy),
    // Nuts
    ("nuts", CanonicalAllergen::Nuts),
    ("peanuts", CanonicalAllergen::Nuts),
    ("peanut", CanonicalAllergen::Nuts),
    ("almond", CanonicalAllergen::Nuts),
    ("hazelnut", CanonicalAllergen::Nuts),
    ("walnut", CanonicalAllergen::Nuts),
    ("cashew", CanonicalAllergen::Nuts),
    ("pistachio", CanonicalAllergen::Nuts),
    ("pecan", CanonicalAllergen::Nuts),
    ("fruits a coque", CanonicalAllergen::Nuts),
    ("fruits à coque", CanonicalAllergen::Nuts),
    ("noisette", CanonicalAllergen::Nuts),
    ("amande", CanonicalAllergen::Nuts),
    ("arachide", CanonicalAllergen::Nuts),
    ("cacahuète", CanonicalAllergen::Nuts),
    ("nüsse", CanonicalAllergen::Nuts),
    ("haselnuss", CanonicalAllergen::Nuts),
    ("mandel", CanonicalAllergen::Nuts),
    ("erdnuss", CanonicalAllergen::Nuts),
    ("frutos secos", CanonicalAllergen::Nuts),
    ("cacahuete", CanonicalAllergen::Nuts),
    ("avellana", CanonicalAllergen::Nuts),
    ("almendra", CanonicalAllergen::Nuts),
    ("nocciola", CanonicalAllergen::Nuts),
    ("mandorla", CanonicalAllergen::Nuts),
    ("arachidi", CanonicalAllergen::Nuts),
    ("noten", CanonicalAllergen::Nuts),
    ("pinda", CanonicalAllergen::Nuts),
    ("amendoim", CanonicalAllergen::Nuts),
    // Fish
    ("fish", CanonicalAllergen::Fish),
    ("anchovy", CanonicalAllergen::Fish),
    ("salmon", CanonicalAllergen::Fish),
    ("tuna", CanonicalAllergen::Fish),
    ("cod", CanonicalAllergen::Fish),
    ("poisson", CanonicalAllergen::Fish),
    ("fisch", CanonicalAllergen::Fish),
    ("pescado", CanonicalAllergen::Fish),
    ("pesce", CanonicalAllergen::Fish),
    ("peixe", CanonicalAllergen::Fish),
    // Shellfish
    ("shellfish", CanonicalAllergen::Shellfish),
    ("crustaceans", CanonicalAllergen::Shellfish),
    ("molluscs", CanonicalAllergen::Shellfish),
    ("shrimp", CanonicalAllergen::Shellfish),
    ("prawn", CanonicalAllergen::Shellfish),
    ("crab", CanonicalAllergen::Shellfish),
    ("lobster", CanonicalAllergen::Shellfish),
    ("mussel", CanonicalAllergen::Shellfish),
    ("oyster", CanonicalAllergen::Shellfish),
    ("crustacés", CanonicalAllergen::Shellfish),
    ("crevette", CanonicalAllergen::Shellfish),
    ("mollusques", CanonicalAllergen::Shellfish),
    ("krebstiere", CanonicalAllergen::Shellfish),
    ("garnelen", CanonicalAllergen::Shellfish),
    ("weichtiere", CanonicalAllergen::Shellfish),
    ("crustáceos", CanonicalAllergen::Shellfish),
    ("marisco", CanonicalAllergen::Shellfish),
    ("gamba", CanonicalAllergen::Shellfish),
    ("crostacei", CanonicalAllergen::Shellfish),
    ("gamberi", CanonicalAllergen::Shellfish),
    ("schaaldieren", CanonicalAllergen::Shellfish),
    ("camarão", CanonicalAllergen::Shellfish),
    // Egg
    ("egg", CanonicalAllergen::Egg),
    ("eggs", CanonicalAllergen::Egg),
    ("albumin", CanonicalAllergen::Egg),
    ("oeuf", CanonicalAllergen::Egg),
    ("œuf", CanonicalAllergen::Egg),
    ("eier", CanonicalAllergen::Egg),
    ("huevo", CanonicalAllergen::Egg),
    ("uovo", CanonicalAllergen::Egg),
    ("uova", CanonicalAllergen::Egg),
    ("eieren", CanonicalAllergen::Egg),
    // Celery
    ("celery", CanonicalAllergen::Celery),
    ("celeriac", CanonicalAllergen::Celery),
    ("céleri", CanonicalAllergen::Celery),
    ("celeri", CanonicalAllergen::Celery),
    ("sellerie", CanonicalAllergen::Celery),
    ("apio", CanonicalAllergen::Celery),
    ("sedano", CanonicalAllergen::Celery),
    ("selderij", CanonicalAllergen::Celery),
    ("aipo", CanonicalAllergen::Celery),
    // Mustard
    ("mustard", CanonicalAllergen::Mustard),
    ("moutarde", CanonicalAllergen::Mustard),
    ("senf", CanonicalAllergen::Mustard),
    ("mostaza", CanonicalAllergen::Mustard),
    ("senape", CanonicalAllergen::Mustard),
    ("mosterd", CanonicalAllergen::Mustard),
    ("mostarda", CanonicalAllergen::Mustard),
    // Sesame
    ("sesame", CanonicalAllergen::Sesame),
    ("sesame seeds", CanonicalAllergen::Sesame),
    ("tahini", CanonicalAllergen::Sesame),
    ("sésame", CanonicalAllergen::Sesame),
    ("sesam", CanonicalAllergen::Sesame),
    ("sésamo", CanonicalAllergen::Sesame),
    ("sesamo", CanonicalAllergen::Sesame),
    ("gergelim", CanonicalAllergen::Sesame),
];

/// Every `(token, allergen)` pair in the table.
pub fn tokens() -> impl Iterator<Item = (&'static str, CanonicalAllergen)> {
    TOKENS.iter().copied()
}

/// Exact match of a single tag or keyword, ignoring case and any `xx:` language prefix.
pub fn match_canonical(token: &str) -> Option<CanonicalAllergen> {
    let key = lookup_key(token);
    if key.is_empty() {
        return None;
    }
    TOKENS
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, allergen)| *allergen)
}

/// Every allergen whose token appears anywhere in `text`, case-insensitively.
pub fn scan_text(text: &str) -> BTreeSet<CanonicalAllergen> {
    let haystack = text.to_lowercase();
    TOKENS
        .iter()
        .filter(|(token, _)| haystack.contains(token))
        .map(|(_, allergen)| *allergen)
        .collect()
}
