use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{lookup::ProductRecord, profile::UserProfile};

use super::{
    dictionary::{match_canonical, scan_text, CanonicalAllergen},
    normalizer::normalize,
};

/// Allergens present in both the product and the profile. Never empty, sorted by label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConflictSet(Vec<CanonicalAllergen>);

impl ConflictSet {
    /// Returns `None` when there is nothing in conflict.
    pub fn new(conflicts: impl IntoIterator<Item = CanonicalAllergen>) -> Option<Self> {
        let unique: BTreeSet<CanonicalAllergen> = conflicts.into_iter().collect();
        if unique.is_empty() {
            return None;
        }
        let mut ordered: Vec<CanonicalAllergen> = unique.into_iter().collect();
        ordered.sort_by(CanonicalAllergen::cmp_by_label);
        Some(Self(ordered))
    }

    pub fn as_slice(&self) -> &[CanonicalAllergen] {
        &self.0
    }

    pub fn labels(&self) -> Vec<String> {
        self.0.iter().map(|allergen| allergen.label().to_string()).collect()
    }
}

impl<'de> Deserialize<'de> for ConflictSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<CanonicalAllergen>::deserialize(deserializer)?;
        ConflictSet::new(raw).ok_or_else(|| serde::de::Error::custom("conflict set is empty"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "conflicts", rename_all = "camelCase")]
pub enum ScanOutcome {
    #[default]
    None,
    Safe,
    Unsafe(ConflictSet),
}

impl ScanOutcome {
    pub fn is_unsafe(&self) -> bool {
        matches!(self, ScanOutcome::Unsafe(_))
    }

    pub fn conflicts(&self) -> &[CanonicalAllergen] {
        match self {
            ScanOutcome::Unsafe(conflicts) => conflicts.as_slice(),
            ScanOutcome::None | ScanOutcome::Safe => &[],
        }
    }
}

/// Everything the session shows about a resolved product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAnalysis {
    /// Canonical allergens detected in ingredients and traces, sorted by label.
    pub detected: Vec<CanonicalAllergen>,
    /// The producer's declared allergen tags, cleaned up for display.
    pub declared_tags: Vec<String>,
    pub outcome: ScanOutcome,
}

/// Canonical allergens found in the ingredient text (substring scan) and trace tags
/// (exact match).
pub fn product_allergens(product: &ProductRecord) -> BTreeSet<CanonicalAllergen> {
    let mut found = product
        .ingredients_text
        .as_deref()
        .map(scan_text)
        .unwrap_or_default();

    found.extend(product.trace_tags.iter().filter_map(|tag| match_canonical(tag)));
    found
}

pub fn resolve(product: &ProductRecord, profile: &UserProfile) -> ScanOutcome {
    classify(&product_allergens(product), profile)
}

pub fn analyze(product: &ProductRecord, profile: &UserProfile) -> ProductAnalysis {
    let found = product_allergens(product);
    let outcome = classify(&found, profile);

    let mut detected: Vec<CanonicalAllergen> = found.into_iter().collect();
    detected.sort_by(CanonicalAllergen::cmp_by_label);

    ProductAnalysis {
        detected,
        declared_tags: product.allergen_tags.iter().map(|tag| normalize(tag)).collect(),
        outcome,
    }
}

fn classify(found: &BTreeSet<CanonicalAllergen>, profile: &UserProfile) -> ScanOutcome {
    let overlap = found
        .iter()
        .copied()
        .filter(|allergen| profile.contains(*allergen));

    match ConflictSet::new(overlap) {
        Some(conflicts) => ScanOutcome::Unsafe(conflicts),
        None => ScanOutcome::Safe,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(ingredients: Option<&str>, traces: &[&str]) -> ProductRecord {
        ProductRecord {
            name: Some("Test bar".into()),
            ingredients_text: ingredients.map(str::to_string),
            allergen_tags: Vec::new(),
            trace_tags: traces.iter().map(|tag| tag.to_string()).collect(),
        }
    }

    fn profile(allergens: &[CanonicalAllergen]) -> UserProfile {
        UserProfile::from_iter(allergens.iter().copied())
    }

    #[test]
    fn milk_and_soy_conflict_while_nut_traces_are_ignored() {
        let record = product(Some("contains wheat, milk, soy lecithin"), &["en:nuts"]);
        let outcome = resolve(
            &record,
            &profile(&[CanonicalAllergen::Milk, CanonicalAllergen::Soy]),
        );

        assert_eq!(
            outcome.conflicts(),
            &[CanonicalAllergen::Milk, CanonicalAllergen::Soy]
        );
        assert!(!outcome.conflicts().contains(&CanonicalAllergen::Nuts));
    }

    #[test]
    fn plain_ingredients_are_safe() {
        let record = product(Some("water, sugar, salt"), &[]);
        let outcome = resolve(&record, &profile(&[CanonicalAllergen::Sesame]));
        assert_eq!(outcome, ScanOutcome::Safe);
    }

    #[test]
    fn no_overlap_is_safe_never_empty_unsafe() {
        let record = product(Some("milk, eggs"), &["en:peanuts"]);
        assert_eq!(resolve(&record, &profile(&[CanonicalAllergen::Fish])), ScanOutcome::Safe);
        assert_eq!(resolve(&record, &UserProfile::default()), ScanOutcome::Safe);
        assert!(ConflictSet::new(Vec::new()).is_none());
    }

    #[test]
    fn trace_tags_alone_can_make_a_product_unsafe() {
        let record = product(None, &["en:sesame-seeds", "fr:moutarde"]);
        let outcome = resolve(
            &record,
            &profile(&[CanonicalAllergen::Sesame, CanonicalAllergen::Mustard]),
        );
        assert_eq!(
            outcome.conflicts(),
            &[CanonicalAllergen::Mustard, CanonicalAllergen::Sesame]
        );
    }

    #[test]
    fn trace_tags_must_match_exactly() {
        let record = product(None, &["en:soy-lecithin-traces"]);
        assert_eq!(resolve(&record, &profile(&[CanonicalAllergen::Soy])), ScanOutcome::Safe);
    }

    #[test]
    fn resolution_is_deterministic_and_bounded_by_profile() {
        let record = product(
            Some("Weizenmehl, Vollmilchpulver, Haselnüsse, Sesam, Eier"),
            &["en:celery", "en:mustard", "en:fish"],
        );
        let user = profile(&[
            CanonicalAllergen::Sesame,
            CanonicalAllergen::Celery,
            CanonicalAllergen::Gluten,
            CanonicalAllergen::Shellfish,
        ]);

        let first = resolve(&record, &user);
        for _ in 0..10 {
            assert_eq!(resolve(&record, &user), first);
        }
        for conflict in first.conflicts() {
            assert!(user.contains(*conflict));
        }
        assert_eq!(
            first.conflicts(),
            &[
                CanonicalAllergen::Celery,
                CanonicalAllergen::Gluten,
                CanonicalAllergen::Sesame,
            ]
        );
    }

    #[test]
    fn trace_order_does_not_change_the_result() {
        let user = profile(&[CanonicalAllergen::Fish, CanonicalAllergen::Celery]);
        let forward = product(None, &["en:fish", "en:celery"]);
        let backward = product(None, &["en:celery", "en:fish"]);
        assert_eq!(resolve(&forward, &user), resolve(&backward, &user));
    }

    #[test]
    fn analyze_reports_detected_and_declared_allergens() {
        let mut record = product(Some("milk chocolate, hazelnut"), &["en:soybeans"]);
        record.allergen_tags = vec!["en:milk".into(), "en:nuts".into()];

        let analysis = analyze(&record, &profile(&[CanonicalAllergen::Nuts]));

        assert_eq!(
            analysis.detected,
            vec![
                CanonicalAllergen::Milk,
                CanonicalAllergen::Nuts,
                CanonicalAllergen::Soy,
            ]
        );
        assert_eq!(analysis.declared_tags, vec!["Milk".to_string(), "Nuts".to_string()]);
        assert_eq!(analysis.outcome.conflicts(), &[CanonicalAllergen::Nuts]);
    }

    #[test]
    fn outcome_serializes_with_conflict_labels() {
        let outcome = ScanOutcome::Unsafe(
            ConflictSet::new([CanonicalAllergen::Soy, CanonicalAllergen::Egg]).unwrap(),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "unsafe", "conflicts": ["Egg", "Soy"] })
        );
        assert_eq!(
            serde_json::to_value(ScanOutcome::Safe).unwrap(),
            serde_json::json!({ "kind": "safe" })
        );
    }
}
