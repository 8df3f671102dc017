//! The user's allergen selection and its persistence contract.

use std::{collections::BTreeSet, sync::Arc, sync::RwLock};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::allergens::CanonicalAllergen;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const PROFILE_KEY: &str = "user_allergens";

/// Durable set-of-strings storage. Calls are synchronous from the registry's point of view.
pub trait ProfileStore: Send + Sync {
    fn read_set(&self, key: &str) -> Result<BTreeSet<String>>;
    fn write_set(&self, key: &str, values: &BTreeSet<String>) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile {
    allergens: BTreeSet<CanonicalAllergen>,
}

impl UserProfile {
    pub fn contains(&self, allergen: CanonicalAllergen) -> bool {
        self.allergens.contains(&allergen)
    }

    pub fn is_empty(&self) -> bool {
        self.allergens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.allergens.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = CanonicalAllergen> + '_ {
        self.allergens.iter().copied()
    }

    /// Labels sorted alphabetically.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.iter().map(|a| a.label().to_string()).collect();
        labels.sort();
        labels
    }

    fn to_label_set(&self) -> BTreeSet<String> {
        self.iter().map(|a| a.label().to_string()).collect()
    }
}

impl FromIterator<CanonicalAllergen> for UserProfile {
    fn from_iter<T: IntoIterator<Item = CanonicalAllergen>>(iter: T) -> Self {
        Self {
            allergens: iter.into_iter().collect(),
        }
    }
}

/// Cached view of the stored profile. Toggles persist the full set before the cache changes.
pub struct ProfileRegistry {
    store: Arc<dyn ProfileStore>,
    cache: RwLock<UserProfile>,
}

impl ProfileRegistry {
    pub fn load(store: Arc<dyn ProfileStore>) -> Result<Self> {
        let labels = store
            .read_set(PROFILE_KEY)
            .context("failed to load allergen profile")?;

        let mut allergens = BTreeSet::new();
        for label in labels {
            match label.parse::<CanonicalAllergen>() {
                Ok(allergen) => {
                    allergens.insert(allergen);
                }
                Err(_) => log_warn!("Skipping unknown allergen '{}' in stored profile", label),
            }
        }

        log_info!("Loaded allergen profile with {} entries", allergens.len());

        Ok(Self {
            store,
            cache: RwLock::new(UserProfile { allergens }),
        })
    }

    pub fn get(&self) -> UserProfile {
        match self.cache.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn contains(&self, allergen: CanonicalAllergen) -> bool {
        self.get().contains(allergen)
    }

    /// Flips membership of `allergen` and returns whether it is now selected.
    pub fn toggle(&self, allergen: CanonicalAllergen) -> Result<bool> {
        let mut guard = self
            .cache
            .write()
            .map_err(|_| anyhow!("profile cache lock poisoned"))?;

        let mut updated = guard.clone();
        let selected = if updated.allergens.remove(&allergen) {
            false
        } else {
            updated.allergens.insert(allergen);
            true
        };

        self.store
            .write_set(PROFILE_KEY, &updated.to_label_set())
            .with_context(|| format!("failed to persist profile after toggling {allergen}"))?;

        *guard = updated;
        log_info!(
            "{} {} profile",
            allergen,
            if selected { "added to" } else { "removed from" }
        );
        Ok(selected)
    }
}
