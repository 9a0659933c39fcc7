//! Domain item types and the label catalog.
//!
//! The catalog maps each [`ItemType`] to the set of raw detector labels that
//! count as that item. Matching is case-insensitive: labels are lowercased
//! once at configuration time, lookups fold the probe the same way. An
//! unconfigured item type has the empty set, so nothing classifies to it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::detect::Detection;

/// Recyclable item classes the engine counts.
///
/// The serialized key of each variant is the stable identifier used in
/// counter snapshots and configuration files; it never changes meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemType {
    #[serde(rename = "pet_1")]
    Pet1,
    #[serde(rename = "hdpe_2")]
    Hdpe2,
    #[serde(rename = "aluminum_can")]
    AluminumCan,
    #[serde(rename = "cardboard_carton")]
    CardboardCarton,
    #[serde(rename = "glass_bottle")]
    GlassBottle,
}

impl ItemType {
    /// All item types, in classification-priority order.
    pub const ALL: [ItemType; 5] = [
        ItemType::Pet1,
        ItemType::Hdpe2,
        ItemType::AluminumCan,
        ItemType::CardboardCarton,
        ItemType::GlassBottle,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ItemType::Pet1 => "pet_1",
            ItemType::Hdpe2 => "hdpe_2",
            ItemType::AluminumCan => "aluminum_can",
            ItemType::CardboardCarton => "cardboard_carton",
            ItemType::GlassBottle => "glass_bottle",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ItemType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pet_1" => Ok(ItemType::Pet1),
            "hdpe_2" => Ok(ItemType::Hdpe2),
            "aluminum_can" => Ok(ItemType::AluminumCan),
            "cardboard_carton" => Ok(ItemType::CardboardCarton),
            "glass_bottle" => Ok(ItemType::GlassBottle),
            other => Err(anyhow!("unknown item type '{}'", other)),
        }
    }
}

/// Which item types the classifier passes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassifierTarget {
    /// Every type configured in the catalog.
    All,
    /// A single selected type; everything else is filtered out.
    Single(ItemType),
}

/// A detection that resolved to a domain item type.
#[derive(Clone, Debug)]
pub struct ClassifiedDetection {
    pub detection: Detection,
    pub item_type: ItemType,
}

/// Mapping from item types to accepted raw detector labels.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemCatalog {
    entries: BTreeMap<ItemType, BTreeSet<String>>,
}

impl ItemCatalog {
    /// An empty catalog: nothing classifies until entries are configured.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Replace the label set for an item type.
    ///
    /// Labels are lowercased and deduplicated. An empty set is rejected; to
    /// stop counting a type, remove it instead.
    pub fn set_entry<I, S>(&mut self, item: ItemType, labels: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().trim().to_lowercase())
            .filter(|label| !label.is_empty())
            .collect();
        if normalized.is_empty() {
            return Err(anyhow!("catalog entry for {} must not be empty", item));
        }
        self.entries.insert(item, normalized);
        Ok(())
    }

    /// Remove an item type from the catalog entirely.
    pub fn remove_entry(&mut self, item: ItemType) {
        self.entries.remove(&item);
    }

    /// Accepted labels for an item type; empty for unconfigured types.
    pub fn labels_for(&self, item: ItemType) -> impl Iterator<Item = &str> {
        self.entries
            .get(&item)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Case-insensitive membership test.
    pub fn accepts(&self, item: ItemType, label: &str) -> bool {
        match self.entries.get(&item) {
            Some(set) => set.contains(&label.trim().to_lowercase()),
            None => false,
        }
    }

    /// Resolve a raw label to an item type, if any accepts it.
    ///
    /// When label sets overlap, the first match in [`ItemType::ALL`] order
    /// wins, so resolution is deterministic.
    pub fn resolve(&self, label: &str) -> Option<ItemType> {
        let folded = label.trim().to_lowercase();
        ItemType::ALL
            .into_iter()
            .find(|item| match self.entries.get(item) {
                Some(set) => set.contains(&folded),
                None => false,
            })
    }

    /// Classify de-duplicated detections against the target selection.
    ///
    /// Pure function of catalog + input: detections whose label resolves to
    /// no configured type (or to a type other than the single target) are
    /// dropped silently.
    pub fn classify(
        &self,
        detections: Vec<Detection>,
        target: ClassifierTarget,
    ) -> Vec<ClassifiedDetection> {
        detections
            .into_iter()
            .filter_map(|detection| {
                let item_type = match target {
                    ClassifierTarget::Single(item) => {
                        if self.accepts(item, &detection.label) {
                            Some(item)
                        } else {
                            None
                        }
                    }
                    ClassifierTarget::All => self.resolve(&detection.label),
                }?;
                Some(ClassifiedDetection {
                    detection,
                    item_type,
                })
            })
            .collect()
    }
}

impl Default for ItemCatalog {
    /// Catalog preloaded with common detector vocabulary for each type.
    fn default() -> Self {
        let mut catalog = Self::empty();
        // set_entry only fails on empty sets; these are all non-empty.
        catalog
            .set_entry(ItemType::Pet1, ["bottle", "plastic bottle", "water bottle"])
            .unwrap();
        catalog
            .set_entry(ItemType::Hdpe2, ["jug", "milk jug", "detergent bottle"])
            .unwrap();
        catalog
            .set_entry(ItemType::AluminumCan, ["can", "soda can", "tin can"])
            .unwrap();
        catalog
            .set_entry(
                ItemType::CardboardCarton,
                ["carton", "box", "cardboard box"],
            )
            .unwrap();
        catalog
            .set_entry(
                ItemType::GlassBottle,
                ["glass bottle", "beer bottle", "wine bottle"],
            )
            .unwrap();
        catalog
    }
}
