//! Graph partitions and partition sets.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the named graph partitions backing a model.
///
/// The system partitions (asserted, inferred, UI) hold model content and are
/// the ones touched by entity deletion; the metadata partition holds model
/// bookkeeping and schema imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Partition {
    /// User-asserted model content.
    Asserted,
    /// Content derived by the validator/inference run.
    Inferred,
    /// Presentation data (positions, visibility).
    Ui,
    /// Model metadata and schema imports.
    Meta,
}

impl Partition {
    /// Every partition, in canonical order.
    pub const ALL: [Partition; 4] = [
        Partition::Asserted,
        Partition::Inferred,
        Partition::Ui,
        Partition::Meta,
    ];

    /// The system partitions: the ones a delete must be applied to.
    pub const SYSTEM: [Partition; 3] = [Partition::Asserted, Partition::Inferred, Partition::Ui];

    /// Stable short name, used as graph name suffix by store backends.
    pub fn as_str(self) -> &'static str {
        match self {
            Partition::Asserted => "asserted",
            Partition::Inferred => "inferred",
            Partition::Ui => "ui",
            Partition::Meta => "meta",
        }
    }

    /// Single-partition flag for set arithmetic.
    pub fn flag(self) -> PartitionSet {
        match self {
            Partition::Asserted => PartitionSet::ASSERTED,
            Partition::Inferred => PartitionSet::INFERRED,
            Partition::Ui => PartitionSet::UI,
            Partition::Meta => PartitionSet::META,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Set of partitions, used for residency tables and validity bookkeeping.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PartitionSet: u8 {
        const ASSERTED = 1 << 0;
        const INFERRED = 1 << 1;
        const UI = 1 << 2;
        const META = 1 << 3;
    }
}

impl PartitionSet {
    /// The system partitions as a set.
    pub const SYSTEM: PartitionSet = PartitionSet::ASSERTED
        .union(PartitionSet::INFERRED)
        .union(PartitionSet::UI);

    /// Iterate the member partitions in canonical order.
    pub fn partitions(self) -> impl Iterator<Item = Partition> {
        Partition::ALL
            .into_iter()
            .filter(move |p| self.contains(p.flag()))
    }
}

impl From<Partition> for PartitionSet {
    fn from(p: Partition) -> Self {
        p.flag()
    }
}

impl FromIterator<Partition> for PartitionSet {
    fn from_iter<I: IntoIterator<Item = Partition>>(iter: I) -> Self {
        iter.into_iter()
            .fold(PartitionSet::empty(), |acc, p| acc | p.flag())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_set_matches_system_array() {
        let from_array: PartitionSet = Partition::SYSTEM.into_iter().collect();
        assert_eq!(from_array, PartitionSet::SYSTEM);
        assert!(!PartitionSet::SYSTEM.contains(PartitionSet::META));
    }

    #[test]
    fn test_partitions_iterator_round_trip() {
        let set = Partition::Asserted.flag() | Partition::Meta.flag();
        let members: Vec<Partition> = set.partitions().collect();
        assert_eq!(members, vec![Partition::Asserted, Partition::Meta]);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Partition::Inferred.to_string(), "inferred");
        assert_eq!(Partition::Ui.as_str(), "ui");
    }
}
