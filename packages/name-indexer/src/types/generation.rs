//! Generation naming for the three-way index rotation.
//!
//! Every generation is split across two databases (partitions): the search
//! database holding namespace and profile collections, and the cache database
//! holding the singleton cache sets.

use std::fmt;

/// One copy of the full derived index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generation {
    /// Being built; never read by consumers
    Next,
    /// Actively served
    Current,
    /// Previous `current`, kept one cycle for rollback
    Prior,
}

impl Generation {
    /// Suffix appended to a partition's base name.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Next => "_next",
            Self::Current => "",
            Self::Prior => "_prior",
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Next => "next",
            Self::Current => "current",
            Self::Prior => "prior",
        };
        f.write_str(name)
    }
}

/// A database that is rotated as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// `namespace`, `profile_data` and `profiles`
    SearchDb,
    /// `people_cache`, `twitter_cache` and `username_cache`
    SearchCache,
}

impl Partition {
    pub const ALL: [Partition; 2] = [Self::SearchDb, Self::SearchCache];

    fn base_name(&self) -> &'static str {
        match self {
            Self::SearchDb => "search_db",
            Self::SearchCache => "search_cache",
        }
    }

    /// Database name of this partition in the given generation.
    pub fn database(&self, generation: Generation) -> String {
        format!("{}{}", self.base_name(), generation.suffix())
    }
}

/// Collection names inside the search database.
pub mod collections {
    pub const NAMESPACE: &str = "namespace";
    pub const PROFILE_DATA: &str = "profile_data";
    pub const PROFILES: &str = "profiles";
}

/// Database names of one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationDatabases {
    pub search_db: String,
    pub search_cache: String,
}

impl GenerationDatabases {
    pub fn for_generation(generation: Generation) -> Self {
        Self {
            search_db: Partition::SearchDb.database(generation),
            search_cache: Partition::SearchCache.database(generation),
        }
    }
}

/// Ordered steps of a promotion. Step 2 (the build) is reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromotionStep {
    ClearNext,
    ClearPrior,
    SnapshotCurrent,
    ClearCurrent,
    PublishNext,
    /// Recovery path: prior copied back over current
    RestorePrior,
}

impl PromotionStep {
    /// Whether a failure at this step may leave `current` absent or partial.
    pub fn threatens_current(&self) -> bool {
        matches!(
            self,
            Self::ClearCurrent | Self::PublishNext | Self::RestorePrior
        )
    }
}

impl fmt::Display for PromotionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ClearNext => "clear-next",
            Self::ClearPrior => "clear-prior",
            Self::SnapshotCurrent => "snapshot-current",
            Self::ClearCurrent => "clear-current",
            Self::PublishNext => "publish-next",
            Self::RestorePrior => "restore-prior",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_names() {
        assert_eq!(Partition::SearchDb.database(Generation::Next), "search_db_next");
        assert_eq!(Partition::SearchDb.database(Generation::Current), "search_db");
        assert_eq!(
            Partition::SearchCache.database(Generation::Prior),
            "search_cache_prior"
        );
    }

    #[test]
    fn test_only_late_steps_threaten_current() {
        assert!(!PromotionStep::ClearNext.threatens_current());
        assert!(!PromotionStep::SnapshotCurrent.threatens_current());
        assert!(PromotionStep::ClearCurrent.threatens_current());
        assert!(PromotionStep::PublishNext.threatens_current());
    }
}
