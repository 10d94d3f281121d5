//! Generation rotation: next → current → prior.
//!
//! ```text
//! 1. drop next          ┐ before the build; failure leaves current as-is
//! 2. build into next    ┘
//! 3. drop prior
//! 4. copy current → prior
//! 5. drop current       ┐ no usable current between these two steps
//! 6. copy next → current┘
//! ```
//!
//! Each drop and copy is atomic per database, but the sequence is not. A
//! crash between steps 5 and 6 leaves `current` empty until the next
//! successful cycle or a [`GenerationManager::restore_prior`] call.

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::{IndexerError, Result};
use crate::traits::store::DocumentStore;
use crate::types::generation::{Generation, GenerationDatabases, Partition, PromotionStep};

/// Owns the rotation protocol over a document store.
pub struct GenerationManager {
    store: Arc<dyn DocumentStore>,
}

impl GenerationManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Build a fresh `next` generation with `build` and publish it.
    ///
    /// A failing build is reported as [`IndexerError::Build`] and leaves
    /// `current` and `prior` untouched. A failing rotation step is reported
    /// as [`IndexerError::Promotion`] and stops the protocol at that step.
    pub async fn promote<F, Fut, T>(&self, build: F) -> Result<T>
    where
        F: FnOnce(GenerationDatabases) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.step(PromotionStep::ClearNext, self.drop_generation(Generation::Next))
            .await?;

        let output = build(GenerationDatabases::for_generation(Generation::Next))
            .await
            .map_err(|e| IndexerError::Build(Box::new(e)))?;

        self.step(PromotionStep::ClearPrior, self.drop_generation(Generation::Prior))
            .await?;
        self.step(
            PromotionStep::SnapshotCurrent,
            self.copy_generation(Generation::Current, Generation::Prior),
        )
        .await?;
        self.step(PromotionStep::ClearCurrent, self.drop_generation(Generation::Current))
            .await?;
        self.step(
            PromotionStep::PublishNext,
            self.copy_generation(Generation::Next, Generation::Current),
        )
        .await?;

        info!("Promoted next generation to current");
        Ok(output)
    }

    /// Copy `prior` back over `current`.
    ///
    /// Refuses with [`IndexerError::NoPriorGeneration`], before touching
    /// `current`, when `prior` has no cache partition. Every build writes
    /// the cache documents, so a missing one means no complete snapshot.
    pub async fn restore_prior(&self) -> Result<()> {
        let prior_cache = Partition::SearchCache.database(Generation::Prior);
        if !self.store.database_exists(&prior_cache).await? {
            warn!(database = %prior_cache, "refusing rollback without a prior generation");
            return Err(IndexerError::NoPriorGeneration {
                database: prior_cache,
            });
        }

        self.step(
            PromotionStep::RestorePrior,
            self.copy_generation(Generation::Prior, Generation::Current),
        )
        .await?;

        info!("Restored prior generation as current");
        Ok(())
    }

    async fn step(&self, step: PromotionStep, op: impl Future<Output = Result<()>>) -> Result<()> {
        info!(step = %step, "promotion step");
        op.await.map_err(|e| {
            error!(
                step = %step,
                threatens_current = step.threatens_current(),
                error = %e,
                "promotion step failed"
            );
            IndexerError::Promotion {
                step,
                source: Box::new(e),
            }
        })
    }

    async fn drop_generation(&self, generation: Generation) -> Result<()> {
        for partition in Partition::ALL {
            self.store
                .drop_database(&partition.database(generation))
                .await?;
        }
        Ok(())
    }

    async fn copy_generation(&self, from: Generation, to: Generation) -> Result<()> {
        for partition in Partition::ALL {
            self.store
                .copy_database(&partition.database(from), &partition.database(to))
                .await?;
        }
        Ok(())
    }
}
