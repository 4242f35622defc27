use crate::domain::ports::ContentSource;
use crate::utils::error::SourceResult;

/// Deletes every join record. Never run alongside the reconciler.
pub struct Purger<'a, C: ContentSource + ?Sized> {
    source: &'a C,
    dry_run: bool,
}

impl<'a, C: ContentSource + ?Sized> Purger<'a, C> {
    pub fn new(source: &'a C, dry_run: bool) -> Self {
        Self { source, dry_run }
    }

    /// Returns the number of records deleted, or that would be deleted in dry-run.
    ///
    /// The first failed delete aborts the run.
    pub async fn purge_all(&self) -> SourceResult<usize> {
        let ids = self.source.list_all_service_location_ids().await?;
        tracing::info!("Found {} ServiceLocations to delete.", ids.len());

        if self.dry_run {
            tracing::info!("🚧 DRY RUN MODE ENABLED (no records will be deleted)");
            return Ok(ids.len());
        }

        let mut deleted = 0;
        for id in &ids {
            if let Err(e) = self.source.delete_service_location(id).await {
                tracing::error!(
                    "❌ Failed to delete {} after {} deletions: {}",
                    id,
                    deleted,
                    e
                );
                return Err(e);
            }
            tracing::info!("🗑️ Deleted {}", id);
            deleted += 1;
        }

        tracing::info!("✅ Cleanup complete!");
        Ok(deleted)
    }
}
