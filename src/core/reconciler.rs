use crate::domain::model::{CityLocation, PairFailure, Service, Summary};
use crate::domain::ports::ContentSource;
use crate::utils::error::SourceResult;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;

/// Extra attempts for transient content source failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub dry_run: bool,
    /// Pairs in flight at once. 1 keeps one outstanding request at a time.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            concurrency: 1,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairOutcome {
    Created,
    AlreadyPresent,
    RejectedAsDuplicate,
}

/// Brings the join collection to one published record per (service, city) pair.
pub struct Reconciler<'a, C: ContentSource + ?Sized> {
    source: &'a C,
    options: ReconcileOptions,
}

impl<'a, C: ContentSource + ?Sized> Reconciler<'a, C> {
    pub fn new(source: &'a C, options: ReconcileOptions) -> Self {
        Self { source, options }
    }

    /// Fetches both collections once, then reconciles their cross-product.
    ///
    /// Only the two list calls can fail the run; pair failures end up in the summary.
    pub async fn run(&self) -> SourceResult<Summary> {
        let services = self
            .retrying("list services", || self.source.list_services())
            .await?;
        let cities = self
            .retrying("list city locations", || self.source.list_city_locations())
            .await?;

        tracing::info!(
            "Found {} services and {} cities.",
            services.len(),
            cities.len()
        );
        if self.options.dry_run {
            tracing::info!("🚧 DRY RUN MODE ENABLED (no changes will be made)");
        }

        Ok(self.reconcile(&services, &cities).await)
    }

    pub async fn reconcile(&self, services: &[Service], cities: &[CityLocation]) -> Summary {
        let pairs = services
            .iter()
            .flat_map(|service| cities.iter().map(move |city| (service, city)));

        // `buffered` yields in input order, so the fold below is deterministic.
        let outcomes: Vec<_> = stream::iter(pairs)
            .map(|(service, city)| async move {
                let outcome = self.reconcile_pair(service, city).await;
                (service, city, outcome)
            })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut summary = Summary::default();
        for (service, city, outcome) in outcomes {
            match outcome {
                Ok(PairOutcome::Created) => {
                    summary.created += 1;
                    summary.published += 1;
                }
                Ok(PairOutcome::AlreadyPresent) | Ok(PairOutcome::RejectedAsDuplicate) => {
                    summary.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(
                        "❌ Error: {} → {} (service {}, city {}): {}",
                        service.name,
                        city.city,
                        service.id,
                        city.id,
                        e
                    );
                    summary.errors += 1;
                    summary.failures.push(PairFailure {
                        service_id: service.id.clone(),
                        service_name: service.name.clone(),
                        city_location_id: city.id.clone(),
                        city: city.city.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        summary
    }

    async fn reconcile_pair(
        &self,
        service: &Service,
        city: &CityLocation,
    ) -> SourceResult<PairOutcome> {
        let existing = self
            .retrying("lookup", || {
                self.source.find_service_locations(&service.id, &city.id)
            })
            .await?;

        if let Some(canonical) = existing.first() {
            if existing.len() > 1 {
                // Pre-existing duplicates are left alone; the first match is canonical.
                tracing::warn!(
                    "🔁 {} join records for {} → {}, using {}",
                    existing.len(),
                    service.name,
                    city.city,
                    canonical.id
                );
            }
            if !self.options.dry_run {
                self.retrying("publish", || {
                    self.source.publish_service_location(&canonical.id)
                })
                .await?;
            }
            tracing::info!(
                "⚠️ Already exists, published: {} → {}",
                service.name,
                city.city
            );
            return Ok(PairOutcome::AlreadyPresent);
        }

        if !self.options.dry_run {
            // Never retried: a create that timed out may still have been committed.
            let created = match self
                .source
                .create_service_location(&service.id, &city.id)
                .await
            {
                Ok(created) => created,
                Err(e) if e.is_duplicate() => {
                    tracing::info!(
                        "⚠️ Already exists: {} → {} ({})",
                        service.name,
                        city.city,
                        e
                    );
                    return Ok(PairOutcome::RejectedAsDuplicate);
                }
                Err(e) => return Err(e),
            };

            self.retrying("publish", || {
                self.source.publish_service_location(&created.id)
            })
            .await?;
        }

        tracing::info!("✅ Created & Published: {} → {}", service.name, city.city);
        Ok(PairOutcome::Created)
    }

    async fn retrying<T, F, Fut>(&self, operation: &str, mut call: F) -> SourceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SourceResult<T>>,
    {
        let policy = self.options.retry;
        let mut attempt = 0;

        loop {
            match call().await {
                Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "🔄 {} failed ({}), retry {}/{}",
                        operation,
                        e,
                        attempt,
                        policy.max_retries
                    );
                    tokio::time::sleep(policy.delay).await;
                }
                result => return result,
            }
        }
    }
}
