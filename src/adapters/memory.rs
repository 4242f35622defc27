use crate::domain::model::{
    CityLocation, CityLocationId, Service, ServiceId, ServiceLocation, ServiceLocationId, Stage,
};
use crate::domain::ports::ContentSource;
use crate::utils::error::{SourceError, SourceResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

type PairKey = (ServiceId, CityLocationId);

/// Number of times each content source operation was invoked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_services: usize,
    pub list_city_locations: usize,
    pub find: usize,
    pub create: usize,
    pub publish: usize,
    pub list_ids: usize,
    pub delete: usize,
}

impl CallCounts {
    pub fn mutations(&self) -> usize {
        self.create + self.publish + self.delete
    }
}

#[derive(Default)]
struct State {
    services: Vec<Service>,
    cities: Vec<CityLocation>,
    locations: Vec<ServiceLocation>,
    next_id: u64,
    calls: CallCounts,
    failing_pairs: HashSet<PairKey>,
    failing_creates: HashSet<PairKey>,
    failing_publishes: HashSet<PairKey>,
    transient_failures: HashMap<PairKey, u32>,
    unique_pairs: bool,
    stale_lookups: bool,
}

impl State {
    fn insert(
        &mut self,
        service_id: ServiceId,
        city_id: CityLocationId,
        stage: Stage,
    ) -> ServiceLocation {
        self.next_id += 1;
        let location = ServiceLocation {
            id: ServiceLocationId::new(format!("sl-{}", self.next_id)),
            service_id,
            city_location_id: city_id,
            stage,
        };
        self.locations.push(location.clone());
        location
    }
}

/// Content source that keeps every collection in memory.
///
/// Used to rehearse runs without touching the CMS and as the backing store
/// for tests. Faults can be injected per pair.
#[derive(Default)]
pub struct MemoryContentSource {
    state: Mutex<State>,
}

impl MemoryContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_services(mut self, services: Vec<Service>) -> Self {
        self.state.get_mut().services = services;
        self
    }

    pub fn with_cities(mut self, cities: Vec<CityLocation>) -> Self {
        self.state.get_mut().cities = cities;
        self
    }

    /// Seeds a join record as if it had been created by an earlier run.
    pub fn with_existing(mut self, service_id: &str, city_id: &str, stage: Stage) -> Self {
        self.state
            .get_mut()
            .insert(ServiceId::new(service_id), CityLocationId::new(city_id), stage);
        self
    }

    /// Every lookup for this pair fails.
    pub fn with_failing_pair(mut self, service_id: &str, city_id: &str) -> Self {
        self.state
            .get_mut()
            .failing_pairs
            .insert((ServiceId::new(service_id), CityLocationId::new(city_id)));
        self
    }

    /// Every create for this pair fails with a non-duplicate error.
    pub fn with_failing_create(mut self, service_id: &str, city_id: &str) -> Self {
        self.state
            .get_mut()
            .failing_creates
            .insert((ServiceId::new(service_id), CityLocationId::new(city_id)));
        self
    }

    /// Every publish of a join record for this pair fails.
    pub fn with_failing_publish(mut self, service_id: &str, city_id: &str) -> Self {
        self.state
            .get_mut()
            .failing_publishes
            .insert((ServiceId::new(service_id), CityLocationId::new(city_id)));
        self
    }

    /// The next `times` lookups for this pair answer HTTP 503.
    pub fn with_transient_failures(
        mut self,
        service_id: &str,
        city_id: &str,
        times: u32,
    ) -> Self {
        self.state.get_mut().transient_failures.insert(
            (ServiceId::new(service_id), CityLocationId::new(city_id)),
            times,
        );
        self
    }

    /// Reject creates for a pair that already has a join record.
    pub fn with_unique_pairs(mut self, enabled: bool) -> Self {
        self.state.get_mut().unique_pairs = enabled;
        self
    }

    /// Lookups always come back empty, as when reading from a lagging replica.
    pub fn with_stale_lookups(mut self, enabled: bool) -> Self {
        self.state.get_mut().stale_lookups = enabled;
        self
    }

    pub async fn calls(&self) -> CallCounts {
        self.state.lock().await.calls.clone()
    }

    pub async fn reset_calls(&self) {
        self.state.lock().await.calls = CallCounts::default();
    }

    pub async fn locations(&self) -> Vec<ServiceLocation> {
        self.state.lock().await.locations.clone()
    }

    pub async fn locations_for(&self, service_id: &str, city_id: &str) -> Vec<ServiceLocation> {
        self.state
            .lock()
            .await
            .locations
            .iter()
            .filter(|l| {
                l.service_id.as_str() == service_id && l.city_location_id.as_str() == city_id
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ContentSource for MemoryContentSource {
    async fn list_services(&self) -> SourceResult<Vec<Service>> {
        let mut state = self.state.lock().await;
        state.calls.list_services += 1;
        Ok(state.services.clone())
    }

    async fn list_city_locations(&self) -> SourceResult<Vec<CityLocation>> {
        let mut state = self.state.lock().await;
        state.calls.list_city_locations += 1;
        Ok(state.cities.clone())
    }

    async fn find_service_locations(
        &self,
        service_id: &ServiceId,
        city_id: &CityLocationId,
    ) -> SourceResult<Vec<ServiceLocation>> {
        let mut state = self.state.lock().await;
        state.calls.find += 1;

        let key = (service_id.clone(), city_id.clone());
        if state.failing_pairs.contains(&key) {
            return Err(SourceError::Injected {
                message: format!("lookup failed for {} / {}", service_id, city_id),
            });
        }
        if let Some(remaining) = state.transient_failures.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SourceError::Status {
                    status: 503,
                    body: "service unavailable".to_string(),
                });
            }
        }
        if state.stale_lookups {
            return Ok(Vec::new());
        }

        Ok(state
            .locations
            .iter()
            .filter(|l| &l.service_id == service_id && &l.city_location_id == city_id)
            .cloned()
            .collect())
    }

    async fn create_service_location(
        &self,
        service_id: &ServiceId,
        city_id: &CityLocationId,
    ) -> SourceResult<ServiceLocation> {
        let mut state = self.state.lock().await;
        state.calls.create += 1;

        if state
            .failing_creates
            .contains(&(service_id.clone(), city_id.clone()))
        {
            return Err(SourceError::Injected {
                message: format!("create failed for {} / {}", service_id, city_id),
            });
        }
        if state.unique_pairs
            && state
                .locations
                .iter()
                .any(|l| &l.service_id == service_id && &l.city_location_id == city_id)
        {
            return Err(SourceError::DuplicateKey {
                message: format!(
                    "ServiceLocation for {} / {} already exists",
                    service_id, city_id
                ),
            });
        }

        Ok(state.insert(service_id.clone(), city_id.clone(), Stage::Draft))
    }

    async fn publish_service_location(
        &self,
        id: &ServiceLocationId,
    ) -> SourceResult<ServiceLocation> {
        let mut state = self.state.lock().await;
        state.calls.publish += 1;

        let State {
            locations,
            failing_publishes,
            ..
        } = &mut *state;
        let location = locations
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or_else(|| SourceError::NotFound {
                entity: "ServiceLocation",
                id: id.to_string(),
            })?;
        let key = (location.service_id.clone(), location.city_location_id.clone());
        if failing_publishes.contains(&key) {
            return Err(SourceError::Injected {
                message: format!("publish failed for {}", id),
            });
        }

        location.stage = Stage::Published;
        Ok(location.clone())
    }

    async fn list_all_service_location_ids(&self) -> SourceResult<Vec<ServiceLocationId>> {
        let mut state = self.state.lock().await;
        state.calls.list_ids += 1;
        Ok(state.locations.iter().map(|l| l.id.clone()).collect())
    }

    async fn delete_service_location(&self, id: &ServiceLocationId) -> SourceResult<()> {
        let mut state = self.state.lock().await;
        state.calls.delete += 1;

        let before = state.locations.len();
        state.locations.retain(|l| &l.id != id);
        if state.locations.len() == before {
            return Err(SourceError::NotFound {
                entity: "ServiceLocation",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
