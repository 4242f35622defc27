use crate::domain::model::{
    CityLocation, CityLocationId, Service, ServiceId, ServiceLocation, ServiceLocationId,
};
use crate::utils::error::{Result, SourceResult};
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Query and mutation operations the reconciler and purger consume.
///
/// Implementations are constructed once by the caller and shared by
/// reference for the whole run.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn list_services(&self) -> SourceResult<Vec<Service>>;

    async fn list_city_locations(&self) -> SourceResult<Vec<CityLocation>>;

    /// All join records for exactly this pair, possibly more than one.
    async fn find_service_locations(
        &self,
        service_id: &ServiceId,
        city_id: &CityLocationId,
    ) -> SourceResult<Vec<ServiceLocation>>;

    /// Fails with `SourceError::DuplicateKey` when the backend rejects a duplicate.
    async fn create_service_location(
        &self,
        service_id: &ServiceId,
        city_id: &CityLocationId,
    ) -> SourceResult<ServiceLocation>;

    async fn publish_service_location(
        &self,
        id: &ServiceLocationId,
    ) -> SourceResult<ServiceLocation>;

    async fn list_all_service_location_ids(&self) -> SourceResult<Vec<ServiceLocationId>>;

    async fn delete_service_location(&self, id: &ServiceLocationId) -> SourceResult<()>;
}
