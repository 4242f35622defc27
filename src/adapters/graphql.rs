use crate::domain::model::{
    CityLocation, CityLocationId, Service, ServiceId, ServiceLocation, ServiceLocationId, Stage,
};
use crate::domain::ports::ContentSource;
use crate::utils::error::{SourceError, SourceResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

const LIST_SERVICES: &str = r#"
query ListServices($first: Int!, $skip: Int!) {
  services(first: $first, skip: $skip) {
    id
    name
    slug
  }
}"#;

const LIST_CITY_LOCATIONS: &str = r#"
query ListCityLocations($first: Int!, $skip: Int!) {
  citylocations(first: $first, skip: $skip) {
    id
    city
    slug
  }
}"#;

// DRAFT holds every document, so records left unpublished by an earlier run are found too.
const FIND_SERVICE_LOCATIONS: &str = r#"
query FindServiceLocations($serviceId: ID!, $cityId: ID!) {
  serviceLocations(
    stage: DRAFT
    where: { service: { id: $serviceId }, cityLocation: { id: $cityId } }
  ) {
    id
    stage
    service { id }
    cityLocation { id }
  }
}"#;

const CREATE_SERVICE_LOCATION: &str = r#"
mutation CreateServiceLocation($serviceId: ID!, $cityId: ID!) {
  createServiceLocation(
    data: {
      service: { connect: { id: $serviceId } }
      cityLocation: { connect: { id: $cityId } }
    }
  ) {
    id
    stage
    service { id }
    cityLocation { id }
  }
}"#;

const PUBLISH_SERVICE_LOCATION: &str = r#"
mutation PublishServiceLocation($id: ID!) {
  publishServiceLocation(where: { id: $id }, to: PUBLISHED) {
    id
    stage
    service { id }
    cityLocation { id }
  }
}"#;

const LIST_SERVICE_LOCATION_IDS: &str = r#"
query ListServiceLocationIds($first: Int!, $skip: Int!) {
  serviceLocations(stage: DRAFT, first: $first, skip: $skip) {
    id
  }
}"#;

const DELETE_SERVICE_LOCATION: &str = r#"
mutation DeleteServiceLocation($id: ID!) {
  deleteServiceLocation(where: { id: $id }) {
    id
  }
}"#;

const DUPLICATE_MARKER: &str = "already exists";

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Largest `first` the content API honours; bigger requests come back truncated.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

#[derive(Deserialize)]
struct WireRef {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireServiceLocation {
    id: ServiceLocationId,
    stage: Option<Stage>,
    service: Option<WireRef>,
    city_location: Option<WireRef>,
}

impl WireServiceLocation {
    fn into_model(self) -> SourceResult<ServiceLocation> {
        let (service, city) = match (self.service, self.city_location) {
            (Some(service), Some(city)) => (service, city),
            _ => {
                return Err(SourceError::Decode(serde::de::Error::custom(format!(
                    "ServiceLocation {} is missing its service or cityLocation reference",
                    self.id
                ))))
            }
        };

        Ok(ServiceLocation {
            id: self.id,
            service_id: ServiceId::new(service.id),
            city_location_id: CityLocationId::new(city.id),
            stage: self.stage.unwrap_or(Stage::Draft),
        })
    }
}

#[derive(Deserialize)]
struct IdOnly {
    id: ServiceLocationId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindData {
    service_locations: Vec<WireServiceLocation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateData {
    create_service_location: WireServiceLocation,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishData {
    publish_service_location: WireServiceLocation,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteData {
    delete_service_location: Option<IdOnly>,
}

/// Content source backed by a GraphQL content API with bearer authentication.
pub struct GraphQlContentSource {
    client: Client,
    endpoint: String,
    token: String,
    page_size: usize,
}

impl GraphQlContentSource {
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("service-area-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Clamped to `1..=MAX_PAGE_SIZE` so a short page always means the last page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        if page_size > MAX_PAGE_SIZE {
            tracing::warn!(
                "⚠️ Page size {} exceeds the API limit, using {}",
                page_size,
                MAX_PAGE_SIZE
            );
        }
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> SourceResult<T> {
        tracing::debug!("GraphQL {} -> {}", operation, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("GraphQL {} response status: {}", operation, status);

        let parsed: GraphQlResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(SourceError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
            Err(e) => return Err(SourceError::Decode(e)),
        };

        if !parsed.errors.is_empty() {
            return Err(classify_errors(parsed.errors));
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data = parsed.data.ok_or_else(|| SourceError::GraphQl {
            messages: vec![format!("{} returned no data", operation)],
        })?;
        Ok(serde_json::from_value(data)?)
    }

    /// Walks `first`/`skip` pages until a short page comes back.
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        field: &str,
    ) -> SourceResult<Vec<T>> {
        let mut items = Vec::new();
        let mut skip = 0;

        loop {
            let mut data: HashMap<String, Vec<T>> = self
                .execute(
                    operation,
                    query,
                    json!({ "first": self.page_size, "skip": skip }),
                )
                .await?;
            let page = data.remove(field).unwrap_or_default();
            let fetched = page.len();
            items.extend(page);

            if fetched < self.page_size {
                break;
            }
            skip += fetched;
        }

        Ok(items)
    }
}

fn classify_errors(errors: Vec<GraphQlErrorEntry>) -> SourceError {
    let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();

    match messages
        .iter()
        .find(|m| m.to_lowercase().contains(DUPLICATE_MARKER))
    {
        Some(message) => SourceError::DuplicateKey {
            message: message.clone(),
        },
        None => SourceError::GraphQl { messages },
    }
}

#[async_trait]
impl ContentSource for GraphQlContentSource {
    async fn list_services(&self) -> SourceResult<Vec<Service>> {
        self.fetch_all("ListServices", LIST_SERVICES, "services").await
    }

    async fn list_city_locations(&self) -> SourceResult<Vec<CityLocation>> {
        self.fetch_all("ListCityLocations", LIST_CITY_LOCATIONS, "citylocations")
            .await
    }

    async fn find_service_locations(
        &self,
        service_id: &ServiceId,
        city_id: &CityLocationId,
    ) -> SourceResult<Vec<ServiceLocation>> {
        let data: FindData = self
            .execute(
                "FindServiceLocations",
                FIND_SERVICE_LOCATIONS,
                json!({ "serviceId": service_id, "cityId": city_id }),
            )
            .await?;

        data.service_locations
            .into_iter()
            .map(WireServiceLocation::into_model)
            .collect()
    }

    async fn create_service_location(
        &self,
        service_id: &ServiceId,
        city_id: &CityLocationId,
    ) -> SourceResult<ServiceLocation> {
        let data: CreateData = self
            .execute(
                "CreateServiceLocation",
                CREATE_SERVICE_LOCATION,
                json!({ "serviceId": service_id, "cityId": city_id }),
            )
            .await?;
        data.create_service_location.into_model()
    }

    async fn publish_service_location(
        &self,
        id: &ServiceLocationId,
    ) -> SourceResult<ServiceLocation> {
        let data: PublishData = self
            .execute(
                "PublishServiceLocation",
                PUBLISH_SERVICE_LOCATION,
                json!({ "id": id }),
            )
            .await?;
        data.publish_service_location.into_model()
    }

    async fn list_all_service_location_ids(&self) -> SourceResult<Vec<ServiceLocationId>> {
        let rows: Vec<IdOnly> = self
            .fetch_all(
                "ListServiceLocationIds",
                LIST_SERVICE_LOCATION_IDS,
                "serviceLocations",
            )
            .await?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    async fn delete_service_location(&self, id: &ServiceLocationId) -> SourceResult<()> {
        let data: DeleteData = self
            .execute(
                "DeleteServiceLocation",
                DELETE_SERVICE_LOCATION,
                json!({ "id": id }),
            )
            .await?;

        match data.delete_service_location {
            Some(_) => Ok(()),
            None => Err(SourceError::NotFound {
                entity: "ServiceLocation",
                id: id.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn source_for(server: &MockServer) -> GraphQlContentSource {
        GraphQlContentSource::new(server.url("/graphql"), "test-token", Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_classify_duplicate_message() {
        let err = classify_errors(vec![GraphQlErrorEntry {
            message: "Value for field 'slug' Already Exists".to_string(),
        }]);
        assert!(err.is_duplicate());

        let err = classify_errors(vec![GraphQlErrorEntry {
            message: "field 'foo' is not defined".to_string(),
        }]);
        assert!(matches!(err, SourceError::GraphQl { .. }));
    }

    #[tokio::test]
    async fn test_sends_bearer_token_and_parses_services() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/graphql")
                .header("Authorization", "Bearer test-token")
                .body_contains("ListServices");
            then.status(200).json_body(json!({
                "data": {
                    "services": [
                        {"id": "svc-1", "name": "Land Clearing", "slug": "land-clearing"},
                        {"id": "svc-2", "name": "Stump Grinding", "slug": "stump-grinding"}
                    ]
                }
            }));
        });

        let services = source_for(&server).list_services().await.unwrap();

        mock.assert();
        assert_eq!(services.len(), 2);
        assert_eq!(services[1].id.as_str(), "svc-2");
        assert_eq!(services[0].name, "Land Clearing");
    }

    #[tokio::test]
    async fn test_duplicate_error_document_maps_to_duplicate_key() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).body_contains("CreateServiceLocation");
            then.status(200).json_body(json!({
                "data": null,
                "errors": [{
                    "message": "ServiceLocation with this service and cityLocation already exists"
                }]
            }));
        });

        let err = source_for(&server)
            .create_service_location(&ServiceId::new("svc-1"), &CityLocationId::new("city-1"))
            .await
            .unwrap_err();

        assert!(err.is_duplicate());
    }

    #[tokio::test]
    async fn test_non_graphql_error_body_maps_to_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(503).body("upstream unavailable");
        });

        let err = source_for(&server)
            .publish_service_location(&ServiceLocationId::new("sl-1"))
            .await
            .unwrap_err();

        match err {
            SourceError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "upstream unavailable");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_of_missing_record_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).body_contains("DeleteServiceLocation");
            then.status(200)
                .json_body(json!({"data": {"deleteServiceLocation": null}}));
        });

        let err = source_for(&server)
            .delete_service_location(&ServiceLocationId::new("gone"))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_ids_are_paged_until_short_page() {
        let server = MockServer::start();
        let first_page = server.mock(|when, then| {
            when.method(POST)
                .body_contains("ListServiceLocationIds")
                .body_contains("\"skip\":0");
            then.status(200).json_body(json!({
                "data": {"serviceLocations": [{"id": "sl-1"}, {"id": "sl-2"}]}
            }));
        });
        let second_page = server.mock(|when, then| {
            when.method(POST)
                .body_contains("ListServiceLocationIds")
                .body_contains("\"skip\":2");
            then.status(200).json_body(json!({
                "data": {"serviceLocations": [{"id": "sl-3"}]}
            }));
        });

        let ids = source_for(&server)
            .with_page_size(2)
            .list_all_service_location_ids()
            .await
            .unwrap();

        first_page.assert();
        second_page.assert();
        let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["sl-1", "sl-2", "sl-3"]);
    }

    #[tokio::test]
    async fn test_oversized_page_is_clamped_to_api_limit() {
        let server = MockServer::start();
        let capped = server.mock(|when, then| {
            when.method(POST)
                .body_contains("ListServiceLocationIds")
                .body_contains("\"first\":100");
            then.status(200).json_body(json!({
                "data": {"serviceLocations": [{"id": "sl-1"}]}
            }));
        });

        let ids = source_for(&server)
            .with_page_size(500)
            .list_all_service_location_ids()
            .await
            .unwrap();

        capped.assert();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_find_maps_references() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .body_contains("FindServiceLocations")
                .body_contains("\"serviceId\":\"svc-1\"")
                .body_contains("\"cityId\":\"city-9\"");
            then.status(200).json_body(json!({
                "data": {"serviceLocations": [{
                    "id": "sl-7",
                    "stage": "DRAFT",
                    "service": {"id": "svc-1"},
                    "cityLocation": {"id": "city-9"}
                }]}
            }));
        });

        let found = source_for(&server)
            .find_service_locations(&ServiceId::new("svc-1"), &CityLocationId::new("city-9"))
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_str(), "sl-7");
        assert_eq!(found[0].city_location_id.as_str(), "city-9");
        assert_eq!(found[0].stage, Stage::Draft);
    }
}
