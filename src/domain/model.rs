use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! content_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

content_id!(
    /// Opaque identity of a `Service` entry.
    ServiceId
);
content_id!(
    /// Opaque identity of a `CityLocation` entry.
    CityLocationId
);
content_id!(
    /// Opaque identity of a `ServiceLocation` join record.
    ServiceLocationId
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityLocation {
    pub id: CityLocationId,
    pub city: String,
    pub slug: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Draft,
    Published,
}

/// Join record linking one service to one city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLocation {
    pub id: ServiceLocationId,
    pub service_id: ServiceId,
    pub city_location_id: CityLocationId,
    pub stage: Stage,
}

impl ServiceLocation {
    pub fn is_published(&self) -> bool {
        self.stage == Stage::Published
    }
}

/// A pair that could not be reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairFailure {
    pub service_id: ServiceId,
    pub service_name: String,
    pub city_location_id: CityLocationId,
    pub city: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub created: usize,
    pub published: usize,
    pub skipped: usize,
    pub errors: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<PairFailure>,
}

impl Summary {
    /// Pairs visited, whatever their outcome.
    pub fn total_pairs(&self) -> usize {
        self.created + self.skipped + self.errors
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--------- SUMMARY ---------")?;
        writeln!(f, "✅ Created: {}", self.created)?;
        writeln!(f, "📢 Published: {}", self.published)?;
        writeln!(f, "⚠️ Skipped (already exists): {}", self.skipped)?;
        writeln!(f, "❌ Errors: {}", self.errors)?;
        write!(f, "---------------------------")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let location = ServiceLocation {
            id: ServiceLocationId::new("sl-1"),
            service_id: ServiceId::new("svc-1"),
            city_location_id: CityLocationId::new("city-1"),
            stage: Stage::Draft,
        };

        let json = serde_json::to_value(&location).unwrap();
        assert_eq!(json["id"], "sl-1");
        assert_eq!(json["service_id"], "svc-1");
        assert_eq!(json["stage"], "DRAFT");
    }

    #[test]
    fn test_stage_parses_wire_names() {
        let stage: Stage = serde_json::from_str("\"PUBLISHED\"").unwrap();
        assert_eq!(stage, Stage::Published);
    }

    #[test]
    fn test_summary_display_lists_every_counter() {
        let summary = Summary {
            created: 2,
            published: 2,
            skipped: 3,
            errors: 1,
            failures: Vec::new(),
        };

        assert_eq!(summary.total_pairs(), 6);
        let rendered = summary.to_string();
        assert!(rendered.contains("Created: 2"));
        assert!(rendered.contains("Skipped (already exists): 3"));
        assert!(rendered.contains("Errors: 1"));
    }
}
