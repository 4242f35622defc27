pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::{GraphQlContentSource, LocalStorage, MemoryContentSource};
pub use crate::config::{CliConfig, Command, Settings};
pub use crate::core::{
    purge::Purger,
    reconciler::{ReconcileOptions, Reconciler, RetryPolicy},
    report::{RunMode, RunReport},
};
pub use crate::domain::model::{
    CityLocation, CityLocationId, Service, ServiceId, ServiceLocation, ServiceLocationId, Stage,
    Summary,
};
pub use crate::domain::ports::ContentSource;
pub use crate::utils::error::{Result, SourceError, SyncError};
