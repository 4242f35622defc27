pub mod purge;
pub mod reconciler;
pub mod report;

pub use crate::domain::model::{CityLocation, PairFailure, Service, ServiceLocation, Summary};
pub use crate::domain::ports::{ContentSource, Storage};
pub use crate::utils::error::{Result, SourceResult};
