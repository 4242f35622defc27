// Domain layer: content models and ports. No knowledge of HTTP or GraphQL.

pub mod model;
pub mod ports;
