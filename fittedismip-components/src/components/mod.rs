pub mod extrapolate;
mod global;
mod ice_source;
pub mod localize;
pub mod response;
mod sampler;
pub mod trend;

pub use extrapolate::RateExtrapolation;
pub use global::{GlobalAssembler, GlobalProjection, ProjectionSettings};
pub use ice_source::{IceSheet, IceSource};
pub use localize::{local_provenance, FingerprintLocalizer};
pub use response::{ResponseComponents, ResponseModel};
pub use sampler::{SampleIndices, TrajectorySampler};
pub use trend::TrendDistribution;
