pub mod aggregate;
pub mod chart;
pub mod error;
pub mod layout;
pub mod matrix;
pub mod pipeline;
pub mod platform;
pub mod request;
pub mod resources;
pub mod samples;

pub use aggregate::{aggregate, Provenance, RepresentativeValue};
pub use error::DataError;
pub use layout::{layout, AxisLayout, AxisRange, SplitOptions, DEFAULT_MARGIN_FRAC};
pub use matrix::ComparisonMatrix;
pub use platform::Platform;
pub use resources::{extract, ResourceBreakdown, ResourceKind};
pub use samples::SampleSet;
