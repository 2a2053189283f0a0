pub mod run;
pub mod telemetry;

pub use run::{PodResult, RunDescriptor, RunDocument, RunWindow, TimeRange};
pub use telemetry::{HostSample, NetworkSample, NodeSample, SampleKind, TelemetryDocument};
