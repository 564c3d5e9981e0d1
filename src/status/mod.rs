//! Health indicators for the frontend's liveness/readiness endpoints

mod poller;
mod probe;

pub use poller::{LayoutGate, PollerHandle, StatusPoller};
pub use probe::{
    default_probes, HealthIndicator, IndicatorStatus, Probe, ProbeOutcome, ProbeValue, FAIL_CLASS,
    OK_CLASS,
};
