// Application Layer - Relay engine

pub mod progress;
pub mod relay;
pub mod retry;
pub mod watchdog;
pub mod worker;

// Re-exports
pub use progress::{ProgressMeter, ProgressSample, RateTracker};
pub use relay::{RelayConfig, RelayController, RelayState, RelaySummary, StartOutcome};
pub use retry::RetryPolicy;
pub use watchdog::IdleWatchdog;
pub use worker::{
    shutdown_channel, RoundOutcome, ShutdownReason, ShutdownSender, ShutdownToken, Worker,
    WorkerReport,
};
