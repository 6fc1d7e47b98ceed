// Relay constants (no magic values)
use std::time::Duration;

/// Long-poll wait for a single receive call (service maximum)
pub const RECEIVE_WAIT: Duration = Duration::from_secs(20);

/// Upper bound accepted for the receive long-poll wait
pub const MAX_RECEIVE_WAIT: Duration = Duration::from_secs(20);

/// Default idle window before the relay stops on its own
pub const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(60);

/// Accepted idle window range
pub const MIN_MAX_IDLE: Duration = Duration::from_secs(1);
pub const MAX_MAX_IDLE: Duration = Duration::from_secs(60);

/// Default and maximum number of parallel workers
pub const DEFAULT_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 20;

/// Progress meter sampling period
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Cap for the per-worker error backoff
pub const MAX_ERROR_BACKOFF: Duration = Duration::from_secs(30);
