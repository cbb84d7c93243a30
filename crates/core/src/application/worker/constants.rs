// Worker constants
use std::time::Duration;

/// Sleep duration when the queue is empty (100ms)
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(100);

/// Sleep duration after a storage error before claiming again (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);
