//! Polling for room changes.
//!
//! Nothing is pushed to clients: a player waiting on others re-fetches
//! their view on a fixed interval until something they care about moves.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sketchrelay_protocol::{RoomCode, RoomView};
use tokio::time::{self, MissedTickBehavior};

use crate::RoomError;

/// Shortest re-fetch interval; smaller configured values are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How often to re-fetch and when to give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Returns `true` if `after` asks the player for something new.
pub fn has_changed(before: &RoomView, after: &RoomView) -> bool {
    before.phase != after.phase || before.round != after.round || before.task != after.task
}

/// Calls `fetch` every `config.interval` (at least [`MIN_POLL_INTERVAL`])
/// until the returned view differs from `last` (see [`has_changed`]).
///
/// Errors from `fetch` are returned immediately. If nothing changes before
/// `config.timeout`, returns [`RoomError::PollTimeout`].
pub async fn poll_until_changed<F, Fut, E>(
    code: &RoomCode,
    last: &RoomView,
    config: PollConfig,
    mut fetch: F,
) -> Result<RoomView, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RoomView, E>>,
    E: From<RoomError>,
{
    let deadline = time::Instant::now() + config.timeout;
    let mut ticker = time::interval(config.interval.max(MIN_POLL_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the caller just fetched.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = time::sleep_until(deadline) => {
                tracing::debug!(room = %code, "poll timed out");
                return Err(RoomError::PollTimeout(code.clone()).into());
            }
        }

        let view = fetch().await?;
        if has_changed(last, &view) {
            return Ok(view);
        }
    }
}
