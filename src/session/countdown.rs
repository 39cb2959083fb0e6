use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Run `on_tick` every `period` until it returns `false`
///
/// The first tick fires one period after spawning. Aborting the returned
/// handle cancels the countdown.
pub fn spawn_countdown<F, Fut>(period: Duration, mut on_tick: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !on_tick().await {
                break;
            }
        }
    })
}
