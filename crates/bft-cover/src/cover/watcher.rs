//! Motion watcher for covers with a command in flight.
//!
//! Re-polls the cover on a fixed interval while the gate is believed to be
//! moving. The controller owns the only handle and cancels it once a poll
//! reports a settled state.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use super::controller::WeakCover;
use crate::gate::GateCommand;

/// Handle to a running watcher task. Dropping it also stops the task.
pub struct MotionWatcher {
    cancel_tx: oneshot::Sender<()>,
}

impl MotionWatcher {
    /// Spawn a watcher that polls `cover` every `poll_interval`.
    ///
    /// The first poll happens one interval after the command, not
    /// immediately. Ticks that fire while a poll is running are skipped.
    pub(super) fn spawn(cover: WeakCover, poll_interval: Duration, command: GateCommand) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let slug = cover.slug().to_string();

        tokio::spawn(async move {
            debug!(cover = %slug, command = %command, "Motion watcher started");

            let start = Instant::now() + poll_interval;
            let mut interval = tokio::time::interval_at(start, poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut cancel_rx = cancel_rx;

            loop {
                tokio::select! {
                    biased;
                    _ = &mut cancel_rx => {
                        debug!(cover = %slug, "Motion watcher cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        let Some(controller) = cover.upgrade() else {
                            debug!(cover = %slug, "Cover dropped, stopping watcher");
                            break;
                        };
                        controller.poll_from_watcher().await;
                    }
                }
            }

            debug!(cover = %slug, "Motion watcher stopped");
        });

        Self { cancel_tx }
    }

    pub fn stop(self) {
        let _ = self.cancel_tx.send(());
    }
}
