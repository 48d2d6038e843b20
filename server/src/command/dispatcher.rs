//! Shared relay coordinator behind a single lock

use smartmeter_shared::relay::StatusReport;
use smartmeter_shared::{now_ms, RelayCoordinator, RelaySnapshot, RelayState};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Serializes dashboard commands, device reports and device polls.
///
/// Relay state and the pending command are read and written together under
/// one lock so no caller sees one updated without the other.
pub struct RelayDispatcher {
    coordinator: Mutex<RelayCoordinator>,
}

impl RelayDispatcher {
    /// Create a dispatcher whose commands expire after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            coordinator: Mutex::new(RelayCoordinator::new(timeout.as_millis() as u64)),
        }
    }

    /// Queue a command for the device and assume the relay follows it
    pub async fn issue_command(&self, target: RelayState) -> RelaySnapshot {
        let (snapshot, timeout_ms) = {
            let mut coordinator = self.coordinator.lock().await;
            (coordinator.issue_command(target, now_ms()), coordinator.timeout_ms())
        };

        info!(
            "[RELAY] Command queued: {} (expires in {}s if not confirmed)",
            target,
            timeout_ms / 1000
        );

        snapshot
    }

    /// Apply a status reported by the device
    pub async fn report_status(&self, reported: RelayState) -> StatusReport {
        let report = self.coordinator.lock().await.report_status(reported);

        info!(
            "[RELAY] Status updated: {} -> {}",
            report.previous, report.relay_state
        );
        if let Some(cmd) = report.confirmed {
            info!(
                "[RELAY] Command {} confirmed by device, clearing pending command",
                cmd.target
            );
        }

        report
    }

    /// What the polling device should see, after expiring a stale command
    pub async fn poll_pending(&self) -> RelaySnapshot {
        let (poll, timeout_ms) = {
            let mut coordinator = self.coordinator.lock().await;
            (coordinator.poll_pending(now_ms()), coordinator.timeout_ms())
        };

        if let Some(cmd) = poll.expired {
            info!(
                "[RELAY] Command {} expired (timeout {}s)",
                cmd.target,
                timeout_ms / 1000
            );
        }
        debug!(
            "[RELAY] Poll - current state: {}, pending command: {:?}",
            poll.snapshot.relay_state,
            poll.snapshot.command()
        );

        poll.snapshot
    }

    /// Current relay state, without touching the pending command
    pub async fn relay_state(&self) -> RelayState {
        self.coordinator.lock().await.relay_state()
    }
}

impl Default for RelayDispatcher {
    fn default() -> Self {
        Self::new(Duration::from_millis(smartmeter_shared::timing::COMMAND_TIMEOUT_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_command_then_confirmation() {
        let dispatcher = RelayDispatcher::default();

        let snapshot = dispatcher.issue_command(RelayState::On).await;
        assert_eq!(snapshot.command(), Some(RelayState::On));

        let polled = dispatcher.poll_pending().await;
        assert_eq!(polled.command(), Some(RelayState::On));
        assert_eq!(polled.relay_state, RelayState::On);

        let report = dispatcher.report_status(RelayState::On).await;
        assert!(report.confirmed.is_some());

        let polled = dispatcher.poll_pending().await;
        assert_eq!(polled.command(), None);
        assert_eq!(dispatcher.relay_state().await, RelayState::On);
    }

    #[tokio::test]
    async fn test_command_expires_on_poll() {
        let dispatcher = RelayDispatcher::new(Duration::from_millis(10));
        dispatcher.issue_command(RelayState::On).await;

        tokio::time::sleep(Duration::from_millis(30)).await;

        let polled = dispatcher.poll_pending().await;
        assert_eq!(polled.command(), None);
        assert_eq!(polled.relay_state, RelayState::On);
    }

    #[tokio::test]
    async fn test_concurrent_commands_stay_consistent() {
        let dispatcher = Arc::new(RelayDispatcher::default());
        let mut tasks = Vec::new();

        for i in 0..50 {
            let dispatcher = dispatcher.clone();
            tasks.push(tokio::spawn(async move {
                let target = if i % 2 == 0 { RelayState::On } else { RelayState::Off };
                dispatcher.issue_command(target).await;
                dispatcher.poll_pending().await
            }));
        }

        for task in tasks {
            let snapshot = task.await.unwrap();
            // With only commands in flight the state always matches the pending target
            assert_eq!(snapshot.command(), Some(snapshot.relay_state));
        }
    }

    #[tokio::test]
    async fn test_concurrent_mixed_operations_stay_consistent() {
        let dispatcher = Arc::new(RelayDispatcher::default());
        let mut issues = Vec::new();
        let mut reports = Vec::new();
        let mut polls = Vec::new();

        for i in 0..60 {
            let dispatcher = dispatcher.clone();
            let state = if i % 4 < 2 { RelayState::On } else { RelayState::Off };
            match i % 3 {
                0 => issues.push(tokio::spawn(async move {
                    dispatcher.issue_command(state).await
                })),
                1 => reports.push(tokio::spawn(async move {
                    (state, dispatcher.report_status(state).await)
                })),
                _ => polls.push(tokio::spawn(async move {
                    dispatcher.poll_pending().await
                })),
            }
        }

        let issued = issues.len();
        for task in issues {
            let snapshot = task.await.unwrap();
            // Nothing runs between setting the state and queueing the command
            assert_eq!(snapshot.command(), Some(snapshot.relay_state));
        }

        let mut confirmed = 0;
        for task in reports {
            let (reported, report) = task.await.unwrap();
            assert_eq!(report.relay_state, reported);
            if let Some(cmd) = report.confirmed {
                assert_eq!(cmd.target, reported);
                confirmed += 1;
            }
        }
        assert!(confirmed <= issued);

        let now = now_ms();
        for task in polls {
            let snapshot = task.await.unwrap();
            if let Some(cmd) = snapshot.pending {
                // A polled command is never already past its timeout
                assert!(!cmd.is_expired(now, smartmeter_shared::timing::COMMAND_TIMEOUT_MS));
            }
        }

        // Whatever is left pending is cleared by a matching report
        let last = dispatcher.poll_pending().await;
        if let Some(target) = last.command() {
            assert!(dispatcher.report_status(target).await.confirmed.is_some());
        }
        assert_eq!(dispatcher.poll_pending().await.command(), None);
    }
}
