//! Relay Coordinator
//!
//! Reconciles operator-issued relay commands with the status reported by the
//! polling device. The device cannot be pushed to, so a command stays pending
//! until either a matching status report confirms it or it ages past the
//! timeout. Expiry is evaluated when the pending command is next polled;
//! there is no background timer.
//!
//! All operations take the current time explicitly so callers decide the
//! clock and tests can drive it deterministically.

use crate::timing;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Last known (or optimistically assumed) physical state of the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayState {
    On,
    #[default]
    Off,
}

impl RelayState {
    /// Normalize a wire token. Only the exact token `"on"` means ON.
    pub fn from_token(token: &str) -> Self {
        if token == "on" {
            RelayState::On
        } else {
            RelayState::Off
        }
    }

    /// Lower-case wire token
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayState::On => "on",
            RelayState::Off => "off",
        }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command the device has not yet confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCommand {
    pub target: RelayState,
    pub issued_at_ms: u64,
}

impl PendingCommand {
    /// Milliseconds since the command was issued
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.issued_at_ms)
    }

    /// A command is expired once its age strictly exceeds the timeout
    pub fn is_expired(&self, now_ms: u64, timeout_ms: u64) -> bool {
        self.age_ms(now_ms) > timeout_ms
    }
}

/// Consistent view of both coordinator fields taken under one borrow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySnapshot {
    pub relay_state: RelayState,
    pub pending: Option<PendingCommand>,
}

impl RelaySnapshot {
    /// Target of the outstanding command, if any
    pub fn command(&self) -> Option<RelayState> {
        self.pending.map(|p| p.target)
    }
}

/// Result of a status report from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub previous: RelayState,
    pub relay_state: RelayState,
    /// The pending command this report confirmed, if it matched one
    pub confirmed: Option<PendingCommand>,
}

/// Result of a device poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollResult {
    pub snapshot: RelaySnapshot,
    /// The pending command that was found expired and cleared by this poll
    pub expired: Option<PendingCommand>,
}

/// Authoritative relay state plus at most one outstanding command
#[derive(Debug, Clone)]
pub struct RelayCoordinator {
    relay_state: RelayState,
    pending: Option<PendingCommand>,
    timeout_ms: u64,
}

impl Default for RelayCoordinator {
    fn default() -> Self {
        Self::new(timing::COMMAND_TIMEOUT_MS)
    }
}

impl RelayCoordinator {
    /// Create a coordinator with the relay OFF and nothing pending
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            relay_state: RelayState::Off,
            pending: None,
            timeout_ms,
        }
    }

    /// Current relay state
    pub fn relay_state(&self) -> RelayState {
        self.relay_state
    }

    /// Configured command timeout
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Both fields as they are right now, without evaluating expiry
    pub fn snapshot(&self) -> RelaySnapshot {
        RelaySnapshot {
            relay_state: self.relay_state,
            pending: self.pending,
        }
    }

    /// Record `target` as the outstanding command and assume the relay follows it.
    ///
    /// Reissuing a command overwrites any previous one and restarts its clock.
    pub fn issue_command(&mut self, target: RelayState, now_ms: u64) -> RelaySnapshot {
        self.pending = Some(PendingCommand {
            target,
            issued_at_ms: now_ms,
        });
        // Optimistic: the dashboard sees the requested state before the device acts
        self.relay_state = target;
        self.snapshot()
    }

    /// Apply a status reported by the device.
    ///
    /// The relay state always follows the report. The pending command is only
    /// cleared when the report matches its target.
    pub fn report_status(&mut self, reported: RelayState) -> StatusReport {
        let previous = self.relay_state;
        self.relay_state = reported;

        let confirmed = match self.pending {
            Some(cmd) if cmd.target == reported => self.pending.take(),
            _ => None,
        };

        StatusReport {
            previous,
            relay_state: self.relay_state,
            confirmed,
        }
    }

    /// Expire a stale command, then return what the device should see
    pub fn poll_pending(&mut self, now_ms: u64) -> PollResult {
        let expired = match self.pending {
            Some(cmd) if cmd.is_expired(now_ms, self.timeout_ms) => self.pending.take(),
            _ => None,
        };

        PollResult {
            snapshot: self.snapshot(),
            expired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000_000;
    const TIMEOUT: u64 = timing::COMMAND_TIMEOUT_MS;

    #[test]
    fn test_initial_state() {
        let mut relay = RelayCoordinator::default();
        let poll = relay.poll_pending(T0);
        assert_eq!(poll.snapshot.relay_state, RelayState::Off);
        assert_eq!(poll.snapshot.pending, None);
        assert_eq!(poll.expired, None);
    }

    #[test]
    fn test_token_normalization() {
        assert_eq!(RelayState::from_token("on"), RelayState::On);
        assert_eq!(RelayState::from_token("off"), RelayState::Off);
        assert_eq!(RelayState::from_token("ON"), RelayState::Off);
        assert_eq!(RelayState::from_token("banana"), RelayState::Off);
        assert_eq!(RelayState::On.to_string(), "on");
    }

    #[test]
    fn test_issue_then_poll_returns_command() {
        let mut relay = RelayCoordinator::default();
        relay.issue_command(RelayState::On, T0);

        let poll = relay.poll_pending(T0 + 1_000);
        assert_eq!(poll.snapshot.command(), Some(RelayState::On));
        assert_eq!(poll.snapshot.relay_state, RelayState::On);
    }

    #[test]
    fn test_matching_report_clears_command() {
        let mut relay = RelayCoordinator::default();
        relay.issue_command(RelayState::Off, T0);

        let report = relay.report_status(RelayState::Off);
        assert_eq!(report.confirmed.map(|c| c.target), Some(RelayState::Off));

        let poll = relay.poll_pending(T0 + 2_000);
        assert_eq!(poll.snapshot.pending, None);
        assert_eq!(poll.snapshot.relay_state, RelayState::Off);
    }

    #[test]
    fn test_mismatched_report_keeps_command() {
        let mut relay = RelayCoordinator::default();
        relay.issue_command(RelayState::On, T0);

        let report = relay.report_status(RelayState::Off);
        assert_eq!(report.previous, RelayState::On);
        assert_eq!(report.confirmed, None);

        let poll = relay.poll_pending(T0 + 2_000);
        assert_eq!(poll.snapshot.command(), Some(RelayState::On));
        assert_eq!(poll.snapshot.relay_state, RelayState::Off);
    }

    #[test]
    fn test_report_without_pending_updates_state() {
        let mut relay = RelayCoordinator::default();
        let report = relay.report_status(RelayState::On);
        assert_eq!(report.relay_state, RelayState::On);
        assert_eq!(report.confirmed, None);
        assert_eq!(relay.relay_state(), RelayState::On);
    }

    #[test]
    fn test_command_expires_on_poll() {
        let mut relay = RelayCoordinator::default();
        relay.issue_command(RelayState::On, T0);

        // Exactly at the deadline the command is still pending
        let poll = relay.poll_pending(T0 + TIMEOUT);
        assert_eq!(poll.snapshot.command(), Some(RelayState::On));
        assert_eq!(poll.expired, None);

        let poll = relay.poll_pending(T0 + TIMEOUT + 1);
        assert_eq!(poll.snapshot.pending, None);
        assert_eq!(poll.expired.map(|c| c.target), Some(RelayState::On));
        // Expiry does not roll back the optimistic state
        assert_eq!(poll.snapshot.relay_state, RelayState::On);
    }

    #[test]
    fn test_expiry_regardless_of_mismatched_reports() {
        let mut relay = RelayCoordinator::default();
        relay.issue_command(RelayState::On, T0);
        relay.report_status(RelayState::Off);
        relay.report_status(RelayState::Off);

        let poll = relay.poll_pending(T0 + TIMEOUT + 1);
        assert_eq!(poll.snapshot.pending, None);
        assert_eq!(poll.snapshot.relay_state, RelayState::Off);
    }

    #[test]
    fn test_reissue_resets_clock() {
        let mut relay = RelayCoordinator::default();
        let first = relay.issue_command(RelayState::On, T0);
        let second = relay.issue_command(RelayState::On, T0 + 20_000);

        assert_eq!(first.relay_state, second.relay_state);
        assert_eq!(first.command(), second.command());
        assert_eq!(second.pending.map(|p| p.issued_at_ms), Some(T0 + 20_000));

        // Past the first deadline but inside the second
        let poll = relay.poll_pending(T0 + TIMEOUT + 1);
        assert_eq!(poll.snapshot.command(), Some(RelayState::On));
    }

    #[test]
    fn test_last_writer_wins() {
        let mut relay = RelayCoordinator::default();
        relay.issue_command(RelayState::On, T0);
        relay.issue_command(RelayState::Off, T0 + 100);

        // A late confirmation of the overwritten command does not clear the new one
        let report = relay.report_status(RelayState::On);
        assert_eq!(report.confirmed, None);

        let poll = relay.poll_pending(T0 + 200);
        assert_eq!(poll.snapshot.command(), Some(RelayState::Off));
        assert_eq!(poll.snapshot.relay_state, RelayState::On);
    }

    #[test]
    fn test_dashboard_device_round_trip() {
        let mut relay = RelayCoordinator::default();
        assert_eq!(relay.snapshot().relay_state, RelayState::Off);

        let issued = relay.issue_command(RelayState::On, T0);
        assert_eq!(issued.relay_state, RelayState::On);
        assert_eq!(
            issued.pending,
            Some(PendingCommand {
                target: RelayState::On,
                issued_at_ms: T0
            })
        );

        let poll = relay.poll_pending(T0 + 5_000);
        assert_eq!(poll.snapshot.command(), Some(RelayState::On));
        assert_eq!(poll.snapshot.relay_state, RelayState::On);

        let report = relay.report_status(RelayState::On);
        assert_eq!(report.relay_state, RelayState::On);
        assert!(report.confirmed.is_some());

        let poll = relay.poll_pending(T0 + 7_000);
        assert_eq!(poll.snapshot.command(), None);
        assert_eq!(poll.snapshot.relay_state, RelayState::On);
    }

    #[test]
    fn test_custom_timeout() {
        let mut relay = RelayCoordinator::new(500);
        assert_eq!(relay.timeout_ms(), 500);
        relay.issue_command(RelayState::On, T0);
        assert!(relay.poll_pending(T0 + 501).expired.is_some());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Issue(RelayState),
            Report(RelayState),
            Poll,
        }

        fn state() -> impl Strategy<Value = RelayState> {
            prop_oneof![Just(RelayState::On), Just(RelayState::Off)]
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                state().prop_map(Op::Issue),
                state().prop_map(Op::Report),
                Just(Op::Poll),
            ]
        }

        proptest! {
            #[test]
            fn poll_never_returns_stale_command(
                steps in proptest::collection::vec((op(), 0u64..20_000), 1..64)
            ) {
                let mut relay = RelayCoordinator::default();
                let mut now = T0;
                let mut last_written = RelayState::Off;

                for (op, dt) in steps {
                    now += dt;
                    match op {
                        Op::Issue(target) => {
                            let snap = relay.issue_command(target, now);
                            prop_assert_eq!(snap.command(), Some(target));
                            last_written = target;
                        }
                        Op::Report(reported) => {
                            let before = relay.snapshot().pending;
                            let report = relay.report_status(reported);
                            match before {
                                Some(cmd) if cmd.target == reported => {
                                    prop_assert_eq!(report.confirmed, Some(cmd));
                                    prop_assert_eq!(relay.snapshot().pending, None);
                                }
                                _ => {
                                    prop_assert_eq!(relay.snapshot().pending, before);
                                }
                            }
                            last_written = reported;
                        }
                        Op::Poll => {
                            let poll = relay.poll_pending(now);
                            if let Some(cmd) = poll.snapshot.pending {
                                prop_assert!(cmd.age_ms(now) <= TIMEOUT);
                            }
                        }
                    }
                    prop_assert_eq!(relay.relay_state(), last_written);
                }
            }
        }
    }
}
