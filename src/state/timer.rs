//! Pure countdown logic for the shared timer: phase transitions, the
//! compare-and-swap skip guard, and the last-write-wins ordering that lets
//! concurrent commands race without a room-level lock.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::state::room::RoomSettings;

/// Cycle stage the timer is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Work interval.
    Focus,
    /// Short recovery interval.
    Break,
    /// Long recovery interval granted every few completed cycles.
    LongBreak,
}

/// Whether the countdown is ticking, and the one field that is live for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Counting down towards an absolute deadline.
    Running {
        /// Deadline in epoch milliseconds.
        ends_at_ms: u64,
    },
    /// Frozen with a known number of seconds left.
    Paused {
        /// Seconds left on the clock.
        remaining_sec: u32,
    },
}

/// Authoritative timer state embedded in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    /// Current cycle stage.
    pub phase: Phase,
    /// Running deadline or paused remainder.
    pub mode: TimerMode,
    /// Completed focus cycles, monotonically increasing.
    pub cycle_count: u32,
    /// Logical clock of the last accepted mutation (epoch milliseconds).
    /// Monotonically non-decreasing across accepted commands.
    pub last_updated_at: u64,
}

/// Mutating command fed through the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// Resume the countdown of the current phase.
    Start,
    /// Freeze the countdown, capturing the remaining seconds.
    Pause,
    /// Rewind the current phase to its configured duration, paused.
    Reset,
    /// Advance to the next phase, paused at its configured duration.
    Skip {
        /// Optional precondition for machine-generated skips.
        guard: Option<SkipGuard>,
    },
}

/// Compare-and-swap precondition attached to a skip.
///
/// Automatic "timer hit zero" skips carry the state the client observed;
/// if the live state has diverged (a manual skip or settings change got
/// there first) the skip silently dissolves instead of double-advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipGuard {
    /// Expected phase.
    pub phase: Phase,
    /// Expected running flag.
    pub running: bool,
    /// Expected deadline, when running.
    pub phase_ends_at_ms: Option<u64>,
}

impl SkipGuard {
    fn matches(&self, timer: &TimerState) -> bool {
        let (running, ends_at) = match timer.mode {
            TimerMode::Running { ends_at_ms } => (true, Some(ends_at_ms)),
            TimerMode::Paused { .. } => (false, None),
        };
        self.phase == timer.phase && self.running == running && self.phase_ends_at_ms == ends_at
    }
}

/// Strategy deciding whether a command timestamp may supersede the stored
/// logical clock. Pluggable so the wall-clock comparison can later be
/// swapped for a server-assigned sequence without touching the machine.
pub trait OrderingPolicy: Send + Sync {
    /// True when a command stamped `command_ts` is allowed to mutate state
    /// whose clock currently reads `clock`.
    fn admits(&self, command_ts: u64, clock: u64) -> bool;
}

/// Wall-clock last-write-wins ordering.
///
/// Equal timestamps admit the command, so of two commands carrying the same
/// stamp the later-arriving one wins deterministically.
#[derive(Debug, Default, Clone, Copy)]
pub struct LastWriteWins;

impl OrderingPolicy for LastWriteWins {
    fn admits(&self, command_ts: u64, clock: u64) -> bool {
        command_ts >= clock
    }
}

/// Result of feeding one command through the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerOutcome {
    /// The command was admitted and produced a new state.
    Applied(TimerState),
    /// The command was admitted but the state already satisfied it; nothing
    /// changed, including the logical clock.
    Unchanged,
    /// The command timestamp lost against the room's logical clock.
    Stale,
    /// A skip guard did not match the live state.
    GuardRejected,
}

impl TimerState {
    /// Fresh timer for a new room: paused at the start of a full focus phase.
    /// The logical clock starts at zero since no mutation has been accepted
    /// yet, so any first command wins.
    pub fn initial(settings: &RoomSettings) -> Self {
        Self {
            phase: Phase::Focus,
            mode: TimerMode::Paused {
                remaining_sec: settings.focus_sec,
            },
            cycle_count: 0,
            last_updated_at: 0,
        }
    }

    /// Whether the countdown is currently ticking.
    pub fn running(&self) -> bool {
        matches!(self.mode, TimerMode::Running { .. })
    }

    /// Feed one command through the machine.
    ///
    /// `timestamp` is the command's action time: it serves both as the
    /// logical-clock stamp and as the time base for deadline arithmetic.
    pub fn apply(
        &self,
        command: TimerCommand,
        settings: &RoomSettings,
        timestamp: u64,
        ordering: &dyn OrderingPolicy,
    ) -> TimerOutcome {
        // The guard is a precise precondition: a mismatch means the skip
        // already happened (or was preempted) and must dissolve silently,
        // before staleness is even considered.
        if let TimerCommand::Skip { guard: Some(guard) } = &command {
            if !guard.matches(self) {
                return TimerOutcome::GuardRejected;
            }
        }

        if !ordering.admits(timestamp, self.last_updated_at) {
            return TimerOutcome::Stale;
        }

        match command {
            TimerCommand::Start => match self.mode {
                TimerMode::Running { .. } => TimerOutcome::Unchanged,
                TimerMode::Paused { remaining_sec } => TimerOutcome::Applied(Self {
                    mode: TimerMode::Running {
                        ends_at_ms: timestamp + u64::from(remaining_sec) * 1000,
                    },
                    last_updated_at: timestamp,
                    ..*self
                }),
            },
            TimerCommand::Pause => match self.mode {
                TimerMode::Paused { .. } => TimerOutcome::Unchanged,
                TimerMode::Running { ends_at_ms } => TimerOutcome::Applied(Self {
                    mode: TimerMode::Paused {
                        remaining_sec: remaining_after(ends_at_ms, timestamp),
                    },
                    last_updated_at: timestamp,
                    ..*self
                }),
            },
            TimerCommand::Reset => TimerOutcome::Applied(Self {
                mode: TimerMode::Paused {
                    remaining_sec: settings.phase_duration_sec(self.phase),
                },
                last_updated_at: timestamp,
                ..*self
            }),
            TimerCommand::Skip { .. } => {
                let (phase, cycle_count) = self.next_phase(settings);
                TimerOutcome::Applied(Self {
                    phase,
                    cycle_count,
                    mode: TimerMode::Paused {
                        remaining_sec: settings.phase_duration_sec(phase),
                    },
                    last_updated_at: timestamp,
                })
            }
        }
    }

    /// Reconcile the timer with freshly merged settings.
    ///
    /// A paused timer snaps to the new duration of its current phase so the
    /// change is visible immediately; a running timer keeps its deadline and
    /// only picks up the new durations on the next phase entry. The logical
    /// clock advances either way since the settings write was admitted.
    pub fn settings_changed(&self, settings: &RoomSettings, timestamp: u64) -> Self {
        let mode = match self.mode {
            TimerMode::Paused { .. } => TimerMode::Paused {
                remaining_sec: settings.phase_duration_sec(self.phase),
            },
            running => running,
        };
        Self {
            mode,
            last_updated_at: timestamp,
            ..*self
        }
    }

    /// Whether the deadline has been reached, within a grace window that
    /// absorbs client clock skew.
    pub fn near_deadline(&self, now_ms: u64, grace_ms: u64) -> bool {
        match self.mode {
            TimerMode::Running { ends_at_ms } => now_ms + grace_ms >= ends_at_ms,
            TimerMode::Paused { remaining_sec } => remaining_sec == 0,
        }
    }

    fn next_phase(&self, settings: &RoomSettings) -> (Phase, u32) {
        match self.phase {
            Phase::Focus => {
                let completed = self.cycle_count + 1;
                let next = if settings.long_break_every > 0
                    && completed % settings.long_break_every == 0
                {
                    Phase::LongBreak
                } else {
                    Phase::Break
                };
                (next, completed)
            }
            Phase::Break | Phase::LongBreak => (Phase::Focus, self.cycle_count),
        }
    }
}

/// Seconds left until `ends_at_ms` as seen from `now_ms`: ceiling of the
/// millisecond difference, floored at zero.
fn remaining_after(ends_at_ms: u64, now_ms: u64) -> u32 {
    ends_at_ms.saturating_sub(now_ms).div_ceil(1000) as u32
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::room::ControlMode;

    fn settings() -> RoomSettings {
        RoomSettings {
            focus_sec: 1500,
            break_sec: 300,
            long_break_sec: 900,
            long_break_every: 4,
            mode: ControlMode::Collab,
        }
    }

    fn apply(timer: &TimerState, command: TimerCommand, timestamp: u64) -> TimerState {
        match timer.apply(command, &settings(), timestamp, &LastWriteWins) {
            TimerOutcome::Applied(next) => next,
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    #[test]
    fn initial_state_is_paused_focus_at_full_duration() {
        let timer = TimerState::initial(&settings());
        assert_eq!(timer.phase, Phase::Focus);
        assert_eq!(timer.mode, TimerMode::Paused { remaining_sec: 1500 });
        assert_eq!(timer.cycle_count, 0);
    }

    #[test]
    fn start_computes_deadline_from_remaining() {
        let timer = TimerState::initial(&settings());
        let started = apply(&timer, TimerCommand::Start, 0);
        assert_eq!(
            started.mode,
            TimerMode::Running {
                ends_at_ms: 1_500_000
            }
        );
        assert_eq!(started.last_updated_at, 0);
    }

    #[test]
    fn start_while_running_changes_nothing() {
        let timer = TimerState::initial(&settings());
        let started = apply(&timer, TimerCommand::Start, 0);
        let outcome = started.apply(TimerCommand::Start, &settings(), 10_000, &LastWriteWins);
        assert_eq!(outcome, TimerOutcome::Unchanged);
    }

    #[test]
    fn pause_captures_ceiling_of_remaining_seconds() {
        let timer = TimerState::initial(&settings());
        let started = apply(&timer, TimerCommand::Start, 0);
        let paused = apply(&started, TimerCommand::Pause, 600_000);
        assert_eq!(paused.mode, TimerMode::Paused { remaining_sec: 900 });
    }

    #[test]
    fn pause_rounds_partial_seconds_up() {
        let timer = TimerState {
            phase: Phase::Focus,
            mode: TimerMode::Running { ends_at_ms: 1_500 },
            cycle_count: 0,
            last_updated_at: 0,
        };
        let paused = apply(&timer, TimerCommand::Pause, 100);
        assert_eq!(paused.mode, TimerMode::Paused { remaining_sec: 2 });
    }

    #[test]
    fn pause_past_deadline_floors_at_zero() {
        let timer = TimerState {
            phase: Phase::Focus,
            mode: TimerMode::Running { ends_at_ms: 1_000 },
            cycle_count: 0,
            last_updated_at: 0,
        };
        let paused = apply(&timer, TimerCommand::Pause, 5_000);
        assert_eq!(paused.mode, TimerMode::Paused { remaining_sec: 0 });
    }

    #[test]
    fn pause_while_paused_is_idempotent() {
        let timer = TimerState::initial(&settings());
        let outcome = timer.apply(TimerCommand::Pause, &settings(), 50_000, &LastWriteWins);
        // No mutation at all, including the logical clock.
        assert_eq!(outcome, TimerOutcome::Unchanged);
    }

    #[test]
    fn reset_restores_configured_duration_in_both_modes() {
        let timer = TimerState::initial(&settings());
        let started = apply(&timer, TimerCommand::Start, 0);
        let reset_running = apply(&started, TimerCommand::Reset, 60_000);
        assert_eq!(
            reset_running.mode,
            TimerMode::Paused { remaining_sec: 1500 }
        );
        assert_eq!(reset_running.phase, Phase::Focus);

        let paused = apply(&started, TimerCommand::Pause, 600_000);
        let reset_paused = apply(&paused, TimerCommand::Reset, 700_000);
        assert_eq!(reset_paused.mode, TimerMode::Paused { remaining_sec: 1500 });
    }

    #[test]
    fn skip_cycle_law() {
        let mut timer = TimerState::initial(&settings());
        let mut visited = Vec::new();
        for step in 1..=8 {
            timer = apply(&timer, TimerCommand::Skip { guard: None }, step * 1_000);
            visited.push((timer.phase, timer.cycle_count));
        }
        assert_eq!(
            visited,
            vec![
                (Phase::Break, 1),
                (Phase::Focus, 1),
                (Phase::Break, 2),
                (Phase::Focus, 2),
                (Phase::Break, 3),
                (Phase::Focus, 3),
                (Phase::LongBreak, 4),
                (Phase::Focus, 4),
            ]
        );
    }

    #[test]
    fn skip_lands_paused_at_new_phase_duration() {
        let timer = TimerState::initial(&settings());
        let skipped = apply(&timer, TimerCommand::Skip { guard: None }, 1_000);
        assert_eq!(skipped.phase, Phase::Break);
        assert_eq!(skipped.mode, TimerMode::Paused { remaining_sec: 300 });
    }

    #[test]
    fn skip_guard_matching_live_state_is_admitted() {
        let timer = TimerState::initial(&settings());
        let started = apply(&timer, TimerCommand::Start, 0);
        let guard = SkipGuard {
            phase: Phase::Focus,
            running: true,
            phase_ends_at_ms: Some(1_500_000),
        };
        let outcome = started.apply(
            TimerCommand::Skip { guard: Some(guard) },
            &settings(),
            1_500_500,
            &LastWriteWins,
        );
        assert!(matches!(outcome, TimerOutcome::Applied(_)));
    }

    #[test]
    fn skip_guard_mismatch_is_silently_rejected() {
        let timer = TimerState::initial(&settings());
        let started = apply(&timer, TimerCommand::Start, 0);
        // Guard built against a deadline that a concurrent reset already wiped.
        let guard = SkipGuard {
            phase: Phase::Focus,
            running: true,
            phase_ends_at_ms: Some(999_999),
        };
        let outcome = started.apply(
            TimerCommand::Skip { guard: Some(guard) },
            &settings(),
            1_500_500,
            &LastWriteWins,
        );
        assert_eq!(outcome, TimerOutcome::GuardRejected);
    }

    #[test]
    fn stale_command_is_dropped() {
        let timer = TimerState {
            phase: Phase::Focus,
            mode: TimerMode::Running { ends_at_ms: 900_000 },
            cycle_count: 0,
            last_updated_at: 500_000,
        };
        let outcome = timer.apply(TimerCommand::Pause, &settings(), 499_999, &LastWriteWins);
        assert_eq!(outcome, TimerOutcome::Stale);
    }

    #[test]
    fn equal_timestamp_is_admitted() {
        // Ties go to the later arrival: an equal stamp may still mutate.
        let timer = TimerState {
            phase: Phase::Focus,
            mode: TimerMode::Running { ends_at_ms: 900_000 },
            cycle_count: 0,
            last_updated_at: 500_000,
        };
        let outcome = timer.apply(TimerCommand::Pause, &settings(), 500_000, &LastWriteWins);
        assert!(matches!(outcome, TimerOutcome::Applied(_)));
    }

    #[test]
    fn settings_change_recomputes_paused_remainder() {
        let timer = TimerState::initial(&settings());
        let mut updated = settings();
        updated.focus_sec = 1_800;
        let reconciled = timer.settings_changed(&updated, 1_000);
        assert_eq!(reconciled.mode, TimerMode::Paused { remaining_sec: 1_800 });
        assert_eq!(reconciled.last_updated_at, 1_000);
    }

    #[test]
    fn settings_change_leaves_running_deadline_alone() {
        let timer = TimerState::initial(&settings());
        let started = apply(&timer, TimerCommand::Start, 0);
        let mut updated = settings();
        updated.focus_sec = 1_800;
        let reconciled = started.settings_changed(&updated, 1_000);
        assert_eq!(
            reconciled.mode,
            TimerMode::Running {
                ends_at_ms: 1_500_000
            }
        );
    }

    #[test]
    fn near_deadline_honours_grace_window() {
        let timer = TimerState {
            phase: Phase::Focus,
            mode: TimerMode::Running { ends_at_ms: 10_000 },
            cycle_count: 0,
            last_updated_at: 0,
        };
        assert!(timer.near_deadline(8_000, 2_000));
        assert!(timer.near_deadline(10_500, 2_000));
        assert!(!timer.near_deadline(7_999, 2_000));
    }
}
