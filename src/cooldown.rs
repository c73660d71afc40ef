//! Quota cooldown countdown.
//!
//! The timer itself is pure: it only counts. The workflow controller owns the
//! one-second ticker that drives it and drops that ticker whenever the
//! countdown is cancelled or expires, so a stale tick can never reach it.

use crate::model::CooldownState;

/// Result of advancing the countdown by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The timer was not running; nothing changed.
    Idle,
    Running { remaining: u32 },
    /// The countdown just reached zero.
    Expired,
}

#[derive(Debug, Clone, Default)]
pub struct CooldownTimer {
    remaining: u32,
}

impl CooldownTimer {
    /// (Re)start the countdown, replacing any countdown in progress.
    /// A zero duration leaves the timer inactive.
    pub fn start(&mut self, duration_secs: u32) {
        self.remaining = duration_secs;
    }

    pub fn tick(&mut self) -> Tick {
        match self.remaining {
            0 => Tick::Idle,
            1 => {
                self.cancel();
                Tick::Expired
            }
            n => {
                self.remaining = n - 1;
                Tick::Running {
                    remaining: self.remaining,
                }
            }
        }
    }

    pub fn cancel(&mut self) {
        self.remaining = 0;
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    pub fn state(&self) -> CooldownState {
        CooldownState {
            active: self.is_active(),
            remaining_seconds: self.remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_by_one_and_expires_at_zero() {
        let mut t = CooldownTimer::default();
        t.start(3);
        assert_eq!(t.tick(), Tick::Running { remaining: 2 });
        assert_eq!(t.tick(), Tick::Running { remaining: 1 });
        assert!(t.state().active);
        assert_eq!(t.tick(), Tick::Expired);
        assert_eq!(
            t.state(),
            CooldownState {
                active: false,
                remaining_seconds: 0
            }
        );
    }

    #[test]
    fn tick_while_inactive_is_noop() {
        let mut t = CooldownTimer::default();
        assert_eq!(t.tick(), Tick::Idle);
        assert_eq!(t.state(), CooldownState::default());
    }

    #[test]
    fn restart_overrides_instead_of_stacking() {
        let mut t = CooldownTimer::default();
        t.start(60);
        for _ in 0..30 {
            t.tick();
        }
        t.start(60);
        assert_eq!(t.state().remaining_seconds, 60);
    }

    #[test]
    fn remaining_zero_implies_inactive_for_every_step() {
        let mut t = CooldownTimer::default();
        t.start(60);
        let mut prev = t.state().remaining_seconds;
        for _ in 0..70 {
            t.tick();
            let s = t.state();
            assert_eq!(s.remaining_seconds, prev.saturating_sub(1));
            assert_eq!(s.active, s.remaining_seconds > 0);
            prev = s.remaining_seconds;
        }
    }
}
