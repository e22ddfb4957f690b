//! Per-form cooldown controller.
//!
//! One controller is built per page for the single form it guards. It owns
//! its store, clock, timer and control; nothing lives in globals.

use crate::config::{DEFAULT_LABEL, TICK_MS};
use crate::countdown::{Clock, CooldownControl, Countdown, RepeatingTask, Scheduler, TaskControl};
use crate::storage::{load_state, save_state, KeyValueStore};
use crate::utils::CooldownKeys;
use crate::{CooldownPolicy, CooldownSnapshot, CooldownState, Submission};
use log::debug;

pub struct CooldownController<S, K, Sch, C>
where
    Sch: Scheduler,
{
    store: S,
    clock: K,
    policy: CooldownPolicy,
    keys: CooldownKeys,
    control: C,
    idle_label: String,
    task: RepeatingTask<Sch>,
}

impl<S, K, Sch, C> CooldownController<S, K, Sch, C>
where
    S: KeyValueStore,
    K: Clock + Clone + 'static,
    Sch: Scheduler,
    Sch::Handle: 'static,
    C: CooldownControl + Clone + 'static,
{
    /// Capture the control's current label as the one to restore after
    /// each cooldown.
    pub fn new(
        store: S,
        clock: K,
        scheduler: Sch,
        policy: CooldownPolicy,
        keys: CooldownKeys,
        control: C,
    ) -> Self {
        let label = control.label();
        let idle_label = if label.trim().is_empty() {
            DEFAULT_LABEL.to_string()
        } else {
            label
        };
        Self {
            store,
            clock,
            policy,
            keys,
            control,
            idle_label,
            task: RepeatingTask::new(scheduler),
        }
    }

    pub fn state(&self) -> CooldownState {
        load_state(&self.store, &self.keys)
    }

    pub fn snapshot(&self) -> CooldownSnapshot {
        CooldownSnapshot::new(&self.policy, self.state(), self.clock.now_ms())
    }

    /// Resume the countdown if the page was reloaded mid-cooldown.
    pub fn on_page_load(&self) {
        let until = self.state().until;
        if until > self.clock.now_ms() {
            debug!("Resuming cooldown for {}", self.keys.until);
            self.render_countdown(until);
        }
    }

    /// Record a submission and start its cooldown.
    ///
    /// The submission itself is never cancelled; disabling the control is the
    /// only friction applied.
    pub fn on_submit(&self) -> Submission {
        let now = self.clock.now_ms();
        let submission = self.policy.register_submission(self.state(), now);
        if submission.reset {
            debug!("Idle threshold passed, attempts reset for {}", self.keys.attempts);
        }
        save_state(&self.store, &self.keys, &submission.state);

        debug!(
            "Cooldown {}s after attempt {}",
            submission.wait_secs, submission.state.attempts
        );
        self.render_countdown(submission.state.until);
        submission
    }

    /// Disable the control and count down once per tick until `until`.
    ///
    /// Any countdown already running is cancelled first. An already expired
    /// `until` re-enables the control without starting a timer.
    pub fn render_countdown(&self, until: u64) {
        self.task.cancel();
        self.control.set_disabled(true);

        let countdown = Countdown::new(
            self.control.clone(),
            self.clock.clone(),
            until,
            self.idle_label.clone(),
        );
        if countdown.update() == TaskControl::Stop {
            return;
        }
        self.task.start(TICK_MS, move || {
            let step = countdown.update();
            if step == TaskControl::Stop {
                debug!("Cooldown finished");
            }
            step
        });
    }

    pub fn is_counting_down(&self) -> bool {
        self.task.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RESET_THRESHOLD_MS;
    use crate::remaining_secs;
    use crate::storage::MemoryStore;
    use crate::testing::{FakeControl, ManualClock, ManualScheduler};

    type TestController = CooldownController<MemoryStore, ManualClock, ManualScheduler, FakeControl>;

    struct Harness {
        controller: TestController,
        clock: ManualClock,
        scheduler: ManualScheduler,
        control: FakeControl,
        keys: CooldownKeys,
    }

    fn harness(now: u64, seed: &[(&str, &str)]) -> Harness {
        let keys = CooldownKeys::new("/challenge/1", "http://localhost/challenge/1");
        let store = MemoryStore::new();
        for (suffix, value) in seed {
            let key = if *suffix == "attempts" {
                &keys.attempts
            } else {
                &keys.until
            };
            store.set(key, value);
        }
        let clock = ManualClock::new(now);
        let scheduler = ManualScheduler::new();
        let control = FakeControl::new("Submit");
        let controller = CooldownController::new(
            store,
            clock.clone(),
            scheduler.clone(),
            CooldownPolicy::default(),
            keys.clone(),
            control.clone(),
        );
        Harness {
            controller,
            clock,
            scheduler,
            control,
            keys,
        }
    }

    /// Advance one tick and fire the timer.
    fn tick(h: &Harness) {
        h.clock.advance(u64::from(TICK_MS));
        h.scheduler.fire();
    }

    #[test]
    fn fresh_state_single_submit() {
        let h = harness(0, &[]);
        let sub = h.controller.on_submit();

        assert_eq!(sub.wait_secs, 30);
        assert_eq!(
            h.controller.state(),
            CooldownState {
                attempts: 1,
                until: 30_000
            }
        );
        assert!(h.control.is_disabled());
        assert_eq!(h.control.label(), "Wait 30s");

        for expected in (1..30).rev() {
            tick(&h);
            assert_eq!(h.control.label(), format!("Wait {}s", expected));
            assert!(h.control.is_disabled());
        }

        tick(&h);
        assert_eq!(h.clock.now_ms(), 30_000);
        assert!(!h.control.is_disabled());
        assert_eq!(h.control.label(), "Submit");
        assert!(!h.controller.is_counting_down());
        assert_eq!(h.scheduler.live(), 0);
    }

    #[test]
    fn second_attempt_within_threshold() {
        let now = 1_000_000_000;
        let until = (now - 10_000).to_string();
        let h = harness(now, &[("attempts", "1"), ("until", until.as_str())]);

        let sub = h.controller.on_submit();
        assert!(!sub.reset);
        assert_eq!(sub.wait_secs, 60);
        assert_eq!(h.controller.state().attempts, 2);
        assert_eq!(h.control.label(), "Wait 60s");
    }

    #[test]
    fn long_idle_resets_attempts() {
        let now = 1_000_000_000;
        let until = (now - 7_200_000).to_string();
        let h = harness(now, &[("attempts", "3"), ("until", until.as_str())]);

        let sub = h.controller.on_submit();
        assert!(sub.reset);
        assert_eq!(sub.wait_secs, 30);
        assert_eq!(h.controller.state().attempts, 1);
    }

    #[test]
    fn idle_exactly_at_threshold_keeps_attempts() {
        let now = 1_000_000_000;
        let until = (now - RESET_THRESHOLD_MS).to_string();
        let h = harness(now, &[("attempts", "2"), ("until", until.as_str())]);

        let sub = h.controller.on_submit();
        assert!(!sub.reset);
        assert_eq!(sub.wait_secs, 180);
        assert_eq!(h.controller.state().attempts, 3);
    }

    #[test]
    fn attempts_beyond_schedule_clamp() {
        let now = 1_000_000_000;
        let until = (now - 5_000).to_string();
        let h = harness(now, &[("attempts", "10"), ("until", until.as_str())]);

        let sub = h.controller.on_submit();
        assert_eq!(sub.wait_secs, 300);
        assert_eq!(h.controller.state().attempts, 11);
        assert_eq!(h.controller.state().until, now + 300_000);
    }

    #[test]
    fn reload_mid_cooldown_resumes() {
        let now = 5_000_000;
        let until = now + 4_200;
        let stored = until.to_string();
        let h = harness(now, &[("attempts", "1"), ("until", stored.as_str())]);

        h.controller.on_page_load();
        assert!(h.control.is_disabled());
        assert_eq!(h.control.label(), "Wait 5s");
        assert_eq!(
            h.control.label(),
            format!("Wait {}s", remaining_secs(until, now))
        );

        for expected in [4, 3, 2, 1] {
            tick(&h);
            assert_eq!(h.control.label(), format!("Wait {}s", expected));
        }
        tick(&h);
        assert!(!h.control.is_disabled());
        assert_eq!(h.control.label(), "Submit");
        assert!(!h.controller.is_counting_down());
    }

    #[test]
    fn reload_after_expiry_does_nothing() {
        let now = 5_000_000;
        let until = (now - 1).to_string();
        let h = harness(now, &[("attempts", "2"), ("until", until.as_str())]);

        h.controller.on_page_load();
        assert!(!h.control.is_disabled());
        assert_eq!(h.control.label(), "Submit");
        assert_eq!(h.scheduler.live(), 0);
    }

    #[test]
    fn malformed_storage_reads_as_fresh() {
        let h = harness(0, &[("attempts", "abc"), ("until", "soon")]);
        h.controller.on_page_load();
        assert!(!h.control.is_disabled());

        let sub = h.controller.on_submit();
        assert_eq!(sub.wait_secs, 30);
        assert_eq!(h.controller.state().attempts, 1);
    }

    #[test]
    fn expired_until_enables_without_timer() {
        let h = harness(10_000, &[]);
        h.control.set_disabled(true);
        h.control.set_label("stale");

        h.controller.render_countdown(10_000);
        assert!(!h.control.is_disabled());
        assert_eq!(h.control.label(), "Submit");
        assert!(!h.controller.is_counting_down());
        assert_eq!(h.scheduler.live(), 0);
    }

    #[test]
    fn reentry_keeps_single_timer() {
        let h = harness(0, &[]);
        h.controller.on_submit();
        h.controller.on_submit();
        h.controller.on_submit();

        assert_eq!(h.scheduler.live(), 1);
        assert_eq!(h.controller.state().attempts, 3);
        assert_eq!(h.control.label(), "Wait 180s");

        tick(&h);
        assert_eq!(h.control.label(), "Wait 179s");
    }

    #[test]
    fn custom_label_is_restored() {
        let keys = CooldownKeys::new("/", "/send");
        let control = FakeControl::new("Send flag");
        let clock = ManualClock::new(0);
        let scheduler = ManualScheduler::new();
        let controller = CooldownController::new(
            MemoryStore::new(),
            clock.clone(),
            scheduler.clone(),
            CooldownPolicy::new(vec![1], RESET_THRESHOLD_MS).unwrap(),
            keys,
            control.clone(),
        );

        controller.on_submit();
        assert_eq!(control.label(), "Wait 1s");
        clock.advance(1_000);
        scheduler.fire();
        assert_eq!(control.label(), "Send flag");
    }

    #[test]
    fn blank_label_falls_back_to_default() {
        let control = FakeControl::new("   ");
        let controller = CooldownController::new(
            MemoryStore::new(),
            ManualClock::new(0),
            ManualScheduler::new(),
            CooldownPolicy::default(),
            CooldownKeys::new("/", "/"),
            control.clone(),
        );
        controller.render_countdown(0);
        assert_eq!(control.label(), DEFAULT_LABEL);
    }

    #[test]
    fn page_load_never_writes() {
        let h = harness(0, &[]);
        h.controller.on_page_load();
        assert!(h.controller.store.is_empty());
        assert!(!h.control.is_disabled());
    }

    #[test]
    fn snapshot_tracks_running_cooldown() {
        let h = harness(0, &[]);
        h.controller.on_submit();
        h.clock.set(10_000);

        let snap = h.controller.snapshot();
        assert_eq!(snap.attempts, 1);
        assert_eq!(snap.remaining_secs, 20);
        assert_eq!(snap.next_wait_secs, 60);
        assert_eq!(h.keys.until, "cooldown_/challenge/1_http://localhost/challenge/1_until");
    }
}
