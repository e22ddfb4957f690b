//! Countdown display driven by a cancellable repeating task.
//!
//! Time, timers and the button are all behind small traits so the tick logic
//! can run natively without a browser.

use crate::remaining_secs;
use crate::utils::wait_label;
use gloo_timers::callback::Interval;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use web_sys::HtmlButtonElement;

/// Wall-clock source in epoch milliseconds.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserClock;

impl Clock for BrowserClock {
    fn now_ms(&self) -> u64 {
        let now = js_sys::Date::now();
        if now.is_finite() && now > 0.0 {
            now as u64
        } else {
            0
        }
    }
}

/// Starts periodic callbacks. Dropping the returned handle stops them.
pub trait Scheduler {
    type Handle;

    fn every(&self, period_ms: u32, callback: Box<dyn FnMut()>) -> Self::Handle;
}

/// `setInterval` through gloo; the `Interval` clears itself on drop.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalScheduler;

impl Scheduler for IntervalScheduler {
    type Handle = Interval;

    fn every(&self, period_ms: u32, callback: Box<dyn FnMut()>) -> Interval {
        Interval::new(period_ms, callback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskControl {
    Continue,
    Stop,
}

/// A periodic callback with at most one live instance.
///
/// `start` cancels whatever was running before, and a tick that returns
/// [`TaskControl::Stop`] cancels its own timer.
pub struct RepeatingTask<S: Scheduler> {
    scheduler: S,
    handle: Rc<RefCell<Option<S::Handle>>>,
}

impl<S> RepeatingTask<S>
where
    S: Scheduler,
    S::Handle: 'static,
{
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            handle: Rc::new(RefCell::new(None)),
        }
    }

    pub fn start<F>(&self, period_ms: u32, mut tick: F)
    where
        F: FnMut() -> TaskControl + 'static,
    {
        self.cancel();

        // Weak so the timer callback does not keep its own handle alive
        let slot: Weak<RefCell<Option<S::Handle>>> = Rc::downgrade(&self.handle);
        let handle = self.scheduler.every(
            period_ms,
            Box::new(move || {
                if tick() == TaskControl::Stop {
                    if let Some(slot) = slot.upgrade() {
                        let finished = slot.borrow_mut().take();
                        drop(finished);
                    }
                }
            }),
        );
        *self.handle.borrow_mut() = Some(handle);
    }

    pub fn cancel(&self) {
        let previous = self.handle.borrow_mut().take();
        drop(previous);
    }

    pub fn is_active(&self) -> bool {
        self.handle.borrow().is_some()
    }
}

/// The element a cooldown disables and relabels.
pub trait CooldownControl {
    fn set_disabled(&self, disabled: bool);
    fn set_label(&self, label: &str);
    fn label(&self) -> String;
}

impl CooldownControl for HtmlButtonElement {
    fn set_disabled(&self, disabled: bool) {
        HtmlButtonElement::set_disabled(self, disabled);
    }

    fn set_label(&self, label: &str) {
        self.set_text_content(Some(label));
    }

    fn label(&self) -> String {
        self.text_content().unwrap_or_default()
    }
}

/// One running cooldown display for a single control.
pub struct Countdown<C, K> {
    control: C,
    clock: K,
    until: u64,
    idle_label: String,
}

impl<C: CooldownControl, K: Clock> Countdown<C, K> {
    pub fn new(control: C, clock: K, until: u64, idle_label: impl Into<String>) -> Self {
        Self {
            control,
            clock,
            until,
            idle_label: idle_label.into(),
        }
    }

    /// Refresh the label from the current time.
    ///
    /// Re-enables the control and restores its idle label once the cooldown
    /// has run out, returning [`TaskControl::Stop`].
    pub fn update(&self) -> TaskControl {
        let remaining = remaining_secs(self.until, self.clock.now_ms());
        if remaining <= 0 {
            self.control.set_disabled(false);
            self.control.set_label(&self.idle_label);
            return TaskControl::Stop;
        }
        self.control.set_label(&wait_label(remaining));
        TaskControl::Continue
    }
}
