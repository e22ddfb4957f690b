//! Browser-free stand-ins used by unit tests.

use crate::countdown::{Clock, CooldownControl, Scheduler};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Clone)]
pub struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self(Rc::new(Cell::new(now)))
    }

    pub fn set(&self, now: u64) {
        self.0.set(now);
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

type Callback = Rc<RefCell<Box<dyn FnMut()>>>;

struct Entry {
    alive: Rc<Cell<bool>>,
    callback: Callback,
}

/// Records periodic callbacks; `fire` runs one tick of every live one.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    entries: Rc<RefCell<Vec<Entry>>>,
}

pub struct ManualHandle {
    alive: Rc<Cell<bool>>,
}

impl Drop for ManualHandle {
    fn drop(&mut self) {
        self.alive.set(false);
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        let live: Vec<(Rc<Cell<bool>>, Callback)> = self
            .entries
            .borrow()
            .iter()
            .filter(|e| e.alive.get())
            .map(|e| (Rc::clone(&e.alive), Rc::clone(&e.callback)))
            .collect();
        for (alive, callback) in live {
            // an earlier callback in this round may have cancelled this one
            if alive.get() {
                let mut tick = callback.borrow_mut();
                (*tick)();
            }
        }
    }

    pub fn live(&self) -> usize {
        self.entries.borrow().iter().filter(|e| e.alive.get()).count()
    }
}

impl Scheduler for ManualScheduler {
    type Handle = ManualHandle;

    fn every(&self, _period_ms: u32, callback: Box<dyn FnMut()>) -> ManualHandle {
        let alive = Rc::new(Cell::new(true));
        self.entries.borrow_mut().push(Entry {
            alive: Rc::clone(&alive),
            callback: Rc::new(RefCell::new(callback)),
        });
        ManualHandle { alive }
    }
}

struct ControlState {
    disabled: bool,
    label: String,
}

#[derive(Clone)]
pub struct FakeControl(Rc<RefCell<ControlState>>);

impl FakeControl {
    pub fn new(label: &str) -> Self {
        Self(Rc::new(RefCell::new(ControlState {
            disabled: false,
            label: label.to_string(),
        })))
    }

    pub fn is_disabled(&self) -> bool {
        self.0.borrow().disabled
    }
}

impl CooldownControl for FakeControl {
    fn set_disabled(&self, disabled: bool) {
        self.0.borrow_mut().disabled = disabled;
    }

    fn set_label(&self, label: &str) {
        self.0.borrow_mut().label = label.to_string();
    }

    fn label(&self) -> String {
        self.0.borrow().label.clone()
    }
}
