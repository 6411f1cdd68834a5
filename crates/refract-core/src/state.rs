use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

/// Positional storage backing `use_state`. Slots are assigned by call
/// order: the Nth hook call of a pass always reads the Nth slot, so
/// hooks must run the same number of times and in the same order on
/// every pass. Values persist across passes; only the cursor resets.
#[derive(Default)]
pub(crate) struct SlotTable {
    slots: Vec<Rc<dyn Any>>,
    cursor: usize,
    previous_count: Option<usize>,
}

impl SlotTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin_pass(&mut self) {
        self.cursor = 0;
    }

    /// Ends a pass, reporting `(hook count of the previous pass, hook
    /// count of this one)` so the caller can enforce call-order
    /// stability.
    pub(crate) fn end_pass(&mut self) -> (Option<usize>, usize) {
        let observed = self.cursor;
        let previous = self.previous_count.replace(observed);
        (previous, observed)
    }

    /// Claims the next slot, seeding it on first use, and returns the
    /// slot index together with the stored value.
    pub(crate) fn claim(&mut self, seed: impl FnOnce() -> Rc<dyn Any>) -> (usize, Rc<dyn Any>) {
        let index = self.cursor;
        self.cursor += 1;
        if index == self.slots.len() {
            self.slots.push(seed());
        }
        (index, self.slots[index].clone())
    }

    pub(crate) fn write(&mut self, index: usize, value: Rc<dyn Any>) {
        self.slots[index] = value;
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Renderer-facing half of the setter path, implemented by the render
/// session. Type-erases the host parameter so `Setter` stays a plain
/// value type that callbacks can capture.
pub(crate) trait Driver {
    fn apply_set(&self, slot: usize, value: Rc<dyn Any>);
}

/// Hook interface handed to component functions for the duration of
/// one render pass. Only the renderer can construct it, and it cannot
/// outlive the pass, which is what confines hook calls to component
/// execution.
pub struct Scope<'a> {
    slots: &'a RefCell<SlotTable>,
    driver: Weak<dyn Driver>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(slots: &'a RefCell<SlotTable>, driver: Weak<dyn Driver>) -> Self {
        Self { slots, driver }
    }

    /// Reads the state slot at the current cursor position (seeding it
    /// with `initial` on first use), advances the cursor, and returns
    /// the current value with a setter targeting the same slot.
    ///
    /// A slot that holds a different type than requested means the
    /// hook order drifted since the slot was seeded; the stale value
    /// cannot be reinterpreted, so this panics with a diagnostic.
    pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, Setter<T>) {
        let (index, value) = self
            .slots
            .borrow_mut()
            .claim(|| Rc::new(initial) as Rc<dyn Any>);
        let current = match value.downcast_ref::<T>() {
            Some(current) => current.clone(),
            None => panic!(
                "state slot {index} does not hold a {}; hooks must run in the same order on every render pass",
                std::any::type_name::<T>()
            ),
        };
        let setter = Setter {
            slot: index,
            driver: self.driver.clone(),
            _value: PhantomData,
        };
        (current, setter)
    }
}

/// Writes a state slot and drives a full re-render. Cloneable and
/// `'static`, so event callbacks can capture it. Firing a setter whose
/// session is gone is a no-op.
pub struct Setter<T> {
    slot: usize,
    driver: Weak<dyn Driver>,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot,
            driver: self.driver.clone(),
            _value: PhantomData,
        }
    }
}

impl<T: 'static> Setter<T> {
    /// Stores `next` into the captured slot and performs a complete
    /// render pass before returning. There is no equality shortcut:
    /// setting a value equal to the current one still re-renders. If a
    /// pass is already running, the write is queued and applied after
    /// that pass commits.
    pub fn set(&self, next: T) {
        if let Some(driver) = self.driver.upgrade() {
            driver.apply_set(self.slot, Rc::new(next));
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter").field("slot", &self.slot).finish()
    }
}
