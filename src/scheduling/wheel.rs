//! Two-tier timing wheel.
//!
//! Tier-1 ("near") holds one slot per pulse, tier-2 ("far") one slot per full tier-1
//! rotation. A cursor walks tier-1; every time it wraps, the head tier-2 slot is promoted
//! into tier-1 and the far tier shifts down by one. Both tiers are fixed-size arenas
//! indexed by cursor arithmetic, so the far shift is an O(1) head rotation rather than a
//! copy.
//!
//! The wheel itself is single-threaded. The scheduler loop owns it and is the only thing
//! that ever mutates it.
use tracing::{debug, trace, warn};

use super::task::{Entry, Slot};

/// Number of tasks resident in each tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resident {
    pub near: usize,
    pub far: usize,
}

impl Resident {
    pub fn total(&self) -> usize {
        self.near + self.far
    }
}

#[derive(Debug)]
pub(crate) struct Wheel {
    near: Box<[Slot]>,
    far: Box<[Slot]>,
    far_head: usize, // physical index of logical far slot 0
    pos: usize,      // near cursor, "now"
}

impl Wheel {
    /// Sizes must already be validated: `tier1 > 0` and the capacity fits in a `u64`.
    pub(crate) fn new(tier1: usize, tier2: usize) -> Self {
        Self {
            near: (0..tier1).map(|_| Slot::default()).collect(),
            far: (0..tier2).map(|_| Slot::default()).collect(),
            far_head: 0,
            pos: 0,
        }
    }

    fn tier1(&self) -> u64 {
        self.near.len() as u64
    }

    fn tier2(&self) -> u64 {
        self.far.len() as u64
    }

    /// Largest delay the wheel can hold.
    pub(crate) fn max_delay(&self) -> u64 {
        self.tier1() * (self.tier2() + 1) - 1
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Bucket an entry relative to the current cursor.
    pub(crate) fn place(&mut self, mut entry: Entry) {
        let t1 = self.tier1();
        let pos = self.pos as u64;

        if entry.delay < t1 {
            let idx = ((entry.delay + pos) % t1) as usize;
            trace!(delay = entry.delay, slot = idx, "placed in near tier");
            entry.delay = idx as u64;
            self.near[idx].register(entry);
            return;
        }

        if entry.delay < t1 * (self.tier2() + 1) {
            let offset = entry.delay + pos;
            // Divisor is t1 + 1, not t1. Existing placement depends on it.
            // Clamped so boundary offsets stay inside the far tier.
            let idx = (offset / (t1 + 1)).saturating_sub(1).min(self.tier2() - 1) as usize;
            trace!(delay = entry.delay, slot = idx, "placed in far tier");
            entry.delay = offset % t1;
            let physical = self.far_index(idx);
            self.far[physical].register(entry);
            return;
        }

        warn!(
            delay = entry.delay,
            max = self.max_delay(),
            "delay beyond wheel capacity, firing immediately"
        );
        entry.fire();
    }

    /// Fire the slot under the cursor, then advance. Returns how many tasks fired.
    pub(crate) fn pulse(&mut self) -> usize {
        let fired = self.near[self.pos].take();
        let count = fired.len();
        for entry in fired {
            entry.fire();
        }
        if count > 0 {
            trace!(slot = self.pos, fired = count, "pulse");
        }
        self.advance();
        count
    }

    fn advance(&mut self) {
        if self.pos == self.near.len() - 1 {
            self.pos = 0;
            self.promote();
        } else {
            self.pos += 1;
        }
    }

    /// Move the head far slot into the near tier and shift the far tier down by one.
    fn promote(&mut self) {
        if self.far.is_empty() {
            return;
        }
        let moved = self.far[self.far_head].take();
        // the emptied head becomes the fresh slot at the far end
        self.far_head = (self.far_head + 1) % self.far.len();

        if moved.is_empty() {
            return;
        }
        debug!(tasks = moved.len(), "promoting far slot");
        for entry in moved {
            let idx = entry.delay as usize;
            self.near[idx].register(entry);
        }
    }

    /// Fire everything still resident in either tier. Returns how many tasks fired.
    pub(crate) fn drain(&mut self) -> usize {
        let mut count = 0;
        for slot in self.near.iter_mut().chain(self.far.iter_mut()) {
            for entry in slot.take() {
                entry.fire();
                count += 1;
            }
        }
        count
    }

    pub(crate) fn resident(&self) -> Resident {
        Resident {
            near: self.near.iter().map(Slot::len).sum(),
            far: self.far.iter().map(Slot::len).sum(),
        }
    }

    fn far_index(&self, logical: usize) -> usize {
        (self.far_head + logical) % self.far.len()
    }

    #[cfg(test)]
    pub(crate) fn near_slot(&self, idx: usize) -> &Slot {
        &self.near[idx]
    }

    #[cfg(test)]
    pub(crate) fn far_slot(&self, idx: usize) -> &Slot {
        &self.far[self.far_index(idx)]
    }

    #[cfg(test)]
    pub(crate) fn far_slot_mut(&mut self, idx: usize) -> &mut Slot {
        let physical = self.far_index(idx);
        &mut self.far[physical]
    }

    #[cfg(test)]
    pub(crate) fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::task::Task;

    fn submit(wheel: &mut Wheel, delay: u64) -> Task {
        let (entry, task) = Entry::create(delay);
        wheel.place(entry);
        task
    }

    #[test]
    fn near_delays_land_relative_to_cursor() {
        let mut wheel = Wheel::new(1000, 59);
        submit(&mut wheel, 1);
        submit(&mut wheel, 999);
        assert_eq!(wheel.near_slot(1).len(), 1);
        assert_eq!(wheel.near_slot(999).len(), 1);

        wheel.set_position(10);
        submit(&mut wheel, 995);
        assert_eq!(wheel.near_slot(5).len(), 1);
        assert_eq!(wheel.near_slot(5).entries()[0].delay, 5);
    }

    #[test]
    fn far_delay_at_capacity_edge() {
        let mut wheel = Wheel::new(1000, 59);
        assert_eq!(wheel.max_delay(), 59_999);

        let task = submit(&mut wheel, 59_999);
        assert_eq!(wheel.far_slot(58).len(), 1);
        assert_eq!(wheel.far_slot(58).entries()[0].delay, 999);
        assert!(!task.is_done());
    }

    #[test]
    fn far_index_uses_widened_divisor() {
        let mut wheel = Wheel::new(1000, 59);
        // 2001 / 1001 - 1 == 0, where a t1 divisor would give 1
        submit(&mut wheel, 2001);
        assert_eq!(wheel.far_slot(0).len(), 1);
        assert_eq!(wheel.far_slot(0).entries()[0].delay, 1);

        submit(&mut wheel, 3003);
        assert_eq!(wheel.far_slot(2).len(), 1);
    }

    #[test]
    fn far_index_is_clamped_at_both_ends() {
        // offset == t1 would otherwise underflow
        let mut wheel = Wheel::new(4, 2);
        submit(&mut wheel, 4);
        assert_eq!(wheel.far_slot(0).len(), 1);

        // offset / (t1 + 1) - 1 would overshoot the far tier here
        let mut wheel = Wheel::new(10, 1);
        wheel.set_position(9);
        submit(&mut wheel, 19);
        assert_eq!(wheel.far_slot(0).len(), 1);
        assert_eq!(wheel.far_slot(0).entries()[0].delay, 8);
    }

    #[test]
    fn out_of_range_fires_immediately() {
        let mut wheel = Wheel::new(1000, 59);
        let task = submit(&mut wheel, 60_000);
        assert!(task.is_done());
        assert_eq!(wheel.resident().total(), 0);
    }

    #[test]
    fn pulse_fires_whole_slot() {
        let mut wheel = Wheel::new(1000, 59);
        let tasks: Vec<Task> = (0..60)
            .map(|_| {
                let (entry, task) = Entry::create(0);
                wheel.near[0].register(entry);
                task
            })
            .collect();

        assert_eq!(wheel.pulse(), 60);
        assert!(tasks.iter().all(Task::is_done));
        assert!(wheel.near_slot(0).is_empty());
        assert_eq!(wheel.position(), 1);
    }

    #[test]
    fn cursor_wraps_at_last_slot() {
        let mut wheel = Wheel::new(1000, 59);
        wheel.set_position(999);
        wheel.advance();
        assert_eq!(wheel.position(), 0);

        wheel.advance();
        assert_eq!(wheel.position(), 1);
    }

    #[test]
    fn promotion_shifts_far_tier() {
        let mut wheel = Wheel::new(1000, 59);
        for i in 0..1000 {
            wheel.far_slot_mut(0).register(Entry::create(i).0);
            wheel.far_slot_mut(58).register(Entry::create(i).0);
        }

        wheel.promote();

        assert!(wheel.far_slot(0).is_empty());
        assert_eq!(wheel.resident().near, 1000);
        assert!((0..1000).all(|i| wheel.near_slot(i).len() == 1));
        assert_eq!(wheel.far_slot(57).len(), 1000);
        assert!(wheel.far_slot(58).is_empty());
    }

    #[test]
    fn far_task_fires_after_promotion() {
        let mut wheel = Wheel::new(4, 2);
        let task = submit(&mut wheel, 6);
        // 6 / 5 - 1 == 0, lands in near slot 2 on promotion
        assert_eq!(wheel.far_slot(0).len(), 1);

        for _ in 0..4 {
            wheel.pulse();
            assert!(!task.is_done());
        }
        assert_eq!(wheel.resident(), Resident { near: 1, far: 0 });
        assert_eq!(wheel.near_slot(2).len(), 1);

        wheel.pulse();
        wheel.pulse();
        assert!(!task.is_done());
        wheel.pulse();
        assert!(task.is_done());
    }

    #[test]
    fn near_task_fires_after_delay_pulses() {
        let mut wheel = Wheel::new(8, 0);
        wheel.set_position(6);
        let task = submit(&mut wheel, 3);

        for _ in 0..3 {
            wheel.pulse();
        }
        assert!(!task.is_done());
        wheel.pulse();
        assert!(task.is_done());
    }

    #[test]
    fn single_tier_wheel_wraps_without_promotion() {
        let mut wheel = Wheel::new(3, 0);
        assert_eq!(wheel.max_delay(), 2);
        for _ in 0..7 {
            wheel.pulse();
        }
        assert_eq!(wheel.position(), 1);
    }

    #[test]
    fn drain_fires_both_tiers() {
        let mut wheel = Wheel::new(4, 2);
        let near = submit(&mut wheel, 1);
        let far = submit(&mut wheel, 9);
        assert_eq!(wheel.resident(), Resident { near: 1, far: 1 });

        assert_eq!(wheel.drain(), 2);
        assert!(near.is_done() && far.is_done());
        assert_eq!(wheel.resident().total(), 0);
    }
}
