//! Call id allocation and pending-handler bookkeeping.
//!
//! Ids index straight into a slot vector. Released ids go on a LIFO free
//! list and are handed out again before any id above the high-water mark,
//! which keeps the table small under steady traffic.

/// Number of distinct call ids (`0..=u16::MAX`).
pub const MAX_CALLS: usize = 1 << 16;

/// Pending-call table keyed by 16-bit call id.
#[derive(Debug)]
pub struct CallTable<H> {
    slots: Vec<Option<H>>,
    free: Vec<u16>,
    /// Smallest id never allocated.
    top: usize,
}

impl<H> CallTable<H> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            top: 0,
        }
    }

    /// Register `handler` under a fresh id.
    ///
    /// Reuses the most recently released id if there is one. When all
    /// 65536 ids are outstanding the handler is handed back untouched and
    /// nothing is allocated.
    pub fn allocate(&mut self, handler: H) -> Result<u16, H> {
        let id = match self.free.pop() {
            Some(id) => id,
            None if self.top < MAX_CALLS => {
                let id = self.top as u16;
                self.top += 1;
                id
            }
            None => return Err(handler),
        };

        let index = usize::from(id);
        if index == self.slots.len() {
            self.slots.push(Some(handler));
        } else {
            self.slots[index] = Some(handler);
        }
        Ok(id)
    }

    /// Take the handler registered under `id` and release the id.
    ///
    /// The slot is emptied before the handler is returned, so a duplicate
    /// response for the same id finds nothing. Returns `None` for ids with
    /// no live handler; those are not pushed onto the free list again.
    pub fn resolve(&mut self, id: u16) -> Option<H> {
        let handler = self.slots.get_mut(usize::from(id))?.take()?;
        self.free.push(id);
        Some(handler)
    }

    /// Remove every live handler in ascending id order.
    ///
    /// Stops scanning as soon as all outstanding calls have been found.
    pub fn drain_pending(&mut self) -> Vec<(u16, H)> {
        let mut missing = self.pending();
        let mut drained = Vec::with_capacity(missing);
        let mut index = 0;
        while missing > 0 && index < self.top {
            if let Some(handler) = self.slots[index].take() {
                let id = index as u16;
                self.free.push(id);
                drained.push((id, handler));
                missing -= 1;
            }
            index += 1;
        }
        drained
    }

    /// Whether `id` currently holds a live handler.
    pub fn is_pending(&self, id: u16) -> bool {
        matches!(self.slots.get(usize::from(id)), Some(Some(_)))
    }

    /// Number of outstanding calls.
    pub fn pending(&self) -> usize {
        self.top - self.free.len()
    }

    /// Smallest id never handed out.
    pub fn high_water_mark(&self) -> usize {
        self.top
    }

    /// Ids released and waiting for reuse.
    pub fn free_ids(&self) -> usize {
        self.free.len()
    }
}

impl<H> Default for CallTable<H> {
    fn default() -> Self {
        Self::new()
    }
}
