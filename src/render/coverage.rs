use std::sync::atomic::{AtomicBool, Ordering};

/// Per-pass record of which pixels have been claimed by a worker.
///
/// Claims are compare-and-set, so a pixel is handed out at most once even when several
/// workers race for it.
pub(crate) struct Coverage {
    cells: Vec<AtomicBool>,
}

impl Coverage {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            cells: (0..len).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    /// Claim `index`; `true` only for the first caller.
    pub(crate) fn claim(&self, index: usize) -> bool {
        self.cells[index]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_claimed(&self, index: usize) -> bool {
        self.cells[index].load(Ordering::Acquire)
    }

    pub(crate) fn claimed(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.load(Ordering::Acquire))
            .count()
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/coverage.rs"]
mod tests;
