//! Shared terminal size, written by the resize watcher and read by the poll loop.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub const DEFAULT_WIDTH: u16 = 80;
pub const DEFAULT_HEIGHT: u16 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u16,
    pub height: u16,
}

impl Dimensions {
    /// Returns `None` when either side is zero.
    pub fn new(width: u16, height: u16) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }

    fn pack(self) -> u32 {
        (u32::from(self.width) << 16) | u32::from(self.height)
    }

    fn unpack(packed: u32) -> Self {
        Self {
            width: (packed >> 16) as u16,
            height: (packed & 0xffff) as u16,
        }
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

/// Last known terminal size.
///
/// Width and height live in one atomic word so a reader never observes a
/// width from one resize paired with the height from another. Clones share
/// the same value.
#[derive(Debug, Clone)]
pub struct TerminalDimensions {
    packed: Arc<AtomicU32>,
}

impl TerminalDimensions {
    pub fn new(initial: Dimensions) -> Self {
        Self {
            packed: Arc::new(AtomicU32::new(initial.pack())),
        }
    }

    pub fn current(&self) -> Dimensions {
        Dimensions::unpack(self.packed.load(Ordering::Acquire))
    }

    /// Overwrite the stored size. Last write wins.
    pub fn update(&self, dimensions: Dimensions) {
        self.packed.store(dimensions.pack(), Ordering::Release);
    }
}

impl Default for TerminalDimensions {
    fn default() -> Self {
        Self::new(Dimensions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_dimensions_are_rejected() {
        assert_eq!(Dimensions::new(0, 24), None);
        assert_eq!(Dimensions::new(80, 0), None);
        assert_eq!(
            Dimensions::new(1, 1),
            Some(Dimensions {
                width: 1,
                height: 1
            })
        );
    }

    #[test]
    fn default_is_classic_terminal_size() {
        assert_eq!(
            TerminalDimensions::default().current(),
            Dimensions {
                width: 80,
                height: 24
            }
        );
    }

    #[test]
    fn last_write_wins_across_clones() {
        let dims = TerminalDimensions::default();
        let writer = dims.clone();
        writer.update(Dimensions::new(120, 40).expect("non-zero"));
        writer.update(Dimensions::new(u16::MAX, 1).expect("non-zero"));
        assert_eq!(
            dims.current(),
            Dimensions {
                width: u16::MAX,
                height: 1
            }
        );
    }

    #[test]
    fn concurrent_updates_never_tear() {
        let small = Dimensions::new(10, 10).expect("non-zero");
        let large = Dimensions::new(300, 300).expect("non-zero");
        let dims = TerminalDimensions::new(small);

        let writer = {
            let dims = dims.clone();
            std::thread::spawn(move || {
                for i in 0..10_000 {
                    dims.update(if i % 2 == 0 { small } else { large });
                }
            })
        };

        for _ in 0..10_000 {
            let seen = dims.current();
            assert_eq!(seen.width, seen.height, "torn read: {seen:?}");
        }
        writer.join().expect("writer thread");
    }
}
