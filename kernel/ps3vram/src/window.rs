//! The virtual address window through which backing memory is accessed

use crate::mapper::{self, MapError};
use pmap::{KernelPmap, PAddr, VAddr};

/// A fixed range of kernel virtual address space that exposes one piece of backing memory at a time.
///
/// The window itself holds no mapping.
/// [`map()`](MappingWindow::map) establishes one for the lifetime of the returned [`MappedRange`],
/// which also borrows the window exclusively so that two ranges can never be mapped at once.
#[derive(Debug)]
pub struct MappingWindow<P> {
    pmap: P,
    base: VAddr,
    size: u64,
}

impl<P: KernelPmap> MappingWindow<P> {
    pub fn new(pmap: P, base: VAddr, size: u64) -> Self {
        Self { pmap, base, size }
    }

    pub fn base(&self) -> VAddr {
        self.base
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Expose `[paddr, paddr + len)` through the window until the returned guard is dropped
    pub fn map(&mut self, paddr: PAddr, len: u64) -> Result<MappedRange<'_, P>, MapError> {
        if len > self.size {
            return Err(MapError::ExceedsWindow {
                len,
                window: self.size,
            });
        }
        mapper::establish(&mut self.pmap, paddr, self.base, len)?;
        Ok(MappedRange { window: self, len })
    }

    pub fn into_pmap(self) -> P {
        self.pmap
    }
}

/// Backing memory that is currently mapped into a [`MappingWindow`].
///
/// Dropping it removes the mapping again, also when unwinding out of a copy.
pub struct MappedRange<'w, P: KernelPmap> {
    window: &'w mut MappingWindow<P>,
    len: u64,
}

impl<P: KernelPmap> MappedRange<'_, P> {
    /// The mapped memory
    pub fn bytes(&mut self) -> &mut [u8] {
        let (base, len) = (self.window.base, self.len);
        match self.window.pmap.mapped_mut(base, len as usize) {
            Some(bytes) => bytes,
            None => panic!("window at {base:#x} lost its mapping of {len:#x} bytes"),
        }
    }
}

impl<P: KernelPmap> Drop for MappedRange<'_, P> {
    fn drop(&mut self) {
        // the range was accepted by establish(), so revoking the same range cannot fail
        if let Err(e) = mapper::revoke(&mut self.window.pmap, self.window.base, self.len) {
            log::error!("could not unmap window: {e}");
        }
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use super::*;
    use pmap::PAGESIZE;
    use ps3_sim::SimPmap;

    const PHYS: PAddr = 0x7_0000_0000;
    const WINDOW: VAddr = 0x1_0000_0000;
    const PAGE: u64 = PAGESIZE as u64;

    #[test]
    fn test_mapping_lives_as_long_as_the_guard() {
        let pmap = SimPmap::new(PHYS, 8 * PAGE, WINDOW, 4 * PAGE);
        let stats = pmap.stats();
        let mut window = MappingWindow::new(pmap, WINDOW, 4 * PAGE);
        {
            let mut range = window.map(PHYS + PAGE, 2 * PAGE).unwrap();
            range.bytes().fill(0x5a);
            assert_eq!(stats.mapped_pages(), 2);
        }
        assert_eq!(stats.mapped_pages(), 0);

        let pmap = window.into_pmap();
        assert_eq!(pmap.phys(PHYS + PAGE, 2 * PAGE), [0x5a; 2 * PAGESIZE].as_slice());
        assert_eq!(pmap.phys(PHYS, PAGE), [0; PAGESIZE].as_slice());
    }

    #[test]
    fn test_ranges_larger_than_the_window_are_refused() {
        let pmap = SimPmap::new(PHYS, 8 * PAGE, WINDOW, 4 * PAGE);
        let stats = pmap.stats();
        let mut window = MappingWindow::new(pmap, WINDOW, 4 * PAGE);
        assert!(matches!(
            window.map(PHYS, 5 * PAGE),
            Err(MapError::ExceedsWindow { .. })
        ));
        assert_eq!(stats.kenter_calls(), 0);
    }

    #[test]
    fn test_mapping_is_removed_when_unwinding() {
        let pmap = SimPmap::new(PHYS, 8 * PAGE, WINDOW, 4 * PAGE);
        let stats = pmap.stats();
        let mut window = MappingWindow::new(pmap, WINDOW, 4 * PAGE);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _range = window.map(PHYS, 4 * PAGE).unwrap();
            panic!("copy faulted");
        }));
        assert!(result.is_err());
        assert_eq!(stats.mapped_pages(), 0);
    }
}
