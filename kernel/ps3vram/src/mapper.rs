//! Page-wise mapping of backing memory into kernel virtual address space
//!
//! The backing memory is GPU memory that is not kept coherent with the CPU caches,
//! so every page is entered as [`MemAttr::Uncacheable`].

use pmap::{is_page_aligned, KernelPmap, MemAttr, PAddr, VAddr, PAGESIZE};
use thiserror_no_std::Error;

#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum MapError {
    #[error("cannot map {len:#x} bytes from {paddr:#x} to {vaddr:#x} because they are not page aligned")]
    Unaligned { paddr: PAddr, vaddr: VAddr, len: u64 },
    #[error("mapping {len:#x} bytes from {paddr:#x} to {vaddr:#x} wraps the address space")]
    Overflow { paddr: PAddr, vaddr: VAddr, len: u64 },
    #[error("cannot map {len:#x} bytes through a window of {window:#x} bytes")]
    ExceedsWindow { len: u64, window: u64 },
}

fn check_range(paddr: PAddr, vaddr: VAddr, len: u64) -> Result<(), MapError> {
    if !is_page_aligned(paddr) || !is_page_aligned(vaddr) || !is_page_aligned(len) {
        return Err(MapError::Unaligned { paddr, vaddr, len });
    }
    if paddr.checked_add(len).is_none() || vaddr.checked_add(len).is_none() {
        return Err(MapError::Overflow { paddr, vaddr, len });
    }
    Ok(())
}

/// Map `[vaddr, vaddr + len)` to `[paddr, paddr + len)` one page at a time.
///
/// The whole range is checked before the first page is entered, so on error nothing has been mapped.
pub fn establish(
    pmap: &mut impl KernelPmap,
    paddr: PAddr,
    vaddr: VAddr,
    len: u64,
) -> Result<(), MapError> {
    check_range(paddr, vaddr, len)?;
    log::trace!("mapping {len:#x} bytes {vaddr:#x} -> {paddr:#x} uncacheable");

    for offset in (0..len).step_by(PAGESIZE) {
        pmap.kenter(vaddr + offset, paddr + offset, MemAttr::Uncacheable);
    }
    Ok(())
}

/// Remove the mappings of `[vaddr, vaddr + len)` one page at a time
pub fn revoke(pmap: &mut impl KernelPmap, vaddr: VAddr, len: u64) -> Result<(), MapError> {
    check_range(0, vaddr, len)?;
    log::trace!("unmapping {len:#x} bytes at {vaddr:#x}");

    for offset in (0..len).step_by(PAGESIZE) {
        pmap.kremove(vaddr + offset);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use ps3_sim::SimPmap;

    const PHYS: PAddr = 0x7_0000_0000;
    const WINDOW: VAddr = 0x1_0000_0000;
    const PAGE: u64 = PAGESIZE as u64;

    fn pmap() -> SimPmap {
        SimPmap::new(PHYS, 64 * PAGE, WINDOW, 16 * PAGE)
    }

    #[test]
    fn test_establish_enters_every_page_uncacheable() {
        let mut pmap = pmap();
        establish(&mut pmap, PHYS + 4 * PAGE, WINDOW, 3 * PAGE).unwrap();

        for i in 0..3 {
            assert_eq!(
                pmap.lookup(WINDOW + i * PAGE),
                Some((PHYS + (4 + i) * PAGE, MemAttr::Uncacheable))
            );
        }
        assert_eq!(pmap.lookup(WINDOW + 3 * PAGE), None);
        assert_eq!(pmap.stats().mapped_pages(), 3);
    }

    #[test]
    fn test_revoke_removes_every_page() {
        let mut pmap = pmap();
        establish(&mut pmap, PHYS, WINDOW, 4 * PAGE).unwrap();
        revoke(&mut pmap, WINDOW, 4 * PAGE).unwrap();

        assert_eq!(pmap.stats().mapped_pages(), 0);
        assert_eq!(pmap.lookup(WINDOW), None);
        // revoking again is harmless
        revoke(&mut pmap, WINDOW, 4 * PAGE).unwrap();
    }

    #[test]
    fn test_partial_pages_are_rejected_before_mapping() {
        let mut pmap = pmap();
        assert_eq!(
            establish(&mut pmap, PHYS, WINDOW, PAGE + 512),
            Err(MapError::Unaligned {
                paddr: PHYS,
                vaddr: WINDOW,
                len: PAGE + 512
            })
        );
        assert!(matches!(
            establish(&mut pmap, PHYS + 8, WINDOW, PAGE),
            Err(MapError::Unaligned { .. })
        ));
        assert_eq!(pmap.stats().kenter_calls(), 0);
    }

    #[test]
    fn test_wrapping_range_is_rejected() {
        let mut pmap = pmap();
        let paddr = u64::MAX - PAGE + 1;
        assert!(matches!(
            establish(&mut pmap, paddr, WINDOW, 2 * PAGE),
            Err(MapError::Overflow { .. })
        ));
        assert_eq!(pmap.stats().kenter_calls(), 0);
    }
}
