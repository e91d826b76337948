use pmap::{is_page_aligned, KernelPmap, MemAttr, PAddr, VAddr, PAGESIZE};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counters about everything a [`SimPmap`] was asked to do.
///
/// They are shared so that a test can keep watching after the pmap was moved into a driver.
#[derive(Debug, Default)]
pub struct PmapStats {
    mapped_pages: AtomicUsize,
    peak_mapped_pages: AtomicUsize,
    kenter_calls: AtomicUsize,
    kremove_calls: AtomicUsize,
    replaced_entries: AtomicUsize,
    cacheable_entries: AtomicUsize,
}

impl PmapStats {
    /// How many pages of the window are mapped right now
    pub fn mapped_pages(&self) -> usize {
        self.mapped_pages.load(Ordering::SeqCst)
    }

    /// The largest number of pages that were ever mapped at the same time
    pub fn peak_mapped_pages(&self) -> usize {
        self.peak_mapped_pages.load(Ordering::SeqCst)
    }

    pub fn kenter_calls(&self) -> usize {
        self.kenter_calls.load(Ordering::SeqCst)
    }

    pub fn kremove_calls(&self) -> usize {
        self.kremove_calls.load(Ordering::SeqCst)
    }

    /// How often a page was entered while it was still mapped.
    ///
    /// A window that is only ever used by one transfer at a time is always empty when a transfer starts,
    /// so this stays zero.
    pub fn replaced_entries(&self) -> usize {
        self.replaced_entries.load(Ordering::SeqCst)
    }

    /// How many pages were entered with anything other than [`MemAttr::Uncacheable`]
    pub fn cacheable_entries(&self) -> usize {
        self.cacheable_entries.load(Ordering::SeqCst)
    }
}

/// A window of kernel virtual address space on top of simulated physical memory.
///
/// Only `[window_base, window_base + window_size)` may be touched, everything else is a bug in the caller and
/// panics like a real kernel would fault.
/// Every [`kenter`](KernelPmap::kenter) yields the current thread to shake out missing synchronization.
#[derive(Debug)]
pub struct SimPmap {
    phys_base: PAddr,
    phys: Vec<u8>,
    window_base: VAddr,
    window_size: u64,
    entries: BTreeMap<VAddr, (PAddr, MemAttr)>,
    stats: Arc<PmapStats>,
}

impl SimPmap {
    /// Simulate `phys_size` bytes of zeroed physical memory at `phys_base` and a window of `window_size` bytes at
    /// `window_base`
    pub fn new(phys_base: PAddr, phys_size: u64, window_base: VAddr, window_size: u64) -> Self {
        assert!(is_page_aligned(phys_base) && is_page_aligned(phys_size));
        assert!(is_page_aligned(window_base) && is_page_aligned(window_size));
        Self {
            phys_base,
            phys: vec![0; phys_size as usize],
            window_base,
            window_size,
            entries: BTreeMap::new(),
            stats: Arc::default(),
        }
    }

    pub fn stats(&self) -> Arc<PmapStats> {
        self.stats.clone()
    }

    /// What the page at `vaddr` is currently mapped to
    pub fn lookup(&self, vaddr: VAddr) -> Option<(PAddr, MemAttr)> {
        self.entries.get(&vaddr).copied()
    }

    /// Look at simulated physical memory directly, bypassing the window
    pub fn phys(&self, paddr: PAddr, len: u64) -> &[u8] {
        let start = self.phys_index(paddr, len);
        &self.phys[start..start + len as usize]
    }

    fn phys_index(&self, paddr: PAddr, len: u64) -> usize {
        let end = self.phys_base + self.phys.len() as u64;
        assert!(
            paddr >= self.phys_base && paddr + len <= end,
            "{len:#x} bytes at {paddr:#x} are outside of physical memory [{:#x}, {end:#x})",
            self.phys_base
        );
        (paddr - self.phys_base) as usize
    }

    fn check_window_page(&self, vaddr: VAddr) {
        assert!(is_page_aligned(vaddr), "{vaddr:#x} is not page aligned");
        assert!(
            vaddr >= self.window_base && vaddr < self.window_base + self.window_size,
            "{vaddr:#x} is outside of the window at {:#x}",
            self.window_base
        );
    }
}

unsafe impl KernelPmap for SimPmap {
    fn kenter(&mut self, vaddr: VAddr, paddr: PAddr, attr: MemAttr) {
        self.check_window_page(vaddr);
        assert!(is_page_aligned(paddr), "{paddr:#x} is not page aligned");
        self.phys_index(paddr, PAGESIZE as u64);

        self.stats.kenter_calls.fetch_add(1, Ordering::SeqCst);
        if attr != MemAttr::Uncacheable {
            self.stats.cacheable_entries.fetch_add(1, Ordering::SeqCst);
        }
        if self.entries.insert(vaddr, (paddr, attr)).is_some() {
            self.stats.replaced_entries.fetch_add(1, Ordering::SeqCst);
        } else {
            let mapped = self.stats.mapped_pages.fetch_add(1, Ordering::SeqCst) + 1;
            self.stats.peak_mapped_pages.fetch_max(mapped, Ordering::SeqCst);
        }

        std::thread::yield_now();
    }

    fn kremove(&mut self, vaddr: VAddr) {
        self.check_window_page(vaddr);
        self.stats.kremove_calls.fetch_add(1, Ordering::SeqCst);
        if self.entries.remove(&vaddr).is_some() {
            self.stats.mapped_pages.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Only mappings onto physically contiguous memory can be accessed as one slice
    fn mapped_mut(&mut self, vaddr: VAddr, len: usize) -> Option<&mut [u8]> {
        if len == 0 {
            return Some(&mut self.phys[..0]);
        }
        let offset = vaddr % PAGESIZE as u64;
        let first_page = vaddr - offset;
        let (first_paddr, _) = self.lookup(first_page)?;

        let mut page = first_page;
        while page < vaddr + len as u64 {
            let (paddr, _) = self.lookup(page)?;
            assert_eq!(
                paddr - first_paddr,
                page - first_page,
                "the simulation can only access physically contiguous mappings"
            );
            page += PAGESIZE as u64;
        }

        let start = self.phys_index(first_paddr + offset, len as u64);
        Some(&mut self.phys[start..start + len])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PHYS: PAddr = 0x7_0000_0000;
    const WINDOW: VAddr = 0x1_0000_0000;
    const PAGE: u64 = PAGESIZE as u64;

    #[test]
    fn test_window_accesses_physical_memory() {
        let mut pmap = SimPmap::new(PHYS, 4 * PAGE, WINDOW, 2 * PAGE);
        pmap.kenter(WINDOW, PHYS + 2 * PAGE, MemAttr::Uncacheable);
        pmap.kenter(WINDOW + PAGE, PHYS + 3 * PAGE, MemAttr::Uncacheable);
        pmap.mapped_mut(WINDOW + 16, PAGESIZE).unwrap().fill(0xcc);

        assert_eq!(pmap.phys(PHYS + 2 * PAGE, 16), [0; 16].as_slice());
        assert_eq!(pmap.phys(PHYS + 2 * PAGE + 16, PAGE), [0xcc; PAGESIZE].as_slice());
        assert_eq!(pmap.stats().peak_mapped_pages(), 2);
    }

    #[test]
    fn test_unmapped_pages_are_not_accessible() {
        let mut pmap = SimPmap::new(PHYS, 4 * PAGE, WINDOW, 2 * PAGE);
        pmap.kenter(WINDOW, PHYS, MemAttr::Uncacheable);
        assert!(pmap.mapped_mut(WINDOW, 2 * PAGESIZE).is_none());
        pmap.kremove(WINDOW);
        assert!(pmap.mapped_mut(WINDOW, 1).is_none());
        assert_eq!(pmap.stats().mapped_pages(), 0);
    }

    #[test]
    fn test_replaced_and_cacheable_entries_are_counted() {
        let mut pmap = SimPmap::new(PHYS, 4 * PAGE, WINDOW, 2 * PAGE);
        pmap.kenter(WINDOW, PHYS, MemAttr::Uncacheable);
        pmap.kenter(WINDOW, PHYS + PAGE, MemAttr::WriteBack);
        let stats = pmap.stats();
        assert_eq!(stats.replaced_entries(), 1);
        assert_eq!(stats.cacheable_entries(), 1);
        assert_eq!(stats.mapped_pages(), 1);
    }

    #[test]
    #[should_panic(expected = "outside of the window")]
    fn test_access_outside_of_window_faults() {
        let mut pmap = SimPmap::new(PHYS, 4 * PAGE, WINDOW, 2 * PAGE);
        pmap.kenter(WINDOW + 2 * PAGE, PHYS, MemAttr::Uncacheable);
    }
}
