//! Kernel physical map primitives
//!
//! Drivers that need to look at device memory (e.g. memory handed out by a hypervisor) do so by entering
//! single pages into a reserved range of kernel virtual address space and removing them again afterwards.
//! This crate only defines the vocabulary and the [`KernelPmap`] capability; the actual page-table work is done by
//! an architecture backend or by a simulation during tests.
#![no_std]

/// Type alias for physical addresses.
///
/// On hypervisor-managed platforms this is the *logical partition* address handed out by the hypervisor.
pub type PAddr = u64;

/// Type alias for virtual addresses.
pub type VAddr = u64;

/// How large each page entered through a [`KernelPmap`] is.
pub const PAGESIZE: usize = 4096;

const PAGE_OFFSET_MASK: u64 = PAGESIZE as u64 - 1;

/// Whether `addr` lies on a page boundary
#[inline]
pub const fn is_page_aligned(addr: u64) -> bool {
    addr & PAGE_OFFSET_MASK == 0
}

/// The caching behaviour requested for a mapping
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum MemAttr {
    /// Normal, fully cached memory
    #[default]
    WriteBack,
    /// Writes may be buffered and merged but reads are not cached
    WriteCombining,
    /// Every access goes straight to the device.
    ///
    /// Required for memory that is shared with a device which does not snoop the CPU caches.
    Uncacheable,
}

/// The capability to change single page mappings of kernel virtual address space.
///
/// # Safety
/// Entering or removing a mapping changes what memory is behind a virtual address.
/// Implementors must therefore only ever modify a virtual address range that is reserved for their exclusive use
/// (and panic when asked to touch anything outside of it) so that calling the safe methods below can never
/// invalidate unrelated references.
pub unsafe trait KernelPmap {
    /// Map the page at `vaddr` to the physical page at `paddr` using the caching behaviour `attr`.
    ///
    /// An existing mapping at `vaddr` is replaced.
    /// Both addresses must be page aligned.
    fn kenter(&mut self, vaddr: VAddr, paddr: PAddr, attr: MemAttr);

    /// Remove the mapping of the page at `vaddr`.
    ///
    /// Removing a page that is not mapped is not an error.
    fn kremove(&mut self, vaddr: VAddr);

    /// Access the bytes currently mapped at `[vaddr, vaddr + len)`.
    ///
    /// Returns `None` if any page of the range is not mapped.
    fn mapped_mut(&mut self, vaddr: VAddr, len: usize) -> Option<&mut [u8]>;
}
