//! Definitions for the `gpu_memory_allocate` hypervisor call.

use crate::{HvcallBinding, HvcallReturnData, Lv1Result, RawHvcallArgs};
use core::convert::Infallible;
use core::fmt::{Debug, Formatter};

/// The opaque handle under which the hypervisor tracks an allocation
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct MemoryHandle(pub u64);

impl Debug for MemoryHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "MemoryHandle({:#x})", self.0)
    }
}

pub struct GpuMemoryAllocate;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GpuMemoryAllocateArgs {
    /// How many bytes of DDR memory to allocate
    pub size: u64,
    /// Further allocation parameters which are passed through to the hypervisor as-is.
    /// Plain DDR memory is requested by leaving all of them zero.
    pub reserved: [u64; 4],
}

impl GpuMemoryAllocateArgs {
    /// Arguments for a plain DDR memory allocation of `size` bytes
    pub const fn ddr(size: u64) -> Self {
        Self {
            size,
            reserved: [0; 4],
        }
    }
}

/// A successful GPU memory allocation
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GpuMemory {
    pub handle: MemoryHandle,
    /// Logical partition address at which the memory starts
    pub lpar: u64,
}

impl HvcallBinding for GpuMemoryAllocate {
    const HVCALL_NO: u64 = 214;
    type CallArgs = GpuMemoryAllocateArgs;
    type Return = Lv1Result<GpuMemory>;
}

impl From<GpuMemoryAllocateArgs> for RawHvcallArgs {
    fn from(args: GpuMemoryAllocateArgs) -> Self {
        let [r0, r1, r2, r3] = args.reserved;
        [args.size, r0, r1, r2, r3, 0, 0, 0]
    }
}

impl TryFrom<RawHvcallArgs> for GpuMemoryAllocateArgs {
    type Error = Infallible;

    fn try_from(args: RawHvcallArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            size: args[0],
            reserved: [args[1], args[2], args[3], args[4]],
        })
    }
}

impl From<GpuMemory> for HvcallReturnData {
    fn from(value: GpuMemory) -> Self {
        [value.handle.0, value.lpar, 0, 0, 0, 0, 0]
    }
}

impl TryFrom<HvcallReturnData> for GpuMemory {
    type Error = Infallible;

    fn try_from(value: HvcallReturnData) -> Result<Self, Self::Error> {
        Ok(Self {
            handle: MemoryHandle(value[0]),
            lpar: value[1],
        })
    }
}
