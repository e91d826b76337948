//! Definitions for the `gpu_memory_free` hypervisor call.

use crate::{HvcallBinding, Lv1Result, MemoryHandle, NoValue, RawHvcallArgs};
use core::convert::Infallible;

pub struct GpuMemoryFree;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GpuMemoryFreeArgs {
    pub handle: MemoryHandle,
}

impl HvcallBinding for GpuMemoryFree {
    const HVCALL_NO: u64 = 216;
    type CallArgs = GpuMemoryFreeArgs;
    type Return = Lv1Result<NoValue>;
}

impl From<GpuMemoryFreeArgs> for RawHvcallArgs {
    fn from(args: GpuMemoryFreeArgs) -> Self {
        [args.handle.0, 0, 0, 0, 0, 0, 0, 0]
    }
}

impl TryFrom<RawHvcallArgs> for GpuMemoryFreeArgs {
    type Error = Infallible;

    fn try_from(args: RawHvcallArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            handle: MemoryHandle(args[0]),
        })
    }
}
