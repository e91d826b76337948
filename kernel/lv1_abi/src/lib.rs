//! ABI definitions for calling into the LV1 hypervisor and interpreting its results
//!
//! # Hypervisor Call Overview
//!
//! Only the hypervisor calls needed for handing GPU memory to the kernel are currently defined:
//!
//! | Hvcall | Number | Arguments | Return | Summary |
//! |--------|:------:|-----------|--------|---------|
//! | [gpu_memory_allocate](gpu_memory_allocate::GpuMemoryAllocate) | *214* | [GpuMemoryAllocateArgs](gpu_memory_allocate::GpuMemoryAllocateArgs) | [GpuMemory](gpu_memory_allocate::GpuMemory) | Allocate physically contiguous GPU DDR memory |
//! | [gpu_memory_free](gpu_memory_free::GpuMemoryFree) | *216* | [GpuMemoryFreeArgs](gpu_memory_free::GpuMemoryFreeArgs) | [NoValue] | Return GPU DDR memory to the hypervisor |
//!
//! # Calling Conventions
//!
//! A hypervisor call passes up to 8 arguments in registers `r3-r10` and the call number in `r11`.
//!
//! When returning, `r3` holds a status code (0 = success or one of the negative [`Lv1Error`] codes) and `r4-r10`
//! hold call specific output values.
//!
//! How the call instruction is actually executed is up to an implementation of [`Lv1`].
#![no_std]

mod errors;
pub mod gpu_memory_allocate;
pub mod gpu_memory_free;
mod traits;

pub use errors::Lv1Error;
pub use gpu_memory_allocate::{GpuMemory, GpuMemoryAllocateArgs, MemoryHandle};
pub use gpu_memory_free::GpuMemoryFreeArgs;
pub use traits::*;

/// Typed access to the GPU memory hypervisor calls.
///
/// This is implemented for everything that can perform raw hypervisor calls.
pub trait Lv1GpuMemory {
    /// Allocate `args.size` bytes of physically contiguous GPU DDR memory
    fn gpu_memory_allocate(&self, args: GpuMemoryAllocateArgs) -> Lv1Result<GpuMemory>;

    /// Return memory previously handed out by [`gpu_memory_allocate`](Lv1GpuMemory::gpu_memory_allocate)
    fn gpu_memory_free(&self, handle: MemoryHandle) -> Lv1Result<NoValue>;
}

impl<T: Lv1> Lv1GpuMemory for T {
    fn gpu_memory_allocate(&self, args: GpuMemoryAllocateArgs) -> Lv1Result<GpuMemory> {
        hvcall::<gpu_memory_allocate::GpuMemoryAllocate>(self, args)
    }

    fn gpu_memory_free(&self, handle: MemoryHandle) -> Lv1Result<NoValue> {
        hvcall::<gpu_memory_free::GpuMemoryFree>(self, GpuMemoryFreeArgs { handle })
    }
}

/// Execute the hypervisor call described by `B` through `lv1`
pub fn hvcall<B: HvcallBinding>(lv1: &(impl Lv1 + ?Sized), args: B::CallArgs) -> B::Return {
    log::trace!("hvcall {} with {args:?}", B::HVCALL_NO);
    let raw = lv1.raw_hvcall(B::HVCALL_NO, args.into());
    B::Return::from_response(raw)
}
