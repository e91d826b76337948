use lv1_abi::gpu_memory_allocate::GpuMemoryAllocate;
use lv1_abi::gpu_memory_free::GpuMemoryFree;
use lv1_abi::{
    GpuMemory, GpuMemoryAllocateArgs, GpuMemoryFreeArgs, HvcallBinding, IntoRawHvResponse, Lv1,
    Lv1Error, Lv1Result, MemoryHandle, NoValue, RawHvcallArgs, RawHvcallReturn,
};
use std::sync::Mutex;

/// The logical partition address at which simulated GPU memory starts
pub const SIM_LPAR_BASE: u64 = 0x7_0000_0000;

#[derive(Debug, Default)]
struct State {
    next_handle: u64,
    live: Vec<(MemoryHandle, u64)>,
    attempts: Vec<u64>,
}

/// A hypervisor that manages a fixed amount of GPU memory.
///
/// Allocations are handed out back to back starting at [`SIM_LPAR_BASE`].
/// Calls arrive as raw register contents, exactly like they would on hardware.
#[derive(Debug)]
pub struct SimLv1 {
    capacity: u64,
    grant_limit: u64,
    failing_free: Option<Lv1Error>,
    state: Mutex<State>,
}

impl SimLv1 {
    /// A hypervisor with `capacity` bytes of GPU memory
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            grant_limit: capacity,
            failing_free: None,
            state: Mutex::new(State {
                next_handle: 1,
                ..State::default()
            }),
        }
    }

    /// Refuse every single allocation that is larger than `limit` bytes
    pub fn with_grant_limit(self, limit: u64) -> Self {
        Self {
            grant_limit: limit,
            ..self
        }
    }

    /// Answer every free with `error`
    pub fn with_failing_free(self, error: Lv1Error) -> Self {
        Self {
            failing_free: Some(error),
            ..self
        }
    }

    /// The sizes of all allocation requests in the order in which they were made
    pub fn attempts(&self) -> Vec<u64> {
        self.state.lock().unwrap().attempts.clone()
    }

    /// How many allocations have not been freed yet
    pub fn outstanding(&self) -> usize {
        self.state.lock().unwrap().live.len()
    }

    fn allocate(&self, args: GpuMemoryAllocateArgs) -> Lv1Result<GpuMemory> {
        let mut state = self.state.lock().unwrap();
        state.attempts.push(args.size);

        if args.reserved != [0; 4] {
            return Err(Lv1Error::IllegalParameterValue);
        }
        let used: u64 = state.live.iter().map(|(_, size)| size).sum();
        if args.size == 0 || args.size > self.grant_limit || used + args.size > self.capacity {
            return Err(Lv1Error::ResourceShortage);
        }

        let handle = MemoryHandle(state.next_handle);
        state.next_handle += 1;
        state.live.push((handle, args.size));
        Ok(GpuMemory {
            handle,
            lpar: SIM_LPAR_BASE + used,
        })
    }

    fn free(&self, args: GpuMemoryFreeArgs) -> Lv1Result<NoValue> {
        if let Some(e) = self.failing_free {
            return Err(e);
        }
        let mut state = self.state.lock().unwrap();
        match state.live.iter().position(|(handle, _)| *handle == args.handle) {
            Some(i) => {
                state.live.remove(i);
                Ok(NoValue)
            }
            None => Err(Lv1Error::NoEntry),
        }
    }
}

impl Lv1 for SimLv1 {
    fn raw_hvcall(&self, hvcall_no: u64, args: RawHvcallArgs) -> RawHvcallReturn {
        if hvcall_no == GpuMemoryAllocate::HVCALL_NO {
            match GpuMemoryAllocateArgs::try_from(args) {
                Ok(args) => self.allocate(args).into_response(),
                Err(e) => match e {},
            }
        } else if hvcall_no == GpuMemoryFree::HVCALL_NO {
            match GpuMemoryFreeArgs::try_from(args) {
                Ok(args) => self.free(args).into_response(),
                Err(e) => match e {},
            }
        } else {
            let unknown: Lv1Result<NoValue> = Err(Lv1Error::NotImplemented);
            unknown.into_response()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use lv1_abi::Lv1GpuMemory;

    #[test]
    fn test_allocations_are_placed_back_to_back() {
        let hv = SimLv1::new(4 << 20);
        let a = hv.gpu_memory_allocate(GpuMemoryAllocateArgs::ddr(1 << 20)).unwrap();
        let b = hv.gpu_memory_allocate(GpuMemoryAllocateArgs::ddr(2 << 20)).unwrap();
        assert_eq!(a.lpar, SIM_LPAR_BASE);
        assert_eq!(b.lpar, SIM_LPAR_BASE + (1 << 20));
        assert_ne!(a.handle, b.handle);
        assert_eq!(
            hv.gpu_memory_allocate(GpuMemoryAllocateArgs::ddr(2 << 20)),
            Err(Lv1Error::ResourceShortage)
        );
        assert_eq!(hv.outstanding(), 2);
    }

    #[test]
    fn test_free_of_unknown_handle_fails() {
        let hv = SimLv1::new(4 << 20);
        assert_eq!(
            hv.gpu_memory_free(MemoryHandle(0x99)),
            Err(Lv1Error::NoEntry)
        );
    }

    #[test]
    fn test_unknown_hvcall_is_not_implemented() {
        let hv = SimLv1::new(4 << 20);
        assert_eq!(hv.raw_hvcall(1, [0; 8])[0] as i64, -20);
    }
}
