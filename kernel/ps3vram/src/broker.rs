//! Negotiation of backing memory with the hypervisor

use crate::config::MIB;
use lv1_abi::{GpuMemoryAllocateArgs, Lv1Error, Lv1GpuMemory, MemoryHandle};
use pmap::PAddr;
use thiserror_no_std::Error;

/// GPU memory that the hypervisor handed out to the driver.
///
/// A region can only be given back once because [`Broker::release`] consumes it.
#[derive(Debug, Eq, PartialEq)]
pub struct BackingRegion {
    size: u64,
    handle: MemoryHandle,
    lpar: PAddr,
}

impl BackingRegion {
    /// How many bytes were granted
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn handle(&self) -> MemoryHandle {
        self.handle
    }

    /// The address at which the region starts
    pub fn lpar(&self) -> PAddr {
        self.lpar
    }
}

#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum BrokerError {
    #[error("the hypervisor refused every size from {preferred:#x} down to zero (last status: {last})")]
    Exhausted { preferred: u64, last: Lv1Error },
}

/// Allocates and frees the backing memory through the hypervisor
#[derive(Debug)]
pub struct Broker<H> {
    hv: H,
    step: u64,
}

impl<H: Lv1GpuMemory> Broker<H> {
    /// Create a broker that shrinks refused requests by `step` bytes
    pub fn new(hv: H, step: u64) -> Self {
        assert_ne!(step, 0, "a size step of zero would never terminate");
        Self { hv, step }
    }

    /// Allocate as much memory as possible, starting at `preferred` bytes.
    ///
    /// Every refused request is retried with `step` bytes less until the hypervisor grants one.
    /// Reaching zero is reported as [`BrokerError::Exhausted`].
    pub fn try_acquire(&self, preferred: u64) -> Result<BackingRegion, BrokerError> {
        let mut size = preferred;
        let mut last = Lv1Error::ResourceShortage;

        while size != 0 {
            log::debug!("requesting {size:#x} bytes of gpu memory");
            match self.hv.gpu_memory_allocate(GpuMemoryAllocateArgs::ddr(size)) {
                Ok(memory) => {
                    log::info!(
                        "ddr_size = {} MiB ({size} Bytes), memory_handle = {:#x}, ddr_lpar = {:#x}",
                        size / MIB,
                        memory.handle.0,
                        memory.lpar,
                    );
                    return Ok(BackingRegion {
                        size,
                        handle: memory.handle,
                        lpar: memory.lpar,
                    });
                }
                Err(e) => {
                    log::debug!("hypervisor refused {size:#x} bytes: {e}");
                    last = e;
                    size = size.saturating_sub(self.step);
                }
            }
        }

        Err(BrokerError::Exhausted { preferred, last })
    }

    /// Like [`try_acquire()`](Broker::try_acquire) but a driver without any memory cannot exist,
    /// so exhaustion halts the system.
    pub fn acquire(&self, preferred: u64) -> BackingRegion {
        match self.try_acquire(preferred) {
            Ok(region) => region,
            Err(e) => panic!("ps3vram: allocate gpu memory failed! ({e})"),
        }
    }

    /// Give the region back to the hypervisor.
    ///
    /// A refusal means the hypervisor disagrees with the driver about what it owns.
    /// Nothing can safely continue after that, so it halts the system.
    pub fn release(&self, region: BackingRegion) {
        log::debug!("freeing gpu memory {:?}", region.handle);
        if let Err(e) = self.hv.gpu_memory_free(region.handle) {
            panic!(
                "ps3vram: free gpu memory failed! (err = {}: {e})",
                e.status()
            );
        }
    }

    pub fn into_inner(self) -> H {
        self.hv
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use super::*;
    use ps3_sim::SimLv1;
    use std::vec;

    #[test]
    fn test_preferred_size_is_granted_directly() {
        let broker = Broker::new(SimLv1::new(256 * MIB), MIB);
        let region = broker.acquire(256 * MIB);
        assert_eq!(region.size(), 256 * MIB);
        assert_eq!(broker.into_inner().attempts(), vec![256 * MIB]);
    }

    #[test]
    fn test_size_steps_down_until_granted() {
        let hv = SimLv1::new(256 * MIB).with_grant_limit(253 * MIB);
        let broker = Broker::new(hv, MIB);
        let region = broker.acquire(256 * MIB);

        assert_eq!(region.size(), 253 * MIB);
        assert_eq!(
            broker.into_inner().attempts(),
            vec![256 * MIB, 255 * MIB, 254 * MIB, 253 * MIB]
        );
    }

    #[test]
    fn test_exhaustion_is_reported() {
        let broker = Broker::new(SimLv1::new(256 * MIB).with_grant_limit(0), MIB);
        assert_eq!(
            broker.try_acquire(4 * MIB),
            Err(BrokerError::Exhausted {
                preferred: 4 * MIB,
                last: Lv1Error::ResourceShortage
            })
        );
        assert_eq!(broker.into_inner().attempts().len(), 4);
    }

    #[test]
    fn test_step_larger_than_remainder_ends_at_zero() {
        let broker = Broker::new(SimLv1::new(256 * MIB).with_grant_limit(0), 2 * MIB);
        assert!(broker.try_acquire(3 * MIB).is_err());
        assert_eq!(broker.into_inner().attempts(), vec![3 * MIB, MIB]);
    }

    #[test]
    #[should_panic(expected = "allocate gpu memory failed")]
    fn test_exhaustion_halts() {
        let broker = Broker::new(SimLv1::new(256 * MIB).with_grant_limit(0), MIB);
        broker.acquire(256 * MIB);
    }

    #[test]
    fn test_release_returns_memory() {
        let broker = Broker::new(SimLv1::new(16 * MIB), MIB);
        let region = broker.acquire(16 * MIB);
        broker.release(region);
        assert_eq!(broker.into_inner().outstanding(), 0);
    }

    #[test]
    #[should_panic(expected = "free gpu memory failed! (err = -11")]
    fn test_release_failure_halts() {
        let hv = SimLv1::new(16 * MIB).with_failing_free(Lv1Error::WrongState);
        let broker = Broker::new(hv, MIB);
        let region = broker.acquire(16 * MIB);
        broker.release(region);
    }

    #[test]
    #[should_panic(expected = "free gpu memory failed! (err = -12")]
    fn test_release_failure_keeps_unknown_status() {
        let hv = SimLv1::new(16 * MIB).with_failing_free(Lv1Error::Unknown(-12));
        let broker = Broker::new(hv, MIB);
        let region = broker.acquire(16 * MIB);
        broker.release(region);
    }
}
