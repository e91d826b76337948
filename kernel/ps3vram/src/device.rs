//! Attaching and detaching a driver instance

use crate::broker::{BackingRegion, Broker};
use crate::config::{ValidConfig, MIB};
use crate::window::MappingWindow;
use geom::{Disk, DiskFlags, DiskRegistry};
use lock_api::{Mutex, RawMutex};
use lv1_abi::Lv1GpuMemory;
use pmap::{KernelPmap, PAGESIZE};

/// A driver instance: GPU memory exposed as a disk.
///
/// It owns the backing memory, the window through which that memory is accessed and the registration of the disk.
/// The backing memory and the disk description never change while the instance exists, only the window is
/// shared mutable state and it lives behind a lock.
///
/// The lock `L` is provided by the kernel. Contending requests wait for the whole duration of a transfer,
/// so it should put them to sleep instead of spinning.
pub struct Ps3Vram<H, P, K, L> {
    pub(crate) config: ValidConfig,
    pub(crate) broker: Broker<H>,
    pub(crate) region: BackingRegion,
    pub(crate) window: Mutex<L, MappingWindow<P>>,
    pub(crate) disk: Disk,
    disk_handle: K,
}

impl<H, P, K, L> Ps3Vram<H, P, K, L>
where
    H: Lv1GpuMemory,
    P: KernelPmap,
    L: RawMutex,
{
    /// Negotiate backing memory with the hypervisor and register a disk for it.
    ///
    /// # Panics
    /// If the hypervisor does not grant any memory at all.
    pub fn attach<R>(config: ValidConfig, hv: H, pmap: P, disks: &mut R) -> Self
    where
        R: DiskRegistry<Handle = K>,
    {
        log::info!("attaching {}{}", config.name, config.unit);

        let broker = Broker::new(hv, config.size_step);
        let region = broker.acquire(config.preferred_size);

        log::info!("virt_addr = {:#x}", config.window_base);
        let window = MappingWindow::new(pmap, config.window_base, config.max_transfer);

        let disk = Disk {
            name: config.name,
            unit: config.unit,
            sectorsize: PAGESIZE as u32,
            mediasize: region.size(),
            maxsize: config.max_transfer,
            flags: DiskFlags::empty(),
        };
        log::info!("block size = {}", disk.sectorsize);
        let disk_handle = disks.disk_create(disk);

        log::info!("{}{} ready", config.name, config.unit);
        Self {
            config,
            broker,
            region,
            window: Mutex::new(window),
            disk,
            disk_handle,
        }
    }

    /// Deregister the disk and give the backing memory back.
    ///
    /// The hypervisor and pmap capabilities are returned so that the driver can be attached again later.
    ///
    /// # Panics
    /// If the hypervisor refuses to take the memory back.
    pub fn detach<R>(self, disks: &mut R) -> (H, P)
    where
        R: DiskRegistry<Handle = K>,
    {
        log::info!("detaching {}{}", self.config.name, self.config.unit);

        disks.disk_destroy(self.disk_handle);
        self.broker.release(self.region);
        let pmap = self.window.into_inner().into_pmap();

        log::info!(
            "{}{} destroyed",
            self.config.name,
            self.config.unit
        );
        (self.broker.into_inner(), pmap)
    }

    /// The disk as it was registered
    pub fn disk(&self) -> &Disk {
        &self.disk
    }

    /// The memory backing the disk
    pub fn region(&self) -> &BackingRegion {
        &self.region
    }

    /// How large the backing memory is in MiB, rounded down
    pub fn size_mib(&self) -> u64 {
        self.region.size() / MIB
    }
}
