//! Kernel module glue
//!
//! The kernel only ever talks to a driver module through [`ModuleEvent`]s.
//! [`Ps3VramModule`] turns them into attaching and detaching a [`Ps3Vram`] and forwards I/O requests to it
//! while it is attached.

use crate::config::{ConfigError, ValidConfig, VramConfig};
use crate::device::Ps3Vram;
use core::mem;
use geom::{errno, Bio, DiskOps, DiskRegistry};
use lock_api::RawMutex;
use lv1_abi::Lv1GpuMemory;
use pmap::KernelPmap;
use thiserror_no_std::Error;

/// Events that the kernel delivers to a module
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ModuleEvent {
    Load,
    Unload,
    Quiesce,
    Shutdown,
}

/// The lifecycle phase of a module
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    Unloaded,
    Initializing,
    Ready,
    TearingDown,
}

#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum ModuleError {
    #[error("module event {0:?} is not supported")]
    Unsupported(ModuleEvent),
    #[error("module is already loaded")]
    AlreadyLoaded,
    #[error("module is not loaded")]
    NotLoaded,
}

impl ModuleError {
    /// The error number that is reported back to the kernel
    pub fn errno(&self) -> i32 {
        match self {
            ModuleError::Unsupported(_) => errno::EOPNOTSUPP,
            ModuleError::AlreadyLoaded => errno::EEXIST,
            ModuleError::NotLoaded => errno::ENXIO,
        }
    }
}

enum Slot<H, P, K, L> {
    Parked { hv: H, pmap: P },
    Attached(Ps3Vram<H, P, K, L>),
    /// Only observable if attaching or detaching panicked
    Poisoned,
}

/// The ps3vram kernel module.
///
/// While unloaded it keeps the hypervisor and pmap capabilities so that it can be loaded again.
pub struct Ps3VramModule<H, P, R: DiskRegistry, L> {
    config: ValidConfig,
    registry: R,
    phase: Phase,
    slot: Slot<H, P, R::Handle, L>,
}

impl<H, P, R, L> Ps3VramModule<H, P, R, L>
where
    H: Lv1GpuMemory,
    P: KernelPmap,
    R: DiskRegistry,
    L: RawMutex,
{
    /// Set up an unloaded module.
    ///
    /// An invalid config is refused here so that loading can never fail half way.
    pub fn new(config: VramConfig, hv: H, pmap: P, registry: R) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        Ok(Self {
            config,
            registry,
            phase: Phase::Unloaded,
            slot: Slot::Parked { hv, pmap },
        })
    }

    /// Handle an event delivered by the kernel
    pub fn handle_event(&mut self, event: ModuleEvent) -> Result<(), ModuleError> {
        log::debug!("{} received {event:?}", self.config.name);
        match event {
            ModuleEvent::Load => self.load(),
            ModuleEvent::Unload => self.unload(),
            other => Err(ModuleError::Unsupported(other)),
        }
    }

    fn load(&mut self) -> Result<(), ModuleError> {
        let (hv, pmap) = match mem::replace(&mut self.slot, Slot::Poisoned) {
            Slot::Parked { hv, pmap } => (hv, pmap),
            other => {
                self.slot = other;
                return Err(ModuleError::AlreadyLoaded);
            }
        };

        log::info!("{}_init()", self.config.name);
        self.phase = Phase::Initializing;
        let vram = Ps3Vram::attach(self.config, hv, pmap, &mut self.registry);
        self.slot = Slot::Attached(vram);
        self.phase = Phase::Ready;
        Ok(())
    }

    fn unload(&mut self) -> Result<(), ModuleError> {
        let vram = match mem::replace(&mut self.slot, Slot::Poisoned) {
            Slot::Attached(vram) => vram,
            other => {
                self.slot = other;
                return Err(ModuleError::NotLoaded);
            }
        };

        log::info!("{}_destroy()", self.config.name);
        self.phase = Phase::TearingDown;
        let (hv, pmap) = vram.detach(&mut self.registry);
        self.slot = Slot::Parked { hv, pmap };
        self.phase = Phase::Unloaded;
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The attached driver instance, if the module is loaded
    pub fn device(&self) -> Option<&Ps3Vram<H, P, R::Handle, L>> {
        match &self.slot {
            Slot::Attached(vram) => Some(vram),
            _ => None,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }
}

impl<H, P, R, L> DiskOps for Ps3VramModule<H, P, R, L>
where
    H: Lv1GpuMemory,
    P: KernelPmap,
    R: DiskRegistry,
    L: RawMutex,
{
    fn open(&self) -> Result<(), i32> {
        self.device().ok_or(errno::ENXIO)?.open()
    }

    fn close(&self) -> Result<(), i32> {
        self.device().ok_or(errno::ENXIO)?.close()
    }

    fn strategy(&self, bio: &mut Bio<'_>) {
        match self.device() {
            Some(vram) => vram.strategy(bio),
            None => {
                log::warn!("{} is not loaded, rejecting {bio:?}", self.config.name);
                bio.finish_err(errno::ENXIO);
            }
        }
    }
}
