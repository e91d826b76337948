use crate::Bio;
use bitflags::bitflags;

bitflags! {
    /// Optional capabilities a [`Disk`] advertises to the framework
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
    pub struct DiskFlags: u32 {
        /// The driver understands [`BioCmd::DELETE`](crate::BioCmd::DELETE)
        const CANDELETE = 0x0004;
        /// The driver understands [`BioCmd::FLUSH`](crate::BioCmd::FLUSH)
        const CANFLUSHCACHE = 0x0008;
    }
}

/// Description of a disk as it is presented to the rest of the system
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Disk {
    /// Name of the disk driver, combined with `unit` to form the device name
    pub name: &'static str,
    pub unit: u32,
    /// Size of one sector in bytes. Every request is a multiple of it.
    pub sectorsize: u32,
    /// Total size of the medium in bytes
    pub mediasize: u64,
    /// The largest single request the driver accepts, in bytes.
    /// The framework splits larger requests.
    pub maxsize: u64,
    pub flags: DiskFlags,
}

impl Disk {
    /// How many sectors the medium holds
    pub fn sectors(&self) -> u64 {
        self.mediasize / self.sectorsize as u64
    }
}

/// The entry points through which the framework drives a registered disk
pub trait DiskOps {
    /// Called when the disk is opened. The default does nothing.
    fn open(&self) -> Result<(), i32> {
        Ok(())
    }

    /// Called when the disk is closed. The default does nothing.
    fn close(&self) -> Result<(), i32> {
        Ok(())
    }

    /// Execute the request.
    ///
    /// Implementations must complete `bio` before returning, regardless of whether it succeeded.
    fn strategy(&self, bio: &mut Bio<'_>);
}

/// The framework side of disk registration
pub trait DiskRegistry {
    /// Identifies a registered disk
    type Handle;

    /// Make `disk` visible to the system
    fn disk_create(&mut self, disk: Disk) -> Self::Handle;

    /// Remove a disk again.
    ///
    /// After this returns the framework no longer dispatches requests for it.
    fn disk_destroy(&mut self, handle: Self::Handle);
}
