//! Execution of block I/O requests

use crate::device::Ps3Vram;
use crate::mapper::MapError;
use geom::{errno, Bio, BioCmd, DiskOps};
use lock_api::RawMutex;
use lv1_abi::Lv1GpuMemory;
use pmap::{KernelPmap, PAGESIZE};
use thiserror_no_std::Error;

/// Which way a transfer copies data
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Direction {
    /// From the device into the request buffer
    Read,
    /// From the request buffer onto the device
    Write,
}

impl TryFrom<BioCmd> for Direction {
    type Error = TransferError;

    fn try_from(cmd: BioCmd) -> Result<Self, Self::Error> {
        match cmd {
            BioCmd::READ => Ok(Direction::Read),
            BioCmd::WRITE => Ok(Direction::Write),
            BioCmd(other) => Err(TransferError::InvalidCommand(other)),
        }
    }
}

/// Why a single request could not be executed.
///
/// None of these affect the driver itself, it keeps serving other requests.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum TransferError {
    #[error("unsupported bio command {0}")]
    InvalidCommand(u8),
    #[error("transfer of {length:#x} bytes at {offset:#x} does not cover whole sectors")]
    Unaligned { offset: u64, length: u64 },
    #[error("transfer of {length:#x} bytes exceeds the maximum of {max:#x}")]
    TooLarge { length: u64, max: u64 },
    #[error("transfer of {length:#x} bytes at {offset:#x} does not fit into {size:#x} bytes of memory")]
    OutOfRange { offset: u64, length: u64, size: u64 },
    #[error("could not map backing memory: {0}")]
    Map(#[from] MapError),
}

impl TransferError {
    /// The error number with which the request is completed
    pub fn errno(&self) -> i32 {
        match self {
            TransferError::InvalidCommand(_)
            | TransferError::Unaligned { .. }
            | TransferError::TooLarge { .. } => errno::EINVAL,
            TransferError::OutOfRange { .. } | TransferError::Map(_) => errno::EIO,
        }
    }
}

impl<H, P, K, L> Ps3Vram<H, P, K, L>
where
    H: Lv1GpuMemory,
    P: KernelPmap,
    L: RawMutex,
{
    fn check_bounds(&self, offset: u64, length: u64) -> Result<(), TransferError> {
        let sector = PAGESIZE as u64;
        if offset % sector != 0 || length % sector != 0 {
            return Err(TransferError::Unaligned { offset, length });
        }
        if length > self.config.max_transfer {
            return Err(TransferError::TooLarge {
                length,
                max: self.config.max_transfer,
            });
        }
        let size = self.region.size();
        match offset.checked_add(length) {
            Some(end) if end <= size => Ok(()),
            _ => Err(TransferError::OutOfRange {
                offset,
                length,
                size,
            }),
        }
    }

    /// Copy between the request buffer and backing memory.
    ///
    /// The affected part of backing memory is mapped into the window only for the duration of the copy.
    /// Concurrent callers are serialized on the window.
    /// The request is validated completely before anything is mapped; it is not completed here.
    pub fn execute(&self, bio: &mut Bio<'_>) -> Result<(), TransferError> {
        let direction = Direction::try_from(bio.cmd)?;
        let (offset, length) = (bio.offset, bio.length());
        self.check_bounds(offset, length)?;
        if length == 0 {
            return Ok(());
        }

        log::trace!("{direction:?} {length:#x} bytes at {offset:#x}");
        let mut window = self.window.lock();
        let mut range = window.map(self.region.lpar() + offset, length)?;
        match direction {
            Direction::Read => bio.data.copy_from_slice(range.bytes()),
            Direction::Write => range.bytes().copy_from_slice(&*bio.data),
        }
        Ok(())
    }
}

impl<H, P, K, L> DiskOps for Ps3Vram<H, P, K, L>
where
    H: Lv1GpuMemory,
    P: KernelPmap,
    L: RawMutex,
{
    fn strategy(&self, bio: &mut Bio<'_>) {
        match self.execute(bio) {
            Ok(()) => bio.finish_ok(),
            Err(e) => {
                log::warn!("{}{}: rejecting {bio:?}: {e}", self.config.name, self.config.unit);
                bio.finish_err(e.errno());
            }
        }
    }
}
