//! Block device framework surface
//!
//! A disk driver describes its device with a [`Disk`], hands it to a [`DiskRegistry`] and from then on receives
//! I/O requests as [`Bio`]s through its [`DiskOps`] implementation.
//!
//! A [`Bio`] is owned by the framework.
//! The driver fills in the completion status and calls [`Bio::biodone`] exactly once before returning control.
#![no_std]

mod bio;
mod disk;

pub use bio::{Bio, BioCmd, BioCompletion, BioFlags};
pub use disk::{Disk, DiskFlags, DiskOps, DiskRegistry};

/// Error numbers that are reported through [`Bio::error`] and the driver entry points
pub mod errno {
    /// Input/output error
    pub const EIO: i32 = 5;
    /// Device not configured
    pub const ENXIO: i32 = 6;
    /// File exists
    pub const EEXIST: i32 = 17;
    /// Invalid argument
    pub const EINVAL: i32 = 22;
    /// Operation not supported
    pub const EOPNOTSUPP: i32 = 45;
}
