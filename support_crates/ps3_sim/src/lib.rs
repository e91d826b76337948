//! Host-side simulations of everything the ps3vram driver needs from its environment
//!
//! - [`SimLv1`] answers GPU memory hypervisor calls
//! - [`SimPmap`] is a kernel address window backed by simulated physical memory
//! - [`SimDisks`] records the disks a driver registers
//! - [`SimLogger`] collects log output so that tests can look at it

mod address_space;
mod disks;
mod logger;
mod lv1;

pub use address_space::{PmapStats, SimPmap};
pub use disks::{DiskHandle, SimDisks};
pub use logger::SimLogger;
pub use lv1::{SimLv1, SIM_LPAR_BASE};
