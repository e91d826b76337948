//! A block device driver that exposes the DDR memory of the PS3 GPU as a disk
//!
//! At load time the driver asks the hypervisor for as much GPU memory as it is willing to give
//! (see [`broker`]) and registers a disk of exactly that size.
//! The memory is never mapped permanently.
//! Every I/O request instead maps the part of the memory it touches into a small, fixed window of kernel
//! virtual address space, copies its data and unmaps it again (see [`strategy`]).
//! Only one request can use the window at a time.
//!
//! The driver is written against four capabilities which are supplied by the hosting kernel:
//! - [`lv1_abi::Lv1`] to make hypervisor calls
//! - [`pmap::KernelPmap`] to enter and remove single page mappings in the window
//! - [`geom::DiskRegistry`] to make the disk visible
//! - a [`lock_api::RawMutex`] that puts requests waiting for the window to sleep
//!
//! The kernel drives the whole thing through [`Ps3VramModule::handle_event`].
#![no_std]

pub mod broker;
pub mod config;
mod device;
pub mod mapper;
pub mod module;
pub mod strategy;
pub mod window;

pub use broker::{BackingRegion, Broker, BrokerError};
pub use config::{ConfigError, ValidConfig, VramConfig};
pub use device::Ps3Vram;
pub use mapper::MapError;
pub use module::{ModuleError, ModuleEvent, Phase, Ps3VramModule};
pub use strategy::{Direction, TransferError};
