//! Load-time configuration of the driver

use core::ops::Deref;
use pmap::{is_page_aligned, VAddr};
use thiserror_no_std::Error;

/// One mebibyte
pub const MIB: u64 = 1024 * 1024;

/// Tunables of a driver instance.
///
/// The values in [`VramConfig::DEFAULT`] describe the PS3; other values are mainly useful for tests.
/// A config must pass [`validate()`](VramConfig::validate) before a driver can be attached with it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VramConfig {
    /// How much memory is requested from the hypervisor before stepping down
    pub preferred_size: u64,
    /// By how much the request shrinks after each refused allocation
    pub size_step: u64,
    /// Start of the kernel virtual address range through which backing memory is accessed.
    /// The range must be reserved for the driver.
    pub window_base: VAddr,
    /// Largest single transfer, which is also the size of the window
    pub max_transfer: u64,
    /// Name under which the disk is registered
    pub name: &'static str,
    pub unit: u32,
}

impl VramConfig {
    pub const DEFAULT: Self = Self {
        preferred_size: 256 * MIB,
        size_step: MIB,
        window_base: 0x1_0000_0000,
        max_transfer: MIB,
        name: "ps3vram",
        unit: 0,
    };

    pub const fn with_preferred_size(self, preferred_size: u64) -> Self {
        Self {
            preferred_size,
            ..self
        }
    }

    pub const fn with_size_step(self, size_step: u64) -> Self {
        Self { size_step, ..self }
    }

    pub const fn with_window(self, window_base: VAddr, max_transfer: u64) -> Self {
        Self {
            window_base,
            max_transfer,
            ..self
        }
    }

    /// Check that the config describes something that can be mapped page by page
    pub fn validate(self) -> Result<ValidConfig, ConfigError> {
        if self.preferred_size == 0 || !is_page_aligned(self.preferred_size) {
            return Err(ConfigError::PreferredSize(self.preferred_size));
        }
        if self.size_step == 0 || !is_page_aligned(self.size_step) {
            return Err(ConfigError::SizeStep(self.size_step));
        }
        if self.max_transfer == 0 || !is_page_aligned(self.max_transfer) {
            return Err(ConfigError::MaxTransfer(self.max_transfer));
        }
        if !is_page_aligned(self.window_base)
            || self.window_base.checked_add(self.max_transfer).is_none()
        {
            return Err(ConfigError::Window {
                base: self.window_base,
                size: self.max_transfer,
            });
        }
        Ok(ValidConfig(self))
    }
}

impl Default for VramConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A [`VramConfig`] that passed validation
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ValidConfig(VramConfig);

impl Deref for ValidConfig {
    type Target = VramConfig;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum ConfigError {
    #[error("preferred size {0:#x} is zero or not page aligned")]
    PreferredSize(u64),
    #[error("size step {0:#x} is zero or not page aligned")]
    SizeStep(u64),
    #[error("maximum transfer size {0:#x} is zero or not page aligned")]
    MaxTransfer(u64),
    #[error("window of {size:#x} bytes at {base:#x} is not page aligned or wraps the address space")]
    Window { base: VAddr, size: u64 },
}
