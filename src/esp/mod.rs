//! ESP-IDF implementations of the driver seams
//!
//! Thin wrappers over `esp_idf_svc::sys`: the SPI control bus, the RGB panel,
//! DMA capable heap memory and the TWAI driver. Everything above them is plain
//! Rust and tests on the host.
pub mod control_bus;
pub mod heap;
pub mod rgb_panel;
pub mod twai;

use esp_idf_svc::sys::{configTICK_RATE_HZ, TickType_t};

/// Milliseconds to FreeRTOS ticks, rounded up so a non-zero wait never becomes 0
pub(crate) fn ms_to_ticks(ms: u32) -> TickType_t {
    let hz = u64::from(configTICK_RATE_HZ);
    ((u64::from(ms) * hz).div_ceil(1000)) as TickType_t
}
