//! CAN dashboard firmware library
//!
//! An ST7701 panel driven over a 9-bit SPI control bus and a parallel RGB data
//! plane, a partial render graphics display bridged onto it, and a TWAI
//! configuration sized for bursty vehicle buses.
//!
//! All protocol logic is written against `embedded-hal` and the small traits in
//! this crate; the `esp` module (device builds only) holds the ESP-IDF
//! implementations.
pub mod backlight;
pub mod buffers;
pub mod bus;
pub mod config;
pub mod display;
pub mod expander;
pub mod flush;
pub mod gfx;
pub mod rgb;
pub mod splash;
pub mod st7701;
pub mod window;

#[cfg(target_os = "espidf")]
pub mod esp;
