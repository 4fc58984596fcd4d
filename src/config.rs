//! Board configuration
//!
//! Panel size and timing, canvas placement, backlight and CAN settings for the
//! dashboard board. GPIO numbers live in [`crate::st7701::pins`].
use embedded_graphics::geometry::Size;

use crate::backlight::BacklightConfig;
use crate::bus::BusConfiguration;
use crate::flush::Offset;
use crate::rgb::{
    BufferPolicy, ClockSource, DataPlaneConfig, FrameBufferPlacement, PanelGeometry, RgbPins,
    RgbTiming,
};
use crate::st7701::pins::Pins;

/// Physical panel resolution
pub const PANEL_WIDTH: u16 = 960;
pub const PANEL_HEIGHT: u16 = 1000;

pub const PCLK_HZ: u32 = 18_000_000;
pub const HSYNC_PULSE_WIDTH: u16 = 8;
pub const HSYNC_BACK_PORCH: u16 = 10;
pub const HSYNC_FRONT_PORCH: u16 = 50;
pub const VSYNC_PULSE_WIDTH: u16 = 3;
pub const VSYNC_BACK_PORCH: u16 = 8;
pub const VSYNC_FRONT_PORCH: u16 = 8;

/// Bounce buffer height in panel lines
pub const BOUNCE_BUFFER_LINES: usize = 10;

/// Where the canvas sits on the panel and how big its draw buffers are
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasLayout {
    pub width: u16,
    pub height: u16,
    pub offset: Offset,
    pub bytes_per_pixel: usize,
    /// Draw buffers hold 1/buffer_factor of the canvas. 5 is ~46 KB each.
    pub buffer_factor: usize,
}

impl Default for CanvasLayout {
    fn default() -> Self {
        CanvasLayout {
            width: 240,
            height: 960,
            offset: Offset::new(632, 26),
            bytes_per_pixel: 2,
            buffer_factor: 5,
        }
    }
}

impl CanvasLayout {
    pub fn size(&self) -> Size {
        Size::new(u32::from(self.width), u32::from(self.height))
    }

    /// Whether the canvas at its offset lies inside a `width` x `height` panel
    pub fn fits(&self, width: u16, height: u16) -> bool {
        u32::from(self.offset.x) + u32::from(self.width) <= u32::from(width)
            && u32::from(self.offset.y) + u32::from(self.height) <= u32::from(height)
    }
}

pub fn panel_size() -> Size {
    Size::new(u32::from(PANEL_WIDTH), u32::from(PANEL_HEIGHT))
}

/// RGB data plane: 16 data lines, RGB565, double frame buffer in PSRAM with a
/// bounce buffer in internal RAM
pub fn data_plane_config() -> DataPlaneConfig {
    DataPlaneConfig {
        clock_source: ClockSource::Xtal,
        timing: RgbTiming {
            pclk_hz: PCLK_HZ,
            h_res: PANEL_WIDTH,
            v_res: PANEL_HEIGHT,
            hsync_pulse_width: HSYNC_PULSE_WIDTH,
            hsync_back_porch: HSYNC_BACK_PORCH,
            hsync_front_porch: HSYNC_FRONT_PORCH,
            vsync_pulse_width: VSYNC_PULSE_WIDTH,
            vsync_back_porch: VSYNC_BACK_PORCH,
            vsync_front_porch: VSYNC_FRONT_PORCH,
            hsync_idle_low: false,
            vsync_idle_low: false,
            de_idle_high: false,
            pclk_active_neg: false,
            pclk_idle_high: false,
        },
        geometry: PanelGeometry {
            data_width: 16,
            bits_per_pixel: 16,
        },
        buffers: BufferPolicy {
            frame_buffers: 2,
            placement: FrameBufferPlacement::Psram,
            bounce_buffer_px: BOUNCE_BUFFER_LINES * usize::from(PANEL_WIDTH),
            psram_trans_align: 64,
            refresh_on_demand: false,
        },
        pins: RgbPins {
            hsync: Pins::RGB_HSYNC,
            vsync: Pins::RGB_VSYNC,
            de: Pins::RGB_DE,
            pclk: Pins::RGB_PCLK,
            disp: Pins::RGB_DISP,
            data: Pins::RGB_DATA,
        },
    }
}

pub fn bus_config() -> BusConfiguration {
    BusConfiguration::new(Pins::CAN_TX, Pins::CAN_RX)
}

pub fn backlight_config() -> BacklightConfig {
    BacklightConfig::default()
}

/// Brightness after boot
pub const DEFAULT_BRIGHTNESS: u8 = 80;
