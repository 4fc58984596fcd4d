//! `esp_lcd` RGB panel
use core::ffi::c_void;
use core::ptr;

use esp_idf_svc::sys::*;

use crate::rgb::{ClockSource, DataPlaneConfig, FrameBufferPlacement, RgbPanel, RgbPanelFactory};

pub struct EspRgbPanel {
    handle: esp_lcd_panel_handle_t,
}

// The handle is only used from the display task
unsafe impl Send for EspRgbPanel {}

impl RgbPanel for EspRgbPanel {
    type Error = EspError;

    fn reset(&mut self) -> Result<(), EspError> {
        esp!(unsafe { esp_lcd_panel_reset(self.handle) })
    }

    fn init(&mut self) -> Result<(), EspError> {
        esp!(unsafe { esp_lcd_panel_init(self.handle) })
    }

    fn draw_bitmap(
        &mut self,
        x_start: u16,
        y_start: u16,
        x_end: u16,
        y_end: u16,
        pixels: &[u8],
    ) -> Result<(), EspError> {
        esp!(unsafe {
            esp_lcd_panel_draw_bitmap(
                self.handle,
                i32::from(x_start),
                i32::from(y_start),
                i32::from(x_end),
                i32::from(y_end),
                pixels.as_ptr() as *const c_void,
            )
        })
    }
}

#[derive(Debug, Default)]
pub struct EspRgbPanelFactory;

impl RgbPanelFactory for EspRgbPanelFactory {
    type Panel = EspRgbPanel;
    type Error = EspError;

    fn create(&mut self, config: &DataPlaneConfig) -> Result<EspRgbPanel, EspError> {
        let timing = &config.timing;

        let mut timing_flags = esp_lcd_rgb_timing_t__bindgen_ty_1::default();
        timing_flags.set_hsync_idle_low(timing.hsync_idle_low as u32);
        timing_flags.set_vsync_idle_low(timing.vsync_idle_low as u32);
        timing_flags.set_de_idle_high(timing.de_idle_high as u32);
        timing_flags.set_pclk_active_neg(timing.pclk_active_neg as u32);
        timing_flags.set_pclk_idle_high(timing.pclk_idle_high as u32);

        let mut flags = esp_lcd_rgb_panel_config_t__bindgen_ty_1::default();
        flags.set_fb_in_psram((config.buffers.placement == FrameBufferPlacement::Psram) as u32);
        flags.set_double_fb((config.buffers.frame_buffers == 2) as u32);
        flags.set_refresh_on_demand(config.buffers.refresh_on_demand as u32);

        let clk_src = match config.clock_source {
            ClockSource::Xtal => soc_periph_lcd_clk_src_t_LCD_CLK_SRC_XTAL,
            ClockSource::Pll160M => soc_periph_lcd_clk_src_t_LCD_CLK_SRC_PLL160M,
            ClockSource::Pll240M => soc_periph_lcd_clk_src_t_LCD_CLK_SRC_PLL240M,
        };

        let panel_config = esp_lcd_rgb_panel_config_t {
            clk_src,
            timings: esp_lcd_rgb_timing_t {
                pclk_hz: timing.pclk_hz,
                h_res: u32::from(timing.h_res),
                v_res: u32::from(timing.v_res),
                hsync_pulse_width: u32::from(timing.hsync_pulse_width),
                hsync_back_porch: u32::from(timing.hsync_back_porch),
                hsync_front_porch: u32::from(timing.hsync_front_porch),
                vsync_pulse_width: u32::from(timing.vsync_pulse_width),
                vsync_back_porch: u32::from(timing.vsync_back_porch),
                vsync_front_porch: u32::from(timing.vsync_front_porch),
                flags: timing_flags,
            },
            data_width: usize::from(config.geometry.data_width),
            bits_per_pixel: usize::from(config.geometry.bits_per_pixel),
            num_fbs: usize::from(config.buffers.frame_buffers),
            bounce_buffer_size_px: config.buffers.bounce_buffer_px,
            psram_trans_align: config.buffers.psram_trans_align,
            hsync_gpio_num: config.pins.hsync,
            vsync_gpio_num: config.pins.vsync,
            de_gpio_num: config.pins.de,
            pclk_gpio_num: config.pins.pclk,
            disp_gpio_num: config.pins.disp,
            data_gpio_nums: config.pins.data,
            flags,
            ..Default::default()
        };

        let mut handle: esp_lcd_panel_handle_t = ptr::null_mut();
        esp!(unsafe { esp_lcd_new_rgb_panel(&panel_config, &mut handle) })?;
        Ok(EspRgbPanel { handle })
    }
}
