//! Panel Data Plane
//!
//! Timing, geometry and frame buffer policy of the parallel RGB interface, and
//! the step that creates the data-plane panel once the command transcript is
//! done. The data plane streams continuously from its own frame buffers; the
//! actual driver sits behind [`RgbPanelFactory`] / [`RgbPanel`].
use crate::st7701::driver::PanelReady;

/// Pixel clock source of the LCD peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    /// Crystal, 40 MHz. Slow but independent of CPU frequency changes.
    Xtal,
    Pll160M,
    Pll240M,
}

/// Sync/porch timing. Widths and porches in pixel clocks (horizontal) or lines
/// (vertical).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbTiming {
    pub pclk_hz: u32,
    pub h_res: u16,
    pub v_res: u16,
    pub hsync_pulse_width: u16,
    pub hsync_back_porch: u16,
    pub hsync_front_porch: u16,
    pub vsync_pulse_width: u16,
    pub vsync_back_porch: u16,
    pub vsync_front_porch: u16,
    pub hsync_idle_low: bool,
    pub vsync_idle_low: bool,
    pub de_idle_high: bool,
    pub pclk_active_neg: bool,
    pub pclk_idle_high: bool,
}

impl RgbTiming {
    /// Total pixel clocks per frame including blanking
    pub fn clocks_per_frame(&self) -> u64 {
        let line = u64::from(self.h_res)
            + u64::from(self.hsync_pulse_width)
            + u64::from(self.hsync_back_porch)
            + u64::from(self.hsync_front_porch);
        let lines = u64::from(self.v_res)
            + u64::from(self.vsync_pulse_width)
            + u64::from(self.vsync_back_porch)
            + u64::from(self.vsync_front_porch);
        line * lines
    }

    /// Frame rate this timing produces, in millihertz
    pub fn refresh_mhz(&self) -> u64 {
        match self.clocks_per_frame() {
            0 => 0,
            clocks => u64::from(self.pclk_hz) * 1000 / clocks,
        }
    }
}

/// Bus width and pixel format of the data plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelGeometry {
    pub data_width: u8,
    pub bits_per_pixel: u8,
}

/// Where the data plane's own frame buffers live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBufferPlacement {
    /// Fast, small. One frame of this panel does not fit twice.
    InternalSram,
    /// Large, slower. Needs a bounce buffer to keep the timing engine fed.
    Psram,
}

/// Frame buffer policy. There is no default on purpose, the caller decides the
/// bandwidth / capacity trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPolicy {
    pub frame_buffers: u8,
    pub placement: FrameBufferPlacement,
    /// Staging buffer between frame buffer memory and the timing engine, in
    /// pixels. 0 disables it.
    pub bounce_buffer_px: usize,
    pub psram_trans_align: usize,
    pub refresh_on_demand: bool,
}

/// GPIO assignment of the data plane, -1 for unused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbPins {
    pub hsync: i32,
    pub vsync: i32,
    pub de: i32,
    pub pclk: i32,
    pub disp: i32,
    pub data: [i32; 16],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPlaneConfig {
    pub clock_source: ClockSource,
    pub timing: RgbTiming,
    pub geometry: PanelGeometry,
    pub buffers: BufferPolicy,
    pub pins: RgbPins,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PanelError {
    #[error("invalid data plane configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("data plane panel handle could not be created")]
    HandleCreationFailed,
    #[error("data plane panel reset failed")]
    ResetFailed,
    #[error("data plane panel init failed")]
    InitFailed,
}

impl DataPlaneConfig {
    /// Reject what the RGB driver would refuse anyway, with a readable reason
    pub fn validate(&self) -> Result<(), PanelError> {
        let timing = &self.timing;
        if timing.h_res == 0 || timing.v_res == 0 {
            return Err(PanelError::InvalidConfig("resolution must be non-zero"));
        }
        if timing.pclk_hz == 0 {
            return Err(PanelError::InvalidConfig("pixel clock must be non-zero"));
        }
        if !matches!(self.geometry.data_width, 8 | 16) {
            return Err(PanelError::InvalidConfig("data width must be 8 or 16 lines"));
        }
        if !matches!(self.geometry.bits_per_pixel, 16 | 24) {
            return Err(PanelError::InvalidConfig("bits per pixel must be 16 or 24"));
        }
        if !(1..=3).contains(&self.buffers.frame_buffers) {
            return Err(PanelError::InvalidConfig("1 to 3 frame buffers"));
        }
        let frame_px = usize::from(timing.h_res) * usize::from(timing.v_res);
        let bounce = self.buffers.bounce_buffer_px;
        if bounce > 0 && frame_px % bounce != 0 {
            return Err(PanelError::InvalidConfig(
                "frame size must be a multiple of the bounce buffer size",
            ));
        }
        if self.buffers.placement == FrameBufferPlacement::Psram && bounce == 0 {
            log::warn!("Frame buffers in PSRAM without a bounce buffer, expect tearing");
        }
        Ok(())
    }

    /// Bytes of one data-plane frame buffer
    pub fn frame_bytes(&self) -> usize {
        usize::from(self.timing.h_res)
            * usize::from(self.timing.v_res)
            * usize::from(self.geometry.bits_per_pixel / 8)
    }
}

/// The data-plane driver once created
pub trait RgbPanel {
    type Error: core::fmt::Debug;

    fn reset(&mut self) -> Result<(), Self::Error>;

    fn init(&mut self) -> Result<(), Self::Error>;

    /// Copy `pixels` into the frame buffer region `[x_start, x_end) x [y_start, y_end)`
    fn draw_bitmap(
        &mut self,
        x_start: u16,
        y_start: u16,
        x_end: u16,
        y_end: u16,
        pixels: &[u8],
    ) -> Result<(), Self::Error>;
}

impl<T: RgbPanel + ?Sized> RgbPanel for &mut T {
    type Error = T::Error;

    fn reset(&mut self) -> Result<(), Self::Error> {
        (**self).reset()
    }

    fn init(&mut self) -> Result<(), Self::Error> {
        (**self).init()
    }

    fn draw_bitmap(
        &mut self,
        x_start: u16,
        y_start: u16,
        x_end: u16,
        y_end: u16,
        pixels: &[u8],
    ) -> Result<(), Self::Error> {
        (**self).draw_bitmap(x_start, y_start, x_end, y_end, pixels)
    }
}

/// Creates the data-plane driver from a configuration
pub trait RgbPanelFactory {
    type Panel: RgbPanel;
    type Error: core::fmt::Debug;

    fn create(&mut self, config: &DataPlaneConfig) -> Result<Self::Panel, Self::Error>;
}

/// Create the data-plane panel, then reset and initialize it.
///
/// Takes the [`PanelReady`] token: the RGB stream is only meaningful once the
/// command transcript has put the controller into RGB mode.
pub fn configure_data_plane<F: RgbPanelFactory>(
    _ready: &PanelReady,
    factory: &mut F,
    config: &DataPlaneConfig,
) -> Result<F::Panel, PanelError> {
    config.validate()?;

    log::info!(
        "Configuring RGB data plane {}x{} @ {} Hz pclk, {} frame buffer(s) in {:?}, bounce {} px",
        config.timing.h_res,
        config.timing.v_res,
        config.timing.pclk_hz,
        config.buffers.frame_buffers,
        config.buffers.placement,
        config.buffers.bounce_buffer_px
    );

    let mut panel = factory.create(config).map_err(|e| {
        log::error!("RGB panel creation failed: {:?}", e);
        PanelError::HandleCreationFailed
    })?;

    panel.reset().map_err(|e| {
        log::error!("RGB panel reset failed: {:?}", e);
        PanelError::ResetFailed
    })?;
    panel.init().map_err(|e| {
        log::error!("RGB panel init failed: {:?}", e);
        PanelError::InitFailed
    })?;

    log::info!(
        "RGB data plane running, ~{}.{:03} fps",
        config.timing.refresh_mhz() / 1000,
        config.timing.refresh_mhz() % 1000
    );
    Ok(panel)
}
