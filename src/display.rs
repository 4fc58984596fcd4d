//! Display subsystem
//!
//! Owns everything the display needs for the lifetime of the firmware: the
//! command sequencer (the panel stays addressable), the data-plane panel behind
//! the flush bridge, and the graphics display with its draw buffers. Built once
//! by [`bring_up`] in the only safe order:
//!
//! 1. panel reset and command transcript
//! 1. data plane
//! 1. draw buffers
//! 1. flush callback
use display_interface::DisplayError;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::buffers::{allocate_frame_buffers, AllocError, DmaAllocator};
use crate::config::CanvasLayout;
use crate::flush::FlushBridge;
use crate::gfx::{GfxDisplay, GfxError, Rotation};
use crate::rgb::{configure_data_plane, DataPlaneConfig, PanelError, RgbPanel, RgbPanelFactory};
use crate::st7701::driver::{PanelReady, St7701};
use crate::st7701::interface::ControlBus;
use crate::window::PanelWindow;

#[derive(Debug, thiserror::Error)]
pub enum DisplayInitError {
    #[error("panel command sequence failed: {0:?}")]
    Sequencer(DisplayError),
    #[error(transparent)]
    DataPlane(#[from] PanelError),
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error(transparent)]
    Gfx(#[from] GfxError),
}

/// Flush callback type the display subsystem registers
pub type PanelFlush<P> = FlushBridge<PanelWindow<P>>;

pub struct Display<BUS, CS, RST, DELAY, P: RgbPanel, A: DmaAllocator> {
    pub sequencer: St7701<BUS, CS, RST, DELAY>,
    pub gfx: GfxDisplay<A, PanelFlush<P>>,
    ready: PanelReady,
}

impl<BUS, CS, RST, DELAY, P, A> Display<BUS, CS, RST, DELAY, P, A>
where
    P: RgbPanel,
    A: DmaAllocator,
{
    /// Proof of a completed bring-up, for the backlight
    pub fn ready(&self) -> &PanelReady {
        &self.ready
    }
}

/// Register draw buffers and the flush bridge on `gfx`.
///
/// If either buffer cannot be allocated nothing is registered, the display
/// stays without a flush callback.
pub fn attach<P, A>(
    gfx: &mut GfxDisplay<A, PanelFlush<P>>,
    window: PanelWindow<P>,
    alloc: &A,
    layout: &CanvasLayout,
) -> Result<(), DisplayInitError>
where
    P: RgbPanel,
    A: DmaAllocator,
{
    if !layout.fits(window.width(), window.height()) {
        log::warn!(
            "Canvas {}x{} at ({}, {}) exceeds the {}x{} panel, edges are clipped",
            layout.width,
            layout.height,
            layout.offset.x,
            layout.offset.y,
            window.width(),
            window.height()
        );
    }

    let buffers = allocate_frame_buffers(
        alloc,
        usize::from(layout.width),
        usize::from(layout.height),
        layout.bytes_per_pixel,
        layout.buffer_factor,
    )
    .map_err(|e| {
        log::error!("Draw buffer allocation failed, display disabled: {}", e);
        e
    })?;

    gfx.set_buffers(buffers)?;
    gfx.set_rotation(Rotation::Deg0)?;
    gfx.set_flush(FlushBridge::new(window, layout.offset));
    Ok(())
}

/// Bring the whole display up. The first failing step ends bring-up.
pub fn bring_up<BUS, CS, RST, DELAY, F, A>(
    mut sequencer: St7701<BUS, CS, RST, DELAY>,
    factory: &mut F,
    data_plane: &DataPlaneConfig,
    alloc: &A,
    layout: &CanvasLayout,
) -> Result<Display<BUS, CS, RST, DELAY, F::Panel, A>, DisplayInitError>
where
    BUS: ControlBus,
    CS: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
    F: RgbPanelFactory,
    A: DmaAllocator,
{
    let ready = sequencer.init().map_err(|e| {
        log::error!("ST7701 bring-up failed: {:?}", e);
        DisplayInitError::Sequencer(e)
    })?;

    let panel = configure_data_plane(&ready, factory, data_plane)?;
    let window = PanelWindow::new(panel, data_plane.timing.h_res, data_plane.timing.v_res);

    let mut gfx = GfxDisplay::new(
        layout.size(),
        embedded_graphics::geometry::Size::new(
            u32::from(window.width()),
            u32::from(window.height()),
        ),
    );
    attach(&mut gfx, window, alloc, layout)?;

    log::info!("Display online");
    Ok(Display {
        sequencer,
        gfx,
        ready,
    })
}
