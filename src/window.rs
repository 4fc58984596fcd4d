//! Window / blit primitive on top of the data-plane panel
//!
//! Callers pass inclusive end coordinates, the data-plane driver wants
//! exclusive ones. The window is clamped to the panel and empty windows never
//! reach the driver.
use crate::rgb::RgbPanel;

/// Region of the physical panel, end coordinates exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalWindow {
    pub x_start: u16,
    pub x_end: u16,
    pub y_start: u16,
    pub y_end: u16,
}

impl PhysicalWindow {
    /// Window from inclusive end coordinates, clamped to `width` x `height`.
    /// `None` if nothing is left to draw.
    pub fn clamp(
        x_start: u16,
        x_end: u16,
        y_start: u16,
        y_end: u16,
        width: u16,
        height: u16,
    ) -> Option<Self> {
        let x_end = (u32::from(x_end) + 1).min(u32::from(width)) as u16;
        let y_end = (u32::from(y_end) + 1).min(u32::from(height)) as u16;

        if x_start >= x_end || y_start >= y_end {
            return None;
        }

        Some(PhysicalWindow {
            x_start,
            x_end,
            y_start,
            y_end,
        })
    }

    pub fn width(&self) -> u16 {
        self.x_end - self.x_start
    }

    pub fn height(&self) -> u16 {
        self.y_end - self.y_start
    }

    pub fn pixel_count(&self) -> usize {
        usize::from(self.width()) * usize::from(self.height())
    }
}

/// Rectangular pixel transfer. Fire and forget, end coordinates inclusive.
pub trait Blit {
    fn blit(&mut self, x_start: u16, x_end: u16, y_start: u16, y_end: u16, pixels: &[u8]);
}

impl<T: Blit + ?Sized> Blit for &mut T {
    fn blit(&mut self, x_start: u16, x_end: u16, y_start: u16, y_end: u16, pixels: &[u8]) {
        (**self).blit(x_start, x_end, y_start, y_end, pixels)
    }
}

/// The data-plane panel with its physical bounds
pub struct PanelWindow<P> {
    panel: P,
    width: u16,
    height: u16,
}

impl<P: RgbPanel> PanelWindow<P> {
    pub fn new(panel: P, width: u16, height: u16) -> Self {
        PanelWindow {
            panel,
            width,
            height,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }
}

impl<P: RgbPanel> Blit for PanelWindow<P> {
    fn blit(&mut self, x_start: u16, x_end: u16, y_start: u16, y_end: u16, pixels: &[u8]) {
        let Some(window) =
            PhysicalWindow::clamp(x_start, x_end, y_start, y_end, self.width, self.height)
        else {
            log::trace!(
                "skipping empty blit ({}, {}) - ({}, {})",
                x_start,
                y_start,
                x_end,
                y_end
            );
            return;
        };

        log::trace!("blit {:?}", window);
        // Driver errors are not reported to the caller, only logged
        if let Err(e) = self.panel.draw_bitmap(
            window.x_start,
            window.y_start,
            window.x_end,
            window.y_end,
            pixels,
        ) {
            log::warn!("draw_bitmap {:?} failed: {:?}", window, e);
        }
    }
}
