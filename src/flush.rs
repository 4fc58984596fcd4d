//! Flush bridge between the graphics display and the panel window
//!
//! The virtual canvas is a 240x960 strip placed inside the larger physical
//! panel, so every dirty region is shifted by a fixed offset before it is
//! blitted. The completion signal goes back only after the blit returned.
use crate::gfx::{Flush, FlushSignal};
use crate::window::Blit;

/// Changed area of the virtual canvas, inclusive corners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRegion {
    pub x1: u16,
    pub y1: u16,
    pub x2: u16,
    pub y2: u16,
}

impl DirtyRegion {
    /// Saturates at `u16::MAX` for a region spanning the whole coordinate range
    pub fn width(&self) -> u16 {
        self.x2.saturating_sub(self.x1).saturating_add(1)
    }

    pub fn height(&self) -> u16 {
        self.y2.saturating_sub(self.y1).saturating_add(1)
    }
}

/// Position of the virtual canvas inside the physical panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset {
    pub x: u16,
    pub y: u16,
}

impl Offset {
    pub const fn new(x: u16, y: u16) -> Self {
        Offset { x, y }
    }

    /// Region in physical coordinates, still inclusive. Saturates, the window
    /// clamps to the panel afterwards.
    pub fn translate(&self, region: DirtyRegion) -> DirtyRegion {
        DirtyRegion {
            x1: region.x1.saturating_add(self.x),
            y1: region.y1.saturating_add(self.y),
            x2: region.x2.saturating_add(self.x),
            y2: region.y2.saturating_add(self.y),
        }
    }
}

pub struct FlushBridge<B> {
    target: B,
    offset: Offset,
}

impl<B: Blit> FlushBridge<B> {
    pub fn new(target: B, offset: Offset) -> Self {
        FlushBridge { target, offset }
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    pub fn target(&self) -> &B {
        &self.target
    }
}

impl<B: Blit> Flush for FlushBridge<B> {
    fn flush(&mut self, region: DirtyRegion, pixels: &[u8], done: FlushSignal<'_>) {
        let physical = self.offset.translate(region);
        self.target
            .blit(physical.x1, physical.x2, physical.y1, physical.y2, pixels);
        done.ready();
    }
}
