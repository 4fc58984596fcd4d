//! Partial render display
//!
//! The retained-mode side of the display: it owns the two draw buffers, tracks
//! which parts of the virtual canvas changed, renders those parts in stripes
//! into alternating buffers through an `embedded-graphics` [`DrawTarget`] and
//! pushes every stripe through the registered [`Flush`] callback.
//!
//! A buffer is only reused after the flush callback acknowledged it through its
//! [`FlushSignal`].
use core::cell::Cell;
use core::convert::Infallible;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::buffers::{DmaAllocator, FrameBuffers};
use crate::flush::DirtyRegion;

/// More separate dirty areas than this and the whole canvas is redrawn
pub const MAX_DIRTY_AREAS: usize = 16;

const BYTES_PER_PIXEL: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GfxError {
    #[error("draw buffers or flush callback not registered")]
    NotReady,
    #[error("software rotation is not supported on this panel")]
    RotationUnsupported,
    #[error("draw buffer of {len} bytes cannot hold one line of {line} bytes")]
    BufferTooSmall { len: usize, line: usize },
    #[error("flush callback returned without signaling completion")]
    FlushNotAcknowledged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

/// Completion handle passed to [`Flush::flush`]. Consumed by [`Self::ready`], so
/// a flush can acknowledge at most once. The counter is shared, whoever holds
/// a reference to it sees the acknowledgement as soon as it happens.
pub struct FlushSignal<'a> {
    acknowledged: &'a Cell<u32>,
}

impl<'a> FlushSignal<'a> {
    pub fn new(acknowledged: &'a Cell<u32>) -> Self {
        FlushSignal { acknowledged }
    }

    /// The pixels handed to the flush are no longer needed
    pub fn ready(self) {
        self.acknowledged.set(self.acknowledged.get() + 1);
    }
}

/// Receives rendered regions of the virtual canvas
pub trait Flush {
    /// `pixels` is RGB565, little endian, row major, exactly covering `region`.
    fn flush(&mut self, region: DirtyRegion, pixels: &[u8], done: FlushSignal<'_>);
}

impl<T: Flush + ?Sized> Flush for &mut T {
    fn flush(&mut self, region: DirtyRegion, pixels: &[u8], done: FlushSignal<'_>) {
        (**self).flush(region, pixels, done)
    }
}

/// Draw target covering one stripe of the canvas. Drawing outside the stripe is
/// clipped, so the same scene can simply be drawn into every stripe.
pub struct StripeTarget<'a> {
    area: Rectangle,
    canvas: Size,
    pixels: &'a mut [u8],
}

impl StripeTarget<'_> {
    /// Part of the canvas this stripe covers
    pub fn area(&self) -> Rectangle {
        self.area
    }

    fn put(&mut self, point: Point, color: Rgb565) {
        if !self.area.contains(point) {
            return;
        }
        let x = (point.x - self.area.top_left.x) as usize;
        let y = (point.y - self.area.top_left.y) as usize;
        let index = (y * self.area.size.width as usize + x) * BYTES_PER_PIXEL;
        self.pixels[index..index + BYTES_PER_PIXEL]
            .copy_from_slice(&color.into_storage().to_le_bytes());
    }
}

impl OriginDimensions for StripeTarget<'_> {
    fn size(&self) -> Size {
        self.canvas
    }
}

impl DrawTarget for StripeTarget<'_> {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.put(point, color);
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.area);
        for point in area.points() {
            self.put(point, color);
        }
        Ok(())
    }
}

/// The graphics display: virtual canvas, draw buffers, flush callback
pub struct GfxDisplay<A: DmaAllocator, F> {
    virtual_size: Size,
    physical_size: Size,
    buffers: Option<FrameBuffers<A>>,
    flush: Option<F>,
    flush_registrations: usize,
    dirty: Vec<Rectangle>,
    next_buffer: usize,
}

impl<A: DmaAllocator, F: Flush> GfxDisplay<A, F> {
    /// A display for a `virtual_size` canvas shown on a `physical_size` panel.
    /// The whole canvas starts out dirty.
    pub fn new(virtual_size: Size, physical_size: Size) -> Self {
        log::info!(
            "Graphics display: canvas {}x{} on panel {}x{}",
            virtual_size.width,
            virtual_size.height,
            physical_size.width,
            physical_size.height
        );
        GfxDisplay {
            virtual_size,
            physical_size,
            buffers: None,
            flush: None,
            flush_registrations: 0,
            dirty: vec![Rectangle::new(Point::zero(), virtual_size)],
            next_buffer: 0,
        }
    }

    pub fn virtual_size(&self) -> Size {
        self.virtual_size
    }

    pub fn physical_size(&self) -> Size {
        self.physical_size
    }

    fn line_bytes(&self) -> usize {
        self.virtual_size.width as usize * BYTES_PER_PIXEL
    }

    /// Hand over the draw buffers. Each has to hold at least one canvas line.
    pub fn set_buffers(&mut self, buffers: FrameBuffers<A>) -> Result<(), GfxError> {
        let line = self.line_bytes();
        if buffers.len() < line || buffers.buf2.len() < line {
            return Err(GfxError::BufferTooSmall {
                len: buffers.len().min(buffers.buf2.len()),
                line,
            });
        }
        log::debug!("Draw buffers registered, {} lines each", buffers.len() / line);
        self.buffers = Some(buffers);
        Ok(())
    }

    pub fn has_buffers(&self) -> bool {
        self.buffers.is_some()
    }

    pub fn set_flush(&mut self, flush: F) {
        self.flush = Some(flush);
        self.flush_registrations += 1;
        log::info!("Flush callback registered");
    }

    /// How often a flush callback was registered
    pub fn flush_registrations(&self) -> usize {
        self.flush_registrations
    }

    pub fn flush_target(&self) -> Option<&F> {
        self.flush.as_ref()
    }

    /// Only the native orientation is supported, the panel has no hardware
    /// rotation for this mode and software rotation is not implemented.
    pub fn set_rotation(&mut self, rotation: Rotation) -> Result<(), GfxError> {
        match rotation {
            Rotation::Deg0 => Ok(()),
            other => {
                log::error!("Rotation {:?} requested, not supported", other);
                Err(GfxError::RotationUnsupported)
            }
        }
    }

    /// Mark `area` of the canvas for redraw
    pub fn invalidate(&mut self, area: Rectangle) {
        let canvas = Rectangle::new(Point::zero(), self.virtual_size);
        let mut area = area.intersection(&canvas);
        if area.is_zero_sized() {
            return;
        }

        // Absorb every overlapping area until nothing overlaps any more
        while let Some(index) = self
            .dirty
            .iter()
            .position(|d| !d.intersection(&area).is_zero_sized())
        {
            area = envelope(&self.dirty.swap_remove(index), &area);
        }

        if self.dirty.len() >= MAX_DIRTY_AREAS {
            self.invalidate_all();
            return;
        }
        self.dirty.push(area);
    }

    pub fn invalidate_all(&mut self) {
        self.dirty.clear();
        self.dirty
            .push(Rectangle::new(Point::zero(), self.virtual_size));
    }

    pub fn dirty_areas(&self) -> &[Rectangle] {
        &self.dirty
    }

    /// Redraw the dirty areas. `draw` paints the full scene, it is called once
    /// per stripe with a target clipped to that stripe. Returns the number of
    /// stripes flushed.
    pub fn refresh<D>(&mut self, mut draw: D) -> Result<usize, GfxError>
    where
        D: FnMut(&mut StripeTarget<'_>),
    {
        let (Some(buffers), Some(flush)) = (self.buffers.as_mut(), self.flush.as_mut()) else {
            return Err(GfxError::NotReady);
        };
        let buffer_len = buffers.len();
        let mut stripes = 0;

        let pending = core::mem::take(&mut self.dirty);
        for (index, area) in pending.iter().enumerate() {
            let row_bytes = area.size.width as usize * BYTES_PER_PIXEL;
            let rows_per_stripe = (buffer_len / row_bytes).max(1) as u32;
            let mut row = 0;

            while row < area.size.height {
                let rows = rows_per_stripe.min(area.size.height - row);
                let stripe = Rectangle::new(
                    area.top_left + Point::new(0, row as i32),
                    Size::new(area.size.width, rows),
                );
                let len = row_bytes * rows as usize;

                let buffer = if self.next_buffer == 0 {
                    &mut buffers.buf1
                } else {
                    &mut buffers.buf2
                };
                self.next_buffer ^= 1;

                let mut target = StripeTarget {
                    area: stripe,
                    canvas: self.virtual_size,
                    pixels: &mut buffer[..len],
                };
                draw(&mut target);

                let acknowledged = Cell::new(0);
                flush.flush(
                    region_of(&stripe),
                    &buffer[..len],
                    FlushSignal::new(&acknowledged),
                );
                if acknowledged.get() != 1 {
                    log::error!("Flush of {:?} was not acknowledged", stripe);
                    // the unacknowledged stripe and everything after it stay dirty
                    let unflushed = Rectangle::new(
                        stripe.top_left,
                        Size::new(area.size.width, area.size.height - row),
                    );
                    self.dirty = core::iter::once(unflushed)
                        .chain(pending[index + 1..].iter().copied())
                        .collect();
                    return Err(GfxError::FlushNotAcknowledged);
                }

                stripes += 1;
                row += rows;
            }
        }

        log::trace!("refresh flushed {} stripes", stripes);
        Ok(stripes)
    }
}

fn envelope(a: &Rectangle, b: &Rectangle) -> Rectangle {
    let a_end = a.top_left + a.size;
    let b_end = b.top_left + b.size;
    let top_left = a.top_left.component_min(b.top_left);
    let end = a_end.component_max(b_end);
    let size = Size::new((end.x - top_left.x) as u32, (end.y - top_left.y) as u32);
    Rectangle::new(top_left, size)
}

fn region_of(area: &Rectangle) -> DirtyRegion {
    let end = area.top_left + area.size - Point::new(1, 1);
    DirtyRegion {
        x1: area.top_left.x as u16,
        y1: area.top_left.y as u16,
        x2: end.x as u16,
        y2: end.y as u16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::{allocate_frame_buffers, SystemDmaAllocator};
    use embedded_graphics::pixelcolor::RgbColor;
    use embedded_graphics::primitives::{PrimitiveStyle, StyledDrawable};

    #[derive(Default)]
    struct Recorder {
        regions: Vec<DirtyRegion>,
        pointers: Vec<*const u8>,
        first_pixels: Vec<[u8; 2]>,
        /// Flushes still acknowledged, `None` for all of them
        ack_budget: Option<usize>,
    }

    impl Recorder {
        fn acknowledging(flushes: usize) -> Self {
            Recorder {
                ack_budget: Some(flushes),
                ..Default::default()
            }
        }
    }

    impl Flush for Recorder {
        fn flush(&mut self, region: DirtyRegion, pixels: &[u8], done: FlushSignal<'_>) {
            assert_eq!(
                pixels.len(),
                usize::from(region.width()) * usize::from(region.height()) * 2
            );
            self.regions.push(region);
            self.pointers.push(pixels.as_ptr());
            self.first_pixels.push([pixels[0], pixels[1]]);
            match self.ack_budget.as_mut() {
                Some(0) => {}
                Some(budget) => {
                    *budget -= 1;
                    done.ready();
                }
                None => done.ready(),
            }
        }
    }

    fn display() -> GfxDisplay<SystemDmaAllocator, Recorder> {
        let mut display = GfxDisplay::new(Size::new(240, 960), Size::new(960, 1000));
        let buffers = allocate_frame_buffers(&SystemDmaAllocator, 240, 960, 2, 5).unwrap();
        display.set_buffers(buffers).unwrap();
        display.set_flush(Recorder::default());
        display
    }

    #[test]
    fn full_canvas_is_flushed_in_five_stripes() {
        let mut display = display();

        let stripes = display
            .refresh(|target| {
                target.clear(Rgb565::RED).ok();
            })
            .unwrap();

        assert_eq!(stripes, 5);
        let recorder = display.flush_target().unwrap();
        assert_eq!(
            recorder.regions[0],
            DirtyRegion {
                x1: 0,
                y1: 0,
                x2: 239,
                y2: 191
            }
        );
        assert_eq!(recorder.regions[4].y2, 959);
        assert_eq!(
            recorder.first_pixels[0],
            Rgb565::RED.into_storage().to_le_bytes()
        );
    }

    #[test]
    fn stripes_alternate_between_buffers() {
        let mut display = display();
        display.refresh(|_| {}).unwrap();

        let pointers = &display.flush_target().unwrap().pointers;
        assert_ne!(pointers[0], pointers[1]);
        assert_eq!(pointers[0], pointers[2]);
        assert_eq!(pointers[1], pointers[3]);
    }

    #[test]
    fn nothing_dirty_nothing_flushed() {
        let mut display = display();
        display.refresh(|_| {}).unwrap();
        assert_eq!(display.refresh(|_| {}).unwrap(), 0);
    }

    #[test]
    fn small_invalidation_flushes_only_that_area() {
        let mut display = display();
        display.refresh(|_| {}).unwrap();

        display.invalidate(Rectangle::new(Point::new(10, 20), Size::new(11, 11)));
        let stripes = display
            .refresh(|target| {
                Rectangle::new(Point::new(10, 20), Size::new(1, 1))
                    .draw_styled(&PrimitiveStyle::with_fill(Rgb565::WHITE), target)
                    .ok();
            })
            .unwrap();

        assert_eq!(stripes, 1);
        let recorder = display.flush_target().unwrap();
        assert_eq!(
            recorder.regions.last(),
            Some(&DirtyRegion {
                x1: 10,
                y1: 20,
                x2: 20,
                y2: 30
            })
        );
        assert_eq!(recorder.first_pixels.last(), Some(&[0xFF, 0xFF]));
    }

    #[test]
    fn overlapping_invalidations_merge() {
        let mut display = display();
        display.refresh(|_| {}).unwrap();

        display.invalidate(Rectangle::new(Point::new(0, 0), Size::new(10, 10)));
        display.invalidate(Rectangle::new(Point::new(5, 5), Size::new(10, 10)));
        display.invalidate(Rectangle::new(Point::new(100, 100), Size::new(1, 1)));
        // clipped to the canvas
        display.invalidate(Rectangle::new(Point::new(230, 950), Size::new(50, 50)));
        display.invalidate(Rectangle::new(Point::new(300, 0), Size::new(5, 5)));

        assert_eq!(
            display.dirty_areas(),
            &[
                Rectangle::new(Point::new(0, 0), Size::new(15, 15)),
                Rectangle::new(Point::new(100, 100), Size::new(1, 1)),
                Rectangle::new(Point::new(230, 950), Size::new(10, 10)),
            ]
        );
    }

    #[test]
    fn too_many_areas_redraw_everything() {
        let mut display = display();
        display.refresh(|_| {}).unwrap();

        for i in 0..=MAX_DIRTY_AREAS as i32 {
            display.invalidate(Rectangle::new(Point::new(0, i * 10), Size::new(1, 1)));
        }

        assert_eq!(
            display.dirty_areas(),
            &[Rectangle::new(Point::zero(), Size::new(240, 960))]
        );
    }

    #[test]
    fn refresh_needs_buffers_and_flush() {
        let mut display: GfxDisplay<SystemDmaAllocator, Recorder> =
            GfxDisplay::new(Size::new(240, 960), Size::new(960, 1000));
        assert_eq!(display.refresh(|_| {}), Err(GfxError::NotReady));
        assert_eq!(display.flush_registrations(), 0);
    }

    #[test]
    fn unacknowledged_flush_stops_rendering() {
        let mut display = display();
        display.set_flush(Recorder::acknowledging(0));

        assert_eq!(
            display.refresh(|_| {}),
            Err(GfxError::FlushNotAcknowledged)
        );
        assert_eq!(display.flush_target().unwrap().regions.len(), 1);
    }

    #[test]
    fn unacknowledged_stripe_stays_dirty() {
        let mut display = display();
        display.set_flush(Recorder::acknowledging(0));

        assert!(display.refresh(|_| {}).is_err());
        assert_eq!(
            display.dirty_areas(),
            &[Rectangle::new(Point::zero(), Size::new(240, 960))]
        );

        display.set_flush(Recorder::default());
        assert_eq!(display.refresh(|_| {}), Ok(5));
        assert!(display.dirty_areas().is_empty());
    }

    #[test]
    fn refresh_resumes_at_the_failed_stripe() {
        let mut display = display();
        display.set_flush(Recorder::acknowledging(2));

        assert_eq!(
            display.refresh(|_| {}),
            Err(GfxError::FlushNotAcknowledged)
        );
        // two 192 line stripes went out
        assert_eq!(
            display.dirty_areas(),
            &[Rectangle::new(Point::new(0, 384), Size::new(240, 576))]
        );

        display.set_flush(Recorder::default());
        assert_eq!(display.refresh(|_| {}), Ok(3));
        let recorder = display.flush_target().unwrap();
        assert_eq!(recorder.regions[0].y1, 384);
        assert_eq!(recorder.regions[2].y2, 959);
    }

    #[test]
    fn areas_after_the_failure_stay_dirty() {
        let mut display = display();
        display.refresh(|_| {}).unwrap();
        display.set_flush(Recorder::acknowledging(0));

        display.invalidate(Rectangle::new(Point::new(0, 0), Size::new(10, 10)));
        display.invalidate(Rectangle::new(Point::new(100, 100), Size::new(1, 1)));
        assert!(display.refresh(|_| {}).is_err());

        assert_eq!(
            display.dirty_areas(),
            &[
                Rectangle::new(Point::new(0, 0), Size::new(10, 10)),
                Rectangle::new(Point::new(100, 100), Size::new(1, 1)),
            ]
        );
    }

    #[test]
    fn only_native_rotation() {
        let mut display = display();
        assert_eq!(display.set_rotation(Rotation::Deg0), Ok(()));
        assert_eq!(
            display.set_rotation(Rotation::Deg90),
            Err(GfxError::RotationUnsupported)
        );
    }

    #[test]
    fn buffer_must_hold_a_line() {
        let mut display: GfxDisplay<SystemDmaAllocator, Recorder> =
            GfxDisplay::new(Size::new(240, 960), Size::new(960, 1000));
        let tiny = allocate_frame_buffers(&SystemDmaAllocator, 100, 1, 2, 1).unwrap();
        assert_eq!(
            display.set_buffers(tiny),
            Err(GfxError::BufferTooSmall { len: 200, line: 480 })
        );
        assert!(!display.has_buffers());
    }
}
