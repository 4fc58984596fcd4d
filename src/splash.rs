//! Boot splash
//!
//! Title, a frame around the gauge area and a line of bus statistics. Drawn
//! stripe by stripe like every other scene, so it must not depend on what the
//! target already contains.
use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Text};

/// Part of the canvas holding the statistics line, invalidate this when they change
pub const STATUS_AREA: Rectangle = Rectangle::new(Point::new(0, 900), Size::new(240, 40));

/// What the status line shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusStatus {
    pub online: bool,
    pub frames: u32,
    pub dropped_alerts: u32,
}

pub fn draw<D>(target: &mut D, status: &BusStatus) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    target.clear(Rgb565::BLACK)?;

    let size = target.bounding_box().size;
    let center = size.width as i32 / 2;

    let title = MonoTextStyle::new(&FONT_10X20, Rgb565::WHITE);
    Text::with_alignment("CAN", Point::new(center, 60), title, Alignment::Center).draw(target)?;
    Text::with_alignment("DASHBOARD", Point::new(center, 90), title, Alignment::Center)
        .draw(target)?;

    Rectangle::new(Point::new(10, 120), Size::new(size.width.saturating_sub(20), 760))
        .into_styled(PrimitiveStyle::with_stroke(Rgb565::CSS_DARK_GRAY, 2))
        .draw(target)?;

    let small = MonoTextStyle::new(&FONT_6X10, Rgb565::CSS_LIGHT_GRAY);
    let line = if status.online {
        format!("rx {}  drops {}", status.frames, status.dropped_alerts)
    } else {
        "CAN offline".to_string()
    };
    Text::with_alignment(&line, Point::new(center, 920), small, Alignment::Center).draw(target)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    /// Counts pixels per color class
    struct Census {
        size: Size,
        lit: usize,
        lit_in_status: usize,
    }

    impl OriginDimensions for Census {
        fn size(&self) -> Size {
            self.size
        }
    }

    impl DrawTarget for Census {
        type Color = Rgb565;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Infallible>
        where
            I: IntoIterator<Item = Pixel<Rgb565>>,
        {
            for Pixel(point, color) in pixels {
                if color != Rgb565::BLACK {
                    self.lit += 1;
                    if STATUS_AREA.contains(point) {
                        self.lit_in_status += 1;
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn status_line_stays_inside_its_area() {
        let mut census = Census {
            size: Size::new(240, 960),
            lit: 0,
            lit_in_status: 0,
        };
        draw(&mut census, &BusStatus::default()).unwrap();
        assert!(census.lit > 0);
        assert!(census.lit_in_status > 0);
    }
}
