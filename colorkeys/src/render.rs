//! Drawing a [`Palette`] as a horizontal bar

use crate::Palette;
use image::{Rgb, RgbImage};
use std::ops::Range;

/// The default height of a histogram bar in pixels
pub const HIST_BAR_HEIGHT: u32 = 30;

/// The background color left where no entry is drawn
const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

/// The columns covered by each palette entry when drawn into a bar of the given width.
///
/// Each entry spans `round(weight * width)` columns starting where the previous one ended,
/// clipped to the bar. Rounding errors are not reconciled,
/// so the last entry may be cut short or leave a few background columns at the right edge.
#[must_use]
pub fn bar_spans(palette: &Palette, width: u32) -> Vec<Range<u32>> {
	let mut x = 0_u32;
	palette
		.entries()
		.iter()
		.map(|entry| {
			// weight is in [0, 1], so the span is in [0, width]
			#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
			let span = (entry.weight * f64::from(width)).round() as u32;
			let start = x.min(width);
			x = x.saturating_add(span);
			start..x.min(width)
		})
		.collect()
}

/// Render a palette as a `width` × `height` bar, with entries drawn left to right in palette order
#[must_use]
pub fn render_bar(palette: &Palette, width: u32, height: u32) -> RgbImage {
	let mut columns = vec![BACKGROUND; width as usize];
	for (span, entry) in bar_spans(palette, width).into_iter().zip(palette) {
		for x in span {
			columns[x as usize] = Rgb(entry.color);
		}
	}

	RgbImage::from_fn(width, height, |x, _| columns[x as usize])
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ColorSpace;

	fn palette(assignments: &[u32]) -> Palette {
		let centroids = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0, 1.0]];
		Palette::new(assignments, &centroids, ColorSpace::Rgb)
	}

	#[test]
	fn spans_are_contiguous_and_proportional() {
		let spans = bar_spans(&palette(&[0, 0, 1, 2]), 100);
		assert_eq!(spans, vec![0..50, 50..75, 75..100]);
	}

	#[test]
	fn overshoot_is_clipped() {
		// round(50.5) + round(50.5) = 102 > 101
		let spans = bar_spans(&palette(&[0, 1]), 101);
		assert_eq!(spans, vec![0..51, 51..101]);
	}

	#[test]
	fn drawn_width_is_bounded() {
		let assignments = [0, 1, 1, 2, 2, 2, 3];
		let p = palette(&assignments);

		for width in [1, 7, 10, 33, 100, 257, 1000] {
			let drawn = bar_spans(&p, width).iter().map(|span| span.len()).sum::<usize>();
			assert!(drawn <= width as usize);
			assert!((width as usize) - drawn < p.len());
		}
	}

	#[test]
	fn render_fills_columns() {
		let bar = render_bar(&palette(&[0, 0, 0, 2]), 8, 3);

		assert_eq!(bar.dimensions(), (8, 3));
		for y in 0..3 {
			for x in 0..6 {
				assert_eq!(bar.get_pixel(x, y), &Rgb([255, 0, 0]));
			}
			for x in 6..8 {
				assert_eq!(bar.get_pixel(x, y), &Rgb([0, 0, 255]));
			}
		}
	}

	#[test]
	fn undershoot_leaves_background() {
		// three equal thirds of 10 columns round to 3 each
		let bar = render_bar(&palette(&[0, 1, 2]), 10, 1);
		assert_eq!(bar.get_pixel(9, 0), &BACKGROUND);
		assert_eq!(bar.get_pixel(8, 0), &Rgb([0, 0, 255]));
	}
}
