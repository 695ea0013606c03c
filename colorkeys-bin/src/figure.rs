//! Composing an image and its palettes into a single figure

use colorkeys::{
	render::{render_bar, HIST_BAR_HEIGHT},
	Palette,
};
use image::{
	imageops::{self, FilterType},
	Rgb, RgbImage,
};
use std::path::{Path, PathBuf};

/// The height the image is rescaled to
pub const FIGURE_IMAGE_HEIGHT: u32 = 400;

/// Space around and between the panels
const GAP: u32 = 8;

/// The figure background
const BACKGROUND: Rgb<u8> = Rgb([128, 128, 128]);

/// The width of the image once rescaled to [`FIGURE_IMAGE_HEIGHT`]
fn scaled_width(width: u32, height: u32) -> u32 {
	let scaled = u64::from(width) * u64::from(FIGURE_IMAGE_HEIGHT) / u64::from(height.max(1));
	u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

/// Draw the rescaled image on top, followed by one histogram bar per palette
pub fn compose(image: &RgbImage, palettes: &[Palette]) -> RgbImage {
	let (width, height) = image.dimensions();
	let width = scaled_width(width, height);
	let resized = imageops::resize(image, width, FIGURE_IMAGE_HEIGHT, FilterType::Triangle);

	let panels = u32::try_from(palettes.len()).unwrap_or(u32::MAX);
	let canvas_height = GAP + FIGURE_IMAGE_HEIGHT + GAP + panels.saturating_mul(HIST_BAR_HEIGHT + GAP);
	let mut canvas = RgbImage::from_pixel(width + 2 * GAP, canvas_height, BACKGROUND);

	imageops::overlay(&mut canvas, &resized, i64::from(GAP), i64::from(GAP));

	let mut y = 2 * GAP + FIGURE_IMAGE_HEIGHT;
	for palette in palettes {
		let bar = render_bar(palette, width, HIST_BAR_HEIGHT);
		imageops::overlay(&mut canvas, &bar, i64::from(GAP), i64::from(y));
		y += HIST_BAR_HEIGHT + GAP;
	}

	canvas
}

/// The figure path for the `index`-th of `count` images.
///
/// With more than one image, the index is appended to the file stem.
pub fn figure_path(path: &Path, index: usize, count: usize) -> PathBuf {
	if count <= 1 {
		return path.to_owned();
	}

	let stem = path.file_stem().map_or_else(|| "figure".into(), |s| s.to_string_lossy());
	let name = match path.extension() {
		Some(ext) => format!("{stem}_{index}.{}", ext.to_string_lossy()),
		None => format!("{stem}_{index}"),
	};
	path.with_file_name(name)
}

#[cfg(test)]
mod tests {
	use super::*;
	use colorkeys::ColorSpace;

	#[test]
	fn figure_dimensions() {
		let image = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
		let palettes = vec![
			Palette::new(&[0, 1], &[[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]], ColorSpace::Rgb),
			Palette::new(&[0], &[[0.0, 1.0, 0.0]], ColorSpace::Rgb),
		];

		let figure = compose(&image, &palettes);

		assert_eq!(figure.dimensions(), (800 + 2 * GAP, 2 * GAP + 400 + 2 * (HIST_BAR_HEIGHT + GAP)));
		assert_eq!(figure.get_pixel(0, 0), &BACKGROUND);
		assert_eq!(figure.get_pixel(GAP + 400, GAP + 200), &Rgb([255, 255, 255]));

		let first_bar = 2 * GAP + 400;
		assert_eq!(figure.get_pixel(GAP, first_bar), &Rgb([255, 0, 0]));
		assert_eq!(figure.get_pixel(GAP + 799, first_bar), &Rgb([0, 0, 255]));
		let second_bar = first_bar + HIST_BAR_HEIGHT + GAP;
		assert_eq!(figure.get_pixel(GAP + 400, second_bar), &Rgb([0, 255, 0]));
	}

	#[test]
	fn figure_paths() {
		let path = Path::new("out/plot.png");
		assert_eq!(figure_path(path, 0, 1), PathBuf::from("out/plot.png"));
		assert_eq!(figure_path(path, 2, 3), PathBuf::from("out/plot_2.png"));
		assert_eq!(figure_path(Path::new("plot"), 1, 2), PathBuf::from("plot_1"));
	}
}
