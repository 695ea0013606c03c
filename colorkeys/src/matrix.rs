//! Reshaping images into sample matrices for clustering

use crate::{
	colorspace::{convert, triplet_rgb_to_hsv, triplet_to_float, ColorSpace, Triplet, Triplet8},
	Error, Result,
};
use image::{RgbImage, RgbaImage};
use palette::Srgb;
use std::collections::HashMap;

/// A borrowed, row-major height × width × channels image buffer of 8-bit RGB(A) values
#[derive(Debug, Clone, Copy)]
pub struct ImageMatrix<'a> {
	/// Interleaved channel values
	data: &'a [u8],
	/// Number of rows
	height: usize,
	/// Number of columns
	width: usize,
	/// Number of channels per pixel, 3 or 4
	channels: usize,
}

impl<'a> ImageMatrix<'a> {
	/// Wrap a raw image buffer, validating its channel count and length.
	///
	/// # Errors
	/// Returns [`Error::UnsupportedChannelCount`] if `channels` is not 3 or 4,
	/// and [`Error::ShapeMismatch`] if `data` does not have `height * width * channels` values.
	pub fn new(data: &'a [u8], height: usize, width: usize, channels: usize) -> Result<Self> {
		if !(3..=4).contains(&channels) {
			return Err(Error::UnsupportedChannelCount(channels));
		}

		let expected = height.saturating_mul(width).saturating_mul(channels);
		if data.len() != expected {
			return Err(Error::ShapeMismatch { expected, actual: data.len() });
		}

		Ok(Self { data, height, width, channels })
	}

	/// The (height, width, channels) of this image
	#[must_use]
	pub const fn shape(&self) -> (usize, usize, usize) {
		(self.height, self.width, self.channels)
	}

	/// The number of pixels in this image
	#[must_use]
	pub const fn num_pixels(&self) -> usize {
		self.height * self.width
	}

	/// Reshape into an N × 3 matrix in row-major pixel order, dropping any alpha channel
	#[must_use]
	pub fn flatten(&self) -> Vec<Triplet8> {
		self.data.chunks_exact(self.channels).map(|p| [p[0], p[1], p[2]]).collect()
	}
}

impl<'a> From<&'a RgbImage> for ImageMatrix<'a> {
	fn from(image: &'a RgbImage) -> Self {
		let (width, height) = image.dimensions();
		Self {
			data: image.as_raw(),
			height: height as usize,
			width: width as usize,
			channels: 3,
		}
	}
}

impl<'a> From<&'a RgbaImage> for ImageMatrix<'a> {
	fn from(image: &'a RgbaImage) -> Self {
		let (width, height) = image.dimensions();
		Self {
			data: image.as_raw(),
			height: height as usize,
			width: width as usize,
			channels: 4,
		}
	}
}

/// Reshape a raw height × width × channels buffer into an N × 3 matrix.
///
/// # Errors
/// See [`ImageMatrix::new`].
pub fn flatten(data: &[u8], height: usize, width: usize, channels: usize) -> Result<Vec<Triplet8>> {
	Ok(ImageMatrix::new(data, height, width, channels)?.flatten())
}

/// The N × 3 sample matrix given to the clustering algorithms.
///
/// Identical pixels are merged into a single weighted sample,
/// but the per-pixel order is kept through an index into the unique colors.
#[derive(Debug, Clone)]
pub struct PixelMatrix {
	/// Unique normalized colors in the clustering color space
	pub(crate) colors: Vec<Triplet>,
	/// The number of pixels with each unique color
	pub(crate) counts: Vec<u32>,
	/// For each pixel in row-major order, the index of its unique color
	pub(crate) indices: Vec<u32>,
	/// The color space of `colors`
	pub(crate) color_space: ColorSpace,
}

impl PixelMatrix {
	/// Convert 8-bit RGB pixels into a sample matrix in the given color space.
	///
	/// # Errors
	/// Returns [`Error::TooManyPixels`] if there are more than `u32::MAX` pixels.
	pub fn from_pixels(pixels: &[Triplet8], color_space: ColorSpace) -> Result<Self> {
		if u32::try_from(pixels.len()).is_err() {
			return Err(Error::TooManyPixels(pixels.len()));
		}

		let mut data = Self {
			colors: Vec::new(),
			counts: Vec::new(),
			indices: Vec::with_capacity(pixels.len()),
			color_space,
		};

		// Color space conversion only needs to happen once per unique color.
		// This also groups identical pixels, speeding up clustering.

		// Packed Srgb -> data index
		let mut memo: HashMap<u32, u32> = HashMap::new();

		for &[r, g, b] in pixels {
			let key = Srgb::new(r, g, b).into_u32::<palette::rgb::channels::Rgba>();
			let index = *memo.entry(key).or_insert_with(|| {
				let rgb = triplet_to_float([r, g, b]);
				let color = match color_space {
					ColorSpace::Rgb => rgb,
					ColorSpace::Hsv => triplet_rgb_to_hsv(rgb),
				};

				// there are only (2^8)^3 < u32::MAX possible 8-bit colors
				#[allow(clippy::cast_possible_truncation)]
				let index = data.colors.len() as u32;

				data.colors.push(color);
				data.counts.push(0);
				index
			});

			data.counts[index as usize] += 1;
			data.indices.push(index);
		}

		Ok(data)
	}

	/// Flatten an image and convert it into a sample matrix in the given color space.
	///
	/// # Errors
	/// Returns [`Error::TooManyPixels`] if the image has more than `u32::MAX` pixels.
	pub fn from_image(image: ImageMatrix, color_space: ColorSpace) -> Result<Self> {
		Self::from_pixels(&image.flatten(), color_space)
	}

	/// The number of samples (pixels), N
	#[must_use]
	pub fn len(&self) -> usize {
		self.indices.len()
	}

	/// Whether there are no samples
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.indices.is_empty()
	}

	/// The number of distinct colors among the samples
	#[must_use]
	pub fn num_colors(&self) -> usize {
		self.colors.len()
	}

	/// The color space the samples are expressed in
	#[must_use]
	pub const fn color_space(&self) -> ColorSpace {
		self.color_space
	}

	/// The distinct sample colors
	#[must_use]
	pub fn colors(&self) -> &[Triplet] {
		&self.colors
	}

	/// The number of samples with each distinct color
	#[must_use]
	pub fn counts(&self) -> &[u32] {
		&self.counts
	}

	/// Convert the samples to another color space, keeping their order and counts
	#[must_use]
	pub fn in_color_space(&self, color_space: ColorSpace) -> Self {
		Self {
			colors: convert(&self.colors, self.color_space, color_space),
			counts: self.counts.clone(),
			indices: self.indices.clone(),
			color_space,
		}
	}

	/// Each sample in row-major pixel order
	pub fn samples(&self) -> impl ExactSizeIterator<Item = Triplet> + '_ {
		self.indices.iter().map(|&i| self.colors[i as usize])
	}

	/// Each distinct color along with its number of samples
	pub(crate) fn pairs(&self) -> impl Iterator<Item = (Triplet, u32)> + '_ {
		self.colors.iter().copied().zip(self.counts.iter().copied())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::colorspace::to_uint8;

	#[test]
	fn flatten_is_row_major() {
		// 2 rows, 3 columns
		let data = (0..18).collect::<Vec<u8>>();
		let flat = flatten(&data, 2, 3, 3).expect("valid shape");
		assert_eq!(
			flat,
			vec![[0, 1, 2], [3, 4, 5], [6, 7, 8], [9, 10, 11], [12, 13, 14], [15, 16, 17]]
		);
	}

	#[test]
	fn flatten_drops_alpha() {
		let data = [1, 2, 3, 255, 4, 5, 6, 0];
		assert_eq!(flatten(&data, 1, 2, 4), Ok(vec![[1, 2, 3], [4, 5, 6]]));
	}

	#[test]
	fn flatten_rejects_bad_shapes() {
		assert_eq!(flatten(&[0; 4], 2, 1, 2), Err(Error::UnsupportedChannelCount(2)));
		assert_eq!(flatten(&[0; 10], 1, 2, 5), Err(Error::UnsupportedChannelCount(5)));
		assert_eq!(flatten(&[0; 5], 1, 2, 3), Err(Error::ShapeMismatch { expected: 6, actual: 5 }));
	}

	#[test]
	fn image_buffers_convert() {
		let rgba = RgbaImage::from_pixel(4, 2, image::Rgba([9, 8, 7, 6]));
		let matrix = ImageMatrix::from(&rgba);
		assert_eq!(matrix.shape(), (2, 4, 4));
		assert_eq!(matrix.flatten(), vec![[9, 8, 7]; 8]);
	}

	#[test]
	fn pixel_matrix_merges_duplicates() {
		let pixels = [[255, 0, 0], [0, 0, 255], [255, 0, 0], [255, 0, 0]];
		let matrix = PixelMatrix::from_pixels(&pixels, ColorSpace::Rgb).expect("few pixels");

		assert_eq!(matrix.len(), 4);
		assert_eq!(matrix.num_colors(), 2);
		assert_eq!(to_uint8(matrix.colors()), vec![[255, 0, 0], [0, 0, 255]]);
		assert_eq!(matrix.counts(), &[3, 1]);
		assert_eq!(to_uint8(&matrix.samples().collect::<Vec<_>>()), pixels);
	}

	#[test]
	fn pixel_matrix_in_hsv() {
		let matrix = PixelMatrix::from_pixels(&[[0, 0, 255]], ColorSpace::Hsv).expect("few pixels");
		let [h, s, v] = matrix.colors()[0];
		assert!((h - 2.0 / 3.0).abs() < 1e-6);
		assert!((s - 1.0).abs() < 1e-6);
		assert!((v - 1.0).abs() < 1e-6);
		assert_eq!(matrix.color_space(), ColorSpace::Hsv);

		let rgb = matrix.in_color_space(ColorSpace::Rgb);
		assert_eq!(rgb.color_space(), ColorSpace::Rgb);
		assert_eq!(to_uint8(rgb.colors()), vec![[0, 0, 255]]);
		assert_eq!(rgb.counts(), matrix.counts());
	}
}
