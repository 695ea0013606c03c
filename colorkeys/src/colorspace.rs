//! Conversions between color spaces and between integer and float channel encodings
//!
//! Float channels are normalized to `0.0..=1.0` in both supported color spaces.
//! For HSV, this means hue is stored as a fraction of a full turn rather than in degrees,
//! so that euclidean distance weighs all three channels on the same scale.

use crate::{Error, Result};
use palette::{FromColor, Hsv, Srgb};
use std::{
	fmt::{self, Display},
	str::FromStr,
};

/// A color with three float channels
pub type Triplet = [f32; 3];

/// A color with three 8-bit channels
pub type Triplet8 = [u8; 3];

/// The color spaces that clustering can be performed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
	/// Red, green, blue
	#[default]
	Rgb,
	/// Hue, saturation, value
	Hsv,
}

impl ColorSpace {
	/// All supported color spaces
	pub const ALL: [Self; 2] = [Self::Rgb, Self::Hsv];

	/// The canonical, upper case name of this color space
	#[must_use]
	pub const fn name(self) -> &'static str {
		match self {
			Self::Rgb => "RGB",
			Self::Hsv => "HSV",
		}
	}
}

impl Display for ColorSpace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for ColorSpace {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		Self::ALL
			.into_iter()
			.find(|space| space.name().eq_ignore_ascii_case(s))
			.ok_or_else(|| Error::InvalidColorSpace(s.to_owned()))
	}
}

/// Quantize a normalized channel value to 8 bits, rounding half away from zero
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantize(c: f32) -> u8 {
	// NaN saturates to 0
	(c * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Normalize 8-bit channel values to the range `0.0..=1.0`
#[must_use]
pub fn to_float(pixels: &[Triplet8]) -> Vec<Triplet> {
	pixels.iter().map(|&p| triplet_to_float(p)).collect()
}

/// Convert normalized channel values back to 8 bits, saturating at the byte boundaries
#[must_use]
pub fn to_uint8(pixels: &[Triplet]) -> Vec<Triplet8> {
	pixels.iter().map(|&p| triplet_to_uint8(p)).collect()
}

/// Convert normalized RGB colors to normalized HSV colors
#[must_use]
pub fn rgb_to_hsv(pixels: &[Triplet]) -> Vec<Triplet> {
	pixels.iter().map(|&p| triplet_rgb_to_hsv(p)).collect()
}

/// Convert normalized HSV colors to normalized RGB colors
#[must_use]
pub fn hsv_to_rgb(pixels: &[Triplet]) -> Vec<Triplet> {
	pixels.iter().map(|&p| triplet_hsv_to_rgb(p)).collect()
}

/// Convert normalized colors from one color space to another
#[must_use]
pub fn convert(pixels: &[Triplet], from: ColorSpace, to: ColorSpace) -> Vec<Triplet> {
	match (from, to) {
		(ColorSpace::Rgb, ColorSpace::Hsv) => rgb_to_hsv(pixels),
		(ColorSpace::Hsv, ColorSpace::Rgb) => hsv_to_rgb(pixels),
		_ => pixels.to_vec(),
	}
}

/// Convert normalized colors between color spaces given by name.
///
/// # Errors
/// Returns [`Error::InvalidColorSpace`] if either name is not a supported color space.
pub fn convert_named(pixels: &[Triplet], from: &str, to: &str) -> Result<Vec<Triplet>> {
	Ok(convert(pixels, from.parse()?, to.parse()?))
}

/// Normalize a single 8-bit color
pub(crate) fn triplet_to_float([r, g, b]: Triplet8) -> Triplet {
	let rgb = Srgb::new(r, g, b).into_format::<f32>();
	[rgb.red, rgb.green, rgb.blue]
}

/// Quantize a single normalized color
pub(crate) fn triplet_to_uint8([r, g, b]: Triplet) -> Triplet8 {
	[quantize(r), quantize(g), quantize(b)]
}

/// Convert a single normalized RGB color to HSV
pub(crate) fn triplet_rgb_to_hsv([r, g, b]: Triplet) -> Triplet {
	let hsv: Hsv = Hsv::from_color(Srgb::new(r, g, b));
	[hsv.hue.into_positive_degrees() / 360.0, hsv.saturation, hsv.value]
}

/// Convert a single normalized HSV color to RGB
pub(crate) fn triplet_hsv_to_rgb([h, s, v]: Triplet) -> Triplet {
	let rgb = Srgb::from_color(Hsv::new(h * 360.0, s, v));
	[rgb.red, rgb.green, rgb.blue]
}

/// Convert a normalized color in the given color space to an 8-bit RGB display color
#[must_use]
pub fn to_display_rgb(color: Triplet, space: ColorSpace) -> Triplet8 {
	let rgb = match space {
		ColorSpace::Rgb => color,
		ColorSpace::Hsv => triplet_hsv_to_rgb(color),
	};
	triplet_to_uint8(rgb)
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	fn test_colors() -> Vec<Triplet8> {
		let range = (0..=u8::MAX).step_by(15);
		let mut colors = Vec::new();

		for r in range.clone() {
			for g in range.clone() {
				for b in range.clone() {
					colors.push([r, g, b]);
				}
			}
		}

		colors
	}

	#[test]
	fn parse_color_space_names() {
		assert_eq!("RGB".parse::<ColorSpace>(), Ok(ColorSpace::Rgb));
		assert_eq!("hsv".parse::<ColorSpace>(), Ok(ColorSpace::Hsv));
		assert_eq!("LAB".parse::<ColorSpace>(), Err(Error::InvalidColorSpace("LAB".to_owned())));
		assert_eq!(ColorSpace::Hsv.to_string(), "HSV");
	}

	#[test]
	fn float_conversion_is_exact_for_bytes() {
		let colors = test_colors();
		assert_eq!(to_uint8(&to_float(&colors)), colors);

		let floats = to_float(&[[255, 0, 51]]);
		let [r, g, b] = floats[0];
		assert_abs_diff_eq!(r, 1.0);
		assert_abs_diff_eq!(g, 0.0);
		assert_abs_diff_eq!(b, 0.2, epsilon = 1e-6);
	}

	#[test]
	fn to_uint8_saturates_and_rounds() {
		assert_eq!(to_uint8(&[[-0.5, 1.5, f32::NAN]]), vec![[0, 255, 0]]);
		assert_eq!(to_uint8(&[[0.5, 0.25, 0.75]]), vec![[128, 64, 191]]);
	}

	#[test]
	fn rgb_hsv_rgb_round_trip() {
		let colors = test_colors();
		let round_trip = to_uint8(&hsv_to_rgb(&rgb_to_hsv(&to_float(&colors))));

		for (&x, &y) in colors.iter().zip(&round_trip) {
			for (a, b) in x.into_iter().zip(y) {
				assert!(a.abs_diff(b) <= 1, "{x:?} became {y:?}");
			}
		}
	}

	#[test]
	fn hsv_rgb_hsv_round_trip() {
		let mut hsv = Vec::new();
		for h in 0..19 {
			for s in 1..=5 {
				for v in 1..=5 {
					#[allow(clippy::cast_precision_loss)]
					hsv.push([h as f32 / 20.0, s as f32 / 5.0, v as f32 / 5.0]);
				}
			}
		}

		let round_trip = rgb_to_hsv(&hsv_to_rgb(&hsv));
		for (x, y) in hsv.iter().zip(&round_trip) {
			for (&a, &b) in x.iter().zip(y) {
				assert_abs_diff_eq!(a, b, epsilon = 1.0 / 255.0);
			}
		}
	}

	#[test]
	fn primaries_to_hsv() {
		let hsv = rgb_to_hsv(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
		let expected = [[0.0, 1.0, 1.0], [1.0 / 3.0, 1.0, 1.0], [2.0 / 3.0, 1.0, 1.0]];
		for (x, y) in hsv.iter().zip(&expected) {
			for (&a, &b) in x.iter().zip(y) {
				assert_abs_diff_eq!(a, b, epsilon = 1e-6);
			}
		}
	}

	#[test]
	fn convert_by_name() {
		let rgb = [[0.0, 0.0, 1.0]];
		assert_eq!(convert_named(&rgb, "RGB", "RGB"), Ok(rgb.to_vec()));
		assert_eq!(convert_named(&rgb, "RGB", "CMYK"), Err(Error::InvalidColorSpace("CMYK".to_owned())));
		assert_eq!(convert_named(&rgb, "YUV", "HSV"), Err(Error::InvalidColorSpace("YUV".to_owned())));
	}

	#[test]
	fn display_rgb_from_hsv() {
		assert_eq!(to_display_rgb([2.0 / 3.0, 1.0, 1.0], ColorSpace::Hsv), [0, 0, 255]);
		assert_eq!(to_display_rgb([0.5, 0.0, 1.0], ColorSpace::Rgb), [128, 0, 255]);
	}
}
