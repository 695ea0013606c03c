//! Extract the dominant colors ("color keys") of an image by clustering its pixels.
//!
//! # Examples
//!
//! ## Read an image file and get a 5 color palette.
//!
//! ```no_run
//! use colorkeys::{Algorithm, AlgorithmConfig, ClusterOptions, ColorSpace, ImageMatrix};
//!
//! let image = image::open("some image").unwrap().into_rgb8();
//! let config = AlgorithmConfig::new(Algorithm::CentroidK, 5, ColorSpace::Rgb).unwrap();
//! let palette = colorkeys::color_key(ImageMatrix::from(&image), &config, &ClusterOptions::default()).unwrap();
//!
//! for entry in &palette {
//! 	println!("{:?} {:.1}%", entry.color, entry.weight * 100.0);
//! }
//! ```
//!
//! ## Run several algorithms on the same image.
//!
//! ```no_run
//! use colorkeys::{Algorithm, AlgorithmConfig, ClusterOptions, ColorSpace, ImageMatrix, PixelMatrix};
//!
//! let image = image::open("some image").unwrap().into_rgb8();
//! let matrix = PixelMatrix::from_image(ImageMatrix::from(&image), ColorSpace::Hsv).unwrap();
//!
//! for algorithm in Algorithm::ALL {
//! 	let config = AlgorithmConfig::new(algorithm, 8, ColorSpace::Hsv).unwrap();
//! 	let palette = colorkeys::palette(&matrix, &config, &ClusterOptions::default()).unwrap();
//! 	println!("{algorithm}: {} colors", palette.len());
//! }
//! ```
//!
//! # Arguments
//!
//! ## Algorithm
//!
//! - [`Algorithm::CentroidK`] runs k-means with k-means++ seeding.
//!   It gives the most accurate centroids.
//! - [`Algorithm::CentroidKBatched`] runs mini-batch k-means,
//!   which only looks at a random sample of pixels for each iteration.
//!   This is the fastest option on large images, at the cost of slightly less accurate centroids.
//! - [`Algorithm::HierarchicalAgglomerative`] repeatedly merges the two closest clusters using Ward linkage.
//!   It uses no randomness, so it always gives the same result for the same image,
//!   but it takes quadratic time in the number of distinct colors.
//!   Downscale large images before using it.
//!
//! ## Color Space
//!
//! Clustering is performed using euclidean distance in either the RGB or HSV color space,
//! with every channel normalized to `0.0..=1.0`.
//! The palette colors are always converted back to 8-bit RGB.
//!
//! ## K
//!
//! This is the (maximum) number of colors to find.
//!
//! If the image has fewer than `k` distinct colors, then the palette will have fewer than `k` colors.
//! `k` may not be larger than the number of pixels in the image.
//!
//! ## Cluster Options
//!
//! [`ClusterOptions`] tunes the k-means variants and is ignored by hierarchical clustering.
//! See its fields for the defaults.
//! Both k-means variants are deterministic for a fixed seed.

#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::cargo)]
#![warn(clippy::use_debug, clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
#![warn(clippy::unwrap_used, clippy::unwrap_in_result)]
#![warn(clippy::unneeded_field_pattern, clippy::rest_pat_in_fully_bound_structs)]
#![warn(clippy::unnecessary_self_imports)]
#![warn(clippy::str_to_string, clippy::string_to_string, clippy::string_slice)]
#![warn(missing_docs, clippy::missing_docs_in_private_items, rustdoc::all)]
#![warn(clippy::float_cmp_const, clippy::lossy_float_literal)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::enum_glob_use)]
#![allow(clippy::unreadable_literal)]

mod error;
mod hac;
mod kmeans;

pub mod cluster;
pub mod colorspace;
pub mod histogram;
pub mod matrix;
pub mod render;
pub mod statistics;

pub use cluster::{cluster, Algorithm, AlgorithmConfig, ClusterOptions, ClusterResult, Clusterer, Clustering};
pub use colorspace::{ColorSpace, Triplet, Triplet8};
pub use error::{Error, Result};
pub use hac::Agglomerative;
pub use histogram::{Palette, PaletteEntry};
pub use kmeans::{Kmeans, MiniBatchKmeans};
pub use matrix::{ImageMatrix, PixelMatrix};

/// Cluster an already prepared sample matrix and build its palette.
///
/// Use this to run several algorithms over the same image without preparing its samples again.
///
/// # Errors
/// Returns [`Error::InvalidClusterCount`] if `config.n_clusters()` is greater than the number of pixels.
pub fn palette(matrix: &PixelMatrix, config: &AlgorithmConfig, options: &ClusterOptions) -> Result<Palette> {
	Ok(Palette::from(&cluster(matrix, config, options)?))
}

/// Run the whole pipeline on an image: prepare its samples, cluster them, and build the palette.
///
/// # Errors
/// Returns [`Error::InvalidClusterCount`] if `config.n_clusters()` is greater than the number of pixels,
/// or [`Error::TooManyPixels`] if the image has more than `u32::MAX` pixels.
pub fn color_key(image: ImageMatrix, config: &AlgorithmConfig, options: &ClusterOptions) -> Result<Palette> {
	let matrix = PixelMatrix::from_image(image, config.color_space())?;
	palette(&matrix, config, options)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	/// A 100 × 100 image whose top half is pure red and bottom half is pure blue
	fn red_blue() -> Vec<u8> {
		let mut data = Vec::with_capacity(100 * 100 * 3);
		for i in 0..(100 * 100) {
			if i < 50 * 100 {
				data.extend([255, 0, 0]);
			} else {
				data.extend([0, 0, 255]);
			}
		}
		data
	}

	/// A 64 × 64 image with many distinct colors
	fn gradient() -> Vec<u8> {
		let mut data = Vec::with_capacity(64 * 64 * 3);
		for y in 0..64_u8 {
			for x in 0..64_u8 {
				data.extend([x * 4, y * 4, (x / 2 + y / 2) * 2]);
			}
		}
		data
	}

	fn run(data: &[u8], size: usize, algorithm: Algorithm, k: u32, color_space: ColorSpace) -> Palette {
		let image = ImageMatrix::new(data, size, size, 3).expect("valid shape");
		let config = AlgorithmConfig::new(algorithm, k, color_space).expect("nonzero k");
		color_key(image, &config, &ClusterOptions::default()).expect("k <= N")
	}

	fn assert_well_formed(palette: &Palette) {
		assert!((palette.weights().sum::<f64>() - 1.0).abs() < 1e-6);
		for pair in palette.entries().windows(2) {
			assert!(pair[0].weight >= pair[1].weight);
		}
		for weight in palette.weights() {
			assert!(weight > 0.0 && weight <= 1.0);
		}
	}

	#[test]
	fn half_red_half_blue_two_clusters() {
		let data = red_blue();
		for color_space in ColorSpace::ALL {
			for algorithm in Algorithm::ALL {
				let palette = run(&data, 100, algorithm, 2, color_space);

				assert_eq!(palette.weights().collect::<Vec<_>>(), vec![0.5, 0.5]);
				assert_eq!(
					palette.colors().collect::<HashSet<_>>(),
					HashSet::from([[255, 0, 0], [0, 0, 255]]),
					"{algorithm} in {color_space}"
				);
			}
		}
	}

	#[test]
	fn half_red_half_blue_one_cluster() {
		let data = red_blue();
		for algorithm in [Algorithm::CentroidK, Algorithm::HierarchicalAgglomerative] {
			let palette = run(&data, 100, algorithm, 1, ColorSpace::Rgb);

			assert_eq!(palette.len(), 1);
			assert_eq!(palette.weights().collect::<Vec<_>>(), vec![1.0]);
			let [r, g, b] = palette.entries()[0].color;
			assert!(r == 127 || r == 128);
			assert_eq!(g, 0);
			assert!(b == 127 || b == 128);
		}
	}

	#[test]
	fn more_clusters_than_distinct_colors() {
		let data = red_blue();
		for algorithm in Algorithm::ALL {
			let palette = run(&data, 100, algorithm, 5, ColorSpace::Rgb);

			assert_eq!(palette.len(), 2);
			assert_well_formed(&palette);
		}
	}

	#[test]
	fn hierarchical_is_deterministic() {
		let data = gradient();
		let image = ImageMatrix::new(&data, 64, 64, 3).expect("valid shape");
		let matrix = PixelMatrix::from_image(image, ColorSpace::Rgb).expect("few pixels");
		let config = AlgorithmConfig::new(Algorithm::HierarchicalAgglomerative, 6, ColorSpace::Rgb).expect("nonzero k");

		let first = cluster(&matrix, &config, &ClusterOptions::default()).expect("k <= N");
		let second = cluster(&matrix, &config, &ClusterOptions::default()).expect("k <= N");

		assert_eq!(first.assignments, second.assignments);
		assert_eq!(
			first.centroids.iter().map(|c| c.map(f32::to_bits)).collect::<Vec<_>>(),
			second.centroids.iter().map(|c| c.map(f32::to_bits)).collect::<Vec<_>>()
		);
	}

	#[test]
	fn palettes_are_well_formed() {
		let data = gradient();
		for color_space in ColorSpace::ALL {
			for algorithm in Algorithm::ALL {
				let image = ImageMatrix::new(&data, 64, 64, 3).expect("valid shape");
				let matrix = PixelMatrix::from_image(image, color_space).expect("few pixels");
				let config = AlgorithmConfig::new(algorithm, 8, color_space).expect("nonzero k");
				let clustering = cluster(&matrix, &config, &ClusterOptions::default()).expect("k <= N");

				let labels = clustering.assignments.iter().copied().collect::<HashSet<_>>();
				assert!(labels.len() <= 8);
				assert_eq!(labels.len(), clustering.num_clusters());

				let palette = Palette::from(&clustering);
				assert_eq!(palette.len(), clustering.num_clusters());
				assert_well_formed(&palette);

				let drawn = render::bar_spans(&palette, 500).iter().map(|span| span.len()).sum::<usize>();
				assert!(drawn <= 500);
				assert!(500 - drawn < palette.len());
			}
		}
	}

	#[test]
	fn fixed_seed_is_reproducible() {
		let data = gradient();
		for algorithm in [Algorithm::CentroidK, Algorithm::CentroidKBatched] {
			let first = run(&data, 64, algorithm, 5, ColorSpace::Rgb);
			let second = run(&data, 64, algorithm, 5, ColorSpace::Rgb);
			assert_eq!(first, second);
		}
	}

	#[test]
	fn rejects_more_clusters_than_pixels() {
		let data = [0; 2 * 2 * 3];
		let image = ImageMatrix::new(&data, 2, 2, 3).expect("valid shape");
		let config = AlgorithmConfig::new(Algorithm::CentroidK, 5, ColorSpace::Rgb).expect("nonzero k");

		assert_eq!(
			color_key(image, &config, &ClusterOptions::default()),
			Err(Error::InvalidClusterCount { k: 5, max: 4 })
		);
	}
}
