//! Specifies the CLI and handles arg parsing

use clap::{Parser, ValueEnum};
use colorkeys::{Algorithm, ClusterOptions, ColorSpace};
use std::{
	fmt::{Debug, Display},
	num::ParseFloatError,
	ops::RangeBounds,
	path::PathBuf,
	str::FromStr,
};

/// Supported output formats for the final colors
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatOutput {
	/// sRGB hexcode
	Hex,
	/// sRGB (r,g,b) triple
	Rgb,
	/// Whitespace with true color background
	Swatch,
}

/// Ways to colorize the output text
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorizeOutput {
	/// Foreground
	Fg,
	/// Background
	Bg,
}

/// Generate color keys (dominant color palettes) for images by clustering their pixels.
///
/// A palette is generated for every combination of image, algorithm, and color space.
#[allow(clippy::struct_excessive_bools)]
#[derive(Parser, Debug)]
#[command(version)]
pub struct Options {
	/// The input images or directories of images
	///
	/// Directories are expanded to the .jpg, .jpeg, and .png files directly inside them.
	#[arg(required = true)]
	pub images: Vec<PathBuf>,

	/// A comma separated list of clustering algorithms
	///
	/// One of centroid-k (kmeans), centroid-k-batched (mbkmeans), or hierarchical-agglomerative (hac).
	#[arg(short, long, value_delimiter = ',', default_value = "centroid-k-batched", value_parser = parse_algorithm)]
	pub algos: Vec<Algorithm>,

	/// A comma separated list of color spaces to cluster in, RGB or HSV
	#[arg(short, long, value_delimiter = ',', default_value = "RGB", value_parser = parse_color_space)]
	pub colorspaces: Vec<ColorSpace>,

	/// The (maximum) number of colors to find
	#[arg(short = 'k', long, value_parser = clap::value_parser!(u32).range(1..))]
	pub num_clusters: u32,

	/// The number of trials of k-means to run
	///
	/// k-means can get stuck in a local minimum, so you may want to run a few or more trials to get better results.
	/// The trial with the lowest variance is picked.
	#[arg(short = 'n', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
	pub trials: u32,

	/// The threshold number used to determine k-means convergence
	///
	/// Iteration stops once the centroids move less than this in total.
	#[arg(short = 'e', long, default_value_t = 0.001, value_parser = parse_valid_convergence)]
	pub convergence_threshold: f32,

	/// The maximum number of iterations (or mini-batches) for k-means
	#[arg(short = 'i', long, default_value_t = 300, value_parser = clap::value_parser!(u32).range(1..))]
	pub max_iter: u32,

	/// The number of pixels sampled for each mini-batch of centroid-k-batched
	#[arg(long, default_value_t = 1024, value_parser = clap::value_parser!(u32).range(1..))]
	pub batch_size: u32,

	/// The seed value used for the random number generator
	#[arg(long, default_value_t = 0)]
	pub seed: u64,

	/// The maximum image size, in number of pixels, before a thumbnail is created
	///
	/// hierarchical-agglomerative takes quadratic time in the number of distinct colors,
	/// so be careful when raising this.
	#[arg(long, default_value_t = 250_000, value_parser = clap::value_parser!(u32).range(1..))]
	pub max_pixels: u32,

	/// Print the JSON document of all palettes to stdout
	#[arg(short, long)]
	pub json: bool,

	/// Write the JSON document of all palettes to this file
	#[arg(long, value_name = "FILE")]
	pub export: Option<PathBuf>,

	/// Write a PNG figure of the image and one histogram bar per palette
	///
	/// With multiple images, the file stem is suffixed with the index of each image.
	#[arg(short, long, value_name = "FILE")]
	pub plot: Option<PathBuf>,

	/// The format to print the colors in
	#[arg(short, long, default_value = "hex")]
	pub output: FormatOutput,

	/// Color the foreground or background for each printed color
	#[arg(long)]
	pub colorize: Option<ColorizeOutput>,

	/// Print the mean and standard deviation of each palette position across all palettes
	#[arg(long)]
	pub stats: bool,

	/// The number of threads to use
	///
	/// A value of 0 indicates to automatically choose the number of threads.
	#[cfg(feature = "threads")]
	#[arg(short, long, default_value_t = 0)]
	pub threads: u8,

	/// Log additional information, such as the time taken for each step
	#[arg(long)]
	pub verbose: bool,
}

impl Options {
	/// The clustering parameters collected from the options
	pub fn cluster_options(&self) -> ClusterOptions {
		ClusterOptions {
			trials: self.trials,
			max_iter: self.max_iter,
			convergence_threshold: self.convergence_threshold,
			batch_size: self.batch_size,
			seed: self.seed,
		}
	}
}

/// Parse an algorithm name or alias
fn parse_algorithm(s: &str) -> Result<Algorithm, String> {
	s.parse().map_err(|e| format!("{e}"))
}

/// Parse a color space name
fn parse_color_space(s: &str) -> Result<ColorSpace, String> {
	s.parse().map_err(|e| format!("{e}"))
}

/// Parse a float value and ensure it in the provided, valid range
fn parse_float_in_range<T>(s: &str, range: impl RangeBounds<T> + Debug) -> Result<T, String>
where
	T: FromStr<Err = ParseFloatError> + Display + PartialOrd,
{
	let value: T = s.parse().map_err(|e| format!("{e}"))?;
	if range.contains(&value) {
		Ok(value)
	} else {
		Err(format!("{value} is not in {range:?}"))
	}
}

/// Parse the convergence number and ensure it is >= `0.0`
fn parse_valid_convergence(s: &str) -> Result<f32, String> {
	parse_float_in_range(s, 0.0..)
}
