//! Generate color keys (dominant color palettes) for images by clustering their pixels.

#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
	clippy::pedantic,
	clippy::cargo,
	clippy::use_debug,
	clippy::dbg_macro,
	clippy::todo,
	clippy::unimplemented,
	clippy::unwrap_used,
	clippy::unwrap_in_result,
	clippy::unneeded_field_pattern,
	clippy::rest_pat_in_fully_bound_structs,
	clippy::unnecessary_self_imports,
	clippy::str_to_string,
	clippy::string_to_string,
	clippy::string_slice,
	missing_docs,
	clippy::missing_docs_in_private_items,
	rustdoc::all,
	clippy::float_cmp_const,
	clippy::lossy_float_literal
)]
#![allow(
	clippy::doc_markdown,
	clippy::module_name_repetitions,
	clippy::many_single_char_names,
	clippy::missing_panics_doc,
	clippy::missing_errors_doc,
	clippy::unreadable_literal
)]

mod cli;
mod document;
mod figure;
mod sources;

#[allow(clippy::wildcard_imports)]
use cli::*;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use colorkeys::{statistics::rank_statistics, AlgorithmConfig, ColorSpace, ImageMatrix, Palette, PixelMatrix, Triplet8};
use document::{ColorKey, Histogram};
use image::RgbImage;
use palette::Srgb;
use std::{path::Path, process::ExitCode, time::Instant};
use tracing_subscriber::EnvFilter;

/// Record the running time of a function and log the elapsed time
macro_rules! time {
	($name: literal, $func_call: expr) => {{
		let start = Instant::now();
		let result = $func_call;
		tracing::debug!("{} took {}ms", $name, start.elapsed().as_millis());
		result
	}};
}

/// A palette generated for one (algorithm, color space) combination
struct Generated {
	/// The algorithm configuration used
	config: AlgorithmConfig,
	/// The resulting palette
	palette: Palette,
	/// Seconds spent clustering and building the palette
	stopwatch: f64,
}

fn main() -> ExitCode {
	let options = Options::parse();
	init_logging(options.verbose);

	// Returning Result<_> uses Debug printing instead of Display
	match run_colorkeys(&options) {
		Ok(true) => ExitCode::SUCCESS,
		Ok(false) => ExitCode::FAILURE,
		Err(e) => {
			eprintln!("{e:#}");
			ExitCode::FAILURE
		},
	}
}

/// Log to stderr, using `RUST_LOG` if set
fn init_logging(verbose: bool) {
	let default = if verbose { "debug" } else { "warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

/// Builds a thread pool and then runs `generate_colorkeys`
#[cfg(feature = "threads")]
fn run_colorkeys(options: &Options) -> anyhow::Result<bool> {
	let pool = rayon::ThreadPoolBuilder::new()
		.num_threads(usize::from(options.threads))
		.build()
		.context("failed to initialize the thread pool")?;

	pool.install(|| generate_colorkeys(options))
}

/// Runs `generate_colorkeys` on a single thread
#[cfg(not(feature = "threads"))]
fn run_colorkeys(options: &Options) -> anyhow::Result<bool> {
	generate_colorkeys(options)
}

/// Generate and output the palettes for every image, returning whether every image succeeded
fn generate_colorkeys(options: &Options) -> anyhow::Result<bool> {
	let configs = configs(options)?;
	let paths = sources::expand_sources(&options.images).context("failed to read the image directories")?;

	let mut keys = Vec::new();
	let mut all_palettes = Vec::new();
	let mut success = true;

	for (index, path) in paths.iter().enumerate() {
		let span = tracing::debug_span!("image", path = %path.display());
		let _guard = span.enter();

		match process_image(path, &configs, options) {
			Ok((image, shape, bytes, generated)) => {
				if !options.json {
					print_palettes(path, &generated, options, paths.len() * generated.len() > 1);
				}

				if let Some(plot) = &options.plot {
					let palettes = generated.iter().map(|g| g.palette.clone()).collect::<Vec<_>>();
					let figure_path = figure::figure_path(plot, index, paths.len());
					let figure = time!("Figure", figure::compose(&image, &palettes));
					if let Err(e) = figure.save(&figure_path) {
						tracing::error!("failed to save the figure to {}: {e}", figure_path.display());
						success = false;
					}
				}

				for Generated { config, palette, stopwatch } in generated {
					let histogram =
						Histogram::new(config.algorithm(), config.color_space(), config.n_clusters(), stopwatch, &palette);
					keys.push(ColorKey::new(path, &bytes, shape, histogram));
					all_palettes.push(palette);
				}
			},
			Err(e) => {
				tracing::error!("{e:#}");
				success = false;
			},
		}
	}

	if options.json {
		println!("{}", document::to_json(&keys)?);
	}

	if let Some(export) = &options.export {
		document::export(&keys, export).with_context(|| format!("failed to export to {}", export.display()))?;
	}

	if options.stats {
		print_statistics(&all_palettes);
	}

	Ok(success)
}

/// Every (algorithm, color space) combination requested
fn configs(options: &Options) -> colorkeys::Result<Vec<AlgorithmConfig>> {
	let mut configs = Vec::new();
	for &color_space in &options.colorspaces {
		for &algorithm in &options.algos {
			configs.push(AlgorithmConfig::new(algorithm, options.num_clusters, color_space)?);
		}
	}
	Ok(configs)
}

/// The outputs of processing a single image
type Processed = (RgbImage, [u32; 3], Vec<u8>, Vec<Generated>);

/// Load an image and generate its palettes for each configuration
fn process_image(path: &Path, configs: &[AlgorithmConfig], options: &Options) -> anyhow::Result<Processed> {
	let source = time!("Image loading", sources::load_image(path))?;
	let image = time!("Thumbnail", sources::generate_thumbnail(source.image, options.max_pixels)).into_rgb8();
	let (width, height) = image.dimensions();

	// Clustering converts to the other color spaces as needed
	let matrix = time!("Preprocessing", PixelMatrix::from_image(ImageMatrix::from(&image), ColorSpace::Rgb))?;
	tracing::debug!("reduced image to {} unique colors", matrix.num_colors());

	let generated = generate_all(&matrix, configs, options)
		.with_context(|| format!("failed to generate palettes for {}", path.display()))?;

	Ok((image, [height, width, 3], source.bytes, generated))
}

/// Generate a palette for one configuration
fn generate(matrix: &PixelMatrix, config: &AlgorithmConfig, options: &Options) -> colorkeys::Result<Generated> {
	let start = Instant::now();

	let clustering = time!("Clustering", colorkeys::cluster(matrix, config, &options.cluster_options()))?;
	tracing::debug!(
		algorithm = %config.algorithm(),
		colorspace = %config.color_space(),
		clusters = clustering.num_clusters(),
		iterations = clustering.iterations,
		variance = clustering.variance,
		"clustered"
	);

	let palette = time!("Histogram", Palette::from(&clustering));

	Ok(Generated {
		config: *config,
		palette,
		stopwatch: start.elapsed().as_secs_f64(),
	})
}

/// Generate a palette for every configuration, one after another
#[cfg(not(feature = "threads"))]
fn generate_all(
	matrix: &PixelMatrix,
	configs: &[AlgorithmConfig],
	options: &Options,
) -> colorkeys::Result<Vec<Generated>> {
	configs.iter().map(|config| generate(matrix, config, options)).collect()
}

/// Generate a palette for every configuration in parallel
#[cfg(feature = "threads")]
fn generate_all(
	matrix: &PixelMatrix,
	configs: &[AlgorithmConfig],
	options: &Options,
) -> colorkeys::Result<Vec<Generated>> {
	use rayon::prelude::*;

	configs.par_iter().map(|config| generate(matrix, config, options)).collect()
}

/// Print each palette on its own line, prefixed by where it came from if there are several
fn print_palettes(path: &Path, generated: &[Generated], options: &Options, label: bool) {
	for Generated { config, palette, .. } in generated {
		let line = format_palette(palette, options.output, options.colorize);
		if label {
			println!("{} {} {}: {line}", path.display(), config.algorithm(), config.color_space());
		} else {
			println!("{line}");
		}
	}
}

/// Format, colorize, and join the text for all colors of a palette
fn format_palette(palette: &Palette, output: FormatOutput, colorize: Option<ColorizeOutput>) -> String {
	let text = |[r, g, b]: Triplet8| match output {
		FormatOutput::Hex => format!("{:X}", Srgb::new(r, g, b)),
		FormatOutput::Rgb => format!("({r},{g},{b})"),
		FormatOutput::Swatch => "   ".to_owned(),
	};

	let delimiter = if output == FormatOutput::Swatch { "" } else { " " };

	palette
		.colors()
		.map(|color @ [r, g, b]| match (output, colorize) {
			(FormatOutput::Swatch, _) | (_, Some(ColorizeOutput::Bg)) => text(color).on_truecolor(r, g, b).to_string(),
			(_, Some(ColorizeOutput::Fg)) => text(color).truecolor(r, g, b).to_string(),
			(_, None) => text(color),
		})
		.collect::<Vec<_>>()
		.join(delimiter)
}

/// Print the per-rank statistics of all palettes
fn print_statistics(palettes: &[Palette]) {
	let Some(stats) = rank_statistics(palettes) else {
		tracing::warn!("skipping statistics since the palettes have different numbers of colors");
		return;
	};

	for (rank, stat) in stats.iter().enumerate() {
		let [r, g, b, weight] = stat.mean;
		let [sr, sg, sb, sweight] = stat.std_dev;
		println!(
			"#{rank}: mean ({r:.1},{g:.1},{b:.1}) {:.2}%, std dev ({sr:.1},{sg:.1},{sb:.1}) {:.2}%",
			weight * 100.0,
			sweight * 100.0
		);
	}
}
