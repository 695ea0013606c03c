//! Finding and loading the input images

use image::{DynamicImage, GenericImageView};
use std::{
	fs, io,
	path::{Path, PathBuf},
};
use thiserror::Error;

/// The image file extensions picked up when expanding a directory
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Error cases for loading and decoding an image
#[derive(Debug, Error)]
pub enum ImageLoadError {
	/// The image file does not exist
	#[error("image not found: {}", .0.display())]
	NotFound(PathBuf),
	/// Failed to read or decode the image file
	#[error("failed to load {}: {source}", path.display())]
	Unreadable {
		/// The image file
		path: PathBuf,
		/// The underlying error
		source: image::ImageError,
	},
	/// Failed to read the raw bytes of the image file
	#[error("failed to read {}: {source}", path.display())]
	Io {
		/// The image file
		path: PathBuf,
		/// The underlying error
		source: io::Error,
	},
}

/// A decoded image along with its raw file contents
pub struct Source {
	/// The raw, encoded file contents
	pub bytes: Vec<u8>,
	/// The decoded image
	pub image: DynamicImage,
}

/// Whether `path` has one of the supported image extensions
fn is_image(path: &Path) -> bool {
	path.extension()
		.and_then(|ext| ext.to_str())
		.map_or(false, |ext| IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Expand directories into the image files they contain.
///
/// Files are kept as given, and the images in each directory are sorted by path.
/// Later duplicates of an already listed path are dropped.
pub fn expand_sources(paths: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
	let mut sources = Vec::new();
	for path in paths {
		if path.is_dir() {
			let mut entries = fs::read_dir(path)?
				.map(|entry| entry.map(|e| e.path()))
				.collect::<io::Result<Vec<_>>>()?;

			entries.retain(|entry| entry.is_file() && is_image(entry));
			entries.sort();
			sources.extend(entries);
		} else {
			sources.push(path.clone());
		}
	}

	let mut seen = std::collections::HashSet::new();
	sources.retain(|path| seen.insert(path.clone()));

	Ok(sources)
}

/// Load the image at the given path
pub fn load_image(path: &Path) -> Result<Source, ImageLoadError> {
	let bytes = fs::read(path).map_err(|source| {
		if source.kind() == io::ErrorKind::NotFound {
			ImageLoadError::NotFound(path.to_owned())
		} else {
			ImageLoadError::Io { path: path.to_owned(), source }
		}
	})?;

	let image = image::load_from_memory(&bytes)
		.map_err(|source| ImageLoadError::Unreadable { path: path.to_owned(), source })?;

	Ok(Source { bytes, image })
}

/// Create a thumbnail with at most `max_pixels` pixels if the image has more than `max_pixels` pixels
pub fn generate_thumbnail(image: DynamicImage, max_pixels: u32) -> DynamicImage {
	// The number of pixels should be < u64::MAX, since image dimensions are (u32, u32)
	let (width, height) = image.dimensions();
	let pixels = u64::from(width) * u64::from(height);
	if pixels <= u64::from(max_pixels) {
		tracing::debug!("skipping thumbnail since {pixels} pixels is at most {max_pixels}");
		image
	} else {
		// (u64 as f64) only gives innaccurate results for very large u64
		#[allow(clippy::cast_precision_loss)]
		let scale = (f64::from(max_pixels) / pixels as f64).sqrt();

		// multiplying by a positive factor < 1
		#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
		let (thumb_width, thumb_height) = (
			((f64::from(width) * scale) as u32).max(1),
			((f64::from(height) * scale) as u32).max(1),
		);

		tracing::debug!("creating a thumbnail with dimensions {thumb_width}x{thumb_height}");

		image.thumbnail(thumb_width, thumb_height)
	}
}
