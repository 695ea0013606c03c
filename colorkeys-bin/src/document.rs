//! The JSON document describing each generated palette

use colorkeys::{Algorithm, ColorSpace, Palette};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::{fs, io, path::Path};

/// One palette entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistCentroid {
	/// The fraction of pixels with this color
	pub percent: f64,
	/// The 8-bit sRGB color
	pub color: [u8; 3],
}

/// A palette along with how it was generated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
	/// The canonical algorithm name
	pub algo: String,
	/// The color space the pixels were clustered in
	pub colorspace: String,
	/// The requested number of clusters
	pub n_clusters: u32,
	/// Seconds spent clustering and building the palette
	pub stopwatch: f64,
	/// The palette, sorted by descending weight
	pub hist_centroids: Vec<HistCentroid>,
}

impl Histogram {
	/// Describe a palette generated with the given parameters
	pub fn new(algorithm: Algorithm, color_space: ColorSpace, n_clusters: u32, stopwatch: f64, palette: &Palette) -> Self {
		Self {
			algo: algorithm.name().to_owned(),
			colorspace: color_space.name().to_owned(),
			n_clusters,
			stopwatch,
			hist_centroids: palette
				.entries()
				.iter()
				.map(|entry| HistCentroid { percent: entry.weight, color: entry.color })
				.collect(),
		}
	}
}

/// The document for a single (image, algorithm, color space) combination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorKey {
	/// The path of the source image
	pub filename: String,
	/// Hex SHA-256 digest of the raw image file
	pub filehash: String,
	/// (height, width, channels) of the clustered image
	pub shape: [u32; 3],
	/// When the palette was generated, in RFC 3339 format
	pub timestamp: String,
	/// The version of this program
	pub version: String,
	/// The palette
	pub histogram: Histogram,
}

impl ColorKey {
	/// Describe a palette generated for an image file
	pub fn new(path: &Path, bytes: &[u8], shape: [u32; 3], histogram: Histogram) -> Self {
		Self {
			filename: path.display().to_string(),
			filehash: filehash(bytes),
			shape,
			timestamp: chrono::Local::now().to_rfc3339(),
			version: env!("CARGO_PKG_VERSION").to_owned(),
			histogram,
		}
	}
}

/// Hex encoded SHA-256 digest of the given bytes
pub fn filehash(bytes: &[u8]) -> String {
	hex::encode(Sha256::digest(bytes))
}

/// Serialize the documents as a pretty printed JSON array
pub fn to_json(keys: &[ColorKey]) -> serde_json::Result<String> {
	serde_json::to_string_pretty(keys)
}

/// Write the documents as a JSON array to a file
pub fn export(keys: &[ColorKey], path: &Path) -> io::Result<()> {
	fs::write(path, to_json(keys)?)
}
