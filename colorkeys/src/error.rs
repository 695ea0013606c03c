//! Validation errors raised before any clustering work begins

use thiserror::Error;

/// Errors for invalid pipeline input or configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	/// The color space name is not one of `RGB` or `HSV`
	#[error("invalid color space: {0} (expected RGB or HSV)")]
	InvalidColorSpace(String),

	/// The cluster count is zero or greater than the number of samples
	#[error("invalid cluster count: {k} (must be in 1..={max})")]
	InvalidClusterCount {
		/// The requested number of clusters
		k: usize,
		/// The largest allowed number of clusters
		max: usize,
	},

	/// The algorithm name is not recognized
	#[error("unknown algorithm: {0} (expected centroid-k, centroid-k-batched, or hierarchical-agglomerative)")]
	UnknownAlgorithm(String),

	/// The image has a channel count other than 3 or 4
	#[error("unsupported channel count: {0} (expected 3 or 4)")]
	UnsupportedChannelCount(usize),

	/// The image buffer length does not match its dimensions
	#[error("image buffer has {actual} values but its shape requires {expected}")]
	ShapeMismatch {
		/// height * width * channels
		expected: usize,
		/// The length of the provided buffer
		actual: usize,
	},

	/// The image has more pixels than can be counted with a `u32`
	#[error("image has {0} pixels, which is more than the supported maximum of {max}", max = u32::MAX)]
	TooManyPixels(usize),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
