//! Selecting and running a clustering algorithm over a [`PixelMatrix`]

use crate::{
	colorspace::{ColorSpace, Triplet},
	hac::Agglomerative,
	kmeans::{self, Kmeans, MiniBatchKmeans},
	Error, PixelMatrix, Result,
};
use std::{
	fmt::{self, Display},
	str::FromStr,
};

/// The supported clustering algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Algorithm {
	/// Standard k-means with k-means++ seeding
	CentroidK,
	/// Mini-batch k-means
	#[default]
	CentroidKBatched,
	/// Bottom-up agglomerative clustering using Ward linkage
	HierarchicalAgglomerative,
}

impl Algorithm {
	/// All supported algorithms
	pub const ALL: [Self; 3] = [Self::CentroidK, Self::CentroidKBatched, Self::HierarchicalAgglomerative];

	/// The canonical name of this algorithm
	#[must_use]
	pub const fn name(self) -> &'static str {
		match self {
			Self::CentroidK => "centroid-k",
			Self::CentroidKBatched => "centroid-k-batched",
			Self::HierarchicalAgglomerative => "hierarchical-agglomerative",
		}
	}

	/// The short alias accepted in place of the canonical name
	#[must_use]
	pub const fn alias(self) -> &'static str {
		match self {
			Self::CentroidK => "kmeans",
			Self::CentroidKBatched => "mbkmeans",
			Self::HierarchicalAgglomerative => "hac",
		}
	}

	/// Create the clustering strategy for this algorithm
	#[must_use]
	pub fn clusterer(self, options: &ClusterOptions) -> Box<dyn Clusterer + Send + Sync> {
		match self {
			Self::CentroidK => Box::new(Kmeans {
				trials: options.trials,
				max_iter: options.max_iter,
				convergence_threshold: options.convergence_threshold,
				seed: options.seed,
			}),
			Self::CentroidKBatched => Box::new(MiniBatchKmeans {
				batch_size: options.batch_size,
				max_iter: options.max_iter,
				convergence_threshold: options.convergence_threshold,
				seed: options.seed,
			}),
			Self::HierarchicalAgglomerative => Box::new(Agglomerative),
		}
	}
}

impl Display for Algorithm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for Algorithm {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		Self::ALL
			.into_iter()
			.find(|algo| algo.name().eq_ignore_ascii_case(s) || algo.alias().eq_ignore_ascii_case(s))
			.ok_or_else(|| Error::UnknownAlgorithm(s.to_owned()))
	}
}

/// Tuning parameters shared by the clustering algorithms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterOptions {
	/// The number of k-means trials to run, keeping the one with the lowest variance
	pub trials: u32,
	/// The maximum number of k-means iterations (or mini-batches). At least one is always run.
	pub max_iter: u32,
	/// Stop once the summed centroid movement of an iteration is at most this value
	pub convergence_threshold: f32,
	/// The number of pixels sampled per mini-batch
	pub batch_size: u32,
	/// The seed for the random number generator
	pub seed: u64,
}

impl Default for ClusterOptions {
	fn default() -> Self {
		Self {
			trials: 1,
			max_iter: 300,
			convergence_threshold: 0.001,
			batch_size: 1024,
			seed: 0,
		}
	}
}

/// Which algorithm to run, how many clusters to find, and in which color space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlgorithmConfig {
	/// The clustering algorithm
	algorithm: Algorithm,
	/// The requested number of clusters
	n_clusters: u32,
	/// The color space to cluster in
	color_space: ColorSpace,
}

impl AlgorithmConfig {
	/// Create a new [`AlgorithmConfig`].
	///
	/// # Errors
	/// Returns [`Error::InvalidClusterCount`] if `n_clusters` is zero.
	pub fn new(algorithm: Algorithm, n_clusters: u32, color_space: ColorSpace) -> Result<Self> {
		if n_clusters == 0 {
			return Err(Error::InvalidClusterCount { k: 0, max: u32::MAX as usize });
		}
		Ok(Self { algorithm, n_clusters, color_space })
	}

	/// Create a new [`AlgorithmConfig`] from an algorithm and color space name.
	///
	/// # Errors
	/// Returns an error if either name is not recognized or `n_clusters` is zero.
	/// No image has more than `u32::MAX` pixels, so larger counts are rejected as well.
	pub fn from_names(algorithm: &str, n_clusters: usize, color_space: &str) -> Result<Self> {
		let k = u32::try_from(n_clusters).map_err(|_| Error::InvalidClusterCount {
			k: n_clusters,
			max: u32::MAX as usize,
		})?;
		Self::new(algorithm.parse()?, k, color_space.parse()?)
	}

	/// The clustering algorithm
	#[must_use]
	pub const fn algorithm(&self) -> Algorithm {
		self.algorithm
	}

	/// The requested number of clusters
	#[must_use]
	pub const fn n_clusters(&self) -> u32 {
		self.n_clusters
	}

	/// The color space to cluster in
	#[must_use]
	pub const fn color_space(&self) -> ColorSpace {
		self.color_space
	}
}

/// The raw output of a [`Clusterer`] over the distinct colors of a [`PixelMatrix`]
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterResult {
	/// The cluster label of each distinct color
	pub assignment: Vec<u32>,
	/// The centroid of each cluster label, which may include clusters with no colors
	pub centroids: Vec<Triplet>,
	/// The number of iterations or merges performed
	pub iterations: u32,
}

/// A clustering strategy
pub trait Clusterer {
	/// Partition the distinct colors of `matrix` into at most `k` clusters,
	/// weighing each color by its number of pixels.
	///
	/// `matrix` is non-empty and `k` is at least 1.
	fn cluster_colors(&self, matrix: &PixelMatrix, k: u32) -> ClusterResult;
}

/// The result of clustering every pixel of an image
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
	/// The cluster label of each pixel in row-major order, in `0..centroids.len()`
	pub assignments: Vec<u32>,
	/// The centroid of each cluster, in the clustering color space
	pub centroids: Vec<Triplet>,
	/// The color space of `centroids`
	pub color_space: ColorSpace,
	/// The within-cluster sum of squared distances
	pub variance: f64,
	/// The number of iterations or merges performed
	pub iterations: u32,
}

impl Clustering {
	/// The number of (non-empty) clusters
	#[must_use]
	pub fn num_clusters(&self) -> usize {
		self.centroids.len()
	}
}

/// Cluster the pixels of `matrix` with the given algorithm.
///
/// The samples are converted to `config.color_space()` first if `matrix` is in a different color space.
/// Clusters that end up with no pixels are dropped,
/// so fewer than `config.n_clusters()` clusters are returned when the image has fewer distinct colors.
///
/// # Errors
/// Returns [`Error::InvalidClusterCount`] if `config.n_clusters()` is greater than the number of pixels.
pub fn cluster(matrix: &PixelMatrix, config: &AlgorithmConfig, options: &ClusterOptions) -> Result<Clustering> {
	let k = config.n_clusters();
	if k as usize > matrix.len() {
		return Err(Error::InvalidClusterCount { k: k as usize, max: matrix.len() });
	}

	let converted;
	let matrix = if matrix.color_space() == config.color_space() {
		matrix
	} else {
		converted = matrix.in_color_space(config.color_space());
		&converted
	};

	let result = config.algorithm().clusterer(options).cluster_colors(matrix, k);
	Ok(finish(matrix, result))
}

/// Drop empty clusters, then label every pixel
// the number of labels is at most the number of distinct colors, which is < u32::MAX
#[allow(clippy::cast_possible_truncation)]
fn finish(matrix: &PixelMatrix, ClusterResult { assignment, centroids, iterations }: ClusterResult) -> Clustering {
	let mut counts = vec![0_u64; centroids.len()];
	for (&label, &n) in assignment.iter().zip(&matrix.counts) {
		counts[label as usize] += u64::from(n);
	}

	let mut relabel = vec![0; centroids.len()];
	let mut kept = Vec::with_capacity(centroids.len());
	for (i, (&centroid, &n)) in centroids.iter().zip(&counts).enumerate() {
		if n > 0 {
			relabel[i] = kept.len() as u32;
			kept.push(centroid);
		}
	}

	let assignment = assignment.iter().map(|&label| relabel[label as usize]).collect::<Vec<_>>();
	let variance = kmeans::variance(matrix, &kept, &assignment);
	let assignments = matrix.indices.iter().map(|&i| assignment[i as usize]).collect();

	Clustering {
		assignments,
		centroids: kept,
		color_space: matrix.color_space,
		variance,
		iterations,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_algorithm_names_and_aliases() {
		for algo in Algorithm::ALL {
			assert_eq!(algo.name().parse::<Algorithm>(), Ok(algo));
			assert_eq!(algo.alias().parse::<Algorithm>(), Ok(algo));
			assert_eq!(algo.to_string(), algo.name());
		}
		assert_eq!("HAC".parse::<Algorithm>(), Ok(Algorithm::HierarchicalAgglomerative));
		assert_eq!("dbscan".parse::<Algorithm>(), Err(Error::UnknownAlgorithm("dbscan".to_owned())));
	}

	#[test]
	fn config_validates_inputs() {
		assert_eq!(
			AlgorithmConfig::new(Algorithm::CentroidK, 0, ColorSpace::Rgb),
			Err(Error::InvalidClusterCount { k: 0, max: u32::MAX as usize })
		);
		assert_eq!(
			AlgorithmConfig::from_names("kmeans", 1 << 40, "RGB"),
			Err(Error::InvalidClusterCount { k: 1 << 40, max: u32::MAX as usize })
		);
		assert_eq!(
			AlgorithmConfig::from_names("kmeans", 300, "RGB").map(|config| config.n_clusters()),
			Ok(300)
		);
		assert_eq!(
			AlgorithmConfig::from_names("kmeans", 3, "LAB"),
			Err(Error::InvalidColorSpace("LAB".to_owned()))
		);

		let config = AlgorithmConfig::from_names("hac", 3, "hsv").expect("valid config");
		assert_eq!(config.algorithm(), Algorithm::HierarchicalAgglomerative);
		assert_eq!(config.n_clusters(), 3);
		assert_eq!(config.color_space(), ColorSpace::Hsv);
	}

	#[test]
	fn more_clusters_than_pixels_is_an_error() {
		let matrix = PixelMatrix::from_pixels(&[[0, 0, 0], [9, 9, 9]], ColorSpace::Rgb).expect("few pixels");
		for algorithm in Algorithm::ALL {
			let config = AlgorithmConfig::new(algorithm, 3, ColorSpace::Rgb).expect("nonzero k");
			assert_eq!(
				cluster(&matrix, &config, &ClusterOptions::default()),
				Err(Error::InvalidClusterCount { k: 3, max: 2 })
			);
		}
	}

	#[test]
	fn hundreds_of_clusters() {
		let pixels = (0..10_000_u32)
			.map(|i| {
				let c = i % 400;
				[(c % 20 * 13) as u8, (c / 20 * 13) as u8, 128]
			})
			.collect::<Vec<_>>();
		let matrix = PixelMatrix::from_pixels(&pixels, ColorSpace::Rgb).expect("few pixels");

		for algorithm in Algorithm::ALL {
			let config = AlgorithmConfig::new(algorithm, 300, ColorSpace::Rgb).expect("nonzero k");
			let clustering = cluster(&matrix, &config, &ClusterOptions::default()).expect("k <= N");

			assert_eq!(clustering.assignments.len(), pixels.len());
			assert!(clustering.num_clusters() <= 300);
			if algorithm == Algorithm::HierarchicalAgglomerative {
				assert_eq!(clustering.num_clusters(), 300);
			}
			for &label in &clustering.assignments {
				assert!((label as usize) < clustering.num_clusters());
			}
		}
	}

	#[test]
	fn finish_drops_empty_clusters() {
		let matrix =
			PixelMatrix::from_pixels(&[[0, 0, 0], [255, 255, 255], [0, 0, 0]], ColorSpace::Rgb).expect("few pixels");
		let result = ClusterResult {
			assignment: vec![2, 0],
			centroids: vec![[1.0; 3], [0.5; 3], [0.0; 3]],
			iterations: 4,
		};

		let clustering = finish(&matrix, result);

		assert_eq!(clustering.centroids, vec![[1.0; 3], [0.0; 3]]);
		assert_eq!(clustering.assignments, vec![1, 0, 1]);
		assert_eq!(clustering.num_clusters(), 2);
		assert_eq!(clustering.iterations, 4);
		assert!(clustering.variance.abs() < 1e-12);
	}

	#[test]
	fn every_algorithm_labels_every_pixel() {
		let pixels = (0..64_u8).map(|i| [i * 4, 255 - i * 4, i]).collect::<Vec<_>>();
		let matrix = PixelMatrix::from_pixels(&pixels, ColorSpace::Rgb).expect("few pixels");

		for algorithm in Algorithm::ALL {
			let config = AlgorithmConfig::new(algorithm, 4, ColorSpace::Rgb).expect("nonzero k");
			let clustering = cluster(&matrix, &config, &ClusterOptions::default()).expect("valid k");

			assert_eq!(clustering.assignments.len(), pixels.len());
			assert!(clustering.num_clusters() <= 4);
			assert!(clustering.num_clusters() >= 1);
			for &label in &clustering.assignments {
				assert!((label as usize) < clustering.num_clusters());
			}
		}
	}
}
