//! Provides the implementations for (sort) k-means and mini-batch k-means

use crate::{
	cluster::{ClusterResult, Clusterer},
	colorspace::Triplet,
	PixelMatrix,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Squared euclidean distance between two colors
fn squared_distance(x: Triplet, y: Triplet) -> f32 {
	let d0 = x[0] - y[0];
	let d1 = x[1] - y[1];
	let d2 = x[2] - y[2];
	d0 * d0 + d1 * d1 + d2 * d2
}

/// Index of the centroid closest to `color`, preferring the lowest index on ties
// centroids.len() <= the number of distinct colors < u32::MAX
#[allow(clippy::cast_possible_truncation)]
fn nearest(color: Triplet, centroids: &[Triplet]) -> u32 {
	let mut min_dist = f32::INFINITY;
	let mut min_center = 0;
	for (i, &centroid) in centroids.iter().enumerate() {
		let dist = squared_distance(color, centroid);
		if dist < min_dist {
			min_dist = dist;
			min_center = i;
		}
	}
	min_center as u32
}

/// Bookkeeping for each k-means data point
struct PointData {
	/// Center assignment for this data point
	assignment: Vec<u32>,
	/// Squared distance to the closest chosen centroid, used to randomly select starting centroids in k-means++
	weight: Vec<f32>,
}

impl PointData {
	/// Create a [`PointData`] with the given number data points
	fn new(n: usize) -> Self {
		Self {
			assignment: vec![0; n],
			weight: vec![f32::INFINITY; n],
		}
	}

	/// Reset data for the next k-means trial
	fn reset(&mut self) {
		self.assignment.fill(0);
		self.weight.fill(f32::INFINITY);
	}
}

/// Data for each center/centroid
struct CenterData {
	/// The centroid point
	centroid: Vec<Triplet>,
	/// Vector sum for all data points in this center
	sum: Vec<[f64; 3]>,
	/// Number of points in this center
	count: Vec<u32>,
}

impl CenterData {
	/// Create a [`CenterData`] with the given number of centers
	fn new(k: usize) -> Self {
		Self {
			centroid: Vec::new(),
			sum: vec![[0.0; 3]; k],
			count: vec![0; k],
		}
	}

	/// Reset data for the next k-means trial
	fn reset(&mut self) {
		self.centroid.clear();
		self.sum.fill([0.0; 3]);
		self.count.fill(0);
	}
}

/// Holds all the state used by k-means
struct KmeansState {
	/// Data for each center
	centers: CenterData,
	/// One fourth of the squared distance between each pairs of centers
	distances: Vec<(u32, f32)>,
	/// Data for each point
	points: PointData,
}

impl KmeansState {
	/// Initialize a new [`KmeansState`] with `k` centers and `n` data points
	fn new(k: usize, n: usize) -> Self {
		Self {
			centers: CenterData::new(k),
			distances: vec![(0, 0.0); k * k],
			points: PointData::new(n),
		}
	}
}

/// Choose the starting centroids using the k-means++ algorithm.
///
/// Fewer than `k` centroids are chosen if there are fewer than `k` distinct colors.
fn kmeans_plus_plus(
	k: usize,
	rng: &mut impl Rng,
	matrix: &PixelMatrix,
	centroids: &mut Vec<Triplet>,
	weights: &mut [f32],
) {
	use rand::{
		distributions::{WeightedError::*, WeightedIndex},
		prelude::Distribution,
	};

	// Pick a random pixel as the first centroid
	let first = matrix.indices[rng.gen_range(0..matrix.len())];
	centroids.push(matrix.colors[first as usize]);

	// Pick each next centroid with a weighted probability based off the squared distance to its closest centroid
	for i in 1..k {
		let centroid = centroids[i - 1];
		for (weight, &color) in weights.iter_mut().zip(&matrix.colors) {
			*weight = f32::min(*weight, squared_distance(color, centroid));
		}

		#[allow(clippy::cast_precision_loss)]
		let pixel_weights = weights.iter().zip(&matrix.counts).map(|(&w, &n)| w * n as f32);

		match WeightedIndex::new(pixel_weights) {
			Ok(sampler) => centroids.push(matrix.colors[sampler.sample(rng)]),
			Err(AllWeightsZero) => return, // all points exactly match a centroid
			Err(InvalidWeight | NoItem | TooMany) => {
				unreachable!("distances are >= 0 and colors.len() is in 1..=2.pow(24)")
			},
		}
	}
}

/// Initializes the center sums and counts based off the initial centroids
fn compute_initial_sums(matrix: &PixelMatrix, centers: &mut CenterData, assignment: &[u32]) {
	for ((color, n), &center) in matrix.pairs().zip(assignment) {
		let i = center as usize;
		let nf = f64::from(n);
		let sum = &mut centers.sum[i];
		for (s, c) in sum.iter_mut().zip(color) {
			*s += nf * f64::from(c);
		}
		centers.count[i] += n;
	}
}

/// For each pair of centers, update their distances and sort each center's row by increasing distance
// i and j are < centroids.len() <= the number of distinct colors < u32::MAX
#[allow(clippy::cast_possible_truncation)]
fn update_distances(centroids: &[Triplet], distances: &mut [(u32, f32)]) {
	let k = centroids.len();
	for i in 0..k {
		let ci = centroids[i];
		distances[i * k + i] = (i as u32, 0.0);
		for j in (i + 1)..k {
			let cj = centroids[j];
			let dist = squared_distance(ci, cj) / 4.0;
			distances[j * k + i] = (i as u32, dist);
			distances[i * k + j] = (j as u32, dist);
		}
	}

	for row in distances[..(k * k)].chunks_exact_mut(k) {
		row.sort_by(|(_, x), (_, y)| f32::total_cmp(x, y));
	}
}

/// Find the closest center to `color`, given its current center.
///
/// Centers that are more than twice as far from the current center as `color` cannot be closer,
/// so the search stops at the first such center in the sorted row.
fn closest_center(
	color: Triplet,
	center: u32,
	centroids: &[Triplet],
	distances: &[(u32, f32)],
) -> u32 {
	let k = centroids.len();
	let ci = center as usize;
	let dist = squared_distance(color, centroids[ci]);

	let mut min_dist = dist;
	let mut min_center = center;
	for &(other_center, half_dist) in &distances[(ci * k + 1)..((ci + 1) * k)] {
		if dist < half_dist {
			break;
		}

		let other_dist = squared_distance(color, centroids[other_center as usize]);
		if other_dist < min_dist {
			min_dist = other_dist;
			min_center = other_center;
		}
	}

	min_center
}

/// For each data point, update its assigned center
#[cfg(not(feature = "threads"))]
fn update_assignments(
	matrix: &PixelMatrix,
	centers: &mut CenterData,
	distances: &[(u32, f32)],
	points: &mut PointData,
) {
	for ((color, n), center) in matrix.pairs().zip(&mut points.assignment) {
		let min_center = closest_center(color, *center, &centers.centroid, distances);

		// Move this point to its new center
		if min_center != *center {
			let nf = f64::from(n);
			let ci = *center as usize;
			let cj = min_center as usize;

			for (c, x) in color.into_iter().enumerate() {
				let x = nf * f64::from(x);
				centers.sum[ci][c] -= x;
				centers.sum[cj][c] += x;
			}
			centers.count[ci] -= n;
			centers.count[cj] += n;

			*center = min_center;
		}
	}
}

/// For each data point, update its assigned center
#[cfg(feature = "threads")]
fn update_assignments(
	matrix: &PixelMatrix,
	centers: &mut CenterData,
	distances: &[(u32, f32)],
	points: &mut PointData,
) {
	use rayon::prelude::*;

	let k = centers.centroid.len();
	let num_points = matrix.num_colors();
	let centroids = &centers.centroid;
	let deltas = points
		.assignment
		.par_iter_mut()
		.with_min_len((num_points / rayon::current_num_threads()).max(1))
		.zip(&matrix.colors)
		.zip(&matrix.counts)
		.fold_with(
			(vec![[0.0; 3]; k], vec![0; k]),
			|(mut sums, mut counts): (Vec<[f64; 3]>, Vec<i64>), ((center, &color), &n)| {
				let min_center = closest_center(color, *center, centroids, distances);

				// Move this point to its new center
				if min_center != *center {
					let nf = f64::from(n);
					let ci = *center as usize;
					let cj = min_center as usize;

					for (c, x) in color.into_iter().enumerate() {
						let x = nf * f64::from(x);
						sums[ci][c] -= x;
						sums[cj][c] += x;
					}
					counts[ci] -= i64::from(n);
					counts[cj] += i64::from(n);

					*center = min_center;
				}

				(sums, counts)
			},
		)
		.collect::<Vec<_>>();

	for (delta_sums, delta_counts) in deltas {
		for (sum, delta_sum) in centers.sum.iter_mut().zip(&delta_sums) {
			for (s, d) in sum.iter_mut().zip(delta_sum) {
				*s += d;
			}
		}
		#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
		for (count, &delta_count) in centers.count.iter_mut().zip(&delta_counts) {
			let new_count = i64::from(*count) + delta_count;
			// Each center count is the sum of the counts of its points,
			// so moving all points out of this center cannot give a negative value.
			// Similarly, since the sum of the counts of all points is <= u32::MAX,
			// then moving all points into this center cannot give a value > u32::MAX.
			debug_assert!(u32::try_from(new_count).is_ok());
			*count = new_count as u32;
		}
	}
}

/// A random color inside the unit cube, which contains every normalized RGB and HSV color
fn random_color(rng: &mut impl Rng) -> Triplet {
	[rng.gen(), rng.gen(), rng.gen()]
}

/// For each center, update its centroid using the vector sums and compute deltas
fn update_centroids(rng: &mut impl Rng, centers: &mut CenterData) -> f32 {
	let mut total_delta = 0.0;
	for ((centroid, &n), sum) in centers.centroid.iter_mut().zip(&centers.count).zip(&centers.sum) {
		let new_centroid = if n == 0 {
			random_color(rng)
		} else {
			let n = f64::from(n);
			// Sums may need greater precision, but the average can fall back down to a reduced precision
			#[allow(clippy::cast_possible_truncation)]
			sum.map(|s| (s / n) as f32)
		};

		total_delta += squared_distance(*centroid, new_centroid).sqrt();
		*centroid = new_centroid;
	}

	total_delta
}

/// The within-cluster sum of squared distances for the given assignment
pub(crate) fn variance(matrix: &PixelMatrix, centroids: &[Triplet], assignment: &[u32]) -> f64 {
	matrix
		.pairs()
		.zip(assignment)
		.map(|((color, n), &center)| f64::from(n) * f64::from(squared_distance(color, centroids[center as usize])))
		.sum()
}

/// Run a trial of sort k-means
fn kmeans(
	matrix: &PixelMatrix,
	KmeansState { centers, distances, points }: &mut KmeansState,
	k: usize,
	max_iter: u32,
	convergence: f32,
	seed: u64,
) -> (f64, ClusterResult) {
	let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
	kmeans_plus_plus(k, &mut rng, matrix, &mut centers.centroid, &mut points.weight);
	compute_initial_sums(matrix, centers, &points.assignment);

	// At least one pass, so that every centroid is the mean of its colors
	let mut iterations = 0;
	loop {
		update_distances(&centers.centroid, distances);
		update_assignments(matrix, centers, distances, points);
		let total_delta = update_centroids(&mut rng, centers);
		iterations += 1;

		if iterations >= max_iter || total_delta <= convergence {
			break;
		}
	}

	let variance = variance(matrix, &centers.centroid, &points.assignment);

	let result = ClusterResult {
		assignment: points.assignment.clone(),
		centroids: centers.centroid.clone(),
		iterations,
	};

	centers.reset();
	points.reset();

	(variance, result)
}

/// Standard k-means with k-means++ seeding, keeping the best of several trials
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kmeans {
	/// The number of trials to run, taking the one with the lowest variance
	pub trials: u32,
	/// The maximum number of iterations for each trial
	pub max_iter: u32,
	/// Stop once the summed centroid movement of an iteration is at most this value
	pub convergence_threshold: f32,
	/// The seed for the random number generator
	pub seed: u64,
}

impl Clusterer for Kmeans {
	fn cluster_colors(&self, matrix: &PixelMatrix, k: u32) -> ClusterResult {
		// k-means++ never picks more centroids than there are distinct colors
		let k = (k as usize).min(matrix.num_colors());
		let mut state = KmeansState::new(k, matrix.num_colors());
		let mut trial =
			|i: u32| kmeans(matrix, &mut state, k, self.max_iter, self.convergence_threshold, self.seed ^ u64::from(i));

		let (mut best_variance, mut best) = trial(0);
		for i in 1..self.trials {
			let (variance, result) = trial(i);
			if variance < best_variance {
				best_variance = variance;
				best = result;
			}
		}

		best
	}
}

/// Mini-batch k-means, which updates the centroids from random batches of pixels
///
/// Based upon: D. Sculley. Web-scale k-means clustering. WWW 2010.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MiniBatchKmeans {
	/// The number of pixels sampled for each iteration
	pub batch_size: u32,
	/// The maximum number of batches
	pub max_iter: u32,
	/// Stop once the summed centroid movement of a batch is at most this value
	pub convergence_threshold: f32,
	/// The seed for the random number generator
	pub seed: u64,
}

impl Clusterer for MiniBatchKmeans {
	fn cluster_colors(&self, matrix: &PixelMatrix, k: u32) -> ClusterResult {
		let k = (k as usize).min(matrix.num_colors());
		let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
		let mut centroids = Vec::with_capacity(k);
		let mut weights = vec![f32::INFINITY; matrix.num_colors()];
		kmeans_plus_plus(k, &mut rng, matrix, &mut centroids, &mut weights);

		let batch_size = self.batch_size.max(1) as usize;
		let mut batch = vec![(0, 0); batch_size];
		let mut seen = vec![0_u64; centroids.len()];

		let mut iterations = 0;
		loop {
			// Sample pixels, not distinct colors, so that frequent colors pull harder
			for (color, center) in &mut batch {
				*color = matrix.indices[rng.gen_range(0..matrix.len())];
				*center = nearest(matrix.colors[*color as usize], &centroids);
			}

			let previous = centroids.clone();
			for &(color, center) in &batch {
				let center = center as usize;
				seen[center] += 1;

				// Per-center learning rate decays with the number of samples seen
				#[allow(clippy::cast_precision_loss)]
				let rate = 1.0 / seen[center] as f32;
				let color = matrix.colors[color as usize];
				for (c, x) in centroids[center].iter_mut().zip(color) {
					*c += rate * (x - *c);
				}
			}

			let total_delta = previous
				.iter()
				.zip(&centroids)
				.map(|(&old, &new)| squared_distance(old, new).sqrt())
				.sum::<f32>();

			iterations += 1;
			if iterations >= self.max_iter || total_delta <= self.convergence_threshold {
				break;
			}
		}

		let assignment = matrix.colors.iter().map(|&color| nearest(color, &centroids)).collect();

		ClusterResult { assignment, centroids, iterations }
	}
}
