//! Bottom-up agglomerative clustering with Ward linkage
//!
//! The dendrogram is built over the distinct colors, weighted by their pixel counts,
//! using the nearest-neighbor chain algorithm. This needs linear memory
//! and quadratic time in the number of distinct colors.
//!
//! Based upon: D. Müllner. Modern hierarchical, agglomerative clustering algorithms. 2011.

use crate::{
	cluster::{ClusterResult, Clusterer},
	colorspace::Triplet,
	PixelMatrix,
};

/// Agglomerative clustering with Ward linkage, cut to leave `k` clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Agglomerative;

/// A (possibly merged) cluster in the dendrogram
#[derive(Debug, Clone, Copy)]
struct Node {
	/// The weighted centroid
	centroid: [f64; 3],
	/// The total pixel count
	weight: f64,
}

impl Node {
	/// The increase in within-cluster variance caused by merging two clusters
	fn ward(&self, other: &Self) -> f64 {
		let dist = self
			.centroid
			.iter()
			.zip(&other.centroid)
			.map(|(a, b)| (a - b) * (a - b))
			.sum::<f64>();

		self.weight * other.weight / (self.weight + other.weight) * dist
	}

	/// Combine two clusters
	fn merge(&self, other: &Self) -> Self {
		let weight = self.weight + other.weight;
		let mut centroid = [0.0; 3];
		for ((c, a), b) in centroid.iter_mut().zip(self.centroid).zip(other.centroid) {
			*c = (self.weight * a + other.weight * b) / weight;
		}
		Self { centroid, weight }
	}
}

/// A single merge in the dendrogram
#[derive(Debug, Clone, Copy, PartialEq)]
struct Merge {
	/// A leaf in the first cluster
	a: usize,
	/// A leaf in the second cluster
	b: usize,
	/// The linkage distance between the two clusters
	height: f64,
}

/// Build the full dendrogram, returning the merges sorted by increasing height.
///
/// Ties are resolved towards lower indices, so the result is fully determined by the input order.
fn dendrogram(matrix: &PixelMatrix) -> Vec<Merge> {
	let n = matrix.num_colors();
	let mut nodes = matrix
		.pairs()
		.map(|(color, count)| Node {
			centroid: color.map(f64::from),
			weight: f64::from(count),
		})
		.collect::<Vec<_>>();

	let mut active = vec![true; n];
	let mut chain = Vec::<usize>::new();
	let mut merges = Vec::with_capacity(n.saturating_sub(1));

	while merges.len() + 1 < n {
		if chain.is_empty() {
			// the lowest active cluster starts a new chain
			if let Some(start) = active.iter().position(|&x| x) {
				chain.push(start);
			}
		}

		let a = chain[chain.len() - 1];
		let prev = chain.len().checked_sub(2).map(|i| chain[i]);

		// Prefer the previous chain element on ties so that reciprocal neighbors are always found
		let mut nearest = prev;
		let mut min_dist = prev.map_or(f64::INFINITY, |p| nodes[a].ward(&nodes[p]));
		for (b, _) in active.iter().enumerate().filter(|&(b, &x)| x && b != a) {
			let dist = nodes[a].ward(&nodes[b]);
			if dist < min_dist {
				min_dist = dist;
				nearest = Some(b);
			}
		}

		let Some(b) = nearest else { break };

		if Some(b) == prev {
			chain.truncate(chain.len() - 2);
			let (keep, drop) = if a < b { (a, b) } else { (b, a) };
			nodes[keep] = nodes[a].merge(&nodes[b]);
			active[drop] = false;
			merges.push(Merge { a: keep, b: drop, height: min_dist });
		} else {
			chain.push(b);
		}
	}

	merges.sort_by(|x, y| f64::total_cmp(&x.height, &y.height));
	merges
}

/// Find the root of `i`, compressing the path along the way
fn find(parent: &mut [usize], mut i: usize) -> usize {
	let mut root = i;
	while parent[root] != root {
		root = parent[root];
	}
	while parent[i] != root {
		let next = parent[i];
		parent[i] = root;
		i = next;
	}
	root
}

impl Clusterer for Agglomerative {
	// labels and cuts are < the number of distinct colors < u32::MAX
	#[allow(clippy::cast_possible_truncation)]
	fn cluster_colors(&self, matrix: &PixelMatrix, k: u32) -> ClusterResult {
		let n = matrix.num_colors();
		let merges = dendrogram(matrix);
		let cuts = n.saturating_sub(k as usize);

		let mut parent = (0..n).collect::<Vec<_>>();
		for merge in &merges[..cuts.min(merges.len())] {
			let a = find(&mut parent, merge.a);
			let b = find(&mut parent, merge.b);
			// keep the lowest leaf as the root
			let (root, child) = if a < b { (a, b) } else { (b, a) };
			parent[child] = root;
		}

		// Clusters are labeled in order of their first distinct color
		let mut labels = vec![None; n];
		let mut assignment = Vec::with_capacity(n);
		let mut sums = Vec::<([f64; 3], f64)>::new();
		for (i, (color, count)) in matrix.pairs().enumerate() {
			let root = find(&mut parent, i);
			let label = *labels[root].get_or_insert_with(|| {
				sums.push(([0.0; 3], 0.0));
				(sums.len() - 1) as u32
			});

			let (sum, weight) = &mut sums[label as usize];
			let count = f64::from(count);
			for (s, c) in sum.iter_mut().zip(color) {
				*s += count * f64::from(c);
			}
			*weight += count;
			assignment.push(label);
		}

		let centroids = sums
			.into_iter()
			.map(|(sum, weight)| sum.map(|s| (s / weight) as f32))
			.collect::<Vec<Triplet>>();

		ClusterResult {
			assignment,
			centroids,
			iterations: cuts as u32,
		}
	}
}
