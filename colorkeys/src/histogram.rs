//! Turning cluster assignments into a palette of weighted display colors

use crate::{
	cluster::Clustering,
	colorspace::{to_display_rgb, ColorSpace, Triplet, Triplet8},
};

/// A single color of a [`Palette`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaletteEntry {
	/// The fraction of pixels assigned to this color, in `(0, 1]`
	pub weight: f64,
	/// The 8-bit sRGB display color
	pub color: Triplet8,
}

/// The dominant colors of an image, sorted by descending weight
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Palette {
	/// The palette entries
	entries: Vec<PaletteEntry>,
}

impl Palette {
	/// Build a palette from per-pixel cluster labels and the centroid of each label.
	///
	/// Labels with no pixels are skipped and equal weights keep label order.
	/// An empty `assignments` gives an empty palette.
	///
	/// # Panics
	/// Panics if any label is not a valid index into `centroids`.
	#[must_use]
	pub fn new(assignments: &[u32], centroids: &[Triplet], color_space: ColorSpace) -> Self {
		if assignments.is_empty() {
			return Self::default();
		}

		let mut counts = vec![0_u64; centroids.len()];
		for &label in assignments {
			counts[label as usize] += 1;
		}

		#[allow(clippy::cast_precision_loss)]
		let total = assignments.len() as f64;

		let mut entries = counts
			.iter()
			.zip(centroids)
			.filter(|(&n, _)| n > 0)
			.map(|(&n, &centroid)| {
				#[allow(clippy::cast_precision_loss)]
				let weight = n as f64 / total;
				PaletteEntry {
					weight,
					color: to_display_rgb(centroid, color_space),
				}
			})
			.collect::<Vec<_>>();

		// stable sort keeps label order for ties
		entries.sort_by(|a, b| f64::total_cmp(&b.weight, &a.weight));

		Self { entries }
	}

	/// The palette entries, sorted by descending weight
	#[must_use]
	pub fn entries(&self) -> &[PaletteEntry] {
		&self.entries
	}

	/// The number of colors in the palette
	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether the palette has no colors
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// The palette colors, sorted by descending weight
	pub fn colors(&self) -> impl ExactSizeIterator<Item = Triplet8> + '_ {
		self.entries.iter().map(|entry| entry.color)
	}

	/// The palette weights in descending order
	pub fn weights(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
		self.entries.iter().map(|entry| entry.weight)
	}
}

impl From<&Clustering> for Palette {
	fn from(clustering: &Clustering) -> Self {
		Self::new(&clustering.assignments, &clustering.centroids, clustering.color_space)
	}
}

impl<'a> IntoIterator for &'a Palette {
	type Item = &'a PaletteEntry;
	type IntoIter = std::slice::Iter<'a, PaletteEntry>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.iter()
	}
}
