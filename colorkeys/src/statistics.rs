//! Summary statistics over several palettes of the same size

use crate::Palette;

/// The mean and standard deviation of the `i`-th entry across several palettes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankStatistics {
	/// Mean red, green, blue, and weight
	pub mean: [f64; 4],
	/// Population standard deviation of red, green, blue, and weight
	pub std_dev: [f64; 4],
}

/// An entry as red, green, blue, and weight
fn features(palette: &Palette, rank: usize) -> [f64; 4] {
	let entry = palette.entries()[rank];
	let [r, g, b] = entry.color;
	[f64::from(r), f64::from(g), f64::from(b), entry.weight]
}

/// Compute statistics for each rank (position) across the given palettes.
///
/// Returns `None` if there are no palettes or if the palettes differ in length.
#[must_use]
pub fn rank_statistics(palettes: &[Palette]) -> Option<Vec<RankStatistics>> {
	let len = palettes.first()?.len();
	if palettes.iter().any(|palette| palette.len() != len) {
		return None;
	}

	#[allow(clippy::cast_precision_loss)]
	let n = palettes.len() as f64;

	let stats = (0..len)
		.map(|rank| {
			let mut mean = [0.0; 4];
			for palette in palettes {
				for (m, x) in mean.iter_mut().zip(features(palette, rank)) {
					*m += x;
				}
			}
			for m in &mut mean {
				*m /= n;
			}

			let mut std_dev = [0.0; 4];
			for palette in palettes {
				for ((s, x), m) in std_dev.iter_mut().zip(features(palette, rank)).zip(mean) {
					*s += (x - m) * (x - m);
				}
			}
			for s in &mut std_dev {
				*s = (*s / n).sqrt();
			}

			RankStatistics { mean, std_dev }
		})
		.collect();

	Some(stats)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ColorSpace;
	use approx::assert_abs_diff_eq;

	#[test]
	fn mean_and_std_dev_per_rank() {
		let dark = Palette::new(&[0, 0, 0, 1], &[[0.0; 3], [1.0; 3]], ColorSpace::Rgb);
		let light = Palette::new(&[0, 1, 1, 1], &[[0.0; 3], [1.0; 3]], ColorSpace::Rgb);

		let stats = rank_statistics(&[dark, light]).expect("same length");

		assert_eq!(stats.len(), 2);
		assert_abs_diff_eq!(&stats[0].mean[..], &[127.5, 127.5, 127.5, 0.75][..]);
		assert_abs_diff_eq!(&stats[0].std_dev[..], &[127.5, 127.5, 127.5, 0.0][..]);
		assert_abs_diff_eq!(&stats[1].mean[..], &[127.5, 127.5, 127.5, 0.25][..]);
	}

	#[test]
	fn mismatched_lengths_give_none() {
		let one = Palette::new(&[0], &[[0.0; 3]], ColorSpace::Rgb);
		let two = Palette::new(&[0, 1], &[[0.0; 3], [1.0; 3]], ColorSpace::Rgb);

		assert_eq!(rank_statistics(&[one, two]), None);
		assert_eq!(rank_statistics(&[]), None);
	}
}
