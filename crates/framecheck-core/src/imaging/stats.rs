use serde::Serialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageStatistics {
    pub min: u8,
    pub max: u8,
    pub mean: f64,
    /// Element at `floor(n / 2)` of the sorted samples; never averaged.
    pub median: u8,
}

impl ImageStatistics {
    /// `None` for an empty sample set.
    pub fn compute(samples: &[u8]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let sum = samples.iter().map(|sample| u64::from(*sample)).sum::<u64>();

        Some(Self {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: sum as f64 / samples.len() as f64,
            median: sorted[sorted.len() / 2],
        })
    }
}

impl Display for ImageStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "min={}, max={}, mean={}, median={}",
            self.min, self.max, self.mean, self.median
        )
    }
}

#[cfg(test)]
mod tests {
    use super::ImageStatistics;

    #[test]
    fn even_length_uses_lower_median_index() {
        let stats = ImageStatistics::compute(&[40, 10, 30, 20]).expect("stats expected");
        assert_eq!(stats.min, 10);
        assert_eq!(stats.max, 40);
        assert_eq!(stats.mean, 25.0);
        // sorted [10, 20, 30, 40], index 2
        assert_eq!(stats.median, 30);
    }

    #[test]
    fn odd_length_uses_middle_element() {
        let stats = ImageStatistics::compute(&[9, 1, 5]).expect("stats expected");
        assert_eq!(stats.median, 5);
        assert_eq!(stats.mean, 5.0);
    }

    #[test]
    fn empty_samples_have_no_statistics() {
        assert_eq!(ImageStatistics::compute(&[]), None);
    }
}
