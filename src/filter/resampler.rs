//! Quantile elite resampling of parameter groups.
//!
//! Groups whose weight strictly exceeds the `(1 - prop)` sample quantile
//! form the elite. The elite keeps its slots in order and the remaining
//! slots are refilled from it; the result is a group order that is then
//! applied to the swarm, the state ensemble and the history buffer.

use rand::Rng;

use crate::common::utils::quantile;

/// Outcome of one elite selection.
#[derive(Debug, Clone, PartialEq)]
pub struct EliteSelection {
    /// New group order, `order[j]` = source group of slot `j`
    pub order: Vec<usize>,
    /// Groups above the threshold, ascending
    pub elite: Vec<usize>,
    /// The `(1 - prop)` quantile of the weights
    pub threshold: f64,
}

impl EliteSelection {
    /// Number of elite groups.
    #[inline]
    pub fn elite_size(&self) -> usize {
        self.elite.len()
    }
}

/// Select the elite and refill the remaining slots.
///
/// - more than one elite group: elite first, then uniform draws with
///   replacement from the elite for the other slots;
/// - exactly one: that group in every slot;
/// - none (e.g. all weights tied): identity order.
pub fn elite_resample<R: Rng + ?Sized>(weights: &[f64], prop: f64, rng: &mut R) -> EliteSelection {
    let n = weights.len();
    let threshold = quantile(weights, 1.0 - prop).unwrap_or(f64::NEG_INFINITY);
    let elite: Vec<usize> = weights
        .iter()
        .enumerate()
        .filter(|&(_, &w)| w > threshold)
        .map(|(i, _)| i)
        .collect();

    let order = match elite.len() {
        0 => (0..n).collect(),
        1 => vec![elite[0]; n],
        k => {
            let mut order = Vec::with_capacity(n);
            order.extend_from_slice(&elite);
            for _ in k..n {
                order.push(elite[rng.gen_range(0..k)]);
            }
            order
        }
    };

    EliteSelection {
        order,
        elite,
        threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::rng::SimpleRng;

    #[test]
    fn test_all_tied_gives_identity() {
        let mut rng = SimpleRng::new(1);
        let sel = elite_resample(&[-3.0; 6], 0.5, &mut rng);
        assert_eq!(sel.elite_size(), 0);
        assert_eq!(sel.order, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_single_survivor_is_duplicated() {
        let mut rng = SimpleRng::new(1);
        // quantile at 0.66 of 3 values lies between the 2nd and 3rd
        let sel = elite_resample(&[-1.0, 5.0, 0.0], 0.34, &mut rng);
        assert_eq!(sel.elite, vec![1]);
        assert_eq!(sel.order, vec![1, 1, 1]);
    }

    #[test]
    fn test_multiple_elite_fill_from_elite() {
        let weights = [0.3, -2.0, 4.0, 1.0, -7.0, 2.5, 0.0, -1.0];
        for seed in 0..20 {
            let mut rng = SimpleRng::new(seed);
            let sel = elite_resample(&weights, 0.5, &mut rng);
            assert_eq!(sel.order.len(), weights.len());
            assert_eq!(sel.elite, vec![0, 2, 3, 5]);
            assert_eq!(&sel.order[..4], &[0, 2, 3, 5]);
            assert!(sel.order.iter().all(|i| sel.elite.contains(i)));
        }
    }

    #[test]
    fn test_prop_one_keeps_all_but_minimum() {
        let mut rng = SimpleRng::new(5);
        let sel = elite_resample(&[1.0, 2.0, 3.0, 0.5], 1.0, &mut rng);
        assert_eq!(sel.threshold, 0.5);
        assert_eq!(sel.elite, vec![0, 1, 2]);
        assert_eq!(sel.order.len(), 4);
    }

    #[test]
    fn test_fill_is_roughly_uniform() {
        let weights = [10.0, 9.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let mut counts = [0usize; 2];
        let mut rng = SimpleRng::new(77);
        for _ in 0..500 {
            let sel = elite_resample(&weights, 0.2, &mut rng);
            for &i in &sel.order[2..] {
                counts[i] += 1;
            }
        }
        let total = (counts[0] + counts[1]) as f64;
        assert!((counts[0] as f64 / total - 0.5).abs() < 0.05);
    }
}
