//! # Gauss–Legendre quadrature rules
//!
//! The reference flux kernels integrate intensities over disks and annuli with Gauss–Legendre
//! rules. Building a rule costs `O(n²)` Newton iterations, so rules are memoised in a
//! process-wide cache keyed by their node count. The cache only ever holds rules, never flux
//! values: dropping it changes performance, not results.

use std::{
    f64::consts::PI,
    sync::{Arc, Mutex},
};

use ahash::AHashMap;
use once_cell::sync::Lazy;

/// Gauss–Legendre nodes and weights on `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussLegendre {
    pub nodes: Vec<f64>,
    pub weights: Vec<f64>,
}

impl GaussLegendre {
    /// Compute an `n`-point rule by Newton iteration on the Legendre polynomial `P_n`.
    pub fn new(n: usize) -> Self {
        let mut nodes = vec![0.0; n];
        let mut weights = vec![0.0; n];

        for i in 0..n.div_ceil(2) {
            // Tricomi's initial approximation of the i-th root
            let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
            let mut dp = 1.0;

            for _ in 0..100 {
                let (p, d) = legendre_with_derivative(n, x);
                dp = d;
                let dx = p / d;
                x -= dx;
                if dx.abs() < 1e-15 {
                    dp = legendre_with_derivative(n, x).1;
                    break;
                }
            }

            let w = 2.0 / ((1.0 - x * x) * dp * dp);
            nodes[i] = -x;
            nodes[n - 1 - i] = x;
            weights[i] = w;
            weights[n - 1 - i] = w;
        }

        GaussLegendre { nodes, weights }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes and weights mapped onto `[lo, hi]`.
    pub fn mapped(&self, lo: f64, hi: f64) -> impl Iterator<Item = (f64, f64)> + '_ {
        let half = 0.5 * (hi - lo);
        let mid = 0.5 * (hi + lo);
        self.nodes
            .iter()
            .zip(self.weights.iter())
            .map(move |(&x, &w)| (mid + half * x, half * w))
    }

    /// Integrate `f` over `[lo, hi]`.
    pub fn integrate<F: FnMut(f64) -> f64>(&self, lo: f64, hi: f64, mut f: F) -> f64 {
        self.mapped(lo, hi).map(|(x, w)| w * f(x)).sum()
    }
}

/// Evaluate `P_n(x)` and `P_n'(x)` with the three-term recurrence.
fn legendre_with_derivative(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = x;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=n {
        let kf = k as f64;
        let p2 = ((2.0 * kf - 1.0) * x * p1 - (kf - 1.0) * p0) / kf;
        p0 = p1;
        p1 = p2;
    }
    let dp = n as f64 * (x * p1 - p0) / (x * x - 1.0);
    (p1, dp)
}

static RULES: Lazy<Mutex<AHashMap<usize, Arc<GaussLegendre>>>> =
    Lazy::new(|| Mutex::new(AHashMap::new()));

/// Shared `n`-point rule, built on first request.
pub fn gauss_legendre(n: usize) -> Arc<GaussLegendre> {
    let mut rules = match RULES.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    rules
        .entry(n)
        .or_insert_with(|| {
            log::trace!("building {n}-point Gauss-Legendre rule");
            Arc::new(GaussLegendre::new(n))
        })
        .clone()
}

#[cfg(test)]
mod quadrature_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_weights_sum_to_interval_length() {
        for n in [1, 2, 5, 16, 64] {
            let rule = GaussLegendre::new(n);
            assert_abs_diff_eq!(rule.weights.iter().sum::<f64>(), 2.0, epsilon = 1e-13);
        }
    }

    #[test]
    fn test_exact_for_polynomials() {
        let rule = GaussLegendre::new(4);
        // Exact up to degree 2n - 1 = 7
        let integral = rule.integrate(0.0, 2.0, |x| x.powi(7) - 3.0 * x.powi(2) + 1.0);
        assert_abs_diff_eq!(integral, 256.0 / 8.0 - 8.0 + 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_nodes_are_sorted_and_symmetric() {
        let rule = GaussLegendre::new(7);
        assert!(rule.nodes.windows(2).all(|w| w[0] < w[1]));
        assert_abs_diff_eq!(rule.nodes[3], 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(rule.nodes[0], -rule.nodes[6], epsilon = 1e-15);
    }

    #[test]
    fn test_cache_returns_shared_rule() {
        let a = gauss_legendre(12);
        let b = gauss_legendre(12);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
