//! Information-theoretic measures over probability vectors.
//!
//! Values are clipped into `[eps, 1 - eps]` before logarithms are taken, so zero entries never
//! produce `-inf` or `NaN`. All logarithms are natural.

/// Default clipping bound
pub const EPSILON: f64 = 1e-16;


fn clip(p: f64, eps: f64) -> f64 {
    p.max(eps).min(1.0 - eps)
}


/// Shannon entropy of `p`
pub fn entropy(p: &[f64], eps: f64) -> f64 {
    -p.iter().map(|&x| clip(x, eps)).map(|x| x * x.ln()).sum::<f64>()
}


/// Relative entropy (Kullback-Leibler divergence) `D(p || q)`. Extra elements of the longer
/// vector are ignored.
pub fn relative_entropy(p: &[f64], q: &[f64], eps: f64) -> f64 {
    p.iter()
     .zip(q.iter())
     .map(|(&a, &b)| (clip(a, eps), clip(b, eps)))
     .map(|(a, b)| a * (a / b).ln())
     .sum()
}


/// Symmetrised relative entropy `D(p || q) + D(q || p)`
pub fn symmetric_relative_entropy(p: &[f64], q: &[f64], eps: f64) -> f64 {
    relative_entropy(p, q, eps) + relative_entropy(q, p, eps)
}


/// Cross entropy `H(p, q) = H(p) + D(p || q)`
pub fn cross_entropy(p: &[f64], q: &[f64], eps: f64) -> f64 {
    entropy(p, eps) + relative_entropy(p, q, eps)
}
