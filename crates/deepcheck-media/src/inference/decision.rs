//! Logits to class and confidence.

use deepcheck_models::Verdict;

/// Outcome of one model inference.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResult {
    /// 1 = authentic, 0 = manipulated
    pub predicted_class: usize,
    /// Probability of the predicted class, in percent
    pub confidence: f64,
    pub probabilities: Vec<f64>,
}

impl InferenceResult {
    pub fn verdict(&self) -> Verdict {
        Verdict::from_class_index(self.predicted_class)
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits
        .iter()
        .map(|&l| l as f64)
        .fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&l| (l as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Softmax, arg-max and confidence. The lowest index wins ties.
///
/// Logits must be finite and non-empty; the engine checks this first.
pub fn decide(logits: &[f32]) -> InferenceResult {
    let probabilities = softmax(logits);
    let mut predicted_class = 0;
    for (i, p) in probabilities.iter().enumerate() {
        if *p > probabilities[predicted_class] {
            predicted_class = i;
        }
    }
    let confidence = probabilities.get(predicted_class).copied().unwrap_or(0.0) * 100.0;

    InferenceResult {
        predicted_class,
        confidence,
        probabilities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[2.0, -1.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(p[0] > p[1]);
    }

    #[test]
    fn test_softmax_is_stable_for_large_logits() {
        let p = softmax(&[1000.0, 999.0]);
        assert!(p.iter().all(|v| v.is_finite()));
        assert!((p[0] - 0.7310585786300049).abs() < 1e-9);
    }

    #[test]
    fn test_class_one_is_real() {
        let result = decide(&[0.0, 2.0]);
        assert_eq!(result.predicted_class, 1);
        assert_eq!(result.verdict(), Verdict::Real);
        assert!((result.confidence - 88.07970779778823).abs() < 1e-9);
    }

    #[test]
    fn test_class_zero_is_fake() {
        let result = decide(&[3.0, -3.0]);
        assert_eq!(result.verdict(), Verdict::Fake);
        assert!(result.confidence > 99.0 && result.confidence <= 100.0);
    }

    #[test]
    fn test_tie_picks_first_class() {
        let result = decide(&[0.5, 0.5]);
        assert_eq!(result.predicted_class, 0);
        assert!((result.confidence - 50.0).abs() < 1e-12);
    }
}
