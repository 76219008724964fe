//! Final linear projection.

use ndarray::{Array1, Array2};

use crate::error::{MediaError, MediaResult};

/// `linear1` followed by dropout, which is the identity at inference.
#[derive(Debug, Clone)]
pub struct Classifier {
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl Classifier {
    pub fn new(weight: Array2<f32>, bias: Array1<f32>) -> Self {
        Self { weight, bias }
    }

    /// Project a feature vector to class logits.
    pub fn logits(&self, features: &Array1<f32>) -> MediaResult<Vec<f32>> {
        if features.len() != self.weight.ncols() {
            return Err(MediaError::model_load(format!(
                "classifier expects {} features, got {}",
                self.weight.ncols(),
                features.len()
            )));
        }
        let out = self.weight.dot(features) + &self.bias;
        Ok(out.to_vec())
    }
}
