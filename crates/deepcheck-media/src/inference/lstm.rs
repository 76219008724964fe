//! LSTM forward pass over a feature sequence.
//!
//! Zero initial hidden and cell state, gate order i, f, g, o.

use ndarray::{concatenate, s, Array1, Array2, ArrayView1, ArrayView2, Axis};

use super::weights::LstmDirectionWeights;
use crate::error::{MediaError, MediaResult};

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Run one direction of one layer; returns per-step hidden states `[T, H]`.
///
/// With `reverse` the sequence is consumed back to front, but row `t` of the
/// output still corresponds to input step `t`.
fn run_direction(input: ArrayView2<'_, f32>, weights: &LstmDirectionWeights, reverse: bool) -> Array2<f32> {
    let steps = input.nrows();
    let hidden = weights.w_hh.ncols();
    let mut h = Array1::<f32>::zeros(hidden);
    let mut c = Array1::<f32>::zeros(hidden);
    let mut out = Array2::<f32>::zeros((steps, hidden));

    // Input projections for every step at once: [T, 4H]
    let mut projected = input.dot(&weights.w_ih.t());
    if let Some(bias) = &weights.bias {
        projected += bias;
    }

    let order: Box<dyn Iterator<Item = usize>> = if reverse {
        Box::new((0..steps).rev())
    } else {
        Box::new(0..steps)
    };

    for t in order {
        let gates = &projected.row(t) + &weights.w_hh.dot(&h);
        step(gates.view(), hidden, &mut h, &mut c);
        out.row_mut(t).assign(&h);
    }
    out
}

fn step(gates: ArrayView1<'_, f32>, hidden: usize, h: &mut Array1<f32>, c: &mut Array1<f32>) {
    let i = gates.slice(s![0..hidden]);
    let f = gates.slice(s![hidden..2 * hidden]);
    let g = gates.slice(s![2 * hidden..3 * hidden]);
    let o = gates.slice(s![3 * hidden..4 * hidden]);

    for k in 0..hidden {
        let ig = sigmoid(i[k]);
        let fg = sigmoid(f[k]);
        let gg = g[k].tanh();
        let og = sigmoid(o[k]);
        c[k] = fg * c[k] + ig * gg;
        h[k] = og * c[k].tanh();
    }
}

/// Run the stacked LSTM and return the top layer's output at the last step.
///
/// For a bidirectional stack the result is the forward state after the last
/// step concatenated with the backward output at the last position.
pub fn last_step_output(
    sequence: ArrayView2<'_, f32>,
    layers: &[Vec<LstmDirectionWeights>],
) -> MediaResult<Array1<f32>> {
    if sequence.nrows() == 0 {
        return Err(MediaError::invalid_input("empty feature sequence"));
    }
    let mut current = sequence.to_owned();

    for directions in layers {
        let outputs: Vec<Array2<f32>> = directions
            .iter()
            .enumerate()
            .map(|(d, w)| run_direction(current.view(), w, d == 1))
            .collect();
        let views: Vec<ArrayView2<'_, f32>> = outputs.iter().map(|o| o.view()).collect();
        current = concatenate(Axis(1), &views)
            .map_err(|e| MediaError::internal(format!("LSTM direction concat: {e}")))?;
    }

    let last = current.nrows() - 1;
    Ok(current.row(last).to_owned())
}
