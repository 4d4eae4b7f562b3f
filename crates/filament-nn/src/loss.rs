//! Contrastive pair loss.

use candle_core::{bail, Result, Tensor};
use candle_nn::ops;

/// Similarity-based loss between two encodings of the same node set.
///
/// Given `output` and `target` of equal shape `(N, D)`:
///
/// 1. similarity = `output . target^T`, shape `(N, N)`
/// 2. zero the diagonal (self-similarity)
/// 3. L2-normalize each column
/// 4. sigmoid
/// 5. mean over all entries
///
/// The operation order is the contract: reordering an algebraically
/// similar formula changes gradients. Only the diagonal is treated
/// specially; no further pair labeling is applied.
pub fn pair_contrast_loss(output: &Tensor, target: &Tensor) -> Result<Tensor> {
    if output.dims() != target.dims() {
        bail!(
            "loss operands must share a shape, got {:?} and {:?}",
            output.dims(),
            target.dims()
        );
    }

    let sim = output.matmul(&target.t()?)?;
    let n = sim.dim(0)?;

    // Mask out self-similarity.
    let eye = Tensor::eye(n, sim.dtype(), sim.device())?;
    let mask = (Tensor::ones((n, n), sim.dtype(), sim.device())? - eye)?;
    let sim = sim.mul(&mask)?;

    // Column-wise L2 normalization.
    let norm = sim.sqr()?.sum_keepdim(0)?.sqrt()?;
    let norm = (norm + 1e-12)?;
    let sim = sim.broadcast_div(&norm)?;

    let sim = ops::sigmoid(&sim)?;
    sim.mean_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    /// Mirror of the tensor pipeline in plain f32, for expected values.
    fn scalar_loss(output: &[Vec<f32>], target: &[Vec<f32>]) -> f32 {
        let n = output.len();
        let mut sim = vec![vec![0.0f32; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                sim[i][j] = output[i]
                    .iter()
                    .zip(&target[j])
                    .map(|(a, b)| a * b)
                    .sum();
            }
        }
        for j in 0..n {
            let norm = (0..n).map(|i| sim[i][j] * sim[i][j]).sum::<f32>().sqrt() + 1e-12;
            for i in 0..n {
                sim[i][j] /= norm;
            }
        }
        let mut total = 0.0;
        for row in &sim {
            for &v in row {
                total += 1.0 / (1.0 + (-v).exp());
            }
        }
        total / (n * n) as f32
    }

    fn to_tensor(rows: &[Vec<f32>]) -> Tensor {
        let n = rows.len();
        let d = rows[0].len();
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        Tensor::from_vec(flat, (n, d), &Device::Cpu).unwrap()
    }

    #[test]
    fn test_matches_scalar_mirror() {
        let output = vec![
            vec![0.5, -0.25, 1.0],
            vec![-1.0, 0.75, 0.5],
            vec![0.25, 0.25, -0.5],
        ];
        let target = vec![
            vec![1.0, 0.0, -0.5],
            vec![0.5, 0.5, 0.5],
            vec![-0.25, 1.0, 0.0],
        ];

        let loss = pair_contrast_loss(&to_tensor(&output), &to_tensor(&target))
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        let expected = scalar_loss(&output, &target);

        assert!((loss - expected).abs() < 1e-5, "{loss} vs {expected}");
    }

    #[test]
    fn test_identical_operands_deterministic() {
        let rows = vec![vec![0.1, 0.2], vec![0.3, -0.4], vec![-0.5, 0.6]];
        let t = to_tensor(&rows);

        let a = pair_contrast_loss(&t, &t).unwrap().to_scalar::<f32>().unwrap();
        let b = pair_contrast_loss(&t, &t).unwrap().to_scalar::<f32>().unwrap();

        assert_eq!(a, b);
        assert!((a - scalar_loss(&rows, &rows)).abs() < 1e-5);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let a = Tensor::zeros((3, 2), candle_core::DType::F32, &Device::Cpu).unwrap();
        let b = Tensor::zeros((2, 2), candle_core::DType::F32, &Device::Cpu).unwrap();
        assert!(pair_contrast_loss(&a, &b).is_err());
    }
}
