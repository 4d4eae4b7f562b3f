//! The three-layer GraphSAGE encoder.

use crate::conv::SageConv;
use candle_core::{DType, Device, Result, Tensor, D};
use candle_nn::{ops, VarBuilder, VarMap};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Encoder hyperparameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Input feature dimension.
    pub input_dim: usize,
    /// Embedding (hidden and output) dimension.
    pub emb_dim: usize,
    /// Repetitions of the middle layer; 0 wires conv1 straight to conv3.
    pub num_hidden_layers: usize,
    /// Dropout rate applied after each activation while training.
    pub dropout: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            input_dim: 16,
            emb_dim: 8,
            num_hidden_layers: 0,
            dropout: 0.1,
        }
    }
}

/// Three-layer weighted-mean GraphSAGE encoder.
///
/// Maps node features `(N, input_dim)` to log-probability embeddings
/// `(N, emb_dim)`:
///
/// ```text
/// conv1 -> ReLU -> dropout -> [conv2 -> ReLU -> dropout]* -> conv3 -> log_softmax
/// ```
///
/// The middle block repeats `num_hidden_layers` times, reusing the same
/// conv2 parameters. The model owns its parameters through a [`VarMap`];
/// optimizers receive non-owning [`candle_core::Var`] handles.
pub struct SageEmbedder {
    conv1: SageConv,
    conv2: SageConv,
    conv3: SageConv,
    config: ModelConfig,
    varmap: VarMap,
}

impl SageEmbedder {
    /// Build the encoder with freshly initialized parameters on `device`.
    pub fn new(config: ModelConfig, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);

        let conv1 = SageConv::new(config.input_dim, config.emb_dim, false, vb.pp("conv1"))?;
        let conv2 = SageConv::new(config.emb_dim, config.emb_dim, false, vb.pp("conv2"))?;
        let conv3 = SageConv::new(config.emb_dim, config.emb_dim, false, vb.pp("conv3"))?;

        Ok(Self {
            conv1,
            conv2,
            conv3,
            config,
            varmap,
        })
    }

    /// The encoder configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Non-owning handles to every parameter, for the optimizer.
    pub fn all_vars(&self) -> Vec<candle_core::Var> {
        self.varmap.all_vars()
    }

    /// Forward pass.
    ///
    /// Training passes hand in the rng driving the dropout masks; runs
    /// must be reproducible under a fixed seed, so masks come from a
    /// caller-seeded rng rather than the device rng. Evaluation and
    /// export pass `None`, which disables dropout.
    pub fn forward(&self, x: &Tensor, adj: &Tensor, rng: Option<&mut StdRng>) -> Result<Tensor> {
        let mut rng = rng;
        let mut h = self.conv1.forward(x, adj)?.relu()?;
        if let Some(rng) = rng.as_mut() {
            h = seeded_dropout(&h, self.config.dropout, rng)?;
        }

        for _ in 0..self.config.num_hidden_layers {
            h = self.conv2.forward(&h, adj)?.relu()?;
            if let Some(rng) = rng.as_mut() {
                h = seeded_dropout(&h, self.config.dropout, rng)?;
            }
        }

        let h = self.conv3.forward(&h, adj)?;
        ops::log_softmax(&h, D::Minus1)
    }

    /// Re-initialize every layer parameter in place.
    ///
    /// Weights and biases are re-sampled uniform(-1/sqrt(fan_in),
    /// 1/sqrt(fan_in)) from an rng seeded with `seed`; variable names are
    /// visited in sorted order so the result is deterministic across
    /// calls. Callable before each training run.
    pub fn reset_parameters(&self, seed: u64) -> Result<()> {
        let mut rng = StdRng::seed_from_u64(seed);
        let vars = self.varmap.data().lock().unwrap();

        let mut names: Vec<&String> = vars.keys().collect();
        names.sort();

        // Fan-in per layer comes from its weight matrix (out, in).
        let mut fan_in: HashMap<&str, usize> = HashMap::new();
        for name in &names {
            if let Some(prefix) = name.strip_suffix(".weight") {
                fan_in.insert(prefix, vars[*name].dims()[1]);
            }
        }

        for name in &names {
            let var = &vars[*name];
            let prefix = name.rsplit_once('.').map_or(name.as_str(), |(p, _)| p);
            let fan = fan_in
                .get(prefix)
                .copied()
                .unwrap_or_else(|| var.dims().last().copied().unwrap_or(1));
            let bound = 1.0 / (fan as f32).sqrt();

            let fresh: Vec<f32> = (0..var.elem_count())
                .map(|_| rng.random_range(-bound..bound))
                .collect();
            var.set(&Tensor::from_vec(fresh, var.dims(), var.device())?)?;
        }

        Ok(())
    }
}

/// Inverted dropout with a caller-provided rng.
///
/// Kept entries are scaled by 1/(1-p) so activations keep their expected
/// magnitude; the mask is a constant with respect to gradients.
fn seeded_dropout(x: &Tensor, p: f32, rng: &mut StdRng) -> Result<Tensor> {
    if p <= 0.0 {
        return Ok(x.clone());
    }
    let keep = 1.0 - p;
    let scale = 1.0 / keep;
    let mask: Vec<f32> = (0..x.elem_count())
        .map(|_| if rng.random::<f32>() < keep { scale } else { 0.0 })
        .collect();
    let mask = Tensor::from_vec(mask, x.dims(), x.device())?;
    x.mul(&mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_adjacency(n: usize, device: &Device) -> Tensor {
        let mut data = vec![0.0f32; n * n];
        for i in 0..n - 1 {
            data[i * n + i + 1] = 1.0;
            data[(i + 1) * n + i] = 1.0;
        }
        Tensor::from_vec(data, (n, n), device).unwrap()
    }

    #[test]
    fn test_forward_shape() {
        let device = Device::Cpu;
        let model = SageEmbedder::new(ModelConfig::default(), &device).unwrap();

        let x = Tensor::randn(0f32, 1f32, (5, 16), &device).unwrap();
        let adj = line_adjacency(5, &device);

        let out = model.forward(&x, &adj, None).unwrap();
        assert_eq!(out.dims(), &[5, 8]);
    }

    #[test]
    fn test_output_is_log_softmax() {
        let device = Device::Cpu;
        let model = SageEmbedder::new(ModelConfig::default(), &device).unwrap();

        let x = Tensor::randn(0f32, 1f32, (4, 16), &device).unwrap();
        let adj = line_adjacency(4, &device);

        let out = model.forward(&x, &adj, None).unwrap();
        let row_sums = out.exp().unwrap().sum(1).unwrap().to_vec1::<f32>().unwrap();
        for s in row_sums {
            assert!((s - 1.0).abs() < 1e-4, "exp-row-sum {s}");
        }
    }

    #[test]
    fn test_hidden_layers_change_depth_not_shape() {
        let device = Device::Cpu;
        let config = ModelConfig {
            num_hidden_layers: 2,
            ..Default::default()
        };
        let model = SageEmbedder::new(config, &device).unwrap();

        let x = Tensor::randn(0f32, 1f32, (3, 16), &device).unwrap();
        let adj = line_adjacency(3, &device);

        let out = model.forward(&x, &adj, None).unwrap();
        assert_eq!(out.dims(), &[3, 8]);
    }

    #[test]
    fn test_dropout_is_seeded() {
        let device = Device::Cpu;
        let model = SageEmbedder::new(ModelConfig::default(), &device).unwrap();
        model.reset_parameters(0).unwrap();

        let x = Tensor::ones((4, 16), DType::F32, &device).unwrap();
        let adj = line_adjacency(4, &device);

        let mut rng_a = StdRng::seed_from_u64(7);
        let a = model
            .forward(&x, &adj, Some(&mut rng_a))
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();

        let mut rng_b = StdRng::seed_from_u64(7);
        let b = model
            .forward(&x, &adj, Some(&mut rng_b))
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_reset_is_deterministic() {
        let device = Device::Cpu;
        let model = SageEmbedder::new(ModelConfig::default(), &device).unwrap();

        let x = Tensor::ones((4, 16), DType::F32, &device).unwrap();
        let adj = line_adjacency(4, &device);

        model.reset_parameters(0).unwrap();
        let first = model
            .forward(&x, &adj, None)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();

        model.reset_parameters(0).unwrap();
        let second = model
            .forward(&x, &adj, None)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_reset_changes_with_seed() {
        let device = Device::Cpu;
        let model = SageEmbedder::new(ModelConfig::default(), &device).unwrap();

        let x = Tensor::ones((4, 16), DType::F32, &device).unwrap();
        let adj = line_adjacency(4, &device);

        model.reset_parameters(0).unwrap();
        let a = model
            .forward(&x, &adj, None)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();

        model.reset_parameters(1).unwrap();
        let b = model
            .forward(&x, &adj, None)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();

        assert_ne!(a, b);
    }
}
