//! Training and evaluation loop.

use crate::loss::pair_contrast_loss;
use crate::model::SageEmbedder;
use crate::optim::{Sgd, SgdConfig};
use crate::{conv, Error, Result};
use candle_core::{Device, Tensor};
use candle_nn::optim::Optimizer;
use filament_core::{EmbeddingTable, FeaturePair, WeightedGraph};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

/// Training configuration.
///
/// An explicit record passed into the training entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Independent runs; parameters are reset before each (default: 1).
    #[serde(default = "default_runs")]
    pub runs: usize,
    /// Training epochs per run (default: 2000).
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// SGD learning rate (default: 0.01).
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// L2 weight decay (default: 5e-5).
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f64,
    /// Early-stopping window; 0 disables early stopping (default: 0).
    #[serde(default)]
    pub early_stopping: usize,
    /// Random seed for parameter initialization (default: 0).
    #[serde(default)]
    pub seed: u64,
    /// Epoch-progress cadence for stderr logging; 0 silences it
    /// (default: 100).
    #[serde(default = "default_log_every")]
    pub log_every: usize,
}

fn default_runs() -> usize {
    1
}
fn default_epochs() -> usize {
    2000
}
fn default_learning_rate() -> f64 {
    0.01
}
fn default_weight_decay() -> f64 {
    5e-5
}
fn default_log_every() -> usize {
    100
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            runs: 1,
            epochs: 2000,
            learning_rate: 0.01,
            weight_decay: 5e-5,
            early_stopping: 0,
            seed: 0,
            log_every: 100,
        }
    }
}

impl TrainConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn with_early_stopping(mut self, early_stopping: usize) -> Self {
        self.early_stopping = early_stopping;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }
}

/// A graph with its paired features, staged on the training device.
///
/// Bundles the dense adjacency and both feature halves as tensors, plus
/// the external node ids used when exporting embeddings.
pub struct GraphBatch {
    /// External node ids in row order.
    pub ids: Vec<String>,
    /// Group-half features, `(N, input_dim)`.
    pub group: Tensor,
    /// Feature-half features, `(N, input_dim)`.
    pub feature: Tensor,
    /// Weighted adjacency, `(N, N)`.
    pub adj: Tensor,
}

impl GraphBatch {
    /// Stage a graph and its features on `device`.
    ///
    /// Fails fast when the feature rows do not match the node count.
    pub fn new(graph: &WeightedGraph, features: &FeaturePair, device: &Device) -> Result<Self> {
        if features.num_nodes() != graph.node_count() {
            return Err(Error::FeatureCountMismatch {
                nodes: graph.node_count(),
                rows: features.num_nodes(),
            });
        }

        Ok(Self {
            ids: graph.node_ids().map(str::to_string).collect(),
            group: array_to_tensor(features.group(), device)?,
            feature: array_to_tensor(features.feature(), device)?,
            adj: conv::dense_adjacency(graph, device)?,
        })
    }
}

fn array_to_tensor(array: &Array2<f32>, device: &Device) -> candle_core::Result<Tensor> {
    let (rows, cols) = array.dim();
    Tensor::from_vec(array.iter().copied().collect::<Vec<f32>>(), (rows, cols), device)
}

/// Outcome of a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Best (minimum) evaluation loss seen.
    pub best_loss: f32,
    /// Wall-clock time of the optimization loop.
    pub duration: Duration,
    /// Epochs actually executed.
    pub epochs_run: usize,
    /// Whether the early-stopping check ended the run.
    pub stopped_early: bool,
}

/// Drives training, evaluation and embedding export.
pub struct Trainer {
    config: TrainConfig,
    device: Device,
}

impl Trainer {
    /// Create a trainer on the accelerator when available, CPU otherwise.
    pub fn new(config: TrainConfig) -> Result<Self> {
        let device = Device::cuda_if_available(0)?;
        Ok(Self { config, device })
    }

    /// Create a trainer on an explicit device.
    pub fn with_device(config: TrainConfig, device: Device) -> Self {
        Self { config, device }
    }

    /// The training device.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Train, then export normalized embeddings for the training and test
    /// batches to the two output paths.
    ///
    /// Per run: parameters are reset, then each epoch optimizes the
    /// contrastive loss between the two encoded feature halves and
    /// re-evaluates it without dropout. A non-finite loss aborts the run
    /// with its epoch. Export keeps the group half's encoding,
    /// L2-normalizes its columns and writes the table atomically.
    pub fn run(
        &self,
        model: &SageEmbedder,
        train: &GraphBatch,
        test: &GraphBatch,
        train_out: impl AsRef<Path>,
        test_out: impl AsRef<Path>,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary {
            best_loss: f32::INFINITY,
            duration: Duration::ZERO,
            epochs_run: 0,
            stopped_early: false,
        };

        for _ in 0..self.config.runs {
            model.reset_parameters(self.config.seed)?;
            // Dropout masks draw from this rng; a run must be
            // reproducible under a fixed seed.
            let mut dropout_rng = StdRng::seed_from_u64(self.config.seed);
            let mut optimizer = Sgd::new(
                model.all_vars(),
                SgdConfig {
                    learning_rate: self.config.learning_rate,
                    weight_decay: self.config.weight_decay,
                },
            )?;

            self.synchronize()?;
            let t_start = Instant::now();

            let mut best_loss = f32::INFINITY;
            let mut history = Vec::with_capacity(self.config.epochs);
            let mut stopped_early = false;
            let mut epochs_run = 0;

            for epoch in 1..=self.config.epochs {
                self.train_epoch(model, train, &mut optimizer, &mut dropout_rng)?;
                let loss = self.evaluate(model, train)?;
                if !loss.is_finite() {
                    return Err(Error::NonFiniteLoss { epoch, value: loss });
                }

                if loss < best_loss {
                    best_loss = loss;
                }
                history.push(loss);
                epochs_run = epoch;

                if self.config.early_stopping > 0 && epoch > self.config.epochs / 2 {
                    if let Some(avg) = trailing_mean(&history, self.config.early_stopping + 1) {
                        if loss > avg {
                            stopped_early = true;
                            break;
                        }
                    }
                }

                if self.config.log_every > 0 && epoch % self.config.log_every == 0 {
                    eprintln!("epoch {epoch}: loss = {loss:.6}");
                }
            }

            self.synchronize()?;

            summary = RunSummary {
                best_loss,
                duration: t_start.elapsed(),
                epochs_run,
                stopped_early,
            };
        }

        self.export(model, train)?.write_to(train_out)?;
        self.export(model, test)?.write_to(test_out)?;

        Ok(summary)
    }

    /// One optimization step over the full batch.
    fn train_epoch(
        &self,
        model: &SageEmbedder,
        batch: &GraphBatch,
        optimizer: &mut Sgd,
        rng: &mut StdRng,
    ) -> Result<()> {
        let h = model.forward(&batch.group, &batch.adj, Some(&mut *rng))?;
        let l = model.forward(&batch.feature, &batch.adj, Some(&mut *rng))?;
        let loss = pair_contrast_loss(&h, &l)?;
        optimizer.backward_step(&loss)?;
        Ok(())
    }

    /// Loss on the batch without dropout or gradient tracking.
    fn evaluate(&self, model: &SageEmbedder, batch: &GraphBatch) -> Result<f32> {
        let h = model.forward(&batch.group, &batch.adj, None)?.detach();
        let l = model.forward(&batch.feature, &batch.adj, None)?.detach();
        let loss = pair_contrast_loss(&h, &l)?;
        Ok(loss.to_scalar::<f32>()?)
    }

    /// Encode the batch's group half and column-normalize the result.
    fn export(&self, model: &SageEmbedder, batch: &GraphBatch) -> Result<EmbeddingTable> {
        let out = model.forward(&batch.group, &batch.adj, None)?.detach();

        let norm = out.sqr()?.sum_keepdim(0)?.sqrt()?;
        let norm = (norm + 1e-12)?;
        let out = out.broadcast_div(&norm)?;

        let (rows, cols) = out.dims2()?;
        let flat: Vec<f32> = out.to_vec2::<f32>()?.into_iter().flatten().collect();
        let values =
            Array2::from_shape_vec((rows, cols), flat).expect("row-major data matches shape");

        Ok(EmbeddingTable::new(batch.ids.clone(), values)?)
    }

    fn synchronize(&self) -> Result<()> {
        if self.device.is_cuda() {
            self.device.synchronize()?;
        }
        Ok(())
    }
}

/// Mean of the `window` recorded losses immediately preceding the last
/// entry; `None` until enough history exists.
fn trailing_mean(history: &[f32], window: usize) -> Option<f32> {
    let n = history.len();
    if n < window + 1 {
        return None;
    }
    let slice = &history[n - 1 - window..n - 1];
    Some(slice.iter().sum::<f32>() / window as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_mean_needs_history() {
        assert_eq!(trailing_mean(&[1.0, 2.0], 3), None);
        assert_eq!(trailing_mean(&[1.0, 2.0, 3.0], 3), None);
    }

    #[test]
    fn test_trailing_mean_excludes_current() {
        // Current entry is 10.0; the window covers the three before it.
        let history = [4.0, 1.0, 2.0, 3.0, 10.0];
        let avg = trailing_mean(&history, 3).unwrap();
        assert!((avg - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_batch_rejects_feature_mismatch() {
        let mut graph = WeightedGraph::new();
        graph.add_edge("a", "b", 1.0).unwrap();

        let features = FeaturePair::new(Array2::zeros((3, 16)), Array2::zeros((3, 16))).unwrap();
        let err = GraphBatch::new(&graph, &features, &Device::Cpu);
        assert!(matches!(err, Err(Error::FeatureCountMismatch { .. })));
    }

    #[test]
    fn test_batch_staging_shapes() {
        let mut graph = WeightedGraph::new();
        graph.add_edge("a", "b", 1.0).unwrap();
        graph.add_edge("b", "c", 2.0).unwrap();

        let features = FeaturePair::new(Array2::zeros((3, 16)), Array2::ones((3, 16))).unwrap();
        let batch = GraphBatch::new(&graph, &features, &Device::Cpu).unwrap();

        assert_eq!(batch.ids, vec!["a", "b", "c"]);
        assert_eq!(batch.group.dims(), &[3, 16]);
        assert_eq!(batch.feature.dims(), &[3, 16]);
        assert_eq!(batch.adj.dims(), &[3, 3]);
    }
}
