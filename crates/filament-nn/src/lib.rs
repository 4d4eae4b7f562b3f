//! GraphSAGE node embeddings trained with a contrastive pair loss.
//!
//! The encoder is a three-layer weighted-mean GraphSAGE stack mapping node
//! features to log-probability embeddings. Training treats the two halves
//! of a [`filament_core::FeaturePair`] as paired views of the same nodes:
//! each half is encoded through the same network and a similarity-based
//! loss is taken between the two encodings.
//!
//! # Modules
//!
//! - [`conv`]: the weighted-mean graph convolution layer
//! - [`model`]: the three-layer encoder with parameter reset
//! - [`loss`]: the contrastive pair loss
//! - [`optim`]: SGD with L2 weight decay
//! - [`trainer`]: the epoch loop, early stopping and embedding export
//!
//! # Example
//!
//! ```rust,ignore
//! use filament_nn::{GraphBatch, ModelConfig, SageEmbedder, TrainConfig, Trainer};
//!
//! let trainer = Trainer::new(TrainConfig::default())?;
//! let model = SageEmbedder::new(ModelConfig::default(), trainer.device())?;
//!
//! let train = GraphBatch::new(&graph, &features, trainer.device())?;
//! let test = GraphBatch::new(&test_graph, &test_features, trainer.device())?;
//!
//! let summary = trainer.run(&model, &train, &test, "train_emb.txt", "test_emb.txt")?;
//! eprintln!("best loss {:.4}", summary.best_loss);
//! ```

pub mod conv;
mod error;
pub mod loss;
pub mod model;
pub mod optim;
pub mod trainer;

pub use conv::{dense_adjacency, SageConv};
pub use error::{Error, Result};
pub use loss::pair_contrast_loss;
pub use model::{ModelConfig, SageEmbedder};
pub use optim::{Sgd, SgdConfig};
pub use trainer::{GraphBatch, RunSummary, TrainConfig, Trainer};
