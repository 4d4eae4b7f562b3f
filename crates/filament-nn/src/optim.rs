//! Stochastic gradient descent with L2 weight decay.

use candle_core::backprop::GradStore;
use candle_core::{Result, Var};
use candle_nn::optim::Optimizer;

/// SGD hyperparameters.
#[derive(Debug, Clone, Copy)]
pub struct SgdConfig {
    pub learning_rate: f64,
    /// L2 penalty folded into each step; 0 disables decay.
    pub weight_decay: f64,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            weight_decay: 5e-5,
        }
    }
}

/// Plain SGD over a set of parameter handles:
///
/// ```text
/// p <- p - lr * (grad + weight_decay * p)
/// ```
///
/// Holds non-owning [`Var`] handles; the model keeps ownership of its
/// parameters.
#[derive(Debug)]
pub struct Sgd {
    vars: Vec<Var>,
    config: SgdConfig,
}

impl Optimizer for Sgd {
    type Config = SgdConfig;

    fn new(vars: Vec<Var>, config: SgdConfig) -> Result<Self> {
        Ok(Self { vars, config })
    }

    fn step(&mut self, grads: &GradStore) -> Result<()> {
        for var in self.vars.iter() {
            if let Some(grad) = grads.get(var) {
                let update = if self.config.weight_decay > 0.0 {
                    (grad + &(var.as_tensor() * self.config.weight_decay)?)?
                } else {
                    grad.clone()
                };
                var.set(&var.sub(&(update * self.config.learning_rate)?)?)?;
            }
        }
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.config.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.config.learning_rate = lr;
    }
}
