//! Prediction engine over a loaded model
//!
//! [`Machine`] owns a model handle, the per-feature normalization pair and a
//! reusable sparse scratch buffer. Dense inputs are normalized, sparsely
//! encoded into the scratch and dispatched to the model's decision
//! procedures with shape and capability validation up front.
//!
//! One machine means one scratch buffer: prediction takes `&mut self` and
//! concurrent use of a single instance is not possible. Run one machine per
//! worker; separate instances share nothing.

use crate::backend;
use crate::codec::ModelCodec;
use crate::core::{KernelType, MachineType, Result, SvmError, SvmModel, SvmNode};
use log::debug;
use std::path::Path;

/// SVM prediction engine.
pub struct Machine {
    model: Box<dyn SvmModel>,
    input_size: usize,
    input_sub: Vec<f64>,
    input_div: Vec<f64>,
    scratch: Vec<SvmNode>,
}

impl Machine {
    /// Wrap a pre-built model handle.
    pub fn new(model: Box<dyn SvmModel>) -> Result<Self> {
        if model.support_vectors().is_empty() {
            return Err(SvmError::InvalidModel(
                "model carries no support vectors".to_string(),
            ));
        }

        let mut machine = Self {
            model,
            input_size: 0,
            input_sub: Vec::new(),
            input_div: Vec::new(),
            scratch: Vec::new(),
        };
        machine.recompute();
        Ok(machine)
    }

    /// Load a model from its native file format.
    pub fn from_model_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(Box::new(backend::load_model(path)?))
    }

    /// Reconstruct a model from its native byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::new(ModelCodec::new().deserialize(bytes)?)
    }

    /// Derive the expected input size from the support vectors, size the
    /// scratch buffer and reset normalization to identity.
    ///
    /// Runs on every model change; anything restoring stored normalization
    /// vectors must do so afterwards.
    fn recompute(&mut self) {
        let mut input_size = 0usize;
        for sv in self.model.support_vectors() {
            for node in sv {
                if !node.is_terminator() && node.index as usize > input_size {
                    input_size = node.index as usize;
                }
            }
        }

        self.input_size = input_size;
        self.scratch = vec![SvmNode::terminator(); input_size + 1];
        self.input_sub = vec![0.0; input_size];
        self.input_div = vec![1.0; input_size];
        debug!(
            "machine reset: input size {}, {} support vectors",
            input_size,
            self.model.support_vectors().len()
        );
    }

    /// Expected number of input features.
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// 1 for binary models, otherwise the number of classes.
    pub fn output_size(&self) -> usize {
        let c = self.model.num_classes();
        if c == 2 {
            1
        } else {
            c
        }
    }

    pub fn num_classes(&self) -> usize {
        self.model.num_classes()
    }

    /// Label of class `i` in training order.
    pub fn class_label(&self, i: usize) -> Result<i32> {
        let n_classes = self.model.num_classes();
        if i >= n_classes {
            return Err(SvmError::Index {
                index: i,
                n_classes,
            });
        }
        self.model.class_labels().get(i).copied().ok_or_else(|| {
            SvmError::Unsupported("model carries no class labels".to_string())
        })
    }

    pub fn machine_type(&self) -> MachineType {
        self.model.machine_type()
    }

    pub fn kernel_type(&self) -> KernelType {
        self.model.kernel_type()
    }

    pub fn polynomial_degree(&self) -> u32 {
        self.model.degree()
    }

    pub fn gamma(&self) -> f64 {
        self.model.gamma()
    }

    pub fn coefficient0(&self) -> f64 {
        self.model.coef0()
    }

    pub fn supports_probability(&self) -> bool {
        self.model.supports_probability()
    }

    pub fn model(&self) -> &dyn SvmModel {
        self.model.as_ref()
    }

    /// Per-feature values subtracted before prediction.
    pub fn input_subtraction(&self) -> &[f64] {
        &self.input_sub
    }

    /// Per-feature divisors applied after subtraction.
    pub fn input_division(&self) -> &[f64] {
        &self.input_div
    }

    /// Replace the subtraction vector; only the first `input_size` entries
    /// are kept, and the vector is copied rather than referenced.
    pub fn set_input_subtraction(&mut self, v: &[f64]) -> Result<()> {
        if v.len() < self.input_size {
            return Err(SvmError::Dimension {
                expected: self.input_size,
                actual: v.len(),
            });
        }
        self.input_sub = v[..self.input_size].to_vec();
        Ok(())
    }

    /// Replace the division vector; only the first `input_size` entries are
    /// kept. Zero divisors are rejected here rather than surfacing as
    /// infinities during prediction.
    pub fn set_input_division(&mut self, v: &[f64]) -> Result<()> {
        if v.len() < self.input_size {
            return Err(SvmError::Dimension {
                expected: self.input_size,
                actual: v.len(),
            });
        }
        if let Some(k) = v[..self.input_size].iter().position(|&d| d == 0.0) {
            return Err(SvmError::InvalidParameter(format!(
                "input division entry {k} is zero"
            )));
        }
        self.input_div = v[..self.input_size].to_vec();
        Ok(())
    }

    fn check_input(&self, input: &[f64]) -> Result<()> {
        if input.len() < self.input_size {
            return Err(SvmError::Dimension {
                expected: self.input_size,
                actual: input.len(),
            });
        }
        Ok(())
    }

    /// Normalize and sparsely encode the input into the scratch buffer.
    ///
    /// Features that normalize to exactly zero are omitted: in the sparse
    /// encoding a true zero is indistinguishable from an absent feature,
    /// matching the solver's semantics.
    fn encode(&mut self, input: &[f64]) {
        let mut cur = 0;
        for k in 0..self.input_size {
            let normalized = (input[k] - self.input_sub[k]) / self.input_div[k];
            if normalized == 0.0 {
                continue;
            }
            self.scratch[cur] = SvmNode::new((k + 1) as i32, normalized);
            cur += 1;
        }
        self.scratch[cur] = SvmNode::terminator();
    }

    /// Predict the class of a dense input.
    ///
    /// The solver's floating return is rounded half-away-from-zero to the
    /// nearest integer label, as regression-style machine types can yield
    /// fractional values.
    pub fn predict_class(&mut self, input: &[f64]) -> Result<i32> {
        self.check_input(input)?;
        self.encode(input);
        Ok(self.model.predict(&self.scratch).round() as i32)
    }

    /// Predict the class while exposing the decision-function values.
    ///
    /// `scores` must hold one value for binary models, `C*(C-1)/2` pairwise
    /// one-vs-one values otherwise.
    pub fn predict_class_and_scores(&mut self, input: &[f64], scores: &mut [f64]) -> Result<i32> {
        self.check_input(input)?;

        let c = self.output_size();
        let expected = if c < 2 { 1 } else { c * (c - 1) / 2 };
        if scores.len() != expected {
            return Err(SvmError::Dimension {
                expected,
                actual: scores.len(),
            });
        }

        self.encode(input);
        Ok(self.model.predict_values(&self.scratch, scores).round() as i32)
    }

    /// Predict the class while exposing per-class probability estimates.
    ///
    /// `probabilities` must hold `output_size()` entries; for a binary
    /// machine the single slot receives the first class's estimate. Fails
    /// before any solver call when the model was trained without
    /// probability support.
    pub fn predict_class_and_probabilities(
        &mut self,
        input: &[f64],
        probabilities: &mut [f64],
    ) -> Result<i32> {
        self.check_input(input)?;

        if !self.model.supports_probability() {
            return Err(SvmError::Unsupported(
                "this SVM does not support probabilities".to_string(),
            ));
        }

        let expected = self.output_size();
        if probabilities.len() != expected {
            return Err(SvmError::Dimension {
                expected,
                actual: probabilities.len(),
            });
        }

        self.encode(input);
        Ok(self
            .model
            .predict_probability(&self.scratch, probabilities)
            .round() as i32)
    }

    /// Persist the model in its native file format.
    pub fn save_model_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.model.save(path.as_ref())
    }
}
