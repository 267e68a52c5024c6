//! Core traits for SVM inference

use crate::core::{KernelType, MachineType, Result, SvmNode};
use std::path::Path;

/// Capability interface over a trained SVM model.
///
/// The prediction engine talks to the model exclusively through this trait, so
/// the pipeline can be exercised against stub models in tests and alternative
/// solver backends can be plugged in without touching the engine.
///
/// Inputs to the prediction methods are sentinel-terminated sparse node
/// slices; the caller guarantees a terminator is present.
pub trait SvmModel: Send + Sync {
    /// Predict the class (or regression value) for one encoded input.
    ///
    /// For classification models the return is the winning class label as a
    /// float; for regression and one-class models it is the raw decision
    /// output.
    fn predict(&self, input: &[SvmNode]) -> f64;

    /// Predict while exposing the decision-function values.
    ///
    /// For a model with C > 2 classes, `scores` receives the C*(C-1)/2
    /// pairwise one-vs-one values; binary and non-classification models fill
    /// a single value. The caller sizes `scores` accordingly.
    fn predict_values(&self, input: &[SvmNode], scores: &mut [f64]) -> f64;

    /// Predict while exposing per-class probability estimates.
    ///
    /// Only meaningful when [`supports_probability`](Self::supports_probability)
    /// is true. Estimates are written in [`class_labels`](Self::class_labels)
    /// order, at most `probabilities.len()` of them: a binary machine
    /// conventionally passes a single slot and the complement is implied.
    fn predict_probability(&self, input: &[SvmNode], probabilities: &mut [f64]) -> f64;

    /// Whether the model was trained with probability estimates.
    fn supports_probability(&self) -> bool;

    /// Number of classes (2 for regression and one-class models).
    fn num_classes(&self) -> usize;

    /// Class labels in training order; empty for non-classification models.
    fn class_labels(&self) -> &[i32];

    fn machine_type(&self) -> MachineType;

    fn kernel_type(&self) -> KernelType;

    /// Degree of the polynomial kernel (unused by other kernels).
    fn degree(&self) -> u32;

    fn gamma(&self) -> f64;

    fn coef0(&self) -> f64;

    /// Sparse encodings of all support vectors, used to derive the expected
    /// input size.
    fn support_vectors(&self) -> &[Vec<SvmNode>];

    /// Persist the model in its native file format.
    fn save(&self, path: &Path) -> Result<()>;
}
