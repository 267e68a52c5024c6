//! Native prediction backend
//!
//! A pure-Rust solver backend that reads and writes the standard LibSVM
//! model text format and evaluates the trained decision function. Training
//! is out of scope; models come from external tooling (or fixtures) and are
//! only ever loaded, queried and evaluated here.

pub mod format;
pub mod kernel;

use crate::core::{KernelType, MachineType, Result, SvmError, SvmModel, SvmNode};
use kernel::KernelParams;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Release number of the model format dialect this backend speaks,
/// `major * 100 + minor`. Stored as the `version` attribute by the
/// persistence layer and compared major-to-major on load.
pub const VERSION: u64 = 325;

/// A trained model deserialized from the native text format.
///
/// Support vectors are grouped by class in training order; `sv_coef` holds
/// `n_classes - 1` coefficient rows as the one-vs-one decision function
/// expects them.
#[derive(Debug, Clone)]
pub struct NativeModel {
    pub(crate) machine_type: MachineType,
    pub(crate) kernel: KernelParams,
    pub(crate) n_classes: usize,
    pub(crate) labels: Vec<i32>,
    pub(crate) rho: Vec<f64>,
    pub(crate) prob_a: Vec<f64>,
    pub(crate) prob_b: Vec<f64>,
    pub(crate) n_sv_per_class: Vec<usize>,
    pub(crate) sv_coef: Vec<Vec<f64>>,
    pub(crate) sv: Vec<Vec<SvmNode>>,
}

/// Load a model from its native text format.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<NativeModel> {
    let path = path.as_ref();
    let file = File::open(path).map_err(SvmError::Io)?;
    format::parse(BufReader::new(file), &path.display().to_string())
}

impl NativeModel {
    /// Number of one-vs-one class pairs, 1 for non-classification models.
    fn n_pairs(&self) -> usize {
        if self.machine_type.is_classification() {
            self.n_classes * (self.n_classes - 1) / 2
        } else {
            1
        }
    }

    /// Evaluate the decision function, filling `dec` with the raw values.
    ///
    /// `dec` must hold `n_pairs()` entries. Returns the predicted label for
    /// classification, the raw decision output otherwise.
    fn decision_values(&self, x: &[SvmNode], dec: &mut [f64]) -> f64 {
        if !self.machine_type.is_classification() {
            let mut sum = -self.rho[0];
            for (coef, sv) in self.sv_coef[0].iter().zip(&self.sv) {
                sum += coef * self.kernel.eval(x, sv);
            }
            dec[0] = sum;
            return match self.machine_type {
                MachineType::OneClass => {
                    if sum > 0.0 {
                        1.0
                    } else {
                        -1.0
                    }
                }
                _ => sum,
            };
        }

        let c = self.n_classes;
        let kvalue: Vec<f64> = self.sv.iter().map(|sv| self.kernel.eval(x, sv)).collect();

        let mut start = vec![0usize; c];
        for i in 1..c {
            start[i] = start[i - 1] + self.n_sv_per_class[i - 1];
        }

        let mut vote = vec![0usize; c];
        let mut p = 0;
        for i in 0..c {
            for j in (i + 1)..c {
                let (si, ci) = (start[i], self.n_sv_per_class[i]);
                let (sj, cj) = (start[j], self.n_sv_per_class[j]);

                let mut sum = 0.0;
                for k in 0..ci {
                    sum += self.sv_coef[j - 1][si + k] * kvalue[si + k];
                }
                for k in 0..cj {
                    sum += self.sv_coef[i][sj + k] * kvalue[sj + k];
                }
                sum -= self.rho[p];

                dec[p] = sum;
                if sum > 0.0 {
                    vote[i] += 1;
                } else {
                    vote[j] += 1;
                }
                p += 1;
            }
        }

        // Ties go to the earlier class, as the voting scan is first-wins
        let mut best = 0;
        for i in 1..c {
            if vote[i] > vote[best] {
                best = i;
            }
        }
        f64::from(self.labels[best])
    }
}

impl SvmModel for NativeModel {
    fn predict(&self, input: &[SvmNode]) -> f64 {
        let mut dec = vec![0.0; self.n_pairs()];
        self.decision_values(input, &mut dec)
    }

    fn predict_values(&self, input: &[SvmNode], scores: &mut [f64]) -> f64 {
        self.decision_values(input, scores)
    }

    fn predict_probability(&self, input: &[SvmNode], probabilities: &mut [f64]) -> f64 {
        if !(self.machine_type.is_classification() && self.supports_probability()) {
            return self.predict(input);
        }

        let c = self.n_classes;
        let mut dec = vec![0.0; self.n_pairs()];
        self.decision_values(input, &mut dec);

        // Pairwise class probabilities from the decision values, clamped
        // away from 0 and 1 to keep the coupling stable.
        let min_prob = 1e-7;
        let mut pairwise = vec![vec![0.0; c]; c];
        let mut p = 0;
        for i in 0..c {
            for j in (i + 1)..c {
                let r = sigmoid_predict(dec[p], self.prob_a[p], self.prob_b[p])
                    .clamp(min_prob, 1.0 - min_prob);
                pairwise[i][j] = r;
                pairwise[j][i] = 1.0 - r;
                p += 1;
            }
        }

        // Couple over all classes, then hand back as many entries as the
        // caller's buffer holds (a binary machine takes a single slot, the
        // complement being implied).
        let mut estimates = vec![0.0; c];
        couple_probabilities(&pairwise, &mut estimates);
        let n = probabilities.len().min(c);
        probabilities[..n].copy_from_slice(&estimates[..n]);

        let mut best = 0;
        for i in 1..c {
            if estimates[i] > estimates[best] {
                best = i;
            }
        }
        f64::from(self.labels[best])
    }

    fn supports_probability(&self) -> bool {
        match self.machine_type {
            MachineType::CSvc | MachineType::NuSvc => {
                !self.prob_a.is_empty() && !self.prob_b.is_empty()
            }
            MachineType::EpsilonSvr | MachineType::NuSvr => !self.prob_a.is_empty(),
            MachineType::OneClass => false,
        }
    }

    fn num_classes(&self) -> usize {
        self.n_classes
    }

    fn class_labels(&self) -> &[i32] {
        &self.labels
    }

    fn machine_type(&self) -> MachineType {
        self.machine_type
    }

    fn kernel_type(&self) -> KernelType {
        self.kernel.kernel
    }

    fn degree(&self) -> u32 {
        self.kernel.degree
    }

    fn gamma(&self) -> f64 {
        self.kernel.gamma
    }

    fn coef0(&self) -> f64 {
        self.kernel.coef0
    }

    fn support_vectors(&self) -> &[Vec<SvmNode>] {
        &self.sv
    }

    fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(SvmError::Io)?;
        let mut writer = BufWriter::new(file);
        format::write(&mut writer, self).map_err(SvmError::Io)
    }
}

/// Platt-style sigmoid transform of one decision value.
fn sigmoid_predict(decision_value: f64, a: f64, b: f64) -> f64 {
    let f_apb = decision_value * a + b;
    // Formulated to avoid catastrophic cancellation on either side
    if f_apb >= 0.0 {
        (-f_apb).exp() / (1.0 + (-f_apb).exp())
    } else {
        1.0 / (1.0 + f_apb.exp())
    }
}

/// Couple pairwise class probabilities into per-class estimates.
///
/// Second method of Wu, Lin and Weng, "Probability Estimates for Multi-class
/// Classification by Pairwise Coupling": fixed-point iteration on
/// p^T Q p subject to sum(p) == 1.
fn couple_probabilities(pairwise: &[Vec<f64>], p: &mut [f64]) {
    let k = p.len();
    if k == 0 {
        return;
    }

    let mut q = vec![vec![0.0; k]; k];
    for t in 0..k {
        p[t] = 1.0 / k as f64;
        for j in 0..k {
            if j == t {
                continue;
            }
            q[t][t] += pairwise[j][t] * pairwise[j][t];
            q[t][j] = -pairwise[j][t] * pairwise[t][j];
        }
    }

    let max_iter = 100.max(k);
    let eps = 0.005 / k as f64;
    let mut qp = vec![0.0; k];

    for _ in 0..max_iter {
        let mut p_qp = 0.0;
        for t in 0..k {
            qp[t] = (0..k).map(|j| q[t][j] * p[j]).sum();
            p_qp += p[t] * qp[t];
        }

        let max_error = qp
            .iter()
            .map(|&v| (v - p_qp).abs())
            .fold(0.0f64, f64::max);
        if max_error < eps {
            break;
        }

        for t in 0..k {
            let diff = (-qp[t] + p_qp) / q[t][t];
            p[t] += diff;
            p_qp = (p_qp + diff * (diff * q[t][t] + 2.0 * qp[t])) / ((1.0 + diff) * (1.0 + diff));
            for j in 0..k {
                qp[j] = (qp[j] + diff * q[t][j]) / (1.0 + diff);
                p[j] /= 1.0 + diff;
            }
        }
    }
}
