//! Kernel evaluation over sparse node encodings
//!
//! The decision function only ever evaluates K(x, sv) between a caller input
//! and stored support vectors, both in sparse node form with ascending
//! indices, so every kernel reduces to merge-style passes over two sorted
//! slices.

use crate::core::{KernelType, SvmNode};

/// Kernel selection plus its scalar parameters, as carried by a model file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelParams {
    pub kernel: KernelType,
    pub degree: u32,
    pub gamma: f64,
    pub coef0: f64,
}

impl KernelParams {
    /// Evaluate K(x, y).
    pub fn eval(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        let x = trim_terminator(x);
        let y = trim_terminator(y);
        match self.kernel {
            KernelType::Linear => dot(x, y),
            KernelType::Polynomial => {
                (self.gamma * dot(x, y) + self.coef0).powi(self.degree as i32)
            }
            KernelType::Rbf => (-self.gamma * squared_distance(x, y)).exp(),
            KernelType::Sigmoid => (self.gamma * dot(x, y) + self.coef0).tanh(),
        }
    }
}

/// Cut a node slice at its end-of-vector sentinel, if present.
fn trim_terminator(nodes: &[SvmNode]) -> &[SvmNode] {
    match nodes.iter().position(SvmNode::is_terminator) {
        Some(end) => &nodes[..end],
        None => nodes,
    }
}

/// Dot product of two sparse vectors with ascending indices.
///
/// Merge over both index sequences, O(nnz(x) + nnz(y)).
fn dot(x: &[SvmNode], y: &[SvmNode]) -> f64 {
    let mut result = 0.0;
    let mut i = 0;
    let mut j = 0;

    while i < x.len() && j < y.len() {
        if x[i].index == y[j].index {
            result += x[i].value * y[j].value;
            i += 1;
            j += 1;
        } else if x[i].index < y[j].index {
            i += 1;
        } else {
            j += 1;
        }
    }

    result
}

/// Squared Euclidean distance ||x - y||^2 over the union of indices.
fn squared_distance(x: &[SvmNode], y: &[SvmNode]) -> f64 {
    let mut result = 0.0;
    let mut i = 0;
    let mut j = 0;

    while i < x.len() && j < y.len() {
        if x[i].index == y[j].index {
            let d = x[i].value - y[j].value;
            result += d * d;
            i += 1;
            j += 1;
        } else if x[i].index < y[j].index {
            result += x[i].value * x[i].value;
            i += 1;
        } else {
            result += y[j].value * y[j].value;
            j += 1;
        }
    }
    while i < x.len() {
        result += x[i].value * x[i].value;
        i += 1;
    }
    while j < y.len() {
        result += y[j].value * y[j].value;
        j += 1;
    }

    result
}
