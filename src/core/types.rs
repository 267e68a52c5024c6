//! Core type definitions for SVM inference

use std::fmt;

/// One sparse node in the solver's native encoding: a 1-based feature index
/// paired with its value. `index == -1` marks the end of a vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvmNode {
    pub index: i32,
    pub value: f64,
}

impl SvmNode {
    pub fn new(index: i32, value: f64) -> Self {
        Self { index, value }
    }

    /// The end-of-vector sentinel.
    pub fn terminator() -> Self {
        Self {
            index: -1,
            value: 0.0,
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.index == -1
    }
}

/// SVM formulation implemented by a trained model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineType {
    /// C-support vector classification
    CSvc,
    /// Nu-support vector classification
    NuSvc,
    /// One-class distribution estimation
    OneClass,
    /// Epsilon-support vector regression
    EpsilonSvr,
    /// Nu-support vector regression
    NuSvr,
}

impl MachineType {
    /// Name used by the model file format
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineType::CSvc => "c_svc",
            MachineType::NuSvc => "nu_svc",
            MachineType::OneClass => "one_class",
            MachineType::EpsilonSvr => "epsilon_svr",
            MachineType::NuSvr => "nu_svr",
        }
    }

    pub fn from_str_name(name: &str) -> Option<Self> {
        match name {
            "c_svc" => Some(MachineType::CSvc),
            "nu_svc" => Some(MachineType::NuSvc),
            "one_class" => Some(MachineType::OneClass),
            "epsilon_svr" => Some(MachineType::EpsilonSvr),
            "nu_svr" => Some(MachineType::NuSvr),
            _ => None,
        }
    }

    /// Classification types carry per-class labels; the others do not.
    pub fn is_classification(&self) -> bool {
        matches!(self, MachineType::CSvc | MachineType::NuSvc)
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kernel function selected by a trained model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelType {
    /// K(x, y) = x . y
    Linear,
    /// K(x, y) = (gamma * x . y + coef0)^degree
    Polynomial,
    /// K(x, y) = exp(-gamma * ||x - y||^2)
    Rbf,
    /// K(x, y) = tanh(gamma * x . y + coef0)
    Sigmoid,
}

impl KernelType {
    /// Name used by the model file format
    pub fn as_str(&self) -> &'static str {
        match self {
            KernelType::Linear => "linear",
            KernelType::Polynomial => "polynomial",
            KernelType::Rbf => "rbf",
            KernelType::Sigmoid => "sigmoid",
        }
    }

    pub fn from_str_name(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(KernelType::Linear),
            "polynomial" => Some(KernelType::Polynomial),
            "rbf" => Some(KernelType::Rbf),
            "sigmoid" => Some(KernelType::Sigmoid),
            _ => None,
        }
    }
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
