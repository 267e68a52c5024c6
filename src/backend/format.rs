//! Text model format parsing and writing
//!
//! The on-disk model is a header of `key value...` lines followed by an `SV`
//! block: one line per support vector holding the per-class-pair
//! coefficients and then the sparse nodes. Header keys, ordering and the
//! per-kernel parameter subset follow the solver's own save routine, so
//! models written here load in stock tooling and vice versa.

use super::NativeModel;
use crate::backend::kernel::KernelParams;
use crate::core::{KernelType, MachineType, Result, SvmError, SvmNode};
use std::io::{BufRead, Write};

struct Header {
    machine_type: Option<MachineType>,
    kernel_type: Option<KernelType>,
    degree: u32,
    gamma: f64,
    coef0: f64,
    n_classes: Option<usize>,
    total_sv: Option<usize>,
    rho: Vec<f64>,
    labels: Vec<i32>,
    prob_a: Vec<f64>,
    prob_b: Vec<f64>,
    n_sv_per_class: Vec<usize>,
}

impl Header {
    fn new() -> Self {
        Self {
            machine_type: None,
            kernel_type: None,
            degree: 3,
            gamma: 0.0,
            coef0: 0.0,
            n_classes: None,
            total_sv: None,
            rho: Vec::new(),
            labels: Vec::new(),
            prob_a: Vec::new(),
            prob_b: Vec::new(),
            n_sv_per_class: Vec::new(),
        }
    }
}

fn format_err(origin: &str, msg: impl AsRef<str>) -> SvmError {
    SvmError::Format(format!("model file '{}': {}", origin, msg.as_ref()))
}

fn parse_list<T: std::str::FromStr>(rest: &str, origin: &str, key: &str) -> Result<Vec<T>> {
    rest.split_whitespace()
        .map(|tok| {
            tok.parse::<T>()
                .map_err(|_| format_err(origin, format!("invalid {key} entry: {tok}")))
        })
        .collect()
}

fn parse_scalar<T: std::str::FromStr>(rest: &str, origin: &str, key: &str) -> Result<T> {
    rest.trim()
        .parse::<T>()
        .map_err(|_| format_err(origin, format!("invalid {key} value: {}", rest.trim())))
}

/// Parse a model from a reader. `origin` names the source for diagnostics.
pub(crate) fn parse<R: BufRead>(reader: R, origin: &str) -> Result<NativeModel> {
    let mut lines = reader.lines();
    let mut header = Header::new();

    loop {
        let line = match lines.next() {
            Some(line) => line.map_err(SvmError::Io)?,
            None => return Err(format_err(origin, "missing SV block")),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "SV" {
            break;
        }

        let (key, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        match key {
            "svm_type" => {
                header.machine_type = Some(
                    MachineType::from_str_name(rest.trim())
                        .ok_or_else(|| format_err(origin, format!("unknown svm_type: {rest}")))?,
                );
            }
            "kernel_type" => {
                header.kernel_type =
                    Some(KernelType::from_str_name(rest.trim()).ok_or_else(|| {
                        format_err(origin, format!("unknown kernel_type: {rest}"))
                    })?);
            }
            "degree" => header.degree = parse_scalar(rest, origin, "degree")?,
            "gamma" => header.gamma = parse_scalar(rest, origin, "gamma")?,
            "coef0" => header.coef0 = parse_scalar(rest, origin, "coef0")?,
            "nr_class" => header.n_classes = Some(parse_scalar(rest, origin, "nr_class")?),
            "total_sv" => header.total_sv = Some(parse_scalar(rest, origin, "total_sv")?),
            "rho" => header.rho = parse_list(rest, origin, "rho")?,
            "label" => header.labels = parse_list(rest, origin, "label")?,
            "probA" => header.prob_a = parse_list(rest, origin, "probA")?,
            "probB" => header.prob_b = parse_list(rest, origin, "probB")?,
            "nr_sv" => header.n_sv_per_class = parse_list(rest, origin, "nr_sv")?,
            other => {
                return Err(format_err(origin, format!("unknown header entry: {other}")));
            }
        }
    }

    let machine_type =
        header.machine_type.ok_or_else(|| format_err(origin, "missing svm_type"))?;
    let kernel_type =
        header.kernel_type.ok_or_else(|| format_err(origin, "missing kernel_type"))?;
    let n_classes = header.n_classes.ok_or_else(|| format_err(origin, "missing nr_class"))?;
    let total_sv = header.total_sv.ok_or_else(|| format_err(origin, "missing total_sv"))?;

    if n_classes < 2 {
        return Err(format_err(origin, format!("nr_class must be >= 2, got {n_classes}")));
    }

    let n_pairs = n_classes * (n_classes - 1) / 2;
    if header.rho.len() != n_pairs {
        return Err(format_err(
            origin,
            format!("rho holds {} entries, expected {}", header.rho.len(), n_pairs),
        ));
    }
    for (key, list) in [("probA", &header.prob_a), ("probB", &header.prob_b)] {
        if !list.is_empty() && machine_type.is_classification() && list.len() != n_pairs {
            return Err(format_err(
                origin,
                format!("{key} holds {} entries, expected {}", list.len(), n_pairs),
            ));
        }
    }

    if machine_type.is_classification() {
        if header.labels.len() != n_classes {
            return Err(format_err(
                origin,
                format!(
                    "label holds {} entries, expected {}",
                    header.labels.len(),
                    n_classes
                ),
            ));
        }
        if header.n_sv_per_class.len() != n_classes {
            return Err(format_err(
                origin,
                format!(
                    "nr_sv holds {} entries, expected {}",
                    header.n_sv_per_class.len(),
                    n_classes
                ),
            ));
        }
        if header.n_sv_per_class.iter().sum::<usize>() != total_sv {
            return Err(format_err(origin, "nr_sv entries do not sum to total_sv"));
        }
    }

    // SV block: one line per support vector, (n_classes - 1) coefficients
    // then the sparse nodes.
    let n_coef = n_classes - 1;
    let mut sv_coef = vec![Vec::with_capacity(total_sv); n_coef];
    let mut sv = Vec::with_capacity(total_sv);

    for line in lines {
        let line = line.map_err(SvmError::Io)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if sv.len() == total_sv {
            return Err(format_err(origin, "more support vectors than total_sv declares"));
        }

        let mut tokens = line.split_whitespace();
        for row in sv_coef.iter_mut() {
            let tok = tokens
                .next()
                .ok_or_else(|| format_err(origin, "support vector line is missing coefficients"))?;
            row.push(
                tok.parse::<f64>()
                    .map_err(|_| format_err(origin, format!("invalid coefficient: {tok}")))?,
            );
        }

        let mut nodes = Vec::new();
        for tok in tokens {
            let (index_str, value_str) = tok
                .split_once(':')
                .ok_or_else(|| format_err(origin, format!("invalid node: {tok}")))?;
            let index = index_str
                .parse::<i32>()
                .map_err(|_| format_err(origin, format!("invalid node index: {index_str}")))?;
            if index < 1 {
                return Err(format_err(origin, format!("node index must be positive: {tok}")));
            }
            let value = value_str
                .parse::<f64>()
                .map_err(|_| format_err(origin, format!("invalid node value: {value_str}")))?;
            nodes.push(SvmNode::new(index, value));
        }
        sv.push(nodes);
    }

    if sv.len() != total_sv {
        return Err(format_err(
            origin,
            format!("found {} support vectors, total_sv declares {}", sv.len(), total_sv),
        ));
    }

    Ok(NativeModel {
        machine_type,
        kernel: KernelParams {
            kernel: kernel_type,
            degree: header.degree,
            gamma: header.gamma,
            coef0: header.coef0,
        },
        n_classes,
        labels: header.labels,
        rho: header.rho,
        prob_a: header.prob_a,
        prob_b: header.prob_b,
        n_sv_per_class: header.n_sv_per_class,
        sv_coef,
        sv,
    })
}

fn write_list<W: Write, T: std::fmt::Display>(
    w: &mut W,
    key: &str,
    values: &[T],
) -> std::io::Result<()> {
    if values.is_empty() {
        return Ok(());
    }
    write!(w, "{key}")?;
    for v in values {
        write!(w, " {v}")?;
    }
    writeln!(w)
}

/// Write a model in the native text format.
pub(crate) fn write<W: Write>(w: &mut W, model: &NativeModel) -> std::io::Result<()> {
    writeln!(w, "svm_type {}", model.machine_type)?;
    writeln!(w, "kernel_type {}", model.kernel.kernel)?;
    if model.kernel.kernel == KernelType::Polynomial {
        writeln!(w, "degree {}", model.kernel.degree)?;
    }
    if model.kernel.kernel != KernelType::Linear {
        writeln!(w, "gamma {}", model.kernel.gamma)?;
    }
    if matches!(model.kernel.kernel, KernelType::Polynomial | KernelType::Sigmoid) {
        writeln!(w, "coef0 {}", model.kernel.coef0)?;
    }
    writeln!(w, "nr_class {}", model.n_classes)?;
    writeln!(w, "total_sv {}", model.sv.len())?;
    write_list(w, "rho", &model.rho)?;
    write_list(w, "label", &model.labels)?;
    write_list(w, "probA", &model.prob_a)?;
    write_list(w, "probB", &model.prob_b)?;
    write_list(w, "nr_sv", &model.n_sv_per_class)?;
    writeln!(w, "SV")?;

    for (k, nodes) in model.sv.iter().enumerate() {
        for row in &model.sv_coef {
            write!(w, "{} ", row[k])?;
        }
        let mut first = true;
        for node in nodes {
            if first {
                write!(w, "{}:{}", node.index, node.value)?;
                first = false;
            } else {
                write!(w, " {}:{}", node.index, node.value)?;
            }
        }
        writeln!(w)?;
    }

    Ok(())
}
