//! Container persistence for machines
//!
//! Binds a machine's model bytes and normalization vectors into an
//! attribute-bearing container. The container itself is an abstraction:
//! anything offering named typed arrays and scalar attributes can hold a
//! machine. [`AttrStore`] is the built-in implementation, an in-memory store
//! with a JSON file form.

use crate::backend;
use crate::codec::ModelCodec;
use crate::core::{Result, SvmError};
use crate::machine::Machine;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Entry holding the serialized model bytes.
pub const MODEL_ENTRY: &str = "svm_model";
/// Entry holding the subtraction normalization vector.
pub const SUBTRACT_ENTRY: &str = "input_subtract";
/// Entry holding the division normalization vector.
pub const DIVIDE_ENTRY: &str = "input_divide";
/// Root attribute holding the solver format version.
pub const VERSION_ATTRIBUTE: &str = "version";

/// Attributed container able to hold a machine.
///
/// Reads of absent entries are errors; writes replace existing entries.
pub trait Container {
    fn write_bytes(&mut self, name: &str, data: &[u8]) -> Result<()>;
    fn read_bytes(&self, name: &str) -> Result<Vec<u8>>;
    fn write_vector(&mut self, name: &str, data: &[f64]) -> Result<()>;
    fn read_vector(&self, name: &str) -> Result<Vec<f64>>;
    fn write_attribute(&mut self, name: &str, value: u64) -> Result<()>;
    fn read_attribute(&self, name: &str) -> Result<u64>;
}

/// Write a machine into a container.
///
/// Stores the model in its native byte form plus both normalization vectors,
/// and stamps the container with the running solver format version.
pub fn save_machine(machine: &Machine, container: &mut dyn Container) -> Result<()> {
    let bytes = ModelCodec::new().serialize(machine.model())?;
    container.write_bytes(MODEL_ENTRY, &bytes)?;
    container.write_vector(SUBTRACT_ENTRY, machine.input_subtraction())?;
    container.write_vector(DIVIDE_ENTRY, machine.input_division())?;
    container.write_attribute(VERSION_ATTRIBUTE, backend::VERSION)
}

/// Restore a machine from a container.
///
/// A container stamped with an older major format version loads anyway; the
/// mismatch is only logged, since the text format has been stable across
/// minor releases. The model is reconstructed first (which resets
/// normalization to identity) and the stored vectors are restored
/// afterwards; reversing that order would clobber them.
pub fn load_machine(container: &dyn Container) -> Result<Machine> {
    let stored = container.read_attribute(VERSION_ATTRIBUTE)?;
    if stored / 100 < backend::VERSION / 100 {
        warn!(
            "container was written with solver format version {} but version {} is running; \
             check the format changelog if the model misbehaves",
            stored,
            backend::VERSION
        );
    }

    let model = ModelCodec::new().deserialize(&container.read_bytes(MODEL_ENTRY)?)?;
    let mut machine = Machine::new(model)?;
    machine.set_input_subtraction(&container.read_vector(SUBTRACT_ENTRY)?)?;
    machine.set_input_division(&container.read_vector(DIVIDE_ENTRY)?)?;
    Ok(machine)
}

/// In-memory attributed container with a JSON file form.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrStore {
    bytes: BTreeMap<String, Vec<u8>>,
    vectors: BTreeMap<String, Vec<f64>>,
    attributes: BTreeMap<String, u64>,
}

impl AttrStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(SvmError::Io)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| SvmError::Format(format!("cannot encode container: {e}")))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SvmError::Io)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| SvmError::Format(format!("cannot decode container: {e}")))
    }
}

fn missing(name: &str) -> SvmError {
    SvmError::Format(format!("container entry '{name}' not found"))
}

impl Container for AttrStore {
    fn write_bytes(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.bytes.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn read_bytes(&self, name: &str) -> Result<Vec<u8>> {
        self.bytes.get(name).cloned().ok_or_else(|| missing(name))
    }

    fn write_vector(&mut self, name: &str, data: &[f64]) -> Result<()> {
        self.vectors.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn read_vector(&self, name: &str) -> Result<Vec<f64>> {
        self.vectors.get(name).cloned().ok_or_else(|| missing(name))
    }

    fn write_attribute(&mut self, name: &str, value: u64) -> Result<()> {
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    fn read_attribute(&self, name: &str) -> Result<u64> {
        self.attributes
            .get(name)
            .copied()
            .ok_or_else(|| missing(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    const BINARY_LINEAR: &str = "\
svm_type c_svc
kernel_type linear
nr_class 2
total_sv 2
rho 0
label 1 -1
nr_sv 1 1
SV
1 1:1 2:0.5
-1 1:-1 2:-0.5
";

    fn machine() -> Machine {
        let model = crate::backend::format::parse(Cursor::new(BINARY_LINEAR), "<test>").unwrap();
        Machine::new(Box::new(model)).unwrap()
    }

    #[test]
    fn test_save_writes_all_entries() {
        let mut store = AttrStore::new();
        save_machine(&machine(), &mut store).unwrap();

        assert!(!store.read_bytes(MODEL_ENTRY).unwrap().is_empty());
        assert_eq!(store.read_vector(SUBTRACT_ENTRY).unwrap(), vec![0.0, 0.0]);
        assert_eq!(store.read_vector(DIVIDE_ENTRY).unwrap(), vec![1.0, 1.0]);
        assert_eq!(
            store.read_attribute(VERSION_ATTRIBUTE).unwrap(),
            backend::VERSION
        );
    }

    #[test]
    fn test_round_trip_restores_normalization() {
        let mut original = machine();
        original.set_input_subtraction(&[0.5, -0.5]).unwrap();
        original.set_input_division(&[2.0, 4.0]).unwrap();

        let mut store = AttrStore::new();
        save_machine(&original, &mut store).unwrap();

        let restored = load_machine(&store).unwrap();
        assert_eq!(restored.input_subtraction(), &[0.5, -0.5]);
        assert_eq!(restored.input_division(), &[2.0, 4.0]);
        assert_eq!(restored.input_size(), original.input_size());
        assert_eq!(restored.num_classes(), original.num_classes());
    }

    #[test]
    fn test_round_trip_preserves_predictions() {
        let mut original = machine();
        original.set_input_division(&[2.0, 2.0]).unwrap();

        let mut store = AttrStore::new();
        save_machine(&original, &mut store).unwrap();
        let mut restored = load_machine(&store).unwrap();

        for input in [[1.0, 0.5], [-1.0, -0.5], [0.25, -2.0]] {
            assert_eq!(
                restored.predict_class(&input).unwrap(),
                original.predict_class(&input).unwrap()
            );
        }
    }

    #[test]
    fn test_older_major_version_still_loads() {
        let mut store = AttrStore::new();
        save_machine(&machine(), &mut store).unwrap();
        store.write_attribute(VERSION_ATTRIBUTE, 225).unwrap();

        // Warns but does not abort
        assert!(load_machine(&store).is_ok());
    }

    #[test]
    fn test_missing_entries_are_errors() {
        let store = AttrStore::new();
        assert!(matches!(load_machine(&store), Err(SvmError::Format(_))));

        let mut no_model = AttrStore::new();
        no_model
            .write_attribute(VERSION_ATTRIBUTE, backend::VERSION)
            .unwrap();
        assert!(matches!(load_machine(&no_model), Err(SvmError::Format(_))));
    }

    #[test]
    fn test_store_file_round_trip() {
        let mut store = AttrStore::new();
        save_machine(&machine(), &mut store).unwrap();

        let file = NamedTempFile::new().expect("Failed to create temp file");
        store.save_to_file(file.path()).unwrap();

        let reloaded = AttrStore::load_from_file(file.path()).unwrap();
        assert_eq!(reloaded, store);

        // And the reloaded store still yields a working machine
        let mut machine = load_machine(&reloaded).unwrap();
        assert_eq!(machine.predict_class(&[1.0, 0.5]).unwrap(), 1);
    }
}
