//! Integration tests for the svmachine library
//!
//! These tests verify end-to-end functionality across multiple modules
//! and validate real-world usage scenarios.

use std::io::Write;
use svmachine::persistence::{self, AttrStore};
use svmachine::{Machine, ModelCodec, SparseRecordFile, SparseRecordWriter, SvmError};
use tempfile::NamedTempFile;

const BINARY_LINEAR_MODEL: &str = "\
svm_type c_svc
kernel_type linear
nr_class 2
total_sv 2
rho 0
label 1 -1
nr_sv 1 1
SV
1 1:1 2:0.5 3:0.25
-1 1:-1 2:-0.5 3:-0.25
";

const THREE_CLASS_PROB_MODEL: &str = "\
svm_type c_svc
kernel_type rbf
gamma 0.5
nr_class 3
total_sv 3
rho 0 0 0
label 10 20 30
probA -2 -2 -2
probB 0 0 0
nr_sv 1 1 1
SV
1 1 1:1
-1 1 2:1
-1 -1 3:1
";

fn model_file(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    write!(file, "{text}").expect("Failed to write");
    file.flush().expect("Failed to flush");
    file
}

/// Test complete workflow: record streaming -> prediction -> accuracy
#[test]
fn test_complete_workflow_records_to_predictions() {
    let model = model_file(BINARY_LINEAR_MODEL);
    let mut machine = Machine::from_model_file(model.path()).expect("Model should load");
    assert_eq!(machine.input_size(), 3);

    // Data whose labels match the model's decision function
    let mut data = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(data, "1 1:2.0 2:1.0").expect("Failed to write");
    writeln!(data, "-1 1:-2.0 2:-1.0").expect("Failed to write");
    writeln!(data, "1 1:1.5 3:0.8").expect("Failed to write");
    writeln!(data, "-1 1:-1.5 3:-0.8").expect("Failed to write");
    data.flush().expect("Failed to flush");

    let mut records = SparseRecordFile::open(data.path()).expect("Data should open");
    assert_eq!(records.shape(), 3);
    assert_eq!(records.sample_count(), 4);

    let mut buf = vec![0.0; records.shape()];
    let mut correct = 0;
    while let Some(label) = records.read(&mut buf).unwrap() {
        if machine.predict_class(&buf).unwrap() == label {
            correct += 1;
        }
    }
    assert_eq!(correct, 4);
}

/// The discovery scenario: shape and count from a mixed sparse file
#[test]
fn test_sparse_file_discovery_and_replay() {
    let mut data = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(data, "1 1:0.5 3:2.0").expect("Failed to write");
    writeln!(data, "-1 2:1.0").expect("Failed to write");
    data.flush().expect("Failed to flush");

    let mut records = SparseRecordFile::open(data.path()).unwrap();
    assert_eq!(records.shape(), 3);
    assert_eq!(records.sample_count(), 2);

    let mut buf = vec![0.0; 3];
    assert_eq!(records.read(&mut buf).unwrap(), Some(1));
    assert_eq!(buf, vec![0.5, 0.0, 2.0]);
    assert_eq!(records.read(&mut buf).unwrap(), Some(-1));
    assert_eq!(buf, vec![0.0, 1.0, 0.0]);
    assert_eq!(records.read(&mut buf).unwrap(), None);

    // Replay must reproduce the identical sequence
    records.reset().unwrap();
    assert_eq!(records.read(&mut buf).unwrap(), Some(1));
    assert_eq!(buf, vec![0.5, 0.0, 2.0]);
}

/// Written records must read back through the same pipeline
#[test]
fn test_writer_reader_machine_pipeline() {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    {
        let mut writer = SparseRecordWriter::create(file.path()).unwrap();
        writer.write(1, &[2.0, 0.0, 1.0]).unwrap();
        writer.write(-1, &[-2.0, 0.5, -1.0]).unwrap();
        writer.flush().unwrap();
    }

    let model = model_file(BINARY_LINEAR_MODEL);
    let mut machine = Machine::from_model_file(model.path()).unwrap();

    let mut records = SparseRecordFile::open(file.path()).unwrap();
    let mut buf = vec![0.0; records.shape()];

    assert_eq!(records.read(&mut buf).unwrap(), Some(1));
    assert_eq!(machine.predict_class(&buf).unwrap(), 1);
    assert_eq!(records.read(&mut buf).unwrap(), Some(-1));
    assert_eq!(machine.predict_class(&buf).unwrap(), -1);
}

/// Codec round trip preserves solver-visible metadata and predictions
#[test]
fn test_codec_round_trip() {
    let model = model_file(THREE_CLASS_PROB_MODEL);
    let machine = Machine::from_model_file(model.path()).unwrap();

    let codec = ModelCodec::new();
    let bytes = codec.serialize(machine.model()).unwrap();
    let mut restored = Machine::from_bytes(&bytes).unwrap();

    assert_eq!(restored.machine_type(), machine.machine_type());
    assert_eq!(restored.kernel_type(), machine.kernel_type());
    assert_eq!(restored.num_classes(), 3);
    assert_eq!(restored.input_size(), machine.input_size());
    for i in 0..3 {
        assert_eq!(
            restored.class_label(i).unwrap(),
            machine.class_label(i).unwrap()
        );
    }

    assert_eq!(restored.predict_class(&[1.0, 0.0, 0.0]).unwrap(), 10);
    assert_eq!(restored.predict_class(&[0.0, 1.0, 0.0]).unwrap(), 20);
    assert_eq!(restored.predict_class(&[0.0, 0.0, 1.0]).unwrap(), 30);
}

/// Container store round trip through an actual file on disk
#[test]
fn test_container_store_end_to_end() {
    let model = model_file(BINARY_LINEAR_MODEL);
    let mut machine = Machine::from_model_file(model.path()).unwrap();
    machine.set_input_subtraction(&[0.5, 0.5, 0.5]).unwrap();
    machine.set_input_division(&[2.0, 2.0, 2.0]).unwrap();

    let mut store = AttrStore::new();
    persistence::save_machine(&machine, &mut store).unwrap();

    let store_file = NamedTempFile::new().expect("Failed to create temp file");
    store.save_to_file(store_file.path()).unwrap();

    let reloaded = AttrStore::load_from_file(store_file.path()).unwrap();
    let mut restored = persistence::load_machine(&reloaded).unwrap();

    assert_eq!(restored.input_subtraction(), &[0.5, 0.5, 0.5]);
    assert_eq!(restored.input_division(), &[2.0, 2.0, 2.0]);

    for input in [[2.0, 1.0, 0.0], [-2.0, -1.0, 0.5], [0.0, 0.0, 0.0]] {
        assert_eq!(
            restored.predict_class(&input).unwrap(),
            machine.predict_class(&input).unwrap()
        );
    }
}

/// Prediction variants agree on the winning class
#[test]
fn test_prediction_variants_agree() {
    let model = model_file(THREE_CLASS_PROB_MODEL);
    let mut machine = Machine::from_model_file(model.path()).unwrap();
    assert!(machine.supports_probability());
    assert_eq!(machine.output_size(), 3);

    let input = [1.0, 0.2, 0.0];
    let plain = machine.predict_class(&input).unwrap();

    let mut scores = vec![0.0; 3];
    let scored = machine.predict_class_and_scores(&input, &mut scores).unwrap();
    assert_eq!(scored, plain);
    assert!(scores.iter().any(|&s| s != 0.0));

    let mut probs = vec![0.0; 3];
    let probed = machine
        .predict_class_and_probabilities(&input, &mut probs)
        .unwrap();
    assert_eq!(probed, plain);

    let total: f64 = probs.iter().sum();
    assert!((total - 1.0).abs() < 1e-6);
}

/// Probability requests on a model without support fail up front
#[test]
fn test_probability_unsupported_end_to_end() {
    let model = model_file(BINARY_LINEAR_MODEL);
    let mut machine = Machine::from_model_file(model.path()).unwrap();
    assert!(!machine.supports_probability());

    let mut probs = vec![0.0; 1];
    let result = machine.predict_class_and_probabilities(&[1.0, 0.0, 0.0], &mut probs);
    assert!(matches!(result, Err(SvmError::Unsupported(_))));
}

/// Predictions are stable across repeated calls and across reload
#[test]
fn test_prediction_determinism_across_reload() {
    let model = model_file(THREE_CLASS_PROB_MODEL);
    let mut machine = Machine::from_model_file(model.path()).unwrap();

    let input = [0.4, 0.7, 0.1];
    let first = machine.predict_class(&input).unwrap();
    for _ in 0..5 {
        assert_eq!(machine.predict_class(&input).unwrap(), first);
    }

    let mut reloaded = Machine::from_model_file(model.path()).unwrap();
    assert_eq!(reloaded.predict_class(&input).unwrap(), first);
}

/// Zero divisors are refused instead of poisoning predictions
#[test]
fn test_zero_division_vector_rejected() {
    let model = model_file(BINARY_LINEAR_MODEL);
    let mut machine = Machine::from_model_file(model.path()).unwrap();

    let result = machine.set_input_division(&[1.0, 0.0, 1.0]);
    assert!(matches!(result, Err(SvmError::InvalidParameter(_))));

    // The rejected vector left no trace; predictions still work
    assert_eq!(machine.predict_class(&[2.0, 1.0, 0.0]).unwrap(), 1);
}
