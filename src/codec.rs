//! Model byte-buffer codec
//!
//! The solver contract only offers whole-file persistence, so moving a model
//! in and out of memory tunnels through an ephemeral file: save to a unique
//! temp path and read the bytes back, or write the bytes out and invoke the
//! native loader. Temp paths come from an injected provider so tests can
//! redirect them and concurrent codecs never collide.

use crate::backend;
use crate::core::{Result, SvmError, SvmModel};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Source of process-unique, writable temporary paths.
///
/// Implementations must guarantee that concurrent calls never hand out the
/// same path; the codec relies on this instead of any file locking.
pub trait TempPathProvider: Send + Sync {
    fn temp_path(&self) -> Result<PathBuf>;
}

/// Default provider backed by the system temp directory.
///
/// Path uniqueness comes from exclusive file creation, so two codecs
/// serializing at the same time cannot race on a name.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTempProvider;

impl TempPathProvider for SystemTempProvider {
    fn temp_path(&self) -> Result<PathBuf> {
        let file = tempfile::Builder::new()
            .prefix("svmachine-")
            .suffix(".model")
            .tempfile()
            .map_err(SvmError::Io)?;
        let (_, path) = file.keep().map_err(|e| SvmError::Io(e.error))?;
        Ok(path)
    }
}

/// Serializes model handles to byte buffers and back through temp files.
pub struct ModelCodec<P: TempPathProvider = SystemTempProvider> {
    provider: P,
}

impl ModelCodec<SystemTempProvider> {
    pub fn new() -> Self {
        Self {
            provider: SystemTempProvider,
        }
    }
}

impl Default for ModelCodec<SystemTempProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: TempPathProvider> ModelCodec<P> {
    pub fn with_provider(provider: P) -> Self {
        Self { provider }
    }

    /// Serialize a model to its native byte form.
    ///
    /// The buffer is sized exactly to the saved file's length.
    pub fn serialize(&self, model: &dyn SvmModel) -> Result<Vec<u8>> {
        let path = self.provider.temp_path()?;
        debug!("serializing model through {}", path.display());

        let result = model
            .save(&path)
            .and_then(|_| fs::read(&path).map_err(SvmError::Io));

        // Cleanup is best-effort: a failed unlink must not mask the outcome
        remove_best_effort(&path);
        result
    }

    /// Reconstruct a model handle from its native byte form.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Box<dyn SvmModel>> {
        let path = self.provider.temp_path()?;
        debug!("deserializing model through {}", path.display());

        let result = fs::write(&path, bytes)
            .map_err(SvmError::Io)
            .and_then(|_| backend::load_model(&path));

        remove_best_effort(&path);
        result.map(|model| Box::new(model) as Box<dyn SvmModel>)
    }
}

fn remove_best_effort(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        debug!("could not remove temp file {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const BINARY_PROB: &str = "\
svm_type c_svc
kernel_type rbf
gamma 0.25
nr_class 2
total_sv 2
rho 0.1
label 1 -1
probA -1.2
probB 0.05
nr_sv 1 1
SV
1 1:1 2:0.5
-1 1:-1 2:-0.5
";

    fn model() -> backend::NativeModel {
        backend::format::parse(Cursor::new(BINARY_PROB), "<test>").unwrap()
    }

    #[test]
    fn test_round_trip_preserves_metadata() {
        let codec = ModelCodec::new();
        let original = model();

        let bytes = codec.serialize(&original).unwrap();
        assert!(!bytes.is_empty());

        let restored = codec.deserialize(&bytes).unwrap();
        assert_eq!(restored.machine_type(), original.machine_type());
        assert_eq!(restored.kernel_type(), original.kernel_type());
        assert_eq!(restored.num_classes(), original.num_classes());
        assert_eq!(restored.class_labels(), original.class_labels());
        assert_eq!(restored.gamma(), original.gamma());
        assert_eq!(restored.supports_probability(), original.supports_probability());
        assert_eq!(
            restored.support_vectors(),
            original.support_vectors()
        );
    }

    #[test]
    fn test_serialized_bytes_match_file_form() {
        let codec = ModelCodec::new();
        let bytes = codec.serialize(&model()).unwrap();

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("svm_type c_svc"));
        assert!(text.contains("SV\n"));
    }

    #[test]
    fn test_deserialize_garbage_is_format_error() {
        let codec = ModelCodec::new();
        let result = codec.deserialize(b"not a model at all");
        match result {
            Err(SvmError::Format(msg)) => {
                // The message names the temp path for diagnostics
                assert!(msg.contains("svmachine-"));
            }
            Ok(_) => panic!("expected format error, got Ok"),
            Err(other) => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_provider_paths_are_unique() {
        let provider = SystemTempProvider;
        let a = provider.temp_path().unwrap();
        let b = provider.temp_path().unwrap();
        assert_ne!(a, b);
        let _ = fs::remove_file(&a);
        let _ = fs::remove_file(&b);
    }

    #[test]
    fn test_temp_files_are_cleaned_up() {
        struct RecordingProvider {
            path: std::sync::Mutex<Option<PathBuf>>,
        }

        impl TempPathProvider for RecordingProvider {
            fn temp_path(&self) -> Result<PathBuf> {
                let path = SystemTempProvider.temp_path()?;
                *self.path.lock().unwrap() = Some(path.clone());
                Ok(path)
            }
        }

        let provider = RecordingProvider {
            path: std::sync::Mutex::new(None),
        };
        let codec = ModelCodec::with_provider(provider);

        codec.serialize(&model()).unwrap();
        let path = codec.provider.path.lock().unwrap().clone().unwrap();
        assert!(!path.exists());
    }
}
