//! Streaming reader/writer for the sparse LibSVM text format
//!
//! Each non-empty line holds one record:
//! label index:value index:value ...
//!
//! Example:
//! +1 1:0.5 3:1.2 7:0.8
//! -1 2:0.3 5:2.1
//!
//! Indices are 1-based. The format carries no header, so the reader scans the
//! whole file once on open to discover the dense shape (the maximum index
//! seen anywhere) and the record count, then rewinds for sequential reads.

use crate::core::{Result, SvmError};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Streaming reader for LibSVM-format record files.
///
/// Opening performs one full pre-scan to establish `shape` and
/// `sample_count`; records are then read sequentially into dense buffers.
/// `reset` rewinds to the first record.
#[derive(Debug)]
pub struct SparseRecordFile {
    path: PathBuf,
    reader: BufReader<File>,
    shape: usize,
    sample_count: usize,
}

impl SparseRecordFile {
    /// Open a record file, scanning it once for shape and record count.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(SvmError::Io)?;

        let mut shape = 0;
        let mut sample_count = 0;

        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(SvmError::Io)?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (_, pairs) = parse_record(line).map_err(|e| {
                SvmError::Format(format!(
                    "{}:{}: {}",
                    path.display(),
                    line_num + 1,
                    e
                ))
            })?;

            for &(index, _) in &pairs {
                shape = shape.max(index);
            }
            sample_count += 1;
        }

        // Rewind for replay
        let reader = BufReader::new(File::open(&path).map_err(SvmError::Io)?);

        Ok(Self {
            path,
            reader,
            shape,
            sample_count,
        })
    }

    /// Maximum 1-based feature index seen across the whole file.
    pub fn shape(&self) -> usize {
        self.shape
    }

    /// Number of non-empty lines in the file.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewind to the first record by reopening the underlying file.
    pub fn reset(&mut self) -> Result<()> {
        self.reader = BufReader::new(File::open(&self.path).map_err(SvmError::Io)?);
        Ok(())
    }

    /// Read the next record into a dense buffer.
    ///
    /// `values` must be exactly `shape` long; absent indices are
    /// zero-filled. Returns `Ok(None)` at end of stream.
    pub fn read(&mut self, values: &mut [f64]) -> Result<Option<i32>> {
        if values.len() != self.shape {
            return Err(SvmError::Shape {
                expected: self.shape,
                actual: values.len(),
            });
        }

        let line = match self.next_record_line()? {
            Some(line) => line,
            None => return Ok(None),
        };

        let (label, pairs) = parse_record(&line)
            .map_err(|e| SvmError::Format(format!("{}: {}", self.path.display(), e)))?;

        values.fill(0.0);
        for (index, value) in pairs {
            if index > self.shape {
                return Err(SvmError::Format(format!(
                    "{}: index {} exceeds discovered shape {}",
                    self.path.display(),
                    index,
                    self.shape
                )));
            }
            values[index - 1] = value;
        }

        Ok(Some(label))
    }

    /// Next non-empty line, or `None` at end of file.
    fn next_record_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = self.reader.read_line(&mut line).map_err(SvmError::Io)?;
            if n == 0 {
                return Ok(None);
            }
            if !line.trim().is_empty() {
                return Ok(Some(line.trim().to_string()));
            }
        }
    }
}

/// Parse one record line into a label and its (index, value) pairs.
fn parse_record(line: &str) -> std::result::Result<(i32, Vec<(usize, f64)>), String> {
    let mut parts = line.split_whitespace();

    let label_str = parts.next().ok_or_else(|| "empty record".to_string())?;
    let label = label_str
        .parse::<i32>()
        .map_err(|_| format!("invalid label: {label_str}"))?;

    let mut pairs = Vec::new();
    for pair_str in parts {
        let (index_str, value_str) = pair_str
            .split_once(':')
            .ok_or_else(|| format!("invalid feature format: {pair_str}"))?;

        let index = index_str
            .parse::<usize>()
            .map_err(|_| format!("invalid feature index: {index_str}"))?;
        if index == 0 {
            return Err(format!("feature index must be positive: {pair_str}"));
        }

        let value = value_str
            .parse::<f64>()
            .map_err(|_| format!("invalid feature value: {value_str}"))?;

        pairs.push((index, value));
    }

    Ok((label, pairs))
}

/// Writer for LibSVM-format record files.
///
/// Emits one record per line with 1-based indices, skipping exact zeros.
/// Index ordering within a record follows the input; strictly increasing
/// order is recommended but not enforced.
#[derive(Debug)]
pub struct SparseRecordWriter {
    writer: BufWriter<File>,
}

impl SparseRecordWriter {
    /// Create (or truncate) a record file for writing.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path).map_err(SvmError::Io)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Append one dense record; zero values are omitted.
    pub fn write(&mut self, label: i32, values: &[f64]) -> Result<()> {
        write!(self.writer, "{label}").map_err(SvmError::Io)?;
        for (k, &value) in values.iter().enumerate() {
            if value != 0.0 {
                write!(self.writer, " {}:{}", k + 1, value).map_err(SvmError::Io)?;
            }
        }
        writeln!(self.writer).map_err(SvmError::Io)?;
        Ok(())
    }

    /// Append one record given as explicit (1-based index, value) pairs.
    pub fn write_sparse(&mut self, label: i32, pairs: &[(usize, f64)]) -> Result<()> {
        write!(self.writer, "{label}").map_err(SvmError::Io)?;
        for &(index, value) in pairs {
            write!(self.writer, " {index}:{value}").map_err(SvmError::Io)?;
        }
        writeln!(self.writer).map_err(SvmError::Io)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(SvmError::Io)
    }
}
