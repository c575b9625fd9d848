//! Generation record sinks.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::schema::{Candidate, GenerationRecord};

/// Receives one record per completed generation, plus every candidate the
/// moment a population admits it.
pub trait RecordSink: Send {
    fn record(&mut self, record: &GenerationRecord) -> std::io::Result<()>;

    fn admitted(&mut self, candidate: &Candidate) -> std::io::Result<()>;
}

/// Appends generation records and admitted candidates as JSON lines, each
/// stream in its own file.
pub struct JsonlSink {
    records: BufWriter<File>,
    candidates: BufWriter<File>,
}

impl JsonlSink {
    pub fn create(
        records_path: impl AsRef<Path>,
        candidates_path: impl AsRef<Path>,
    ) -> std::io::Result<Self> {
        Ok(Self {
            records: BufWriter::new(File::create(records_path)?),
            candidates: BufWriter::new(File::create(candidates_path)?),
        })
    }
}

impl RecordSink for JsonlSink {
    fn record(&mut self, record: &GenerationRecord) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.records, record)?;
        self.records.write_all(b"\n")?;
        self.records.flush()
    }

    fn admitted(&mut self, candidate: &Candidate) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.candidates, candidate)?;
        self.candidates.write_all(b"\n")?;
        self.candidates.flush()
    }
}

/// Keeps records in memory, for tests and library embedding.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<GenerationRecord>,
    pub admitted: Vec<Candidate>,
}

impl RecordSink for MemorySink {
    fn record(&mut self, record: &GenerationRecord) -> std::io::Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn admitted(&mut self, candidate: &Candidate) -> std::io::Result<()> {
        self.admitted.push(candidate.clone());
        Ok(())
    }
}
