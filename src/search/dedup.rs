//! Two-stage functional deduplication.
//!
//! Stage 1 hashes normalized source text and catches trivial textual
//! variants without running anything. Stage 2 probes the candidate's
//! behavior and hashes the resulting vector, so two syntactically unrelated
//! programs that always make the same decisions count as one discovery.
//!
//! Both hash sets live behind `&mut self`; the engine is their single
//! writer, which makes the duplicate decision a total order over insertion.

use std::collections::HashSet;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::schema::BehaviorSignature;
use crate::search::probe::BehaviorProbe;

/// Running counts over every `check` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    pub total_checked: usize,
    pub source_duplicates: usize,
    pub behavior_duplicates: usize,
    pub unique_passed: usize,
}

impl DedupStats {
    pub fn duplicates(&self) -> usize {
        self.source_duplicates + self.behavior_duplicates
    }
}

/// Outcome of a duplicate check. The signature is always returned so the
/// caller can attach it to the candidate; a stage-1 duplicate carries a
/// sentinel signature since its behavior was never probed.
#[derive(Debug, Clone, PartialEq)]
pub enum DedupOutcome {
    Unique(BehaviorSignature),
    Duplicate(BehaviorSignature),
}

impl DedupOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }

    pub fn signature(self) -> BehaviorSignature {
        match self {
            Self::Unique(signature) | Self::Duplicate(signature) => signature,
        }
    }
}

pub struct Deduplicator {
    probe: Box<dyn BehaviorProbe>,
    source_hash_enabled: bool,
    source_hashes: HashSet<String>,
    signature_hashes: HashSet<String>,
    stats: DedupStats,
}

impl Deduplicator {
    pub fn new(probe: Box<dyn BehaviorProbe>, source_hash_enabled: bool) -> Self {
        Self {
            probe,
            source_hash_enabled,
            source_hashes: HashSet::new(),
            signature_hashes: HashSet::new(),
            stats: DedupStats::default(),
        }
    }

    /// Check one candidate and record its hashes.
    pub fn check(&mut self, source: &str) -> DedupOutcome {
        self.stats.total_checked += 1;

        if self.source_hash_enabled {
            let hash = source_hash(source);
            if !self.source_hashes.insert(hash) {
                self.stats.source_duplicates += 1;
                return DedupOutcome::Duplicate(signature_from_vector(vec![f64::NAN]));
            }
        }

        let signature = signature_from_vector(self.probe.behavior_vector(source));
        if self.signature_hashes.contains(&signature.hash) {
            self.stats.behavior_duplicates += 1;
            return DedupOutcome::Duplicate(signature);
        }
        self.signature_hashes.insert(signature.hash.clone());
        self.stats.unique_passed += 1;
        DedupOutcome::Unique(signature)
    }

    pub fn stats(&self) -> DedupStats {
        self.stats
    }
}

/// Strip `#` comments and collapse whitespace so formatting-only variants
/// hash identically.
pub fn normalize_source(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        let code = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        for word in code.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

fn source_hash(source: &str) -> String {
    let digest = Sha256::digest(normalize_source(source).as_bytes());
    hex_string(&digest)
}

/// Hash a behavior vector into a signature. Each f64 contributes its
/// little-endian bit pattern, with every NaN normalized to one pattern so
/// crashing candidates hash equal.
pub fn signature_from_vector(vector: Vec<f64>) -> BehaviorSignature {
    let mut hasher = Sha256::new();
    for &value in &vector {
        let bits = if value.is_nan() {
            f64::NAN.to_bits()
        } else {
            value.to_bits()
        };
        hasher.update(bits.to_le_bytes());
    }
    BehaviorSignature {
        hash: hex_string(&hasher.finalize()),
        vector,
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
