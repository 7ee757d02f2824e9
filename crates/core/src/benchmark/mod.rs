//! Per-job benchmark records.
//!
//! Every completed job leaves one record summarizing narration quality and
//! cache use, so runs with different model versions can be compared. The
//! history is bounded and process-local; the oldest record is dropped first.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::{JobMode, JobResult};

/// Quality figures of one unit within a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitBenchmark {
    pub unit_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hallucination_ok: Option<bool>,
    pub cached: bool,
    pub failed: bool,
}

/// Aggregates over the units of one job. Averages are `None` when no unit
/// produced a narration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    pub units_count: usize,
    pub failed_units: usize,
    pub avg_word_count: Option<f64>,
    pub hallucination_ok_rate: Option<f64>,
    pub cache_hit_rate: f64,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub job_id: String,
    pub model_version: String,
    pub mode: JobMode,
    pub language: String,
    pub recorded_at: DateTime<Utc>,
    pub summary: BenchmarkSummary,
    pub units: Vec<UnitBenchmark>,
}

impl BenchmarkRecord {
    pub fn from_result(result: &JobResult, model_version: &str) -> Self {
        let units: Vec<UnitBenchmark> = result
            .units
            .iter()
            .map(|u| UnitBenchmark {
                unit_number: u.unit_number,
                word_count: u.narration_meta.as_ref().map(|m| m.word_count),
                hallucination_ok: u.narration_meta.as_ref().map(|m| m.hallucination_ok),
                cached: u.narration_cached,
                failed: u.failed,
            })
            .collect();

        let word_counts: Vec<usize> = units.iter().filter_map(|u| u.word_count).collect();
        let checks: Vec<bool> = units.iter().filter_map(|u| u.hallucination_ok).collect();
        let lookups = result.cache_hits + result.cache_misses;

        Self {
            job_id: result.job_id.clone(),
            model_version: model_version.to_string(),
            mode: result.mode,
            language: result.language.clone(),
            recorded_at: Utc::now(),
            summary: BenchmarkSummary {
                units_count: units.len(),
                failed_units: result.failed_units.len(),
                avg_word_count: average(word_counts.iter().map(|&n| n as f64)),
                hallucination_ok_rate: average(checks.iter().map(|&ok| if ok { 1.0 } else { 0.0 })),
                cache_hit_rate: if lookups == 0 {
                    0.0
                } else {
                    f64::from(result.cache_hits) / f64::from(lookups)
                },
                processing_time_ms: result.processing_time_ms,
            },
            units,
        }
    }
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Bounded, newest-last store of benchmark records.
#[derive(Debug)]
pub struct BenchmarkHistory {
    capacity: usize,
    records: RwLock<VecDeque<BenchmarkRecord>>,
}

impl BenchmarkHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    /// Append a record, dropping the oldest beyond capacity. A capacity of
    /// zero keeps nothing.
    pub fn record(&self, record: BenchmarkRecord) {
        if self.capacity == 0 {
            return;
        }
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Most recent records first.
    pub fn history(&self, limit: usize) -> Vec<BenchmarkRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.iter().rev().take(limit).cloned().collect()
    }

    /// Records for `job_ids`, in the order asked for. Unknown ids are left
    /// out; a repeated id appears once per mention.
    pub fn compare(&self, job_ids: &[String]) -> Vec<BenchmarkRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        job_ids
            .iter()
            .filter_map(|id| records.iter().rev().find(|r| &r.job_id == id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
