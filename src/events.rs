use std::io::{BufRead, Write};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{EventIndex, LossSample, MitigationPolicy, PortfolioSummary, TransferResult};

/// One loss event after the policy has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossRecord {
    pub event: EventIndex,
    pub timestamp: NaiveDate,
    pub gross_loss: f64,
    pub transferred_loss: f64,
    pub retained_loss: f64,
}

impl LossRecord {
    pub fn transfer(&self) -> TransferResult {
        TransferResult {
            gross_loss: self.gross_loss,
            payout: self.transferred_loss,
            retained_loss: self.retained_loss,
        }
    }
}

/// A line of scenario output. A stream is one `ScenarioStart`, one `Loss` per
/// event in sample order, then one `ScenarioEnd`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    ScenarioStart {
        seed: u64,
        num_events: usize,
        distribution: String,
        policy: MitigationPolicy,
    },
    Loss(LossRecord),
    ScenarioEnd {
        summary: PortfolioSummary,
    },
}

/// Zip a sample with its transfer results into per-event records.
pub fn loss_records(sample: &LossSample, transfers: &[TransferResult]) -> Vec<LossRecord> {
    sample
        .iter()
        .zip(transfers)
        .enumerate()
        .map(|(i, (e, t))| LossRecord {
            event: EventIndex(i as u64),
            timestamp: e.timestamp,
            gross_loss: t.gross_loss,
            transferred_loss: t.payout,
            retained_loss: t.retained_loss,
        })
        .collect()
}

/// Write one JSON object per line.
pub fn write_ndjson<'a, W: Write>(
    writer: &mut W,
    records: impl IntoIterator<Item = &'a Record>,
) -> Result<()> {
    for r in records {
        serde_json::to_writer(&mut *writer, r).map_err(|e| {
            if e.is_io() { Error::io("writing record", e.into()) } else { Error::Json(e) }
        })?;
        writeln!(writer).map_err(|e| Error::io("writing record", e))?;
    }
    Ok(())
}

/// Read records written by [`write_ndjson`]. Blank lines are skipped.
pub fn read_ndjson<R: BufRead>(reader: R) -> Result<Vec<Record>> {
    let mut out = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io(format!("reading line {}", line_no + 1), e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|source| Error::Record { line: line_no + 1, source })?;
        out.push(record);
    }
    Ok(out)
}

/// Events declared by the first `ScenarioStart` (if any) and the number of
/// `Loss` records actually present.
pub fn loss_count(records: &[Record]) -> (Option<usize>, usize) {
    let declared = records.iter().find_map(|r| match r {
        Record::ScenarioStart { num_events, .. } => Some(*num_events),
        _ => None,
    });
    let found = records.iter().filter(|r| matches!(r, Record::Loss(_))).count();
    (declared, found)
}
