//! Persistence gateway contract and the progress-row codec.
//!
//! A user's progress lives in one row of an external row store. The row's
//! data cells are JSON-encoded strings; ids appear as decimal strings in
//! object keys because object keys cannot be integers. Backends only move
//! cells around, the codec here is the single place that understands them.

use crate::error::GatewayError;
use crate::ledger::Ledger;
use crate::types::{QuestionId, Submission};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Opaque handle to an existing row, e.g. a sheet row number or file index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowHandle(pub u64);

/// The decoded contents of a progress row.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub ledger: Ledger,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    pub fn new(ledger: Ledger, updated_at: Option<DateTime<Utc>>) -> Self {
        Self { ledger, updated_at }
    }

    /// Encode as data cells: mastered, missed, miss counts, last wrong
    /// answers, updated-at. Deterministic output (sorted ids).
    pub fn to_cells(&self) -> Vec<String> {
        let ledger = &self.ledger;
        let mastered: BTreeSet<QuestionId> = ledger.mastered().iter().copied().collect();
        let missed: BTreeSet<QuestionId> = ledger.missed().iter().copied().collect();
        let counts: BTreeMap<String, u32> = ledger
            .miss_counts()
            .iter()
            .map(|(id, count)| (id.to_string(), *count))
            .collect();
        let last_wrong: BTreeMap<String, &Submission> = ledger
            .last_wrong_answers()
            .iter()
            .map(|(id, answer)| (id.to_string(), answer))
            .collect();

        vec![
            serde_json::to_string(&mastered).unwrap_or_else(|_| "[]".into()),
            serde_json::to_string(&missed).unwrap_or_else(|_| "[]".into()),
            serde_json::to_string(&counts).unwrap_or_else(|_| "{}".into()),
            serde_json::to_string(&last_wrong).unwrap_or_else(|_| "{}".into()),
            self.updated_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ]
    }

    /// Decode data cells back into a record.
    ///
    /// Absent or empty cells decode to empty collections, never an error;
    /// object keys that are not decimal ids are skipped.
    pub fn from_cells(cells: &[String]) -> Result<Self, GatewayError> {
        let cell = |idx: usize| cells.get(idx).map(String::as_str).unwrap_or("");

        let mastered: HashSet<QuestionId> = decode_ids(cell(0))?;
        let missed: HashSet<QuestionId> = decode_ids(cell(1))?;

        let raw_counts: HashMap<String, u32> = decode_map(cell(2))?;
        let miss_counts: HashMap<QuestionId, u32> = raw_counts
            .into_iter()
            .filter_map(|(key, count)| key.parse().ok().map(|id| (id, count)))
            .collect();

        let raw_wrong: HashMap<String, Submission> = decode_map(cell(3))?;
        let last_wrong: HashMap<QuestionId, Submission> = raw_wrong
            .into_iter()
            .filter_map(|(key, answer)| key.parse().ok().map(|id| (id, answer)))
            .collect();

        let updated_at = match cell(4).trim() {
            "" => None,
            stamp => Some(
                DateTime::parse_from_rfc3339(stamp)
                    .map_err(|e| GatewayError::Decode(format!("bad timestamp: {e}")))?
                    .with_timezone(&Utc),
            ),
        };

        Ok(Self {
            ledger: Ledger::from_parts(mastered, missed, miss_counts, last_wrong),
            updated_at,
        })
    }
}

fn decode_ids(cell: &str) -> Result<HashSet<QuestionId>, GatewayError> {
    if cell.trim().is_empty() {
        return Ok(HashSet::new());
    }
    serde_json::from_str(cell).map_err(|e| GatewayError::Decode(format!("bad id array: {e}")))
}

fn decode_map<V: serde::de::DeserializeOwned>(
    cell: &str,
) -> Result<HashMap<String, V>, GatewayError> {
    if cell.trim().is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(cell).map_err(|e| GatewayError::Decode(format!("bad object: {e}")))
}

/// External row store holding one progress row per user.
pub trait PersistenceGateway {
    /// Locate a user's row.
    fn find(&mut self, user_id: &str) -> Result<Option<RowHandle>, GatewayError>;

    /// Read a previously located row.
    fn read(&mut self, handle: &RowHandle) -> Result<ProgressRecord, GatewayError>;

    /// Write a user's progress. `None` handle means "create a new row";
    /// returns the handle of the written row.
    fn write(
        &mut self,
        user_id: &str,
        record: &ProgressRecord,
        handle: Option<&RowHandle>,
    ) -> Result<RowHandle, GatewayError>;
}

impl<G: PersistenceGateway + ?Sized> PersistenceGateway for Box<G> {
    fn find(&mut self, user_id: &str) -> Result<Option<RowHandle>, GatewayError> {
        (**self).find(user_id)
    }

    fn read(&mut self, handle: &RowHandle) -> Result<ProgressRecord, GatewayError> {
        (**self).read(handle)
    }

    fn write(
        &mut self,
        user_id: &str,
        record: &ProgressRecord,
        handle: Option<&RowHandle>,
    ) -> Result<RowHandle, GatewayError> {
        (**self).write(user_id, record, handle)
    }
}

/// In-memory gateway for tests, with injectable failures.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    rows: Vec<(String, Vec<String>)>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub write_calls: u32,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows_len(&self) -> usize {
        self.rows.len()
    }

    /// Insert a row with arbitrary cells, bypassing the codec. For tests
    /// that need corrupt or legacy data.
    pub fn push_raw_row(&mut self, user_id: &str, cells: Vec<String>) {
        self.rows.push((user_id.to_string(), cells));
    }

    fn unavailable() -> GatewayError {
        GatewayError::Backend {
            status: 503,
            message: "simulated outage".into(),
        }
    }
}

impl PersistenceGateway for MemoryGateway {
    fn find(&mut self, user_id: &str) -> Result<Option<RowHandle>, GatewayError> {
        if self.fail_reads {
            return Err(Self::unavailable());
        }
        Ok(self
            .rows
            .iter()
            .position(|(user, _)| user == user_id)
            .map(|idx| RowHandle(idx as u64)))
    }

    fn read(&mut self, handle: &RowHandle) -> Result<ProgressRecord, GatewayError> {
        if self.fail_reads {
            return Err(Self::unavailable());
        }
        let (_, cells) = self
            .rows
            .get(handle.0 as usize)
            .ok_or_else(|| GatewayError::Io(format!("no row {}", handle.0)))?;
        ProgressRecord::from_cells(cells)
    }

    fn write(
        &mut self,
        user_id: &str,
        record: &ProgressRecord,
        handle: Option<&RowHandle>,
    ) -> Result<RowHandle, GatewayError> {
        if self.fail_writes {
            return Err(Self::unavailable());
        }
        self.write_calls += 1;
        let cells = record.to_cells();
        match handle {
            Some(handle) => {
                let row = self
                    .rows
                    .get_mut(handle.0 as usize)
                    .ok_or_else(|| GatewayError::Io(format!("no row {}", handle.0)))?;
                row.1 = cells;
                Ok(*handle)
            }
            None => {
                self.rows.push((user_id.to_string(), cells));
                Ok(RowHandle((self.rows.len() - 1) as u64))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_ledger() -> Ledger {
        let mut ledger = Ledger::new();
        ledger.apply_result(3, Submission::Single("B. no".into()), false);
        ledger.apply_result(3, Submission::Single("C. maybe".into()), false);
        ledger.apply_result(
            10,
            Submission::Multiple(vec!["A. x".into(), "D. w".into()]),
            false,
        );
        ledger.apply_result(5, Submission::Single("A. yes".into()), true);
        ledger
    }

    #[test]
    fn cells_round_trip() {
        let record = ProgressRecord::new(sample_ledger(), Some(Utc::now()));
        let decoded = ProgressRecord::from_cells(&record.to_cells()).unwrap();
        assert_eq!(decoded.ledger, record.ledger);
        assert!(decoded.updated_at.is_some());
    }

    #[test]
    fn empty_cells_decode_to_empty_ledger() {
        for cells in [vec![], vec!["".to_string(); 5], vec!["[]".into(), "[]".into(), "{}".into(), "{}".into(), "".into()]] {
            let record = ProgressRecord::from_cells(&cells).unwrap();
            assert!(record.ledger.is_empty());
            assert_eq!(record.updated_at, None);
        }
    }

    #[test]
    fn non_numeric_keys_are_skipped() {
        let cells = vec![
            "[1]".to_string(),
            "[2]".to_string(),
            r#"{"2": 1, "oops": 9}"#.to_string(),
            r#"{"2": "B. no"}"#.to_string(),
        ];
        let record = ProgressRecord::from_cells(&cells).unwrap();
        assert_eq!(record.ledger.miss_counts().len(), 1);
        assert_eq!(record.ledger.miss_counts().get(&2), Some(&1));
    }

    #[test]
    fn corrupt_cells_are_a_decode_error() {
        let cells = vec!["not json".to_string()];
        assert!(matches!(
            ProgressRecord::from_cells(&cells),
            Err(GatewayError::Decode(_))
        ));
    }

    #[test]
    fn memory_gateway_round_trip() {
        let mut gateway = MemoryGateway::new();
        assert_eq!(gateway.find("ann").unwrap(), None);

        let record = ProgressRecord::new(sample_ledger(), None);
        let handle = gateway.write("ann", &record, None).unwrap();

        let found = gateway.find("ann").unwrap().expect("row exists");
        assert_eq!(found, handle);
        assert_eq!(gateway.read(&found).unwrap().ledger, record.ledger);

        // update in place does not create a second row
        let empty = ProgressRecord::new(Ledger::new(), None);
        gateway.write("ann", &empty, Some(&handle)).unwrap();
        assert_eq!(gateway.find("ann").unwrap(), Some(handle));
        assert!(gateway.read(&handle).unwrap().ledger.is_empty());
    }
}
