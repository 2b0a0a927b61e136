//! The finite row source the producer samples from.
//!
//! The dataset is loaded once, up front, and owned by whoever runs the
//! producer loop. Nothing else in the process ever sees it.

use std::path::Path;

use crate::error::{TicksinkError, TicksinkResult};
use crate::record::{Record, Scalar};

/// A finite, non-empty, in-memory collection of rows.
///
/// `sample` draws one row uniformly at random, with replacement. The
/// generator is seeded so a run can be made deterministic for testing.
#[derive(Debug)]
pub struct RowSource {
    rows: Vec<Record>,
    rng: Rng,
}

impl RowSource {
    /// Builds a source from already-parsed rows. Seeded from the clock.
    pub fn new(rows: Vec<Record>) -> TicksinkResult<Self> {
        Self::with_seed(rows, 0)
    }

    /// Builds a source with an explicit sampling seed. A seed of zero falls
    /// back to the clock.
    pub fn with_seed(rows: Vec<Record>, seed: u64) -> TicksinkResult<Self> {
        if rows.is_empty() {
            return Err(TicksinkError::EmptyRowSource);
        }
        Ok(Self {
            rows,
            rng: Rng::new(seed),
        })
    }

    /// Parses CSV text into a source. The first line is the header.
    pub fn from_csv(text: &str, seed: u64) -> TicksinkResult<Self> {
        Self::with_seed(parse_csv(text)?, seed)
    }

    /// Reads and parses a CSV dataset file.
    pub fn from_csv_path(path: impl AsRef<Path>, seed: u64) -> TicksinkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_csv(&text, seed)
    }

    /// Number of rows loaded.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false, the constructors reject empty datasets.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Draws one row uniformly at random.
    pub fn sample(&mut self) -> &Record {
        let idx = self.rng.next_intn(self.rows.len());
        &self.rows[idx]
    }
}

/// Splits header and data lines into records. Numeric cells become scalars,
/// empty cells become nulls, everything else stays text. The dataset this was
/// written for carries no quoted fields, so a plain comma split is enough.
fn parse_csv(text: &str) -> TicksinkResult<Vec<Record>> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let header: Vec<String> = lines
        .next()
        .ok_or(TicksinkError::EmptyRowSource)?
        .split(',')
        .map(|name| name.trim().to_string())
        .collect();

    let mut rows = Vec::new();

    for line in lines {
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();

        if cells.len() != header.len() {
            return Err(TicksinkError::MalformedRow(format!(
                "expected {} cells, found {}: {line}",
                header.len(),
                cells.len()
            )));
        }

        let fields = header
            .iter()
            .zip(cells)
            .map(|(name, cell)| (name.clone(), parse_cell(cell)));

        rows.push(Record::from_fields(fields));
    }

    if rows.is_empty() {
        return Err(TicksinkError::EmptyRowSource);
    }

    Ok(rows)
}

fn parse_cell(cell: &str) -> Scalar {
    if cell.is_empty() {
        return Scalar::Null;
    }
    if let Ok(int) = cell.parse::<i64>() {
        return Scalar::Int(int);
    }
    if let Ok(float) = cell.parse::<f64>() {
        return Scalar::Float(float);
    }
    Scalar::Text(cell.to_string())
}

/// xorshift64. Small, seedable, good enough for picking rows.
#[derive(Debug)]
struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        let state = if seed == 0 {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos() as u64
                | 1 // ensure non-zero
        } else {
            seed
        };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_intn(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}
