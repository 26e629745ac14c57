//! Periods and the ordered table that defines model time.
//!
//! Time in the engine is positional: relative references are resolved by
//! index into the table, never by date arithmetic. The table also derives
//! the next forecast period from its latest entry.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque period identifier, conventionally `"{year}-{month}-{type}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodId(String);

impl PeriodId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeriodId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PeriodId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodType {
    #[serde(rename = "ANNUAL")]
    Annual,
    #[serde(rename = "MONTHLY")]
    Monthly,
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodType::Annual => f.write_str("ANNUAL"),
            PeriodType::Monthly => f.write_str("MONTHLY"),
        }
    }
}

/// A time bucket of the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub id: PeriodId,
    pub year: i32,
    pub month: u32,
    pub fiscal_year: i32,
    pub is_fiscal_year_end: bool,
    pub period_type: PeriodType,
    #[serde(default)]
    pub label: Option<String>,
}

impl Period {
    /// The label if one was set, else the id.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or_else(|| self.id.as_str())
    }
}

/// Ordered list of periods with an id→index map.
#[derive(Debug, Clone, Default)]
pub struct PeriodTable {
    periods: Vec<Period>,
    index: HashMap<PeriodId, usize>,
}

impl PeriodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole table; order matters.
    pub fn set(&mut self, periods: Vec<Period>) {
        self.periods = periods;
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .periods
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
    }

    /// Appends a period and updates the index.
    pub fn push(&mut self, period: Period) {
        self.index.insert(period.id.clone(), self.periods.len());
        self.periods.push(period);
    }

    pub fn index_of(&self, id: &PeriodId) -> Result<usize, EngineError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| EngineError::UnknownPeriod(id.clone()))
    }

    /// Resolves `base` shifted by `offset` table positions.
    pub fn resolve(&self, base: &PeriodId, offset: i32) -> Result<PeriodId, EngineError> {
        let from = self.index_of(base)? as i64;
        let target = from + offset as i64;
        if target < 0 || target >= self.periods.len() as i64 {
            return Err(EngineError::PeriodOutOfRange { period: base.clone(), offset });
        }
        Ok(self.periods[target as usize].id.clone())
    }

    pub fn get(&self, id: &PeriodId) -> Option<&Period> {
        self.index.get(id).map(|&i| &self.periods[i])
    }

    pub fn contains(&self, id: &PeriodId) -> bool {
        self.index.contains_key(id)
    }

    pub fn latest(&self) -> Option<&Period> {
        self.periods.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Period> {
        self.periods.iter()
    }

    pub fn as_slice(&self) -> &[Period] {
        &self.periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Derives the forecast period that follows the latest table entry.
    ///
    /// Annual models roll the year and fiscal year forward; monthly models
    /// wrap the month, carry the fiscal year across a flagged year end, and
    /// re-flag the year end when the new month matches the fiscal-end month
    /// observed in the table.
    pub fn derive_next(&self) -> Result<Period, EngineError> {
        let latest = self
            .latest()
            .ok_or_else(|| EngineError::NotConfigured("no periods loaded".into()))?;

        let next = match latest.period_type {
            PeriodType::Annual => Period {
                id: PeriodId::new(format!("{}-{}-{}", latest.year + 1, latest.month, latest.period_type)),
                year: latest.year + 1,
                month: latest.month,
                fiscal_year: latest.fiscal_year + 1,
                is_fiscal_year_end: true,
                period_type: PeriodType::Annual,
                label: None,
            },
            PeriodType::Monthly => {
                let (year, month) = if latest.month >= 12 {
                    (latest.year + 1, 1)
                } else {
                    (latest.year, latest.month + 1)
                };
                let fiscal_year = if latest.is_fiscal_year_end {
                    latest.fiscal_year + 1
                } else {
                    latest.fiscal_year
                };
                Period {
                    id: PeriodId::new(format!("{}-{}-{}", year, month, latest.period_type)),
                    year,
                    month,
                    fiscal_year,
                    is_fiscal_year_end: self.fiscal_end_month() == Some(month),
                    period_type: PeriodType::Monthly,
                    label: None,
                }
            }
        };

        let mut next = next;
        if next.label.is_none() {
            next.label = Some(next.id.as_str().to_string());
        }
        Ok(next)
    }

    /// Month of the most recent period flagged as a fiscal year end.
    fn fiscal_end_month(&self) -> Option<u32> {
        self.periods
            .iter()
            .rev()
            .find(|p| p.is_fiscal_year_end)
            .map(|p| p.month)
    }
}
