//! Categorical encoding table
//!
//! Closed mapping from human-readable category strings to the integer codes
//! a pre-encoded artifact was trained on. Codes are the training process's
//! hand-written maps (Red=0, Yellow=1, Green=2; Clear=0, Rainy=1, Foggy=2),
//! not alphabetical order. Artifacts may declare their own code table per
//! column, which takes precedence. The table is static and never mutated.

use crate::errors::{Result, TrafficError};
use crate::schema::columns;

/// One admissible value of a categorical column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryEntry {
    /// Canonical spelling
    pub value: &'static str,
    /// Integer code used by pre-encoded artifacts
    pub code: i64,
    /// Alternative spellings accepted at the input boundary
    pub aliases: &'static [&'static str],
}

impl CategoryEntry {
    fn matches(&self, raw: &str) -> bool {
        self.value == raw || self.aliases.contains(&raw)
    }
}

/// The closed enumeration of one categorical column
#[derive(Debug, Clone, Copy)]
pub struct CategoricalColumn {
    pub name: &'static str,
    pub entries: &'static [CategoryEntry],
}

impl CategoricalColumn {
    /// Canonical values plus aliases, in code order
    pub fn accepted_values(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .flat_map(|e| std::iter::once(e.value).chain(e.aliases.iter().copied()))
            .collect()
    }

    fn lookup(&self, raw: &str) -> Result<&CategoryEntry> {
        self.entries
            .iter()
            .find(|e| e.matches(raw))
            .ok_or_else(|| TrafficError::UnknownCategory {
                column: self.name.to_string(),
                value: raw.to_string(),
            })
    }
}

/// Static encoding table covering every categorical input column
#[derive(Debug)]
pub struct EncodingTable {
    columns: &'static [CategoricalColumn],
}

static STANDARD_COLUMNS: &[CategoricalColumn] = &[
    CategoricalColumn {
        name: columns::TRAFFIC_LIGHT_STATE,
        entries: &[
            CategoryEntry { value: "Red", code: 0, aliases: &[] },
            CategoryEntry { value: "Yellow", code: 1, aliases: &[] },
            CategoryEntry { value: "Green", code: 2, aliases: &[] },
        ],
    },
    CategoricalColumn {
        name: columns::WEATHER_CONDITION,
        entries: &[
            CategoryEntry { value: "Clear", code: 0, aliases: &[] },
            CategoryEntry { value: "Rain", code: 1, aliases: &["Rainy"] },
            CategoryEntry { value: "Fog", code: 2, aliases: &["Foggy"] },
            CategoryEntry { value: "Snow", code: 3, aliases: &[] },
        ],
    },
    CategoricalColumn {
        name: columns::ACCIDENT_REPORT,
        entries: &[
            CategoryEntry { value: "No", code: 0, aliases: &[] },
            CategoryEntry { value: "Yes", code: 1, aliases: &[] },
        ],
    },
];

static STANDARD: EncodingTable = EncodingTable {
    columns: STANDARD_COLUMNS,
};

impl EncodingTable {
    /// The process-wide table
    pub fn standard() -> &'static EncodingTable {
        &STANDARD
    }

    pub fn column(&self, name: &str) -> Option<&CategoricalColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_categorical(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Resolve aliases to the canonical spelling, failing on unmapped values
    pub fn canonicalize(&self, column: &str, raw: &str) -> Result<&'static str> {
        Ok(self.entry(column, raw)?.value)
    }

    /// Integer code for a categorical value, failing on unmapped values
    pub fn encode(&self, column: &str, raw: &str) -> Result<i64> {
        Ok(self.entry(column, raw)?.code)
    }

    /// Pick the spelling of `raw` that `known` accepts.
    ///
    /// `raw` itself wins when accepted; otherwise the canonical value and
    /// aliases are tried in order. `None` when no equivalent spelling is known.
    pub fn resolve<'r>(
        &self,
        column: &str,
        raw: &'r str,
        known: impl Fn(&str) -> bool,
    ) -> Result<Option<&'r str>> {
        let entry = self.entry(column, raw)?;
        if known(raw) {
            return Ok(Some(raw));
        }
        Ok(std::iter::once(entry.value)
            .chain(entry.aliases.iter().copied())
            .find(|spelling| known(*spelling)))
    }

    fn entry(&self, column: &str, raw: &str) -> Result<&CategoryEntry> {
        let col = self.column(column).ok_or_else(|| TrafficError::UnknownCategory {
            column: column.to_string(),
            value: raw.to_string(),
        })?;
        col.lookup(raw)
    }
}
