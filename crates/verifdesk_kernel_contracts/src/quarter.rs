#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ContractViolation, Validate};

pub const MIN_QUARTER_YEAR: i32 = 1000;
pub const MAX_QUARTER_YEAR: i32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quarter {
    // Field order matters for Ord: year first.
    pub year: i32,
    pub number: u8,
}

impl Quarter {
    pub fn v1(number: u8, year: i32) -> Result<Self, ContractViolation> {
        let q = Self { year, number };
        q.validate()?;
        Ok(q)
    }

    pub fn key(self) -> QuarterKey {
        QuarterKey(format!("Q{}-{}", self.number, self.year))
    }
}

impl Validate for Quarter {
    fn validate(&self) -> Result<(), ContractViolation> {
        if !(1..=4).contains(&self.number) {
            return Err(ContractViolation::InvalidRange {
                field: "quarter.number",
                min: 1,
                max: 4,
                got: u64::from(self.number),
            });
        }
        if !(MIN_QUARTER_YEAR..=MAX_QUARTER_YEAR).contains(&self.year) {
            return Err(ContractViolation::InvalidValue {
                field: "quarter.year",
                reason: "must be a four-digit year",
            });
        }
        Ok(())
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}-{}", self.number, self.year)
    }
}

/// Canonical display key `Q<n>-<year>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuarterKey(String);

impl QuarterKey {
    pub fn parse(raw: &str) -> Result<Self, ContractViolation> {
        let quarter = Self::decode(raw)?;
        Ok(quarter.key())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn quarter(&self) -> Result<Quarter, ContractViolation> {
        Self::decode(&self.0)
    }

    fn decode(raw: &str) -> Result<Quarter, ContractViolation> {
        const MALFORMED: ContractViolation = ContractViolation::InvalidValue {
            field: "quarter_key",
            reason: "must match Q<1-4>-<year>",
        };
        let rest = raw.strip_prefix('Q').ok_or(MALFORMED)?;
        let (number, year) = rest.split_once('-').ok_or(MALFORMED)?;
        if number.len() != 1 || year.len() != 4 {
            return Err(MALFORMED);
        }
        let number: u8 = number.parse().map_err(|_| MALFORMED)?;
        let year: i32 = year.parse().map_err(|_| MALFORMED)?;
        Quarter::v1(number, year)
    }
}

impl Validate for QuarterKey {
    fn validate(&self) -> Result<(), ContractViolation> {
        Self::decode(&self.0).map(|_| ())
    }
}

impl TryFrom<String> for QuarterKey {
    type Error = ContractViolation;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<QuarterKey> for String {
    fn from(key: QuarterKey) -> String {
        key.0
    }
}

impl fmt::Display for QuarterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
