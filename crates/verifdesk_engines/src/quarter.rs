#![forbid(unsafe_code)]

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use verifdesk_kernel_contracts::quarter::{
    Quarter, QuarterKey, MAX_QUARTER_YEAR, MIN_QUARTER_YEAR,
};

/// Saturates to Q1-1000 below and Q4-9999 above the four-digit year range.
pub fn quarter_of(date: NaiveDate) -> Quarter {
    if date.year() < MIN_QUARTER_YEAR {
        return Quarter {
            year: MIN_QUARTER_YEAR,
            number: 1,
        };
    }
    if date.year() > MAX_QUARTER_YEAR {
        return Quarter {
            year: MAX_QUARTER_YEAR,
            number: 4,
        };
    }
    Quarter {
        year: date.year(),
        number: (date.month0() / 3 + 1) as u8,
    }
}

pub fn current_quarter(now: DateTime<Utc>) -> Quarter {
    quarter_of(now.date_naive())
}

/// Q1 wraps to Q4 of the prior year. Q1-1000 has no predecessor and is
/// returned unchanged.
pub fn previous_quarter(quarter: Quarter) -> Quarter {
    if quarter.number <= 1 && quarter.year <= MIN_QUARTER_YEAR {
        return quarter;
    }
    if quarter.number <= 1 {
        Quarter {
            year: quarter.year - 1,
            number: 4,
        }
    } else {
        Quarter {
            year: quarter.year,
            number: quarter.number - 1,
        }
    }
}

pub fn quarter_key(quarter: Quarter) -> QuarterKey {
    quarter.key()
}

pub fn previous_quarter_key(quarter: Quarter) -> QuarterKey {
    previous_quarter(quarter).key()
}
