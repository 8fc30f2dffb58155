#![forbid(unsafe_code)]

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use log::warn;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use verifdesk_engines::quarter::{previous_quarter, quarter_of};
use verifdesk_engines::selection::SelectionConfig;
use verifdesk_kernel_contracts::quarter::{Quarter, QuarterKey};
use verifdesk_kernel_contracts::roster::User;
use verifdesk_kernel_contracts::Validate;
use verifdesk_os::ports::{CaseSource, EmptyCaseSource};
use verifdesk_os::selection_wiring::SelectionWiring;

pub const USAGE: &str = "usage: verifdesk quarter [YYYY-MM-DD]\n       \
                         verifdesk select <roster.json> [QUARTER_KEY] [--prior <cases.json>]";

/// Serves one exported JSON file as the previous quarter's case list.
#[derive(Debug, Clone)]
pub struct JsonFileCaseSource {
    path: PathBuf,
}

impl JsonFileCaseSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CaseSource for JsonFileCaseSource {
    fn fetch_audits_by_quarter(&self, quarter_key: &QuarterKey) -> Value {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("cases for {quarter_key}: cannot read {}: {err}", self.path.display());
                return Value::Null;
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!("cases for {quarter_key}: {} is not JSON: {err}", self.path.display());
            Value::Null
        })
    }
}

pub fn execute_command(
    args: &[String],
    today: NaiveDate,
    seed: Option<u64>,
) -> Result<String, String> {
    let (command, rest) = args.split_first().ok_or_else(|| USAGE.to_string())?;
    match command.as_str() {
        "quarter" => {
            let date = match rest.first() {
                Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|e| format!("invalid date '{raw}': {e}"))?,
                None => today,
            };
            let quarter = quarter_of(date);
            Ok(format!(
                "current {}\nprevious {}",
                quarter.key(),
                previous_quarter(quarter).key()
            ))
        }
        "select" => {
            let options = SelectOptions::parse(rest)?;
            let roster = read_roster(&options.roster_path)?;
            let quarter = match &options.quarter_key {
                Some(raw) => QuarterKey::parse(raw)
                    .and_then(|key| key.quarter())
                    .map_err(|e| format!("invalid quarter key '{raw}': {e}"))?,
                None => quarter_of(today),
            };
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let result = match &options.prior_path {
                Some(path) => select(JsonFileCaseSource::new(path), &roster, quarter, &mut rng),
                None => select(EmptyCaseSource, &roster, quarter, &mut rng),
            }?;
            serde_json::to_string_pretty(&result).map_err(|e| e.to_string())
        }
        _ => Err(format!(
            "unknown command: {command}. expected one of: quarter, select\n{USAGE}"
        )),
    }
}

pub fn parse_seed(raw: Option<&str>) -> Result<Option<u64>, String> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| format!("VERIFDESK_SEED must be an unsigned integer: {e}")),
    }
}

pub fn parse_roster(raw: &str) -> Result<Vec<User>, String> {
    let users: Vec<User> =
        serde_json::from_str(raw).map_err(|e| format!("roster is not a user list: {e}"))?;
    for user in &users {
        user.validate()
            .map_err(|e| format!("roster entry {}: {e}", user.id))?;
    }
    Ok(users)
}

fn read_roster(path: &str) -> Result<Vec<User>, String> {
    let raw = fs::read_to_string(path).map_err(|e| format!("cannot read {path}: {e}"))?;
    parse_roster(&raw)
}

fn select<C: CaseSource>(
    source: C,
    roster: &[User],
    quarter: Quarter,
    rng: &mut StdRng,
) -> Result<verifdesk_kernel_contracts::selection::SelectionResult, String> {
    SelectionWiring::new(SelectionConfig::mvp_v1(), source)
        .and_then(|wiring| wiring.auto_select(roster, quarter, rng))
        .map_err(|e| e.to_string())
}

#[derive(Debug, Default)]
struct SelectOptions {
    roster_path: String,
    quarter_key: Option<String>,
    prior_path: Option<String>,
}

impl SelectOptions {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut options = SelectOptions::default();
        let mut positional = Vec::new();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if arg == "--prior" {
                let path = iter
                    .next()
                    .ok_or_else(|| "--prior needs a file path".to_string())?;
                options.prior_path = Some(path.clone());
            } else {
                positional.push(arg.clone());
            }
        }
        let mut positional = positional.into_iter();
        options.roster_path = positional.next().ok_or_else(|| USAGE.to_string())?;
        options.quarter_key = positional.next();
        if let Some(extra) = positional.next() {
            return Err(format!("unexpected argument: {extra}\n{USAGE}"));
        }
        Ok(options)
    }
}
