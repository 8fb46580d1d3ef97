use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"CF\s*(\d+)").unwrap());
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}").unwrap());
static VALUE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.\d+").unwrap());
static TAX_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}").unwrap());

pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// One quotation: fund code, quotation date, quota value and the fund's tax id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub identifier: String,
    pub date: NaiveDate,
    pub value: f64,
    pub tax_id: String,
}

/// Extract a record from anywhere in the line, fields in any order.
///
/// Each field is the first match of its own pattern, searched independently,
/// so a tax id placed before the value lends its `NN.NNN` prefix as the value.
/// Returns `None` unless all four fields match, the date is a real calendar
/// date and the value converts to a finite number.
pub fn parse_line(line: &str) -> Option<Record> {
    let identifier = IDENTIFIER_RE.captures(line)?.get(1)?.as_str();
    let date = DATE_RE.find(line)?;
    let value = VALUE_RE.find(line)?;
    let tax_id = TAX_ID_RE.find(line)?;

    let date = NaiveDate::parse_from_str(date.as_str(), DATE_FORMAT).ok()?;
    let value: f64 = value.as_str().parse().ok().filter(|v: &f64| v.is_finite())?;

    Some(Record {
        identifier: identifier.to_string(),
        date,
        value,
        tax_id: tax_id.as_str().to_string(),
    })
}
