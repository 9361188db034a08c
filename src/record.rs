//! Record normalization for tele-calling contact rows
//!
//! Raw upstream rows arrive with every attribute optional and with the
//! column names of the dialer export. Normalization turns each row into
//! a canonical [`Record`] whose grouping fields are guaranteed present,
//! or rejects it with the first missing attribute so the caller can
//! keep per-reason exclusion counts.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Income band boundaries in source-currency units (lakh/crore).
/// Bands are half-open and lower-inclusive: exactly 500000 is `5-10L`.
const INCOME_BANDS: [(f64, &str); 7] = [
    (500_000.0, "0-5L"),
    (1_000_000.0, "5-10L"),
    (1_500_000.0, "10-15L"),
    (2_000_000.0, "15-20L"),
    (3_000_000.0, "20-30L"),
    (5_000_000.0, "30-50L"),
    (10_000_000.0, "50L-1Cr"),
];

const TOP_INCOME_BRACKET: &str = "1Cr above";

/// Date format of the upstream `DOB` column
const DOB_FORMAT: &str = "%d-%m-%Y";

/// First attribute found missing or invalid during normalization.
///
/// Soft by design: an incomplete record is excluded before clustering,
/// never aborting the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Error)]
pub enum Incomplete {
    #[error("missing or unparsable birth date")]
    BirthDate,
    #[error("missing gender")]
    Gender,
    #[error("missing income")]
    Income,
    #[error("missing profession")]
    Profession,
    #[error("missing brand")]
    Brand,
    #[error("missing city id")]
    CityId,
    #[error("missing day of week")]
    Day,
    #[error("missing or out-of-range call hour")]
    Hour,
    #[error("missing or undefined pickup rate")]
    PickupRate,
    #[error("missing talk time")]
    CallDuration,
}

impl Incomplete {
    /// Stable key for exclusion counters and diagnostics output.
    pub fn label(&self) -> &'static str {
        match self {
            Incomplete::BirthDate => "birth_date",
            Incomplete::Gender => "gender",
            Incomplete::Income => "income",
            Incomplete::Profession => "profession",
            Incomplete::Brand => "brand",
            Incomplete::CityId => "city_id",
            Incomplete::Day => "day",
            Incomplete::Hour => "hour",
            Incomplete::PickupRate => "pickup_rate",
            Incomplete::CallDuration => "call_duration",
        }
    }
}

/// One raw contact row as exported by the dialer.
///
/// Field names match the upstream export; `alias` covers the renamed
/// variants seen in older exports. City ids and numeric columns arrive
/// as either numbers or strings depending on the export path, so both
/// are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "DOB", default)]
    pub dob: Option<String>,

    #[serde(rename = "Gender", default)]
    pub gender: Option<String>,

    #[serde(rename = "Income", default, deserialize_with = "numeric_opt")]
    pub income: Option<f64>,

    #[serde(rename = "ProfessionType", alias = "Profession", default)]
    pub profession: Option<String>,

    #[serde(rename = "Brandname", alias = "Brand", default)]
    pub brand: Option<String>,

    #[serde(rename = "CityId", default, deserialize_with = "stringly_opt")]
    pub city_id: Option<String>,

    #[serde(rename = "CityName", default)]
    pub city_name: Option<String>,

    #[serde(rename = "Day", alias = "DayName", default)]
    pub day: Option<String>,

    #[serde(rename = "Hour", alias = "CallHour", default, deserialize_with = "numeric_opt")]
    pub hour: Option<f64>,

    #[serde(rename = "AnsweredCalls", default, deserialize_with = "numeric_opt")]
    pub answered_calls: Option<f64>,

    #[serde(rename = "TotalCalls", default, deserialize_with = "numeric_opt")]
    pub total_calls: Option<f64>,

    #[serde(rename = "Talktime", default, deserialize_with = "numeric_opt")]
    pub talktime: Option<f64>,
}

/// Canonical contact record.
///
/// Every grouping attribute is plain (non-optional): downstream
/// components never re-derive "is this field usable". `city_name` and
/// `total_calls` stay optional because the export does not always carry
/// them and nothing in the core requires them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub age_bracket: String,
    pub income_bracket: String,
    pub gender: String,
    pub profession: String,
    pub brand: String,
    pub city_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_name: Option<String>,
    /// Day-of-week name as exported (e.g. "Monday")
    pub day: String,
    /// Hour of day, 0-23
    pub hour: u8,
    /// Answered / total calls, percent 0-100
    pub pickup_rate: f32,
    /// Talk time in seconds
    pub call_duration: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_calls: Option<u32>,
}

/// Age in whole years at `today`, or None when the birth date is absent
/// or unparsable. Whole years are days / 365, matching the upstream
/// export's definition.
pub fn age_from_dob(dob: &str, today: NaiveDate) -> Option<i64> {
    let dob = NaiveDate::parse_from_str(dob.trim(), DOB_FORMAT).ok()?;
    let days = (today - dob).num_days();
    if days < 0 {
        return None;
    }
    Some(days / 365)
}

/// 5-year age bracket starting at 18, with a `<18` catch-all.
pub fn age_bracket(age: i64) -> String {
    if age < 18 {
        return "<18".to_string();
    }
    let lower = 18 + 5 * ((age - 18) / 5);
    format!("{}-{}", lower, lower + 4)
}

/// Fixed income band for a numeric income (half-open, lower-inclusive).
pub fn income_bracket(income: f64) -> &'static str {
    for (upper, label) in INCOME_BANDS {
        if income < upper {
            return label;
        }
    }
    TOP_INCOME_BRACKET
}

/// Normalize one raw row into a canonical [`Record`].
///
/// `today` is the run's reference date for age computation; callers fix
/// it once per batch so a run is a pure function of its inputs.
pub fn normalize(raw: &RawRecord, today: NaiveDate) -> Result<Record, Incomplete> {
    let age = raw
        .dob
        .as_deref()
        .and_then(|dob| age_from_dob(dob, today))
        .ok_or(Incomplete::BirthDate)?;

    let income = raw
        .income
        .filter(|i| i.is_finite())
        .ok_or(Incomplete::Income)?;
    let gender = raw.gender.clone().ok_or(Incomplete::Gender)?;
    let profession = raw.profession.clone().ok_or(Incomplete::Profession)?;
    let brand = raw.brand.clone().ok_or(Incomplete::Brand)?;
    let city_id = raw.city_id.clone().ok_or(Incomplete::CityId)?;
    let day = raw.day.clone().ok_or(Incomplete::Day)?;

    let hour = raw
        .hour
        .filter(|h| h.is_finite())
        .ok_or(Incomplete::Hour)? as i64;
    if !(0..=23).contains(&hour) {
        return Err(Incomplete::Hour);
    }

    let pickup_rate = match (raw.answered_calls, raw.total_calls) {
        (Some(answered), Some(total)) if total > 0.0 && answered.is_finite() => {
            (answered / total * 100.0) as f32
        }
        _ => return Err(Incomplete::PickupRate),
    };

    let call_duration = raw
        .talktime
        .filter(|t| t.is_finite())
        .ok_or(Incomplete::CallDuration)? as f32;

    Ok(Record {
        age_bracket: age_bracket(age),
        income_bracket: income_bracket(income).to_string(),
        gender,
        profession,
        brand,
        city_id,
        city_name: raw.city_name.clone(),
        day,
        hour: hour as u8,
        pickup_rate,
        call_duration,
        total_calls: raw.total_calls.map(|t| t as u32),
    })
}

/// Accept a JSON string or number as an optional string (city ids show
/// up both ways across export paths).
fn stringly_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stringly {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Stringly>::deserialize(deserializer)?.map(|v| match v {
        Stringly::Text(s) => s,
        Stringly::Int(i) => i.to_string(),
        Stringly::Float(f) => f.to_string(),
    }))
}

/// Accept a JSON number or numeric string as an optional f64.
fn numeric_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Numeric {
        Num(f64),
        Text(String),
    }

    Ok(Option::<Numeric>::deserialize(deserializer)?.and_then(|v| match v {
        Numeric::Num(n) => Some(n),
        Numeric::Text(s) => s.trim().parse().ok(),
    }))
}
