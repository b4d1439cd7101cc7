use std::collections::BTreeMap;

use thiserror::Error;

use crate::snapshot::RawSnapshot;

/// Value apcupsd reports for fields that currently have no meaning, e.g. XOFFBATT before any transfer.
const NOT_APPLICABLE: &str = "N/A";

/// How the raw value of a status field is turned into a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionRule {
	/// `<number> <unit>`, unit discarded.
	PlainNumber,
	/// `<number> <unit>`, scaled to seconds.
	Duration,
	/// Kept verbatim, never emitted.
	PassThrough,
}

pub const PLAIN_NUMBER_FIELDS: [&str; 4] = ["BCHARGE", "MBATTCHG", "BATTV", "NOMBATTV"];
pub const DURATION_FIELDS: [&str; 6] = ["TIMELEFT", "MINTIMEL", "MAXTIME", "ALARMDEL", "TONBATT", "CUMONBATT"];

impl ConversionRule {
	pub fn for_field(field: &str) -> Self {
		if PLAIN_NUMBER_FIELDS.contains(&field) {
			ConversionRule::PlainNumber
		} else if DURATION_FIELDS.contains(&field) {
			ConversionRule::Duration
		} else {
			ConversionRule::PassThrough
		}
	}

	pub fn is_numeric(self) -> bool {
		self != ConversionRule::PassThrough
	}

	fn convert(self, field: &str, value: &str) -> Result<Option<Measurement>, ConvertError> {
		let invalid = || ConvertError::InvalidNumber {
			field: field.to_string(),
			value: value.to_string(),
		};
		match self {
			ConversionRule::PlainNumber => {
				let number = value.split_once(' ').map_or(value, |(number, _unit)| number);
				parse_finite(number).map(|n| Some(Measurement::Number(n))).ok_or_else(invalid)
			},
			ConversionRule::Duration => {
				let tokens = value.split(' ').collect::<Vec<_>>();
				let [number, unit] = tokens.as_slice() else {
					return Ok(None);
				};
				parse_finite(number).map(|n| Some(Measurement::Number(n * seconds_per(unit)))).ok_or_else(invalid)
			},
			ConversionRule::PassThrough => Ok(Some(Measurement::Text(value.to_string()))),
		}
	}
}

/// `f64::from_str` also takes "NaN" and "inf", which statsd cannot ingest.
fn parse_finite(number: &str) -> Option<f64> {
	number.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Unrecognised units, "Seconds" included, are taken as already being seconds.
fn seconds_per(unit: &str) -> f64 {
	match unit {
		"Days" => 86400.,
		"Hours" => 3600.,
		"Minutes" => 60.,
		_ => 1.,
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Measurement {
	Number(f64),
	Text(String),
}

impl Measurement {
	pub fn as_number(&self) -> Option<f64> {
		match self {
			Measurement::Number(n) => Some(*n),
			Measurement::Text(_) => None,
		}
	}
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
	#[error("{field}: invalid number \"{value}\"")]
	InvalidNumber { field: String, value: String },
}

/// Watched fields of one snapshot, converted.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NormalizedMetrics {
	values: BTreeMap<String, Measurement>,
}

impl NormalizedMetrics {
	#[cfg(test)]
	pub fn get(&self, field: &str) -> Option<&Measurement> {
		self.values.get(field)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	/// Entries that can be sent as metrics. Pass-through text is left out here.
	pub fn numeric(&self) -> impl Iterator<Item = (&str, f64)> {
		self.values.iter().filter_map(|(field, m)| Some((field.as_str(), m.as_number()?)))
	}
}

#[derive(Debug, Default)]
pub struct Normalized {
	pub metrics: NormalizedMetrics,
	pub failures: Vec<ConvertError>,
}

/// Filters snapshots to the watchlist and converts the watched values.
#[derive(Debug, Clone)]
pub struct Normalizer {
	watched: BTreeMap<String, ConversionRule>,
}

impl Normalizer {
	pub fn new<I, S>(watchlist: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let watched = watchlist
			.into_iter()
			.map(|field| {
				let field = field.into();
				let rule = ConversionRule::for_field(&field);
				(field, rule)
			})
			.collect();
		Self { watched }
	}

	pub fn watched(&self) -> impl Iterator<Item = (&str, ConversionRule)> {
		self.watched.iter().map(|(field, rule)| (field.as_str(), *rule))
	}

	pub fn normalize(&self, snapshot: &RawSnapshot) -> Normalized {
		let mut normalized = Normalized::default();
		for (field, value) in snapshot.iter() {
			let Some(rule) = self.watched.get(field) else {
				continue;
			};
			if value == NOT_APPLICABLE {
				continue;
			}
			match rule.convert(field, value) {
				Ok(Some(measurement)) => {
					normalized.metrics.values.insert(field.to_string(), measurement);
				},
				Ok(None) => {},
				Err(e) => normalized.failures.push(e),
			}
		}
		normalized
	}
}
