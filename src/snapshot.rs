use std::collections::BTreeMap;

/// Fields of one `apcaccess status` dump, keyed by field name with trimmed raw values.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawSnapshot {
	fields: BTreeMap<String, String>,
}

impl RawSnapshot {
	/// Parse a status dump. Lines without a colon are skipped; values may contain colons.
	pub fn parse(status: &str) -> Self {
		let fields = status.lines().filter_map(parse_line).collect();
		Self { fields }
	}

	#[cfg(test)]
	pub fn get(&self, key: &str) -> Option<&str> {
		self.fields.get(key).map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}
}

fn parse_line(line: &str) -> Option<(String, String)> {
	let (key, value) = line.split_once(':')?;
	Some((key.trim().to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::RawSnapshot;

	#[rstest]
	#[case("BCHARGE  : 99.0 Percent", "BCHARGE", "99.0 Percent")]
	#[case("CUMONBATT: 0 Seconds", "CUMONBATT", "0 Seconds")]
	#[case("  STATUS :ONLINE  ", "STATUS", "ONLINE")]
	#[case("END APC  : 2022-07-29 10:09:40 +0100", "END APC", "2022-07-29 10:09:40 +0100")]
	#[case("NUMXFERS : ", "NUMXFERS", "")]
	fn test_parse_line(#[case] line: &str, #[case] key: &str, #[case] value: &str) {
		let snapshot = RawSnapshot::parse(line);
		assert_eq!(snapshot.len(), 1);
		assert_eq!(snapshot.get(key), Some(value));
	}

	#[rstest]
	#[case("")]
	#[case("\n\n")]
	#[case("no separator on this line")]
	#[case("   \n\t\n")]
	fn test_lines_without_colon_are_skipped(#[case] status: &str) {
		assert!(RawSnapshot::parse(status).is_empty());
	}

	#[test]
	fn test_later_duplicate_wins() {
		let snapshot = RawSnapshot::parse("A : 1\nA : 2");
		assert_eq!(snapshot.len(), 1);
		assert_eq!(snapshot.get("A"), Some("2"));
	}

	#[test]
	fn test_mixed_dump() {
		let snapshot = RawSnapshot::parse("APC      : 001,027,0676\r\nfooter without separator\nMODEL    : Smart-UPS_1500\n\n");
		assert_eq!(snapshot.iter().collect::<Vec<_>>(), vec![("APC", "001,027,0676"), ("MODEL", "Smart-UPS_1500")]);
	}
}
