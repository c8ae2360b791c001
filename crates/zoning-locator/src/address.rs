//! # Street Address Normalization
//!
//! Situs addresses arrive in every spelling county data allows:
//! `123 N. Main Street, Apt 4, Los Angeles, CA 90012`, `123 NORTH MAIN ST`,
//! `123 main`. Normalization upper-cases, strips punctuation, canonicalizes
//! directionals and USPS street suffixes, and splits off unit, city and ZIP.
//!
//! Matching is keyed on house number plus street name. Suffix, directional,
//! unit, city and ZIP narrow a match only when both sides carry them, so
//! `123 Main` matches `123 MAIN ST` but `123 Main Ave` does not.

use std::fmt;

use serde::Serialize;

/// A parsed, canonical street address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NormalizedAddress {
    house_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pre_directional: Option<&'static str>,
    street_name: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suffix: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    post_directional: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    zip: Option<String>,
}

/// Why an address could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressProblem {
    /// Nothing left after stripping punctuation.
    Empty,
    /// The first token is not a house number.
    MissingHouseNumber,
    /// A house number with no street.
    MissingStreet,
}

impl fmt::Display for AddressProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Empty => "address is empty",
            Self::MissingHouseNumber => "address must start with a house number",
            Self::MissingStreet => "address has no street name",
        })
    }
}

const DIRECTIONALS: &[(&str, &str)] = &[
    ("N", "N"),
    ("NORTH", "N"),
    ("S", "S"),
    ("SOUTH", "S"),
    ("E", "E"),
    ("EAST", "E"),
    ("W", "W"),
    ("WEST", "W"),
    ("NE", "NE"),
    ("NORTHEAST", "NE"),
    ("NW", "NW"),
    ("NORTHWEST", "NW"),
    ("SE", "SE"),
    ("SOUTHEAST", "SE"),
    ("SW", "SW"),
    ("SOUTHWEST", "SW"),
];

const SUFFIXES: &[(&str, &str)] = &[
    ("ST", "ST"),
    ("STR", "ST"),
    ("STREET", "ST"),
    ("AVE", "AVE"),
    ("AV", "AVE"),
    ("AVENUE", "AVE"),
    ("BLVD", "BLVD"),
    ("BOULEVARD", "BLVD"),
    ("BL", "BLVD"),
    ("DR", "DR"),
    ("DRIVE", "DR"),
    ("RD", "RD"),
    ("ROAD", "RD"),
    ("PL", "PL"),
    ("PLACE", "PL"),
    ("LN", "LN"),
    ("LANE", "LN"),
    ("WAY", "WAY"),
    ("WY", "WAY"),
    ("CT", "CT"),
    ("COURT", "CT"),
    ("CIR", "CIR"),
    ("CIRCLE", "CIR"),
    ("TER", "TER"),
    ("TERR", "TER"),
    ("TERRACE", "TER"),
];

const UNIT_DESIGNATORS: &[&str] = &["APT", "APARTMENT", "UNIT", "STE", "SUITE", "#", "SPC", "NO"];

const STATE_TOKENS: &[&str] = &["CA", "CALIF", "CALIFORNIA"];

fn lookup(table: &[(&str, &'static str)], token: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(spelling, _)| *spelling == token)
        .map(|(_, canonical)| *canonical)
}

fn is_zip(token: &str) -> bool {
    let (five, plus_four) = match token.split_once('-') {
        Some((a, b)) => (a, Some(b)),
        None => (token, None),
    };
    five.len() == 5
        && five.bytes().all(|b| b.is_ascii_digit())
        && plus_four.map_or(true, |p| p.len() == 4 && p.bytes().all(|b| b.is_ascii_digit()))
}

fn is_house_number(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_digit())
        && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '/')
}

/// Upper-case and split a segment into tokens. `#` becomes its own token;
/// other punctuation is dropped, except `-` and `/` inside tokens.
fn tokenize(segment: &str) -> Vec<String> {
    let mut cleaned = String::with_capacity(segment.len());
    for c in segment.chars() {
        match c {
            '#' => cleaned.push_str(" # "),
            c if c.is_ascii_alphanumeric() => cleaned.push(c.to_ascii_uppercase()),
            '-' | '/' => cleaned.push(c),
            _ => cleaned.push(' '),
        }
    }
    cleaned
        .split_whitespace()
        .map(|t| t.trim_matches(|c| c == '-' || c == '/').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Strip a trailing `[STATE] [ZIP]` tail from a token list.
fn strip_state_zip(tokens: &mut Vec<String>) -> Option<String> {
    let mut zip = None;
    if tokens.last().is_some_and(|t| is_zip(t)) {
        zip = tokens.pop().map(|z| z.chars().take(5).collect());
    }
    if tokens.last().is_some_and(|t| STATE_TOKENS.contains(&t.as_str())) {
        tokens.pop();
    }
    zip
}

impl NormalizedAddress {
    /// Normalize a free-text address.
    pub fn parse(input: &str) -> Result<Self, AddressProblem> {
        let mut segments = input.split(',');
        let mut street_tokens = tokenize(segments.next().unwrap_or_default());
        if street_tokens.is_empty() {
            return Err(AddressProblem::Empty);
        }

        let mut city = None;
        let mut zip = strip_state_zip(&mut street_tokens);
        let mut unit = None;

        for segment in segments {
            let mut tokens = tokenize(segment);
            if tokens.is_empty() {
                continue;
            }
            if let Some(z) = strip_state_zip(&mut tokens) {
                zip = Some(z);
            }
            if tokens.is_empty() {
                continue;
            }
            if UNIT_DESIGNATORS.contains(&tokens[0].as_str()) {
                let rest = tokens.split_off(1);
                if !rest.is_empty() {
                    unit = Some(rest.join(" "));
                }
            } else if city.is_none() {
                city = Some(tokens.join(" "));
            }
        }

        if street_tokens.is_empty() {
            return Err(AddressProblem::MissingHouseNumber);
        }
        let house_number = street_tokens.remove(0);
        if !is_house_number(&house_number) {
            return Err(AddressProblem::MissingHouseNumber);
        }

        if let Some(pos) = street_tokens
            .iter()
            .position(|t| UNIT_DESIGNATORS.contains(&t.as_str()))
        {
            // "NO" only designates a unit when something follows it.
            if pos > 0 && pos + 1 < street_tokens.len() {
                let rest = street_tokens.split_off(pos);
                unit = Some(rest[1..].join(" "));
            }
        }

        let pre_directional = match street_tokens.first() {
            Some(t) if street_tokens.len() > 1 => lookup(DIRECTIONALS, t),
            _ => None,
        };
        if pre_directional.is_some() {
            street_tokens.remove(0);
        }

        let post_directional = match street_tokens.last() {
            Some(t) if street_tokens.len() > 2 => lookup(DIRECTIONALS, t),
            _ => None,
        };
        if post_directional.is_some() {
            street_tokens.pop();
        }

        let suffix = match street_tokens.last() {
            Some(t) if street_tokens.len() > 1 => lookup(SUFFIXES, t),
            _ => None,
        };
        if suffix.is_some() {
            street_tokens.pop();
        }

        if street_tokens.is_empty() {
            return Err(AddressProblem::MissingStreet);
        }

        Ok(Self {
            house_number,
            pre_directional,
            street_name: street_tokens,
            suffix,
            post_directional,
            unit,
            city,
            zip,
        })
    }

    /// House number token (`123`, `123A`).
    pub fn house_number(&self) -> &str {
        &self.house_number
    }

    /// Street name without directional or suffix, space-joined.
    pub fn street_name(&self) -> String {
        self.street_name.join(" ")
    }

    /// Canonical suffix (`ST`, `AVE`), if present.
    pub fn suffix(&self) -> Option<&'static str> {
        self.suffix
    }

    /// Unit, if present.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// City, if present.
    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    /// Five-digit ZIP, if present.
    pub fn zip(&self) -> Option<&str> {
        self.zip.as_deref()
    }

    /// Lookup key: `"<house number> <street name>"`.
    pub fn match_key(&self) -> String {
        format!("{} {}", self.house_number, self.street_name())
    }

    /// Attach city and ZIP from separate record columns when the situs
    /// line lacks them.
    pub fn with_locality(mut self, city: Option<&str>, zip: Option<&str>) -> Self {
        if self.city.is_none() {
            self.city = city
                .map(|c| tokenize(c).join(" "))
                .filter(|c| !c.is_empty());
        }
        if self.zip.is_none() {
            self.zip = zip.filter(|z| is_zip(z.trim())).map(|z| z.trim()[..5].to_string());
        }
        self
    }

    /// True when `self` (a query) plausibly names `record`.
    pub fn matches(&self, record: &NormalizedAddress) -> bool {
        fn agree<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
        }
        self.house_number == record.house_number
            && self.street_name == record.street_name
            && agree(&self.pre_directional, &record.pre_directional)
            && agree(&self.suffix, &record.suffix)
            && agree(&self.post_directional, &record.post_directional)
            && agree(&self.unit, &record.unit)
            && agree(&self.city, &record.city)
            && agree(&self.zip, &record.zip)
    }
}

impl fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.house_number)?;
        if let Some(d) = self.pre_directional {
            write!(f, " {d}")?;
        }
        write!(f, " {}", self.street_name())?;
        if let Some(s) = self.suffix {
            write!(f, " {s}")?;
        }
        if let Some(d) = self.post_directional {
            write!(f, " {d}")?;
        }
        if let Some(u) = &self.unit {
            write!(f, " UNIT {u}")?;
        }
        if let Some(c) = &self.city {
            write!(f, ", {c}")?;
        }
        if let Some(z) = &self.zip {
            write!(f, ", CA {z}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> NormalizedAddress {
        NormalizedAddress::parse(s).unwrap()
    }

    #[test]
    fn full_address_is_split_into_parts() {
        let a = norm("123 N. Main Street, Apt 4, Los Angeles, CA 90012-1234");
        assert_eq!(a.house_number(), "123");
        assert_eq!(a.street_name(), "MAIN");
        assert_eq!(a.suffix(), Some("ST"));
        assert_eq!(a.unit(), Some("4"));
        assert_eq!(a.city(), Some("LOS ANGELES"));
        assert_eq!(a.zip(), Some("90012"));
        assert_eq!(a.to_string(), "123 N MAIN ST UNIT 4, LOS ANGELES, CA 90012");
    }

    #[test]
    fn spellings_canonicalize_to_the_same_address() {
        let a = norm("123 north main street");
        let b = norm("123 N MAIN ST");
        assert_eq!(a, b);
        assert_eq!(norm("500 Sunset Boulevard").suffix(), Some("BLVD"));
        assert_eq!(norm("9 Ocean Terrace").suffix(), Some("TER"));
    }

    #[test]
    fn inline_unit_markers() {
        assert_eq!(norm("55 Elm Ave #12").unit(), Some("12"));
        assert_eq!(norm("55 Elm Ave Ste 200").unit(), Some("200"));
    }

    #[test]
    fn street_named_like_a_suffix_is_kept() {
        // "COURT ST": only the last token is a suffix.
        let a = norm("10 Court St");
        assert_eq!(a.street_name(), "COURT");
        assert_eq!(a.suffix(), Some("ST"));
        // A lone "WAY" is the street name.
        assert_eq!(norm("10 Way").street_name(), "WAY");
        // "N" alone is a street, not a directional.
        assert_eq!(norm("10 N").street_name(), "N");
    }

    #[test]
    fn missing_suffix_matches_record_with_suffix() {
        let query = norm("123 Main");
        let record = norm("123 MAIN ST, LOS ANGELES, CA 90012");
        assert!(query.matches(&record));
        assert!(!norm("123 Main Ave").matches(&record));
        assert!(!norm("124 Main St").matches(&record));
        assert!(!norm("123 Main St, Pasadena").matches(&record));
        assert!(norm("123 Main St, Los Angeles").matches(&record));
    }

    #[test]
    fn rejects_inputs_without_house_number_or_street() {
        assert_eq!(NormalizedAddress::parse("  ,  "), Err(AddressProblem::Empty));
        assert_eq!(
            NormalizedAddress::parse("Main Street"),
            Err(AddressProblem::MissingHouseNumber)
        );
        assert_eq!(NormalizedAddress::parse("123"), Err(AddressProblem::MissingStreet));
    }

    #[test]
    fn locality_fills_only_missing_parts() {
        let a = norm("123 Main St").with_locality(Some("Los Angeles"), Some("90012"));
        assert_eq!(a.city(), Some("LOS ANGELES"));
        assert_eq!(a.zip(), Some("90012"));
        let b = norm("123 Main St, Pasadena").with_locality(Some("Los Angeles"), None);
        assert_eq!(b.city(), Some("PASADENA"));
    }
}
