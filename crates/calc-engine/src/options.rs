//! Culture and calculation options

use chrono::{NaiveDate, NaiveDateTime};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Locale settings used when tokenizing numbers, lists and dates
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Culture {
    /// Decimal separator in number literals
    pub decimal_separator: char,
    /// Separator between function arguments
    pub list_separator: char,
    /// Suffix that divides a number literal by 100
    pub percent_symbol: char,
    /// `chrono` formats tried, in order, for `#...#` literals
    pub date_formats: Vec<String>,
}

impl Culture {
    /// Culture-neutral settings (`.` decimal, `,` list separator)
    pub fn invariant() -> Self {
        Self {
            decimal_separator: '.',
            list_separator: ',',
            percent_symbol: '%',
            date_formats: [
                "%m/%d/%Y %H:%M:%S",
                "%m/%d/%Y %H:%M",
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%d %H:%M",
                "%m/%d/%Y",
                "%Y-%m-%d",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }

    /// Same as invariant but with different separators
    ///
    /// ```rust
    /// use calc_engine::Culture;
    ///
    /// let german = Culture::with_separators(',', ';');
    /// assert_eq!(german.list_separator, ';');
    /// ```
    pub fn with_separators(decimal_separator: char, list_separator: char) -> Self {
        Self {
            decimal_separator,
            list_separator,
            ..Self::invariant()
        }
    }

    /// Parse the text of a date literal
    ///
    /// Every format is tried as a date-time first; date-only matches land at
    /// midnight.
    pub fn parse_date(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        self.date_formats
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .or_else(|| {
                self.date_formats.iter().find_map(|fmt| {
                    NaiveDate::parse_from_str(text, fmt)
                        .ok()
                        .map(|d| d.and_time(chrono::NaiveTime::MIN))
                })
            })
    }
}

impl Default for Culture {
    fn default() -> Self {
        Self::invariant()
    }
}

/// Options consulted by built-in functions
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FunctionOptions {
    /// Characters stripped from the start of text values before `Contains` compares them
    pub contains_trim_start_chars: Vec<char>,
}

/// Engine-wide calculation options
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CalculationOptions {
    pub functions: FunctionOptions,
    /// Identifiers that are never parsed as binding paths
    pub skipped_variables_for_parsing: Vec<String>,
}

impl CalculationOptions {
    /// Check whether an identifier is excluded from binding-path detection
    pub fn is_skipped(&self, identifier: &str) -> bool {
        self.skipped_variables_for_parsing
            .iter()
            .any(|s| s.eq_ignore_ascii_case(identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_date() {
        let culture = Culture::invariant();
        let expected = NaiveDate::from_ymd_opt(2020, 3, 14)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(culture.parse_date("03/14/2020"), Some(expected));
        assert_eq!(culture.parse_date("2020-03-14"), Some(expected));
        assert_eq!(
            culture.parse_date("2020-03-14 10:30:00"),
            NaiveDate::from_ymd_opt(2020, 3, 14)
                .unwrap()
                .and_hms_opt(10, 30, 0)
        );
        assert_eq!(culture.parse_date("not a date"), None);
    }

    #[test]
    fn test_skipped() {
        let options = CalculationOptions {
            skipped_variables_for_parsing: vec!["Total".into()],
            ..Default::default()
        };
        assert!(options.is_skipped("total"));
        assert!(!options.is_skipped("other"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_options_from_json() {
        let options: CalculationOptions = serde_json::from_str(
            r#"{"functions":{"contains_trim_start_chars":["0"]},"skipped_variables_for_parsing":["x"]}"#,
        )
        .unwrap();
        assert_eq!(options.functions.contains_trim_start_chars, vec!['0']);
        assert_eq!(options.skipped_variables_for_parsing, vec!["x".to_string()]);
    }
}
