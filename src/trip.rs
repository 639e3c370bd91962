// src/trip.rs
use serde::{Deserialize, Serialize};

/// Shown wherever a destination is needed but the user asked for a suggestion.
pub const UNKNOWN_DESTINATION: &str = "unknown";

/// Used when the user finishes the style question without picking anything.
pub const DEFAULT_STYLE: &str = "Balanced";

pub const VACATION_STYLES: &[&str] = &[
    "Adventure",
    "Relaxation",
    "Culture",
    "Food",
    "Nature",
    "Nightlife",
    "Shopping",
    "Romance",
];

/// Everything the intake form collects. Filled one field per question and
/// handed to the generator by value once the user confirms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripParameters {
    pub destination: Option<String>,
    pub duration: String,
    pub time_of_year: String,
    pub vacation_styles: Vec<String>,
    pub departure_city: String,
    pub currency: String,
    pub adults: u32,
    pub kids: u32,
    pub hotel_rating: Option<u8>,
    pub budget: Option<f64>,
    pub local_travel: bool,
    pub suggest_destination: bool,
}

impl Default for TripParameters {
    fn default() -> Self {
        Self {
            destination: None,
            duration: String::new(),
            time_of_year: String::new(),
            vacation_styles: Vec::new(),
            departure_city: String::new(),
            currency: "USD".to_string(),
            adults: 1,
            kids: 0,
            hotel_rating: None,
            budget: None,
            local_travel: false,
            suggest_destination: true,
        }
    }
}

impl TripParameters {
    pub fn destination_or_unknown(&self) -> &str {
        self.destination.as_deref().unwrap_or(UNKNOWN_DESTINATION)
    }

    /// `None` means "suggest one for me".
    pub fn set_destination(&mut self, destination: Option<String>) {
        self.suggest_destination = destination.is_none();
        self.destination = destination;
    }

    pub fn set_departure_city(&mut self, city: String) {
        self.local_travel = self
            .destination
            .as_deref()
            .is_some_and(|dest| dest.trim().eq_ignore_ascii_case(city.trim()));
        self.departure_city = city;
    }

    /// Add the style if absent, remove it if present. Returns whether the style
    /// is selected afterwards.
    pub fn toggle_style(&mut self, style: &str) -> bool {
        if let Some(pos) = self
            .vacation_styles
            .iter()
            .position(|s| s.eq_ignore_ascii_case(style))
        {
            self.vacation_styles.remove(pos);
            false
        } else {
            self.vacation_styles.push(style.to_string());
            true
        }
    }

    pub fn has_style(&self, style: &str) -> bool {
        self.vacation_styles
            .iter()
            .any(|s| s.eq_ignore_ascii_case(style))
    }

    pub fn finalize_styles(&mut self) {
        if self.vacation_styles.is_empty() {
            self.vacation_styles.push(DEFAULT_STYLE.to_string());
        }
    }

    /// Day count parsed from the free-form duration ("7 days" -> 7).
    pub fn duration_days(&self) -> Option<u32> {
        parse_count(&self.duration).and_then(|n| u32::try_from(n).ok())
    }
}

/// First integer in `text`, keeping a directly preceding minus sign.
pub fn parse_count(text: &str) -> Option<i64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let value: i64 = digits.parse().ok()?;
    if text[..start].ends_with('-') {
        Some(-value)
    } else {
        Some(value)
    }
}

/// Match `input` against the known vacation styles, ignoring case.
pub fn known_style(input: &str) -> Option<&'static str> {
    let input = input.trim();
    VACATION_STYLES
        .iter()
        .copied()
        .find(|style| style.eq_ignore_ascii_case(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_an_empty_form() {
        let params = TripParameters::default();
        assert_eq!(params.currency, "USD");
        assert_eq!(params.adults, 1);
        assert_eq!(params.kids, 0);
        assert!(params.suggest_destination);
        assert_eq!(params.destination_or_unknown(), UNKNOWN_DESTINATION);
    }

    #[test]
    fn toggling_twice_restores_the_selection() {
        let mut params = TripParameters::default();
        params.toggle_style("Food");
        let before = params.vacation_styles.clone();

        assert!(params.toggle_style("Nature"));
        assert!(!params.toggle_style("nature"));
        assert_eq!(params.vacation_styles, before);
    }

    #[test]
    fn empty_selection_finalizes_to_default_style() {
        let mut params = TripParameters::default();
        params.finalize_styles();
        assert_eq!(params.vacation_styles, vec![DEFAULT_STYLE.to_string()]);
    }

    #[test]
    fn same_departure_and_destination_is_local_travel() {
        let mut params = TripParameters::default();
        params.set_destination(Some("Lisbon".into()));
        params.set_departure_city("lisbon ".into());
        assert!(params.local_travel);
        assert!(!params.suggest_destination);

        params.set_departure_city("Porto".into());
        assert!(!params.local_travel);
    }

    #[test]
    fn parses_counts_from_free_text() {
        assert_eq!(parse_count("7 days"), Some(7));
        assert_eq!(parse_count("about 12"), Some(12));
        assert_eq!(parse_count("-3"), Some(-3));
        assert_eq!(parse_count("a week"), None);
    }
}
