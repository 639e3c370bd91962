// src/services/affiliate.rs
use chrono::{Datelike, Duration, NaiveDate};
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::trip::TripParameters;

pub const HOTEL_SEARCH_URL: &str = "https://www.agoda.com/search";
pub const FLIGHT_SEARCH_URL: &str = "https://www.agoda.com/flights/results";

/// Month used when the time-of-year answer names no month or season.
pub const FALLBACK_MONTH: u32 = 6;
pub const DEFAULT_STAY_DAYS: u32 = 5;

/// Hotel-search city ids, keyed by lowercase city name.
const HOTEL_CITY_IDS: &[(&str, u32)] = &[
    ("bangkok", 9395),
    ("phuket", 16056),
    ("pattaya", 8584),
    ("chiang mai", 7401),
    ("krabi", 14865),
    ("koh samui", 17182),
    ("hua hin", 16552),
    ("singapore", 4064),
    ("kuala lumpur", 14524),
    ("bali", 17193),
    ("jakarta", 8691),
    ("hanoi", 2758),
    ("ho chi minh city", 13170),
    ("da nang", 16440),
    ("manila", 5016),
    ("hong kong", 16808),
    ("taipei", 4951),
    ("tokyo", 5085),
    ("osaka", 9590),
    ("kyoto", 1784),
    ("seoul", 14690),
    ("sydney", 14370),
    ("melbourne", 10458),
    ("dubai", 2994),
    ("istanbul", 14932),
    ("london", 233),
    ("paris", 15470),
    ("rome", 16417),
    ("barcelona", 5296),
    ("amsterdam", 13868),
    ("new york", 318),
    ("los angeles", 12772),
];

/// Airport codes for the flight search, keyed by lowercase city name.
const AIRPORT_CODES: &[(&str, &str)] = &[
    ("bangkok", "BKK"),
    ("phuket", "HKT"),
    ("chiang mai", "CNX"),
    ("krabi", "KBV"),
    ("singapore", "SIN"),
    ("kuala lumpur", "KUL"),
    ("bali", "DPS"),
    ("jakarta", "CGK"),
    ("hanoi", "HAN"),
    ("ho chi minh city", "SGN"),
    ("da nang", "DAD"),
    ("manila", "MNL"),
    ("hong kong", "HKG"),
    ("taipei", "TPE"),
    ("tokyo", "TYO"),
    ("osaka", "OSA"),
    ("seoul", "SEL"),
    ("sydney", "SYD"),
    ("melbourne", "MEL"),
    ("dubai", "DXB"),
    ("istanbul", "IST"),
    ("london", "LON"),
    ("paris", "PAR"),
    ("rome", "ROM"),
    ("barcelona", "BCN"),
    ("amsterdam", "AMS"),
    ("new york", "NYC"),
    ("los angeles", "LAX"),
];

const MONTH_WORDS: &[(&str, u32)] = &[
    ("january", 1),
    ("jan", 1),
    ("february", 2),
    ("feb", 2),
    ("march", 3),
    ("mar", 3),
    ("april", 4),
    ("apr", 4),
    ("may", 5),
    ("june", 6),
    ("jun", 6),
    ("july", 7),
    ("jul", 7),
    ("august", 8),
    ("aug", 8),
    ("september", 9),
    ("sept", 9),
    ("sep", 9),
    ("october", 10),
    ("oct", 10),
    ("november", 11),
    ("nov", 11),
    ("december", 12),
    ("dec", 12),
];

const AMBIGUOUS_MONTH: &str = "may";

const SEASON_WORDS: &[(&str, u32)] = &[
    ("spring", 4),
    ("summer", 7),
    ("autumn", 10),
    ("fall", 10),
    ("winter", 1),
    ("christmas", 12),
    ("xmas", 12),
];

/// Case-insensitive lookup: exact name first, then containment either way.
pub fn lookup<T: Copy>(table: &[(&str, T)], city: &str) -> Option<T> {
    let city = city.trim().to_lowercase();
    if city.is_empty() {
        return None;
    }
    table
        .iter()
        .find(|(name, _)| *name == city)
        .or_else(|| {
            table
                .iter()
                .find(|(name, _)| city.contains(name) || name.contains(city.as_str()))
        })
        .map(|(_, value)| *value)
}

pub fn hotel_city_id(city: &str) -> Option<u32> {
    lookup(HOTEL_CITY_IDS, city)
}

pub fn airport_code(city: &str) -> Option<&'static str> {
    lookup(AIRPORT_CODES, city)
}

/// Approximate travel month for a time-of-year phrase such as "early July"
/// or "summer holidays".
pub fn resolve_month(time_of_year: &str) -> u32 {
    let lower = time_of_year.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();

    // "may" is also a verb, so it only counts when nothing else names a time.
    let find = |table: &[(&str, u32)]| {
        words
            .iter()
            .filter(|w| **w != AMBIGUOUS_MONTH)
            .find_map(|w| table.iter().find(|(name, _)| name == w).map(|(_, m)| *m))
    };

    if let Some(month) = find(MONTH_WORDS) {
        return month;
    }
    if words.windows(2).any(|pair| pair[0] == "new" && pair[1].starts_with("year")) {
        return 1;
    }
    if let Some(month) = find(SEASON_WORDS) {
        return month;
    }
    if words.contains(&AMBIGUOUS_MONTH) {
        return 5;
    }
    FALLBACK_MONTH
}

/// Check-in on the 15th of the travel month, strictly after `today`;
/// check-out after the trip length.
pub fn stay_dates(params: &TripParameters, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let month = resolve_month(&params.time_of_year);
    let fifteenth = |year: i32| {
        NaiveDate::from_ymd_opt(year, month, 15).expect("every month has a 15th")
    };
    let mut check_in = fifteenth(today.year());
    if check_in <= today {
        check_in = fifteenth(today.year() + 1);
    }
    let days = params
        .duration_days()
        .filter(|d| (1..=100).contains(d))
        .unwrap_or(DEFAULT_STAY_DAYS);
    (check_in, check_in + Duration::days(i64::from(days)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffiliateLinks {
    pub hotel: String,
    /// `None` for local trips.
    pub flight: Option<String>,
}

fn with_query(base: &str, pairs: &[(&str, String)]) -> String {
    let query: Vec<String> = pairs
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect();
    format!("{base}?{}", query.join("&"))
}

/// Hotel and flight search links for `params`. Deterministic for a given
/// `today`.
pub fn build_links(params: &TripParameters, affiliate_id: &str, today: NaiveDate) -> AffiliateLinks {
    let (check_in, check_out) = stay_dates(params, today);
    let check_in = check_in.format("%Y-%m-%d").to_string();
    let check_out = check_out.format("%Y-%m-%d").to_string();

    let mut hotel = Vec::new();
    if let Some(city) = params.destination.as_deref().and_then(hotel_city_id) {
        hotel.push(("city", city.to_string()));
    }
    hotel.extend([
        ("checkIn", check_in.clone()),
        ("checkOut", check_out.clone()),
        ("rooms", "1".to_string()),
        ("adults", params.adults.to_string()),
        ("children", params.kids.to_string()),
    ]);
    if let Some(stars) = params.hotel_rating {
        hotel.push(("hotelStarRating", stars.to_string()));
    }
    hotel.push(("cid", affiliate_id.to_string()));

    let flight = (!params.local_travel).then(|| {
        let mut flight = Vec::new();
        if let Some(origin) = airport_code(&params.departure_city) {
            flight.push(("origin", origin.to_string()));
        }
        if let Some(destination) = params.destination.as_deref().and_then(airport_code) {
            flight.push(("destination", destination.to_string()));
        }
        flight.extend([
            ("departDate", check_in),
            ("returnDate", check_out),
            ("adults", params.adults.to_string()),
            ("children", params.kids.to_string()),
            ("cabinType", "Economy".to_string()),
            ("cid", affiliate_id.to_string()),
        ]);
        with_query(FLIGHT_SEARCH_URL, &flight)
    });

    AffiliateLinks {
        hotel: with_query(HOTEL_SEARCH_URL, &hotel),
        flight,
    }
}

/// Booking block appended to the itinerary message.
pub fn format_links(links: &AffiliateLinks, params: &TripParameters) -> String {
    let place = params
        .destination
        .as_deref()
        .unwrap_or("your destination");
    let mut out = format!(
        "<b>🔗 Book your trip</b>\n🏨 <a href=\"{}\">Hotels in {}</a>\n",
        encode_double_quoted_attribute(&links.hotel),
        encode_text(place)
    );
    if let Some(flight) = &links.flight {
        out.push_str(&format!(
            "✈️ <a href=\"{}\">Flights from {}</a>\n",
            encode_double_quoted_attribute(flight),
            encode_text(&params.departure_city)
        ));
    }
    out
}
