// src/services/itinerary.rs
use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{error::ParseError, trip::TripParameters};

/// Telegram rejects messages longer than this many characters.
pub const MAX_MESSAGE_LEN: usize = 4096;

pub const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/?api=1&query=";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    pub title: String,
    pub highlights: Vec<String>,
    pub best_time_to_visit: String,
    pub transportation: String,
    pub daily_plan: Vec<String>,
    pub locations: Vec<String>,
    pub budget: BudgetBreakdown,
}

/// Category estimates are free text; models send both `"500 USD"` and `500`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetBreakdown {
    #[serde(deserialize_with = "text_or_number")]
    pub accommodation: String,
    #[serde(deserialize_with = "text_or_number")]
    pub food: String,
    #[serde(deserialize_with = "text_or_number")]
    pub activities: String,
    #[serde(deserialize_with = "text_or_number")]
    pub transportation: String,
    #[serde(deserialize_with = "text_or_number")]
    pub miscellaneous: String,
    #[serde(deserialize_with = "text_or_number")]
    pub total: String,
    #[serde(default)]
    pub insufficient_budget: bool,
}

fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

impl Itinerary {
    /// Canned plan used when the model reply has no usable JSON.
    pub fn fallback(params: &TripParameters) -> Self {
        let destination = params
            .destination
            .clone()
            .unwrap_or_else(|| "your destination".to_string());
        let estimate = || "See local prices".to_string();
        Self {
            title: format!("Your trip to {destination}"),
            highlights: vec![
                "Explore the historic centre on foot".to_string(),
                "Try the local food at a busy market".to_string(),
                "Take a day trip to the surrounding countryside".to_string(),
            ],
            best_time_to_visit: format!(
                "{} works well; check the local weather and holidays before booking.",
                params.time_of_year
            ),
            transportation: format!(
                "Compare flights from {} and use public transport or taxis locally.",
                params.departure_city
            ),
            daily_plan: vec![
                "Day 1: Arrive, check in and take an evening walk".to_string(),
                "Day 2: Visit the main sights and museums".to_string(),
                "Day 3: Relax, shop for souvenirs and enjoy a farewell dinner".to_string(),
            ],
            locations: params.destination.iter().cloned().collect(),
            budget: BudgetBreakdown {
                accommodation: estimate(),
                food: estimate(),
                activities: estimate(),
                transportation: estimate(),
                miscellaneous: estimate(),
                total: estimate(),
                insufficient_budget: false,
            },
        }
    }
}

/// Byte index of the `}` closing the object that opens at `text[0]`.
/// Braces inside JSON strings are ignored.
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Pull the first JSON object out of a free-text model reply.
///
/// The object spans from the first `{` to its matching `}`; when the braces
/// never balance, the last `}` in the reply is used instead.
pub fn extract_json(reply: &str) -> Result<Value, ParseError> {
    let start = reply.find('{').ok_or(ParseError::NoJsonObject)?;
    let end = matching_brace(&reply[start..])
        .map(|offset| start + offset)
        .or_else(|| reply.rfind('}').filter(|&end| end > start))
        .ok_or(ParseError::NoJsonObject)?;
    let value: Value = serde_json::from_str(&reply[start..=end])?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(ParseError::NoJsonObject)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItinerarySource {
    /// The model reply parsed and rendered in full.
    Model,
    /// The reply had no usable JSON; the canned plan was rendered.
    Fallback,
    /// The reply was JSON but not an itinerary; only a short note was rendered.
    Minimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedItinerary {
    pub text: String,
    pub source: ItinerarySource,
}

/// Turn a raw model reply into chat markup, never failing.
pub fn render_reply(reply: &str, params: &TripParameters) -> RenderedItinerary {
    let value = match extract_json(reply) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "model reply unusable, using fallback itinerary");
            return RenderedItinerary {
                text: format_itinerary(&Itinerary::fallback(params), params),
                source: ItinerarySource::Fallback,
            };
        }
    };

    match serde_json::from_value::<Itinerary>(value.clone()) {
        Ok(itinerary) => RenderedItinerary {
            text: format_itinerary(&itinerary, params),
            source: ItinerarySource::Model,
        },
        Err(err) => {
            warn!(error = %err, "model JSON is missing itinerary fields");
            RenderedItinerary {
                text: format_minimal(&value, params),
                source: ItinerarySource::Minimal,
            }
        }
    }
}

pub fn maps_link(location: &str) -> String {
    format!("{MAPS_SEARCH_URL}{}", urlencoding::encode(location))
}

/// Render an itinerary as Telegram HTML.
pub fn format_itinerary(itinerary: &Itinerary, params: &TripParameters) -> String {
    let mut out = format!("<b>✈️ {}</b>\n\n", encode_text(&itinerary.title));

    out.push_str("<b>🌟 Highlights</b>\n");
    for (i, highlight) in itinerary.highlights.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, encode_text(highlight)));
    }

    out.push_str(&format!(
        "\n<b>🗓 Best time to visit</b>\n{}\n",
        encode_text(&itinerary.best_time_to_visit)
    ));
    out.push_str(&format!(
        "\n<b>🚆 Transportation</b>\n{}\n",
        encode_text(&itinerary.transportation)
    ));

    out.push_str("\n<b>📅 Day by day</b>\n");
    for day in &itinerary.daily_plan {
        match day.split_once(':') {
            Some((label, description)) => out.push_str(&format!(
                "<b>{}</b>: {}\n",
                encode_text(label.trim()),
                encode_text(description.trim())
            )),
            None => out.push_str(&format!("• {}\n", encode_text(day))),
        }
    }

    if !itinerary.locations.is_empty() {
        out.push_str("\n<b>📍 Locations</b>\n");
        for location in &itinerary.locations {
            out.push_str(&format!(
                "• <a href=\"{}\">{}</a>\n",
                encode_double_quoted_attribute(&maps_link(location)),
                encode_text(location)
            ));
        }
    }

    let budget = &itinerary.budget;
    out.push_str(&format!("\n<b>💰 Estimated budget ({})</b>\n", encode_text(&params.currency)));
    for (label, value) in [
        ("Accommodation", &budget.accommodation),
        ("Food", &budget.food),
        ("Activities", &budget.activities),
        ("Transportation", &budget.transportation),
        ("Miscellaneous", &budget.miscellaneous),
    ] {
        out.push_str(&format!("{label}: {}\n", encode_text(value)));
    }
    out.push_str(&format!("<b>Total: {}</b>\n", encode_text(&budget.total)));
    if budget.insufficient_budget {
        out.push_str("\n⚠️ Your budget may not be enough for this trip. Consider adjusting it.\n");
    }

    out
}

/// Short message for a reply that parsed but could not be rendered in full.
pub fn format_minimal(value: &Value, params: &TripParameters) -> String {
    let title = value
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Your trip to {}", params.destination_or_unknown()));
    format!(
        "<b>✈️ {}</b>\n\nI could not lay out the full day-by-day plan this time, \
         but the booking links below are ready for your {} trip.\n",
        encode_text(&title),
        encode_text(&params.duration)
    )
}

/// Split `text` into chunks of at most `limit` characters, preferring line
/// breaks so HTML tags stay on one chunk. A single line longer than `limit`
/// loses its markup and is cut as plain text.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > limit {
            chunks.extend(cut_plain(line, limit));
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Drop tags from an HTML line, then cut it into escaped pieces of at most
/// `limit` characters. Entities are never split across pieces.
fn cut_plain(line: &str, limit: usize) -> Vec<String> {
    let mut text = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut piece_len = 0;
    let mut buf = [0u8; 4];
    for c in decode_html_entities(&text).chars() {
        let escaped = encode_text(c.encode_utf8(&mut buf));
        let len = escaped.chars().count();
        if piece_len + len > limit && !piece.is_empty() {
            pieces.push(std::mem::take(&mut piece));
            piece_len = 0;
        }
        piece.push_str(&escaped);
        piece_len += len;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}
