// src/services/prompt.rs
use crate::trip::TripParameters;

/// Build the completion prompt for `params`, including the JSON reply contract
/// that `itinerary::extract_json` expects.
pub fn build_prompt(params: &TripParameters) -> String {
    let destination_line = if params.suggest_destination {
        format!(
            "The traveller has not chosen a destination. Suggest the single best destination for \
             them, departing from {}, and plan the trip there.",
            params.departure_city
        )
    } else {
        format!("Destination: {}", params.destination_or_unknown())
    };

    let hotel_line = match params.hotel_rating {
        Some(stars) => format!("Preferred hotel standard: {stars} out of 5 stars"),
        None => "Preferred hotel standard: no preference".to_string(),
    };

    let budget_line = match params.budget {
        Some(budget) => format!(
            "Total budget: {budget:.0} {}. Set insufficientBudget to true if this is not enough \
             for the trip as planned.",
            params.currency
        ),
        None => "Total budget: not specified. Set insufficientBudget to false.".to_string(),
    };

    let travel_line = if params.local_travel {
        "The traveller lives in the destination city, so plan a local staycation without flights."
    } else {
        "Include how to get there from the departure city."
    };

    format!(
        r#"You are an expert travel planner. Create a detailed travel itinerary.

{destination_line}
Trip duration: {duration}
Time of year: {time_of_year}
Vacation style: {styles}
Departure city: {departure}
Travellers: {adults} adult(s) and {kids} child(ren)
{hotel_line}
{budget_line}
{travel_line}

Respond ONLY with a single JSON object, without markdown fences or commentary, using exactly this shape:
{{
  "title": "short catchy title for the trip",
  "highlights": ["highlight 1", "highlight 2", "highlight 3"],
  "bestTimeToVisit": "why this time of year works, weather and events",
  "transportation": "how to get there and how to get around",
  "dailyPlan": ["Day 1: ...", "Day 2: ..."],
  "locations": ["place name 1", "place name 2"],
  "budget": {{
    "accommodation": "estimate in {currency}",
    "food": "estimate in {currency}",
    "activities": "estimate in {currency}",
    "transportation": "estimate in {currency}",
    "miscellaneous": "estimate in {currency}",
    "total": "estimate in {currency}",
    "insufficientBudget": false
  }}
}}

Write one dailyPlan entry per day of the trip, each starting with "Day N:". Use real place names in locations so they can be found on a map."#,
        duration = params.duration,
        time_of_year = params.time_of_year,
        styles = params.vacation_styles.join(", "),
        departure = params.departure_city,
        adults = params.adults,
        kids = params.kids,
        currency = params.currency,
    )
}
