// src/services/flow.rs
//! The intake form as an explicit state machine.
//!
//! Each [`Step`] has one entry in a static table holding its prompt, its
//! keyboard and the function that validates and stores an answer. `apply`
//! turns (step, input) into a [`Transition`] without touching the network, so
//! the controller only has to carry out the side effects.

use crate::{
    error::AnswerError,
    message::{Button, Keyboard},
    trip::{TripParameters, VACATION_STYLES, known_style, parse_count},
};

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const SEASONS: [&str; 4] = ["Spring", "Summer", "Autumn", "Winter"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Destination,
    Duration,
    TimeOfYear,
    VacationStyle,
    DepartureCity,
    Currency,
    Adults,
    Kids,
    LuxuryLevel,
    Budget,
    Confirmation,
}

impl Step {
    pub const FIRST: Step = Step::Destination;
    pub const COUNT: usize = 11;

    pub const ALL: [Step; Step::COUNT] = [
        Step::Destination,
        Step::Duration,
        Step::TimeOfYear,
        Step::VacationStyle,
        Step::DepartureCity,
        Step::Currency,
        Step::Adults,
        Step::Kids,
        Step::LuxuryLevel,
        Step::Budget,
        Step::Confirmation,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// 1-based position, as shown to the user.
    pub fn number(self) -> usize {
        self.index() + 1
    }

    pub fn next(self) -> Option<Step> {
        Step::ALL.get(self.index() + 1).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Step::Destination => "destination",
            Step::Duration => "duration",
            Step::TimeOfYear => "time_of_year",
            Step::VacationStyle => "vacation_style",
            Step::DepartureCity => "departure_city",
            Step::Currency => "currency",
            Step::Adults => "adults",
            Step::Kids => "kids",
            Step::LuxuryLevel => "luxury_level",
            Step::Budget => "budget",
            Step::Confirmation => "confirmation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    Text(&'a str),
    Button(&'a str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Answer stored; ask `next`. `answer` is a display label for the edit.
    Advance { answer: String, next: Step },
    /// Vacation style set changed; stay and refresh the keyboard.
    Toggled,
    /// Answer rejected; ask the same question again.
    Reprompt(AnswerError),
    Generate,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

enum Outcome {
    Answered(String),
    Toggled,
    Confirmed,
    Declined,
}

type Accept = fn(&mut TripParameters, Input<'_>) -> Result<Outcome, AnswerError>;

struct StepEntry {
    step: Step,
    prompt: &'static str,
    keyboard: fn(&TripParameters) -> Option<Keyboard>,
    accept: Accept,
}

static STEPS: [StepEntry; Step::COUNT] = [
    StepEntry {
        step: Step::Destination,
        prompt: "🌍 Where would you like to go? Type a city or country, or let me suggest one.",
        keyboard: destination_keyboard,
        accept: accept_destination,
    },
    StepEntry {
        step: Step::Duration,
        prompt: "📅 How many days will your trip last?",
        keyboard: duration_keyboard,
        accept: accept_duration,
    },
    StepEntry {
        step: Step::TimeOfYear,
        prompt: "🗓 When are you planning to travel? Pick a season or month, or type it.",
        keyboard: time_of_year_keyboard,
        accept: accept_time_of_year,
    },
    StepEntry {
        step: Step::VacationStyle,
        prompt: "🎒 What kind of trip do you enjoy? Select all that apply, then tap Done.",
        keyboard: style_keyboard,
        accept: accept_style,
    },
    StepEntry {
        step: Step::DepartureCity,
        prompt: "🛫 Which city will you be departing from?",
        keyboard: no_keyboard,
        accept: accept_departure_city,
    },
    StepEntry {
        step: Step::Currency,
        prompt: "💱 Which currency should I use for the budget?",
        keyboard: currency_keyboard,
        accept: accept_currency,
    },
    StepEntry {
        step: Step::Adults,
        prompt: "🧑 How many adults are travelling?",
        keyboard: adults_keyboard,
        accept: accept_adults,
    },
    StepEntry {
        step: Step::Kids,
        prompt: "🧒 How many children are travelling?",
        keyboard: kids_keyboard,
        accept: accept_kids,
    },
    StepEntry {
        step: Step::LuxuryLevel,
        prompt: "🏨 What hotel standard do you prefer? (1 = budget, 5 = luxury)",
        keyboard: luxury_keyboard,
        accept: accept_luxury,
    },
    StepEntry {
        step: Step::Budget,
        prompt: "💰 What is your total budget for the trip? Type an amount or tap Skip.",
        keyboard: budget_keyboard,
        accept: accept_budget,
    },
    StepEntry {
        step: Step::Confirmation,
        prompt: "✅ Here is your trip. Shall I create the itinerary? Reply YES to continue or NO to cancel.",
        keyboard: confirmation_keyboard,
        accept: accept_confirmation,
    },
];

fn entry(step: Step) -> &'static StepEntry {
    let entry = &STEPS[step.index()];
    debug_assert_eq!(entry.step, step);
    entry
}

/// The message to send when `step` becomes current.
pub fn question(step: Step, params: &TripParameters) -> Question {
    let entry = entry(step);
    let text = if step == Step::Confirmation {
        format!("{}\n\n{}", summary(params), entry.prompt)
    } else {
        format!("({}/{}) {}", step.number(), Step::COUNT, entry.prompt)
    };
    Question {
        text,
        keyboard: (entry.keyboard)(params),
    }
}

/// Validate `input` for `step` and store it in `params` on success.
pub fn apply(step: Step, params: &mut TripParameters, input: Input<'_>) -> Transition {
    match (entry(step).accept)(params, input) {
        Ok(Outcome::Answered(answer)) => match step.next() {
            Some(next) => Transition::Advance { answer, next },
            None => Transition::Generate,
        },
        Ok(Outcome::Toggled) => Transition::Toggled,
        Ok(Outcome::Confirmed) => Transition::Generate,
        Ok(Outcome::Declined) => Transition::Cancel,
        Err(err) => Transition::Reprompt(err),
    }
}

/// Human readable recap shown before confirmation.
pub fn summary(params: &TripParameters) -> String {
    let destination = match &params.destination {
        Some(dest) => dest.clone(),
        None => "Suggest one for me".to_string(),
    };
    let rating = params
        .hotel_rating
        .map(|r| "⭐".repeat(usize::from(r)))
        .unwrap_or_else(|| "Any".to_string());
    let budget = params
        .budget
        .map(|b| format!("{b:.0} {}", params.currency))
        .unwrap_or_else(|| "Not set".to_string());

    format!(
        "📋 Trip summary\n\
         Destination: {destination}\n\
         Duration: {}\n\
         Time of year: {}\n\
         Style: {}\n\
         Departing from: {}\n\
         Currency: {}\n\
         Travellers: {} adult(s), {} child(ren)\n\
         Hotel: {rating}\n\
         Budget: {budget}",
        params.duration,
        params.time_of_year,
        params.vacation_styles.join(", "),
        params.departure_city,
        params.currency,
        params.adults,
        params.kids,
    )
}

// Keyboards

fn row(buttons: impl IntoIterator<Item = (String, String)>) -> Vec<Button> {
    buttons
        .into_iter()
        .map(|(label, payload)| Button::new(label, payload))
        .collect()
}

fn no_keyboard(_: &TripParameters) -> Option<Keyboard> {
    None
}

fn destination_keyboard(_: &TripParameters) -> Option<Keyboard> {
    Some(Keyboard::new(vec![vec![Button::new(
        "✨ Suggest a destination",
        "destination_suggest",
    )]]))
}

fn duration_keyboard(_: &TripParameters) -> Option<Keyboard> {
    let button = |d: u32| (format!("{d} days"), format!("duration_{d}"));
    Some(Keyboard::new(vec![
        row([3, 5, 7].map(button)),
        row([10, 14].map(button)),
    ]))
}

fn time_of_year_keyboard(_: &TripParameters) -> Option<Keyboard> {
    let mut rows = vec![row(SEASONS.map(|s| {
        (s.to_string(), format!("season_{}", s.to_ascii_lowercase()))
    }))];
    for chunk in MONTH_NAMES.chunks(4) {
        rows.push(row(chunk.iter().map(|name| {
            let month = MONTH_NAMES.iter().position(|m| m == name).unwrap_or(0) + 1;
            (name[..3].to_string(), format!("month_{month}"))
        })));
    }
    Some(Keyboard::new(rows))
}

fn style_keyboard(params: &TripParameters) -> Option<Keyboard> {
    let mut rows: Vec<Vec<Button>> = VACATION_STYLES
        .chunks(2)
        .map(|chunk| {
            row(chunk.iter().map(|style| {
                let label = if params.has_style(style) {
                    format!("✅ {style}")
                } else {
                    style.to_string()
                };
                (label, format!("style_{}", style.to_ascii_lowercase()))
            }))
        })
        .collect();
    rows.push(vec![Button::new("Done ✔️", "style_done")]);
    Some(Keyboard::new(rows))
}

fn currency_keyboard(_: &TripParameters) -> Option<Keyboard> {
    let button = |c: &str| (c.to_string(), format!("currency_{c}"));
    Some(Keyboard::new(vec![
        row(["USD", "EUR", "GBP"].map(button)),
        row(["THB", "JPY", "AUD"].map(button)),
    ]))
}

fn counter_keyboard(prefix: &str, values: std::ops::RangeInclusive<u32>) -> Option<Keyboard> {
    Some(Keyboard::new(vec![row(
        values.map(|n| (n.to_string(), format!("{prefix}_{n}"))),
    )]))
}

fn adults_keyboard(_: &TripParameters) -> Option<Keyboard> {
    counter_keyboard("adults", 1..=6)
}

fn kids_keyboard(_: &TripParameters) -> Option<Keyboard> {
    counter_keyboard("kids", 0..=4)
}

fn luxury_keyboard(_: &TripParameters) -> Option<Keyboard> {
    Some(Keyboard::new(vec![row((1..=5u32).map(|n| {
        ("⭐".repeat(n as usize), format!("luxury_{n}"))
    }))]))
}

fn budget_keyboard(_: &TripParameters) -> Option<Keyboard> {
    Some(Keyboard::new(vec![vec![Button::new("Skip", "budget_skip")]]))
}

fn confirmation_keyboard(_: &TripParameters) -> Option<Keyboard> {
    Some(Keyboard::new(vec![vec![
        Button::new("YES", "confirm_yes"),
        Button::new("NO", "confirm_no"),
    ]]))
}

// Validators and setters

fn text_answer(input: Input<'_>) -> Result<&str, AnswerError> {
    match input {
        Input::Text(text) if !text.trim().is_empty() => Ok(text.trim()),
        Input::Text(_) => Err(AnswerError::Empty),
        Input::Button(_) => Err(AnswerError::UnknownOption),
    }
}

/// Integer from a `prefix_N` button or free text, checked against the range.
fn number_answer(input: Input<'_>, prefix: &str, min: i64, max: i64) -> Result<u32, AnswerError> {
    let value = match input {
        Input::Button(payload) => payload
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|n| n.parse::<i64>().ok())
            .ok_or(AnswerError::UnknownOption)?,
        Input::Text(text) => parse_count(text).ok_or(AnswerError::NotANumber)?,
    };
    if !(min..=max).contains(&value) {
        return Err(AnswerError::OutOfRange { min, max });
    }
    u32::try_from(value).map_err(|_| AnswerError::OutOfRange { min, max })
}

fn accept_destination(params: &mut TripParameters, input: Input<'_>) -> Result<Outcome, AnswerError> {
    if input == Input::Button("destination_suggest") {
        params.set_destination(None);
        return Ok(Outcome::Answered("Suggest a destination".to_string()));
    }
    let destination = text_answer(input)?.to_string();
    params.set_destination(Some(destination.clone()));
    Ok(Outcome::Answered(destination))
}

fn accept_duration(params: &mut TripParameters, input: Input<'_>) -> Result<Outcome, AnswerError> {
    let days = number_answer(input, "duration", 1, 100)?;
    params.duration = format!("{days} days");
    Ok(Outcome::Answered(params.duration.clone()))
}

fn accept_time_of_year(params: &mut TripParameters, input: Input<'_>) -> Result<Outcome, AnswerError> {
    let answer = match input {
        Input::Button(payload) => {
            if let Some(month) = payload.strip_prefix("month_") {
                month
                    .parse::<usize>()
                    .ok()
                    .and_then(|m| m.checked_sub(1))
                    .and_then(|i| MONTH_NAMES.get(i))
                    .map(|name| name.to_string())
                    .ok_or(AnswerError::UnknownOption)?
            } else if let Some(season) = payload.strip_prefix("season_") {
                SEASONS
                    .iter()
                    .find(|s| s.eq_ignore_ascii_case(season))
                    .map(|s| s.to_string())
                    .ok_or(AnswerError::UnknownOption)?
            } else {
                return Err(AnswerError::UnknownOption);
            }
        }
        Input::Text(_) => text_answer(input)?.to_string(),
    };
    params.time_of_year = answer.clone();
    Ok(Outcome::Answered(answer))
}

fn accept_style(params: &mut TripParameters, input: Input<'_>) -> Result<Outcome, AnswerError> {
    let choice = match input {
        Input::Button("style_done") => None,
        Input::Button(payload) => Some(
            payload
                .strip_prefix("style_")
                .and_then(known_style)
                .ok_or(AnswerError::UnknownOption)?,
        ),
        Input::Text(text) if text.trim().eq_ignore_ascii_case("done") => None,
        Input::Text(text) => Some(known_style(text).ok_or(AnswerError::UnknownOption)?),
    };
    match choice {
        Some(style) => {
            params.toggle_style(style);
            Ok(Outcome::Toggled)
        }
        None => {
            params.finalize_styles();
            Ok(Outcome::Answered(params.vacation_styles.join(", ")))
        }
    }
}

fn accept_departure_city(params: &mut TripParameters, input: Input<'_>) -> Result<Outcome, AnswerError> {
    let city = text_answer(input)?.to_string();
    params.set_departure_city(city.clone());
    Ok(Outcome::Answered(city))
}

fn accept_currency(params: &mut TripParameters, input: Input<'_>) -> Result<Outcome, AnswerError> {
    let raw = match input {
        Input::Button(payload) => payload
            .strip_prefix("currency_")
            .ok_or(AnswerError::UnknownOption)?,
        Input::Text(text) => text.trim(),
    };
    if raw.len() != 3 || !raw.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AnswerError::InvalidCurrency);
    }
    params.currency = raw.to_ascii_uppercase();
    Ok(Outcome::Answered(params.currency.clone()))
}

fn accept_adults(params: &mut TripParameters, input: Input<'_>) -> Result<Outcome, AnswerError> {
    params.adults = number_answer(input, "adults", 1, 20)?;
    Ok(Outcome::Answered(params.adults.to_string()))
}

fn accept_kids(params: &mut TripParameters, input: Input<'_>) -> Result<Outcome, AnswerError> {
    params.kids = number_answer(input, "kids", 0, 10)?;
    Ok(Outcome::Answered(params.kids.to_string()))
}

fn accept_luxury(params: &mut TripParameters, input: Input<'_>) -> Result<Outcome, AnswerError> {
    let level = number_answer(input, "luxury", 1, 5)?;
    params.hotel_rating = u8::try_from(level).ok();
    Ok(Outcome::Answered("⭐".repeat(level as usize)))
}

fn accept_budget(params: &mut TripParameters, input: Input<'_>) -> Result<Outcome, AnswerError> {
    let text = match input {
        Input::Button("budget_skip") => {
            params.budget = None;
            return Ok(Outcome::Answered("Skipped".to_string()));
        }
        Input::Button(_) => return Err(AnswerError::UnknownOption),
        Input::Text(text) => text,
    };
    // "2,500 USD" and "$2500" both mean 2500.
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let amount: f64 = digits.parse().map_err(|_| AnswerError::InvalidBudget)?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AnswerError::InvalidBudget);
    }
    params.budget = Some(amount);
    Ok(Outcome::Answered(format!("{amount:.0} {}", params.currency)))
}

fn accept_confirmation(_: &mut TripParameters, input: Input<'_>) -> Result<Outcome, AnswerError> {
    let confirmed = match input {
        Input::Button(payload) => payload == "confirm_yes",
        Input::Text(text) => text.trim().eq_ignore_ascii_case("yes"),
    };
    Ok(if confirmed {
        Outcome::Confirmed
    } else {
        Outcome::Declined
    })
}
