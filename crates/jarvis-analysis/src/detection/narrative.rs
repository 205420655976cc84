//! User-facing wording for detected patterns.

use chrono::NaiveDate;
use jarvis_core::types::{ConditionSide, EvidencePoint, Signal};

#[derive(Debug, Clone, PartialEq)]
pub struct Narrative {
    pub title: String,
    pub pattern_text: String,
    pub why_it_matters: String,
    pub suggestion: Option<String>,
}

/// What the pattern describes, in signal terms.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeInput {
    pub trigger: Signal,
    pub condition: ConditionSide,
    pub outcome: Signal,
    pub lag_days: u8,
    /// +1 when the outcome rises under the condition, -1 when it falls.
    pub direction: f64,
    pub favourable: bool,
    pub outcome_on_condition: f64,
    pub outcome_otherwise: f64,
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// "high stress", "rest days", "short sleep".
fn condition_phrase(trigger: Signal, side: ConditionSide) -> String {
    match (trigger, side) {
        (Signal::Workout, ConditionSide::High) => "workout days".into(),
        (Signal::Workout, ConditionSide::Low) => "rest days".into(),
        (Signal::SleepHours, ConditionSide::High) => "long sleep".into(),
        (Signal::SleepHours, ConditionSide::Low) => "short sleep".into(),
        (Signal::Meetings, ConditionSide::High) => "meeting-heavy days".into(),
        (Signal::Meetings, ConditionSide::Low) => "light meeting days".into(),
        (other, side) => format!("{} {}", side.name(), other.label()),
    }
}

fn on_condition(trigger: Signal, side: ConditionSide) -> String {
    match trigger {
        Signal::Workout | Signal::Meetings => format!("on {}", condition_phrase(trigger, side)),
        _ => format!("on days with {}", condition_phrase(trigger, side)),
    }
}

/// "less sleep", "fewer workouts", "higher stress".
fn change_phrase(outcome: Signal, direction: f64) -> String {
    let up = direction > 0.0;
    let phrase = match outcome {
        Signal::SleepHours => if up { "more sleep" } else { "less sleep" },
        Signal::Workout => if up { "more workouts" } else { "fewer workouts" },
        Signal::Meetings => if up { "more meetings" } else { "fewer meetings" },
        other => {
            return format!("{} {}", if up { "higher" } else { "lower" }, other.label());
        }
    };
    phrase.to_string()
}

fn timing(lag_days: u8) -> String {
    match lag_days {
        0 => "the same day".into(),
        1 => "the next day".into(),
        n => format!("{n} days later"),
    }
}

fn evidence_suffix(lag_days: u8) -> String {
    match lag_days {
        0 => String::new(),
        1 => " next day".into(),
        n => format!(" {n} days later"),
    }
}

fn why_it_matters(outcome: Signal) -> &'static str {
    match outcome {
        Signal::SleepHours => {
            "Sleep is when your body and mind recover; short nights ripple into energy, focus and mood."
        }
        Signal::Energy | Signal::EnergyEvening => {
            "Energy sets how much you can take on, and low-energy stretches tend to compound."
        }
        Signal::Focus => "Focus determines how much of your day turns into meaningful work.",
        Signal::Stress => "Sustained stress wears down sleep, health and relationships.",
        Signal::Workout => "Regular movement is one of the strongest levers on energy and mood.",
        Signal::Meetings => "Meeting load eats into recovery and deep work time.",
        Signal::Mood | Signal::OverallMood => {
            "Mood colours everything else, and spotting what moves it gives you a lever."
        }
    }
}

fn suggestion(input: &NarrativeInput) -> String {
    let condition = condition_phrase(input.trigger, input.condition);
    if input.favourable {
        return format!(
            "Keep making room for {condition}; it shows up in your {}.",
            input.outcome.label()
        );
    }
    match input.trigger {
        Signal::Stress => "On high-stress days, try a 10-minute wind-down before bed.".into(),
        Signal::SleepHours => "Aim for a consistent bedtime to protect your sleep.".into(),
        Signal::Workout => "Even a short walk on rest days can help.".into(),
        Signal::Meetings => "Block out focus time on meeting-heavy days.".into(),
        Signal::Energy | Signal::EnergyEvening => {
            "Plan lighter commitments when your energy runs low.".into()
        }
        Signal::Focus => "Break deep work into shorter blocks when focus dips.".into(),
        Signal::Mood | Signal::OverallMood => {
            format!("Watch for {condition} and plan something small that lifts you.")
        }
    }
}

pub fn narrate(input: &NarrativeInput) -> Narrative {
    let title = format!(
        "{} → {}",
        capitalize(&condition_phrase(input.trigger, input.condition)),
        change_phrase(input.outcome, input.direction)
    );
    let pattern_text = format!(
        "{}, you tend to see {} {}: {} versus {} otherwise.",
        capitalize(&on_condition(input.trigger, input.condition)),
        change_phrase(input.outcome, input.direction),
        timing(input.lag_days),
        input.outcome.format_value(input.outcome_on_condition),
        input.outcome.format_value(input.outcome_otherwise),
    );
    Narrative {
        title,
        pattern_text,
        why_it_matters: why_it_matters(input.outcome).to_string(),
        suggestion: Some(suggestion(input)),
    }
}

/// "Oct 22: High stress → 5.5h sleep next day"
pub fn evidence_line(trigger: Signal, outcome: Signal, lag_days: u8, point: &EvidencePoint) -> String {
    format!(
        "{}: {} → {}{}",
        short_date(point.trigger_date),
        capitalize(&trigger.format_value(point.trigger_value)),
        outcome.format_value(point.outcome_value),
        evidence_suffix(lag_days)
    )
}

fn short_date(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}
