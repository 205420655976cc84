//! Daily signals derived from log answers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::dimension::Dimension;

/// Whether a higher value of a signal is good or bad news.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HigherIsBetter,
    HigherIsWorse,
}

/// Continuous signals use Pearson correlation; binary ones point-biserial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Continuous,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Morning (or quick-check) mood, 1-5.
    Mood,
    /// End-of-day overall mood, 1-5.
    OverallMood,
    /// Morning energy level, 1-5.
    Energy,
    /// Evening energy level, 1-5.
    EnergyEvening,
    /// Hours slept.
    SleepHours,
    /// Afternoon focus level, 1-5.
    Focus,
    /// Stress level, 1-5.
    Stress,
    /// Whether a workout happened, 0 or 1.
    Workout,
    /// Number of meetings.
    Meetings,
}

impl Signal {
    pub const ALL: [Signal; 9] = [
        Self::Mood,
        Self::OverallMood,
        Self::Energy,
        Self::EnergyEvening,
        Self::SleepHours,
        Self::Focus,
        Self::Stress,
        Self::Workout,
        Self::Meetings,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mood => "mood",
            Self::OverallMood => "overall_mood",
            Self::Energy => "energy",
            Self::EnergyEvening => "energy_evening",
            Self::SleepHours => "sleep_hours",
            Self::Focus => "focus",
            Self::Stress => "stress",
            Self::Workout => "workout",
            Self::Meetings => "meetings",
        }
    }

    /// Human-readable noun used in titles and evidence.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mood => "mood",
            Self::OverallMood => "end-of-day mood",
            Self::Energy => "morning energy",
            Self::EnergyEvening => "evening energy",
            Self::SleepHours => "sleep",
            Self::Focus => "focus",
            Self::Stress => "stress",
            Self::Workout => "workouts",
            Self::Meetings => "meeting load",
        }
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            Self::SleepHours | Self::Energy | Self::EnergyEvening | Self::Workout => {
                Dimension::Physical
            }
            Self::Focus | Self::Stress | Self::Meetings => Dimension::Mental,
            Self::Mood | Self::OverallMood => Dimension::Spiritual,
        }
    }

    pub fn polarity(&self) -> Polarity {
        match self {
            Self::Stress | Self::Meetings => Polarity::HigherIsWorse,
            _ => Polarity::HigherIsBetter,
        }
    }

    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Workout => SignalKind::Binary,
            _ => SignalKind::Continuous,
        }
    }

    /// Inclusive value range accepted during ingestion.
    pub fn range(&self) -> (f64, f64) {
        match self {
            Self::SleepHours => (0.0, 16.0),
            Self::Workout => (0.0, 1.0),
            Self::Meetings => (0.0, 12.0),
            _ => (1.0, 5.0),
        }
    }

    /// Map a raw value onto [0, 1] where 1 is always "good".
    pub fn normalize(&self, value: f64) -> f64 {
        let (lo, hi) = match self {
            // Beyond nine hours sleep stops counting as better.
            Self::SleepHours => (4.0, 9.0),
            Self::Meetings => (0.0, 8.0),
            other => other.range(),
        };
        let unit = ((value - lo) / (hi - lo)).clamp(0.0, 1.0);
        match self.polarity() {
            Polarity::HigherIsBetter => unit,
            Polarity::HigherIsWorse => 1.0 - unit,
        }
    }

    /// Render a raw value for evidence strings.
    pub fn format_value(&self, value: f64) -> String {
        match self {
            Self::SleepHours => format!("{}h sleep", trim_float(value)),
            Self::Workout => {
                if value >= 0.5 {
                    "worked out".to_string()
                } else {
                    "rest day".to_string()
                }
            }
            Self::Meetings => format!("{} meetings", trim_float(value)),
            Self::Mood | Self::OverallMood => format!("{} {}/5", self.label(), trim_float(value)),
            other => format!("{} {}", level_word(value), other.label()),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn level_word(value: f64) -> &'static str {
    if value >= 4.5 {
        "very high"
    } else if value >= 3.5 {
        "high"
    } else if value >= 2.5 {
        "moderate"
    } else if value >= 1.5 {
        "low"
    } else {
        "very low"
    }
}

fn trim_float(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded:.1}")
    }
}
