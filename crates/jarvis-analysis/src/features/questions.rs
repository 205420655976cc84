//! Quick-log questions asked at a given hour of the day.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    /// Value submitted back in the log's `data`.
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextualQuestion {
    /// Key under which the answer is submitted.
    pub key: &'static str,
    pub prompt: &'static str,
    pub options: Vec<AnswerOption>,
}

const fn opt(value: &'static str, label: &'static str) -> AnswerOption {
    AnswerOption { value, label }
}

fn levels() -> Vec<AnswerOption> {
    vec![
        opt("very-low", "Very low"),
        opt("low", "Low"),
        opt("medium", "Medium"),
        opt("high", "High"),
        opt("very-high", "Very high"),
    ]
}

fn question(key: &'static str, prompt: &'static str, options: Vec<AnswerOption>) -> ContextualQuestion {
    ContextualQuestion { key, prompt, options }
}

/// Morning asks about energy and sleep, afternoon about focus and stress,
/// evening about workouts and remaining energy.
pub fn contextual_questions(hour: u32) -> Vec<ContextualQuestion> {
    if hour < 12 {
        vec![
            question("energy", "How's your energy this morning?", levels()),
            question(
                "sleep",
                "How did you sleep?",
                vec![
                    opt("good", "Good"),
                    opt("okay", "Okay"),
                    opt("restless", "Restless"),
                    opt("poor", "Poor"),
                ],
            ),
        ]
    } else if hour < 17 {
        vec![
            question("focus", "How's your focus right now?", levels()),
            question("stress", "How stressed are you feeling?", levels()),
        ]
    } else {
        vec![
            question(
                "workout",
                "Did you move today?",
                vec![
                    opt("full", "Full workout"),
                    opt("light", "Light exercise"),
                    opt("movement", "Just movement"),
                    opt("rest", "Rest day"),
                ],
            ),
            question(
                "energy-evening",
                "How much energy is left in the tank?",
                vec![
                    opt("empty", "Empty"),
                    opt("low", "Low"),
                    opt("medium", "Medium"),
                    opt("high", "High"),
                ],
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::mapping::map_entry;
    use chrono::Utc;
    use jarvis_core::types::{LogEntry, LogKind};

    #[test]
    fn questions_follow_the_clock() {
        let keys = |h| contextual_questions(h).iter().map(|q| q.key).collect::<Vec<_>>();
        assert_eq!(keys(7), ["energy", "sleep"]);
        assert_eq!(keys(12), ["focus", "stress"]);
        assert_eq!(keys(16), ["focus", "stress"]);
        assert_eq!(keys(17), ["workout", "energy-evening"]);
    }

    #[test]
    fn every_offered_answer_maps() {
        for hour in [8, 14, 20] {
            for q in contextual_questions(hour) {
                for option in &q.options {
                    let mut fields = serde_json::Map::new();
                    fields.insert(q.key.to_string(), option.value.into());
                    let entry = LogEntry {
                        id: "q".into(),
                        user_id: "u".into(),
                        kind: LogKind::QuickLog,
                        timestamp: Utc::now(),
                        dimension_hints: Default::default(),
                        fields,
                    };
                    assert!(map_entry(&entry).is_ok(), "{} = {}", q.key, option.value);
                }
            }
        }
    }
}
