//! Post-hoc checks on sessions returned by the model.
//!
//! The system prompt asks for these rules in prose; nothing guarantees the
//! model follows them, so every session is checked before it is accepted.

use crate::model::{PracticeConstraints, PracticeSession};
use crate::output::OutputSchema;
use std::fmt;

pub const MIN_DRILLS: usize = 2;
pub const MAX_DRILLS: usize = 5;

/// Distance ceiling when the request does not list distances
pub const DEFAULT_MAX_DISTANCE_FT: u32 = 35;

/// A rule a session breaks. Drill indices are 1-based, as shown to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    DrillCount { count: usize },
    ZeroTotalMinutes,
    EmptyFocus,
    EmptyName { drill: usize },
    EmptyInstructions { drill: usize },
    ZeroValue { drill: usize, field: &'static str },
    DrillMinutesExceedTotal { planned: u64, total: u32 },
    TotalExceedsRequest { total: u32, requested: u32 },
    DistanceNotListed { drill: usize, distance: u32, allowed: Vec<u32> },
    DistanceTooFar { drill: usize, distance: u32, max: u32 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::DrillCount { count } => write!(
                f,
                "drills: expected {} to {} drills, got {}",
                MIN_DRILLS, MAX_DRILLS, count
            ),
            Violation::ZeroTotalMinutes => write!(f, "total_minutes: must be at least 1"),
            Violation::EmptyFocus => write!(f, "focus: must not be empty"),
            Violation::EmptyName { drill } => write!(f, "drill {}: name must not be empty", drill),
            Violation::EmptyInstructions { drill } => {
                write!(f, "drill {}: instructions must not be empty", drill)
            }
            Violation::ZeroValue { drill, field } => {
                write!(f, "drill {}: {} must be at least 1", drill, field)
            }
            Violation::DrillMinutesExceedTotal { planned, total } => write!(
                f,
                "drill minutes add up to {}, more than total_minutes {}",
                planned, total
            ),
            Violation::TotalExceedsRequest { total, requested } => write!(
                f,
                "total_minutes {} exceeds the requested {} minutes",
                total, requested
            ),
            Violation::DistanceNotListed { drill, distance, allowed } => {
                let allowed: Vec<String> = allowed.iter().map(|d| d.to_string()).collect();
                write!(
                    f,
                    "drill {}: distance {}ft is not one of the requested distances ({})",
                    drill,
                    distance,
                    allowed.join(", ")
                )
            }
            Violation::DistanceTooFar { drill, distance, max } => write!(
                f,
                "drill {}: distance {}ft is over the {}ft default limit",
                drill, distance, max
            ),
        }
    }
}

/// Rules every session must satisfy on its own.
pub fn session_violations(session: &PracticeSession) -> Vec<Violation> {
    let mut violations = Vec::new();

    let count = session.drills.len();
    if !(MIN_DRILLS..=MAX_DRILLS).contains(&count) {
        violations.push(Violation::DrillCount { count });
    }
    if session.total_minutes == 0 {
        violations.push(Violation::ZeroTotalMinutes);
    }
    if session.focus.trim().is_empty() {
        violations.push(Violation::EmptyFocus);
    }

    for (i, drill) in session.drills.iter().enumerate() {
        let n = i + 1;
        if drill.name.trim().is_empty() {
            violations.push(Violation::EmptyName { drill: n });
        }
        if drill.instructions.trim().is_empty() {
            violations.push(Violation::EmptyInstructions { drill: n });
        }
        for (field, value) in [
            ("minutes", drill.minutes),
            ("distance", drill.distance),
            ("reps", drill.reps),
        ] {
            if value == 0 {
                violations.push(Violation::ZeroValue { drill: n, field });
            }
        }
    }

    let planned = session.planned_minutes();
    if planned > u64::from(session.total_minutes) {
        violations.push(Violation::DrillMinutesExceedTotal {
            planned,
            total: session.total_minutes,
        });
    }

    violations
}

impl OutputSchema for PracticeSession {
    const TOOL_DESCRIPTION: &'static str = "Return the practice session. This ends the conversation.";

    fn validate(&self) -> Vec<String> {
        session_violations(self).iter().map(|v| v.to_string()).collect()
    }
}

/// Rules that depend on what was asked for.
pub fn constraint_violations(
    session: &PracticeSession,
    constraints: &PracticeConstraints,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    if session.total_minutes > constraints.minutes {
        violations.push(Violation::TotalExceedsRequest {
            total: session.total_minutes,
            requested: constraints.minutes,
        });
    }

    for (i, drill) in session.drills.iter().enumerate() {
        if constraints.distances.is_empty() {
            if drill.distance > DEFAULT_MAX_DISTANCE_FT {
                violations.push(Violation::DistanceTooFar {
                    drill: i + 1,
                    distance: drill.distance,
                    max: DEFAULT_MAX_DISTANCE_FT,
                });
            }
        } else if !constraints.distances.contains(&drill.distance) {
            violations.push(Violation::DistanceNotListed {
                drill: i + 1,
                distance: drill.distance,
                allowed: constraints.distances.clone(),
            });
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PracticeDrill;

    fn drill(minutes: u32, distance: u32) -> PracticeDrill {
        PracticeDrill {
            name: format!("{}ft ladder", distance),
            minutes,
            distance,
            reps: 12,
            instructions: "Three putts per station, score 1 per make.".into(),
        }
    }

    fn session(drills: Vec<PracticeDrill>) -> PracticeSession {
        PracticeSession {
            total_minutes: 10,
            focus: "Circle 1 confidence".into(),
            drills,
        }
    }

    #[test]
    fn test_valid_session() {
        let s = session(vec![drill(4, 15), drill(3, 20), drill(3, 30)]);
        assert!(session_violations(&s).is_empty());

        let constraints = PracticeConstraints::new(10, 10, vec![15, 20, 30]);
        assert!(constraint_violations(&s, &constraints).is_empty());
    }

    #[test]
    fn test_drill_count_bounds() {
        let one = session(vec![drill(5, 15)]);
        assert_eq!(session_violations(&one), vec![Violation::DrillCount { count: 1 }]);

        let six = session((0..6).map(|_| drill(1, 15)).collect());
        let violations = session_violations(&six);
        assert_eq!(violations, vec![Violation::DrillCount { count: 6 }]);
        assert_eq!(violations[0].to_string(), "drills: expected 2 to 5 drills, got 6");
    }

    #[test]
    fn test_field_level_problems() {
        let mut bad = drill(0, 15);
        bad.name = "  ".into();
        bad.instructions = String::new();
        bad.reps = 0;
        let mut s = session(vec![bad, drill(2, 20)]);
        s.focus = String::new();

        let violations = session_violations(&s);
        assert!(violations.contains(&Violation::EmptyFocus));
        assert!(violations.contains(&Violation::EmptyName { drill: 1 }));
        assert!(violations.contains(&Violation::EmptyInstructions { drill: 1 }));
        assert!(violations.contains(&Violation::ZeroValue { drill: 1, field: "minutes" }));
        assert!(violations.contains(&Violation::ZeroValue { drill: 1, field: "reps" }));
    }

    #[test]
    fn test_output_validate_lists_problems() {
        let s = session((0..6).map(|_| drill(1, 15)).collect());
        assert_eq!(s.validate(), vec!["drills: expected 2 to 5 drills, got 6".to_string()]);
    }

    #[test]
    fn test_drill_minutes_over_total() {
        let s = session(vec![drill(6, 15), drill(6, 20)]);
        assert_eq!(
            session_violations(&s),
            vec![Violation::DrillMinutesExceedTotal { planned: 12, total: 10 }]
        );
    }

    #[test]
    fn test_total_over_request() {
        let mut s = session(vec![drill(5, 15), drill(5, 20)]);
        s.total_minutes = 15;
        let constraints = PracticeConstraints::new(10, 4, vec![15, 20]);
        assert_eq!(
            constraint_violations(&s, &constraints),
            vec![Violation::TotalExceedsRequest { total: 15, requested: 10 }]
        );
    }

    #[test]
    fn test_distance_must_come_from_list() {
        let s = session(vec![drill(5, 15), drill(5, 25)]);
        let constraints = PracticeConstraints::new(10, 10, vec![15, 20, 30]);
        let violations = constraint_violations(&s, &constraints);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].to_string(),
            "drill 2: distance 25ft is not one of the requested distances (15, 20, 30)"
        );
    }

    #[test]
    fn test_default_distance_ceiling() {
        let s = session(vec![drill(5, 35), drill(5, 40)]);
        let constraints = PracticeConstraints::new(10, 1, vec![]);
        assert_eq!(
            constraint_violations(&s, &constraints),
            vec![Violation::DistanceTooFar { drill: 2, distance: 40, max: 35 }]
        );
    }
}
