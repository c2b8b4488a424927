//! Practice requests and the sessions returned for them.

use dgtrainer_error::{Error, Result};
use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

// ============================================================================
// Request side
// ============================================================================

/// Where the practice happens. Request files accept any case, like the flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Indoor,
    Outdoor,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Indoor => "indoor",
            Environment::Outdoor => "outdoor",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|e: Error| de::Error::custom(e.message()))
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "indoor" => Ok(Environment::Indoor),
            "outdoor" => Ok(Environment::Outdoor),
            other => Err(Error::invalid_argument(format!(
                "unknown environment '{}', expected indoor or outdoor",
                other
            ))),
        }
    }
}

/// The constraints bounding one practice session.
///
/// `distances` in feet, in the order given; empty means the coach picks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PracticeConstraints {
    pub minutes: u32,
    pub putters: u32,
    pub distances: Vec<u32>,
    #[serde(default)]
    pub environment: Environment,
}

impl PracticeConstraints {
    pub fn new(minutes: u32, putters: u32, distances: Vec<u32>) -> Self {
        Self {
            minutes,
            putters,
            distances,
            environment: Environment::default(),
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Reject requests no session can satisfy: zero minutes, putters or distances.
    pub fn check(&self) -> Result<()> {
        let problem = if self.minutes == 0 {
            Some("minutes must be at least 1".to_string())
        } else if self.putters == 0 {
            Some("putters must be at least 1".to_string())
        } else if self.distances.contains(&0) {
            Some("distances must be at least 1 ft".to_string())
        } else {
            None
        };

        match problem {
            Some(message) => Err(Error::invalid_argument(message)
                .with_operation("request::check")
                .with_context("minutes", self.minutes.to_string())
                .with_context("putters", self.putters.to_string())),
            None => Ok(()),
        }
    }
}

/// Ten minutes, one putter, coach's choice of distances, indoors.
impl Default for PracticeConstraints {
    fn default() -> Self {
        Self::new(10, 1, Vec::new())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PracticeRequest {
    pub constraints: PracticeConstraints,
}

impl PracticeRequest {
    pub fn new(constraints: PracticeConstraints) -> Self {
        Self { constraints }
    }

    /// Parse a request from JSON such as
    /// `{"constraints": {"minutes": 10, "putters": 3, "distances": [15, 20]}}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let request: Self = serde_json::from_str(json).map_err(|e| {
            Error::parse_failed(format!("invalid practice request: {}", e))
                .with_operation("request::from_json")
                .set_source(e)
        })?;
        request.constraints.check()?;
        Ok(request)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e)
                .with_operation("request::from_file")
                .with_context("path", path.display().to_string())
        })?;
        Self::from_json_str(&json).map_err(|e| e.with_context("path", path.display().to_string()))
    }
}

// ============================================================================
// Response side
// ============================================================================

/// One timed putting exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PracticeDrill {
    /// The name of the drill.
    pub name: String,
    /// The minutes of the drill.
    #[schemars(range(min = 1))]
    pub minutes: u32,
    /// The distance of the drill.
    #[schemars(range(min = 1))]
    pub distance: u32,
    /// The number of reps of the drill.
    #[schemars(range(min = 1))]
    pub reps: u32,
    /// The instructions of the drill.
    pub instructions: String,
}

impl fmt::Display for PracticeDrill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} min, {} ft, {} reps)",
            self.name, self.minutes, self.distance, self.reps
        )
    }
}

/// A complete practice plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PracticeSession {
    /// The total minutes of the practice session.
    #[schemars(range(min = 1))]
    pub total_minutes: u32,
    /// The focus of the practice session.
    pub focus: String,
    /// The drills, in the order they should be run.
    #[schemars(length(min = 2, max = 5))]
    pub drills: Vec<PracticeDrill>,
}

impl PracticeSession {
    /// Sum of the drill minutes
    pub fn planned_minutes(&self) -> u64 {
        self.drills.iter().map(|d| u64::from(d.minutes)).sum()
    }
}

impl fmt::Display for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Focus: {}", self.focus)?;
        writeln!(f, "Total: {} min, {} drills", self.total_minutes, self.drills.len())?;

        for (i, drill) in self.drills.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "{}. {}", i + 1, drill)?;
            for line in drill.instructions.lines() {
                writeln!(f, "   {}", line)?;
            }
        }

        Ok(())
    }
}
