//! # dg-trainer Agent
//!
//! Turns practice constraints into a putting session:
//! 1. The caller describes constraints (minutes, putters, distances, venue)
//! 2. The request is rendered into a prompt under a fixed coaching system prompt
//! 3. The model is forced to answer through the `final_result` output tool
//! 4. The answer is parsed into a `PracticeSession` and checked against the request
//! 5. Rejected answers go back to the model with the problems listed, a bounded
//!    number of times

mod agent;
mod model;
mod output;
mod prompt;
mod validate;

pub use agent::{plan_session, AgentConfig, AgentRun, StructuredAgent, OUTPUT_TOOL};
pub use model::{Environment, PracticeConstraints, PracticeDrill, PracticeRequest, PracticeSession};
pub use output::{extract_json, OutputSchema};
pub use prompt::{build_user_prompt, PracticePrompt, SYSTEM_PROMPT};
pub use validate::{
    constraint_violations, session_violations, Violation, DEFAULT_MAX_DISTANCE_FT, MAX_DRILLS,
    MIN_DRILLS,
};
