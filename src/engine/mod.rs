//! Game session engine: per-game loops, their supervisor, and the
//! challenge listener feeding it.

mod challenges;
mod session_loop;
mod supervisor;

pub use challenges::{ChallengeDecision, ChallengeListener, ListenReport};
pub use session_loop::{Action, SessionEnd, SessionLoop, SessionSummary, Tick};
pub use supervisor::{Supervisor, SupervisorControl};
