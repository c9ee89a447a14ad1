//! Offline review of recorded decisions.

use crate::ledger::Ledger;
use crate::oracle::MoveOracle;
use tracing::{debug, info, instrument};

/// A recorded move the oracle would now play differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disagreement {
    /// Opponent the game was played against.
    pub opponent: String,
    /// Position of the decision.
    pub position: String,
    /// Move that was played.
    pub played: String,
    /// Move the oracle suggests now.
    pub suggested: String,
}

/// Counts from a review pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewReport {
    /// Entries examined.
    pub reviewed: usize,
    /// Entries the oracle had no answer for.
    pub unanswered: usize,
    /// Entries where the oracle now prefers another move.
    pub disagreements: Vec<Disagreement>,
}

/// Re-asks the oracle about every ledger entry.
#[instrument(skip_all, fields(opponents = ledger.len()))]
pub async fn review_ledger<O: MoveOracle>(ledger: &Ledger, oracle: &O) -> ReviewReport {
    let mut report = ReviewReport::default();

    for (opponent, entries) in ledger {
        for entry in entries {
            report.reviewed += 1;
            match oracle.suggest_move(&entry.position).await {
                None => report.unanswered += 1,
                Some(suggested) if suggested.as_str() != entry.chosen_move => {
                    info!(
                        opponent = %opponent,
                        played = %entry.chosen_move,
                        suggested = %suggested,
                        "Oracle now prefers a different move"
                    );
                    report.disagreements.push(Disagreement {
                        opponent: opponent.clone(),
                        position: entry.position.clone(),
                        played: entry.chosen_move.clone(),
                        suggested: suggested.to_string(),
                    });
                }
                Some(_) => debug!(opponent = %opponent, "Recorded move confirmed"),
            }
        }
    }

    info!(
        reviewed = report.reviewed,
        unanswered = report.unanswered,
        disagreements = report.disagreements.len(),
        "Review finished"
    );
    report
}
