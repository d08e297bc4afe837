//! Settlement adjudication: from rule verdicts to a final outcome.
//!
//! Precedence is an explicit ordered rule list with a short-circuit
//! evaluator: the first rule that speaks decides, the rest are never
//! consulted. A proven external-trades violation transfers the win to the
//! honest side instead of merely voiding the fight, unless that side is
//! itself below minimum volume. Only when no side cheated do the blanket
//! exclusion rules apply.

use tracing::info;

use tfc_core::{FightId, FightStatus, UserId};

use crate::engine::FightValidation;

/// Inputs to adjudication: the aggregate rule verdict plus the score-based
/// outcome computed upstream, passed through untouched when nothing
/// overrides it.
pub struct AdjudicationInput<'a> {
    pub fight_id: FightId,
    pub participants: (UserId, UserId),
    pub validation: &'a FightValidation,
    /// Winner by score, before any override.
    pub scored_winner: Option<UserId>,
    pub scored_is_draw: bool,
}

impl AdjudicationInput<'_> {
    fn opponent_of(&self, user: UserId) -> UserId {
        if self.participants.0 == user {
            self.participants.1
        } else {
            self.participants.0
        }
    }
}

/// The final settlement outcome for the fight.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementDecision {
    pub status: FightStatus,
    pub winner: Option<UserId>,
    pub is_draw: bool,
    /// The adjudication rule that decided, for logs and audits.
    pub decided_by: &'static str,
}

struct Verdict {
    status: FightStatus,
    winner: Option<UserId>,
    is_draw: bool,
}

impl Verdict {
    fn no_contest() -> Self {
        Self {
            status: FightStatus::NoContest,
            winner: None,
            is_draw: false,
        }
    }
}

struct AdjudicationRule {
    name: &'static str,
    apply: fn(&AdjudicationInput<'_>) -> Option<Verdict>,
}

/// Override rules in precedence order. When none speaks, the score-based
/// outcome passes through as FINISHED.
const ADJUDICATION_RULES: &[AdjudicationRule] = &[
    AdjudicationRule {
        name: "both-sides-cheated",
        apply: both_sides_cheated,
    },
    AdjudicationRule {
        name: "cheater-against-tainted-opponent",
        apply: cheater_against_tainted_opponent,
    },
    AdjudicationRule {
        name: "disqualify-cheater",
        apply: disqualify_cheater,
    },
    AdjudicationRule {
        name: "excluding-violations",
        apply: excluding_violations,
    },
];

fn both_sides_cheated(input: &AdjudicationInput<'_>) -> Option<Verdict> {
    (input.validation.external_violators.len() >= 2).then(Verdict::no_contest)
}

fn cheater_against_tainted_opponent(input: &AdjudicationInput<'_>) -> Option<Verdict> {
    let [cheater] = input.validation.external_violators.as_slice() else {
        return None;
    };
    let opponent = input.opponent_of(*cheater);
    input
        .validation
        .below_min_volume
        .contains(&opponent)
        .then(Verdict::no_contest)
}

fn disqualify_cheater(input: &AdjudicationInput<'_>) -> Option<Verdict> {
    let [cheater] = input.validation.external_violators.as_slice() else {
        return None;
    };
    Some(Verdict {
        status: FightStatus::Finished,
        winner: Some(input.opponent_of(*cheater)),
        is_draw: false,
    })
}

fn excluding_violations(input: &AdjudicationInput<'_>) -> Option<Verdict> {
    (!input.validation.should_count_for_ranking).then(Verdict::no_contest)
}

/// Resolve the final status and winner.
pub fn adjudicate(input: &AdjudicationInput<'_>) -> SettlementDecision {
    for rule in ADJUDICATION_RULES {
        if let Some(verdict) = (rule.apply)(input) {
            info!(
                fight_id = %input.fight_id,
                rule = rule.name,
                status = %verdict.status,
                winner = ?verdict.winner,
                "Adjudication override"
            );
            return SettlementDecision {
                status: verdict.status,
                winner: verdict.winner,
                is_draw: verdict.is_draw,
                decided_by: rule.name,
            };
        }
    }
    SettlementDecision {
        status: FightStatus::Finished,
        winner: input.scored_winner,
        is_draw: input.scored_is_draw,
        decided_by: "score-outcome",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation(
        should_count: bool,
        external: Vec<UserId>,
        below: Vec<UserId>,
    ) -> FightValidation {
        FightValidation {
            violations: Vec::new(),
            warnings: Vec::new(),
            should_count_for_ranking: should_count,
            recommended_status: if should_count {
                FightStatus::Finished
            } else {
                FightStatus::NoContest
            },
            external_violators: external,
            below_min_volume: below,
        }
    }

    fn input<'a>(
        a: UserId,
        b: UserId,
        validation: &'a FightValidation,
        scored_winner: Option<UserId>,
    ) -> AdjudicationInput<'a> {
        AdjudicationInput {
            fight_id: FightId::new(),
            participants: (a, b),
            validation,
            scored_winner,
            scored_is_draw: false,
        }
    }

    #[test]
    fn test_clean_fight_passes_scores_through() {
        let (a, b) = (UserId::new(), UserId::new());
        let v = validation(true, vec![], vec![]);

        let decision = adjudicate(&input(a, b, &v, Some(b)));
        assert_eq!(decision.status, FightStatus::Finished);
        assert_eq!(decision.winner, Some(b));
        assert_eq!(decision.decided_by, "score-outcome");
    }

    #[test]
    fn test_draw_passes_through() {
        let (a, b) = (UserId::new(), UserId::new());
        let v = validation(true, vec![], vec![]);
        let mut inp = input(a, b, &v, None);
        inp.scored_is_draw = true;

        let decision = adjudicate(&inp);
        assert_eq!(decision.status, FightStatus::Finished);
        assert!(decision.is_draw);
        assert_eq!(decision.winner, None);
    }

    #[test]
    fn test_both_cheaters_void_the_fight() {
        let (a, b) = (UserId::new(), UserId::new());
        let v = validation(true, vec![a, b], vec![]);

        let decision = adjudicate(&input(a, b, &v, Some(a)));
        assert_eq!(decision.status, FightStatus::NoContest);
        assert_eq!(decision.winner, None);
        assert_eq!(decision.decided_by, "both-sides-cheated");
    }

    #[test]
    fn test_single_cheater_transfers_the_win() {
        let (a, b) = (UserId::new(), UserId::new());
        let v = validation(true, vec![a], vec![]);

        // Score said the cheater won; the override hands it to the opponent.
        let decision = adjudicate(&input(a, b, &v, Some(a)));
        assert_eq!(decision.status, FightStatus::Finished);
        assert_eq!(decision.winner, Some(b));
        assert!(!decision.is_draw);
        assert_eq!(decision.decided_by, "disqualify-cheater");
    }

    #[test]
    fn test_cheater_with_tainted_opponent_voids() {
        let (a, b) = (UserId::new(), UserId::new());
        // A cheated, but B never traded the minimum either.
        let v = validation(true, vec![a], vec![b]);

        let decision = adjudicate(&input(a, b, &v, Some(b)));
        assert_eq!(decision.status, FightStatus::NoContest);
        assert_eq!(decision.winner, None);
        assert_eq!(decision.decided_by, "cheater-against-tainted-opponent");
    }

    #[test]
    fn test_cheater_below_volume_himself_still_loses() {
        let (a, b) = (UserId::new(), UserId::new());
        // The cheater is the low-volume side; the opponent is clean.
        let v = validation(true, vec![a], vec![a]);

        let decision = adjudicate(&input(a, b, &v, Some(a)));
        assert_eq!(decision.winner, Some(b));
        assert_eq!(decision.decided_by, "disqualify-cheater");
    }

    #[test]
    fn test_excluding_violation_voids_without_cheater() {
        let (a, b) = (UserId::new(), UserId::new());
        let v = validation(false, vec![], vec![]);

        let decision = adjudicate(&input(a, b, &v, Some(a)));
        assert_eq!(decision.status, FightStatus::NoContest);
        assert_eq!(decision.winner, None);
        assert_eq!(decision.decided_by, "excluding-violations");
    }

    #[test]
    fn test_disqualification_outranks_exclusion() {
        let (a, b) = (UserId::new(), UserId::new());
        // Excluding rules fired too, but the cheat override comes first.
        let v = validation(false, vec![a], vec![]);

        let decision = adjudicate(&input(a, b, &v, None));
        assert_eq!(decision.status, FightStatus::Finished);
        assert_eq!(decision.winner, Some(b));
    }
}
