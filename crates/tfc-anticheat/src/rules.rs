//! The five settlement rules.
//!
//! Each rule inspects the fight evidence and returns a [`RuleOutcome`],
//! pass or fail, with enough metadata to audit the decision later. The
//! pure rules live here; the two that need pair history (repeated matchup,
//! same IP) run through the engine, which owns the store handle.

use std::collections::HashMap;
use std::net::IpAddr;

use rust_decimal::Decimal;
use serde_json::json;

use tfc_core::{
    Fight, FightParticipant, FightSession, FightTrade, RuleCode, UserId,
};

/// One rule's verdict over a fight.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub passed: bool,
    pub rule_code: RuleCode,
    pub rule_name: &'static str,
    pub message: String,
    pub metadata: serde_json::Value,
}

impl RuleOutcome {
    fn pass(rule_code: RuleCode, rule_name: &'static str) -> Self {
        Self {
            passed: true,
            rule_code,
            rule_name,
            message: String::new(),
            metadata: serde_json::Value::Null,
        }
    }

    fn fail(
        rule_code: RuleCode,
        rule_name: &'static str,
        message: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            passed: false,
            rule_code,
            rule_name,
            message: message.into(),
            metadata,
        }
    }
}

/// Everything a rule may look at, gathered once per settlement.
///
/// `scores` carries the final USDC score per participant as computed by the
/// scoring engine this settlement run; participants' own `final_score`
/// fields are only persisted afterwards.
pub struct FightEvidence<'a> {
    pub fight: &'a Fight,
    pub participants: &'a [FightParticipant],
    pub trades: &'a [FightTrade],
    pub sessions: &'a [FightSession],
    pub scores: &'a HashMap<UserId, Decimal>,
}

impl FightEvidence<'_> {
    fn score_of(&self, user_id: UserId) -> Decimal {
        self.scores.get(&user_id).copied().unwrap_or(Decimal::ZERO)
    }

    fn trades_of(&self, user_id: UserId) -> usize {
        self.trades.iter().filter(|t| t.user_id == user_id).count()
    }
}

/// Total notional each participant traded (sum of amount * price).
pub fn notional_volumes(evidence: &FightEvidence<'_>) -> HashMap<UserId, Decimal> {
    let mut volumes: HashMap<UserId, Decimal> = evidence
        .participants
        .iter()
        .map(|p| (p.user_id, Decimal::ZERO))
        .collect();
    for trade in evidence.trades {
        *volumes.entry(trade.user_id).or_default() += trade.notional();
    }
    volumes
}

/// Participants whose traded notional is below the minimum.
pub fn below_min_volume(evidence: &FightEvidence<'_>, min_volume: Decimal) -> Vec<UserId> {
    let volumes = notional_volumes(evidence);
    let mut below: Vec<UserId> = evidence
        .participants
        .iter()
        .filter(|p| volumes.get(&p.user_id).copied().unwrap_or(Decimal::ZERO) < min_volume)
        .map(|p| p.user_id)
        .collect();
    below.sort();
    below
}

/// Participants stamped with the external-trades flag.
pub fn external_violators(participants: &[FightParticipant]) -> Vec<UserId> {
    let mut violators: Vec<UserId> = participants
        .iter()
        .filter(|p| p.external_trades_detected)
        .map(|p| p.user_id)
        .collect();
    violators.sort();
    violators
}

/// IPs that appear in both participants' session records for this fight.
pub fn shared_ips(sessions: &[FightSession], a: UserId, b: UserId) -> Vec<IpAddr> {
    let ips_of = |user: UserId| -> Vec<IpAddr> {
        sessions
            .iter()
            .filter(|s| s.user_id == user)
            .map(|s| s.ip)
            .collect()
    };
    let b_ips = ips_of(b);
    let mut shared: Vec<IpAddr> = ips_of(a)
        .into_iter()
        .filter(|ip| b_ips.contains(ip))
        .collect();
    shared.sort();
    shared.dedup();
    shared
}

// ============================================================================
// Pure rules
// ============================================================================

/// ZERO_ZERO: both scores flat, or neither side traded. A no-op fight.
pub fn check_zero_zero(evidence: &FightEvidence<'_>, threshold: Decimal) -> RuleOutcome {
    let [a, b] = evidence.participants else {
        return RuleOutcome::pass(RuleCode::ZeroZero, ZERO_ZERO_NAME);
    };
    let (score_a, score_b) = (evidence.score_of(a.user_id), evidence.score_of(b.user_id));
    let (trades_a, trades_b) = (evidence.trades_of(a.user_id), evidence.trades_of(b.user_id));

    let both_flat = score_a.abs() <= threshold && score_b.abs() <= threshold;
    let both_idle = trades_a == 0 && trades_b == 0;

    if both_flat || both_idle {
        RuleOutcome::fail(
            RuleCode::ZeroZero,
            ZERO_ZERO_NAME,
            "both participants ended flat",
            json!({
                "scoreA": score_a,
                "scoreB": score_b,
                "tradesA": trades_a,
                "tradesB": trades_b,
                "threshold": threshold,
            }),
        )
    } else {
        RuleOutcome::pass(RuleCode::ZeroZero, ZERO_ZERO_NAME)
    }
}

/// MIN_VOLUME: every participant must trade at least the minimum notional.
pub fn check_min_volume(evidence: &FightEvidence<'_>, min_volume: Decimal) -> RuleOutcome {
    let below = below_min_volume(evidence, min_volume);
    if below.is_empty() {
        return RuleOutcome::pass(RuleCode::MinVolume, MIN_VOLUME_NAME);
    }
    let volumes = notional_volumes(evidence);
    RuleOutcome::fail(
        RuleCode::MinVolume,
        MIN_VOLUME_NAME,
        format!("{} participant(s) below {} USDC volume", below.len(), min_volume),
        json!({
            "belowMinimum": below,
            "minVolume": min_volume,
            "volumes": volumes
                .iter()
                .map(|(user, vol)| (user.to_string(), *vol))
                .collect::<HashMap<String, Decimal>>(),
        }),
    )
}

/// EXTERNAL_TRADES: the upstream fill matcher stamped fills outside the
/// fight window on a participant.
pub fn check_external_trades(participants: &[FightParticipant]) -> RuleOutcome {
    let violators = external_violators(participants);
    if violators.is_empty() {
        return RuleOutcome::pass(RuleCode::ExternalTrades, EXTERNAL_TRADES_NAME);
    }
    let trade_ids: Vec<&str> = participants
        .iter()
        .filter(|p| p.external_trades_detected)
        .flat_map(|p| p.external_trade_ids.iter().map(String::as_str))
        .collect();
    RuleOutcome::fail(
        RuleCode::ExternalTrades,
        EXTERNAL_TRADES_NAME,
        format!("external trades detected for {} participant(s)", violators.len()),
        json!({
            "violators": violators,
            "tradeIds": trade_ids,
        }),
    )
}

pub(crate) const ZERO_ZERO_NAME: &str = "Zero-Zero Fight";
pub(crate) const MIN_VOLUME_NAME: &str = "Minimum Volume";
pub(crate) const REPEATED_MATCHUP_NAME: &str = "Repeated Matchup";
pub(crate) const SAME_IP_NAME: &str = "Same IP Pattern";
pub(crate) const EXTERNAL_TRADES_NAME: &str = "External Trades";

/// Builds the repeated-matchup outcome from a completed-pair count.
pub(crate) fn repeated_matchup_outcome(
    completed_others: u32,
    max_matchups: u32,
    window_hours: i64,
) -> RuleOutcome {
    // Counting the current fight, the pair hits the configured max.
    if completed_others + 1 >= max_matchups {
        RuleOutcome::fail(
            RuleCode::RepeatedMatchup,
            REPEATED_MATCHUP_NAME,
            format!(
                "pair fought {} times in {} h (max {})",
                completed_others + 1,
                window_hours,
                max_matchups
            ),
            json!({
                "completedOthers": completed_others,
                "maxMatchups": max_matchups,
                "windowHours": window_hours,
            }),
        )
    } else {
        RuleOutcome::pass(RuleCode::RepeatedMatchup, REPEATED_MATCHUP_NAME)
    }
}

/// Same-IP rule verdict. Flagged is a pass with a warning attached.
#[derive(Debug, Clone)]
pub enum SameIpFinding {
    Clean,
    Flagged(RuleOutcome),
    Excluded(RuleOutcome),
}

/// Builds the same-IP finding from the shared IPs and the prior-matchup
/// count on those IPs.
pub(crate) fn same_ip_finding(
    shared: &[IpAddr],
    prior_matchups: u32,
    exclusion_threshold: u32,
) -> SameIpFinding {
    if shared.is_empty() {
        return SameIpFinding::Clean;
    }
    let shared_repr: Vec<String> = shared.iter().map(IpAddr::to_string).collect();
    let metadata = json!({
        "sharedIps": shared_repr,
        "priorMatchups": prior_matchups,
        "exclusionThreshold": exclusion_threshold,
    });
    if prior_matchups >= exclusion_threshold {
        SameIpFinding::Excluded(RuleOutcome::fail(
            RuleCode::SameIpPattern,
            SAME_IP_NAME,
            format!(
                "{} prior matchup(s) from shared IP(s), threshold {}",
                prior_matchups, exclusion_threshold
            ),
            metadata,
        ))
    } else {
        let mut outcome = RuleOutcome::pass(RuleCode::SameIpPattern, SAME_IP_NAME);
        outcome.message = "participants shared an IP, below exclusion threshold".to_string();
        outcome.metadata = metadata;
        SameIpFinding::Flagged(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tfc_core::{AccountId, Amount, FightId, FightSlot, Price, SessionKind, Side, Symbol};

    fn fight_pair() -> (Fight, FightParticipant, FightParticipant) {
        let creator = UserId::new();
        let opponent = UserId::new();
        let fight = Fight::new(creator, 15, dec!(100)).unwrap();
        let a = FightParticipant::new(fight.id, creator, AccountId::from("0xaaa"), FightSlot::A);
        let b = FightParticipant::new(fight.id, opponent, AccountId::from("0xbbb"), FightSlot::B);
        (fight, a, b)
    }

    fn trade(fight_id: FightId, user_id: UserId, amount: Decimal, price: Decimal) -> FightTrade {
        FightTrade::new(
            fight_id,
            user_id,
            Symbol::from("BTC"),
            Side::Buy,
            Amount::new(amount),
            Price::new(price),
            Utc::now(),
        )
    }

    fn scores(a: (UserId, Decimal), b: (UserId, Decimal)) -> HashMap<UserId, Decimal> {
        HashMap::from([a, b])
    }

    #[test]
    fn test_zero_zero_fails_on_flat_scores() {
        let (fight, a, b) = fight_pair();
        let trades = vec![trade(fight.id, a.user_id, dec!(0.001), dec!(95000))];
        let score_map = scores((a.user_id, dec!(0.004)), (b.user_id, dec!(-0.009)));
        let participants = [a, b];
        let evidence = FightEvidence {
            fight: &fight,
            participants: &participants,
            trades: &trades,
            sessions: &[],
            scores: &score_map,
        };

        let outcome = check_zero_zero(&evidence, dec!(0.01));
        assert!(!outcome.passed);
        assert_eq!(outcome.rule_code, RuleCode::ZeroZero);
    }

    #[test]
    fn test_zero_zero_fails_on_no_trades_despite_scores() {
        let (fight, a, b) = fight_pair();
        let score_map = scores((a.user_id, dec!(5)), (b.user_id, dec!(-3)));
        let participants = [a, b];
        let evidence = FightEvidence {
            fight: &fight,
            participants: &participants,
            trades: &[],
            sessions: &[],
            scores: &score_map,
        };

        let outcome = check_zero_zero(&evidence, dec!(0.01));
        assert!(!outcome.passed);
    }

    #[test]
    fn test_zero_zero_passes_when_one_side_moved() {
        let (fight, a, b) = fight_pair();
        let trades = vec![trade(fight.id, a.user_id, dec!(0.001), dec!(95000))];
        let score_map = scores((a.user_id, dec!(2.5)), (b.user_id, dec!(0)));
        let participants = [a, b];
        let evidence = FightEvidence {
            fight: &fight,
            participants: &participants,
            trades: &trades,
            sessions: &[],
            scores: &score_map,
        };

        assert!(check_zero_zero(&evidence, dec!(0.01)).passed);
    }

    #[test]
    fn test_min_volume_flags_the_quiet_side() {
        let (fight, a, b) = fight_pair();
        // A trades 95 USDC, B trades 5 USDC.
        let trades = vec![
            trade(fight.id, a.user_id, dec!(0.001), dec!(95000)),
            trade(fight.id, b.user_id, dec!(0.0001), dec!(50000)),
        ];
        let score_map = scores((a.user_id, dec!(1)), (b.user_id, dec!(1)));
        let participants = [a.clone(), b.clone()];
        let evidence = FightEvidence {
            fight: &fight,
            participants: &participants,
            trades: &trades,
            sessions: &[],
            scores: &score_map,
        };

        let outcome = check_min_volume(&evidence, dec!(10));
        assert!(!outcome.passed);
        assert_eq!(below_min_volume(&evidence, dec!(10)), vec![b.user_id]);

        // Threshold below both volumes: passes.
        assert!(check_min_volume(&evidence, dec!(1)).passed);
    }

    #[test]
    fn test_min_volume_counts_participants_without_trades() {
        let (fight, a, b) = fight_pair();
        let trades = vec![trade(fight.id, a.user_id, dec!(0.001), dec!(95000))];
        let score_map = scores((a.user_id, dec!(1)), (b.user_id, dec!(0)));
        let participants = [a, b.clone()];
        let evidence = FightEvidence {
            fight: &fight,
            participants: &participants,
            trades: &trades,
            sessions: &[],
            scores: &score_map,
        };

        assert_eq!(below_min_volume(&evidence, dec!(10)), vec![b.user_id]);
    }

    #[test]
    fn test_external_trades_lists_violators_and_ids() {
        let (_fight, a, mut b) = fight_pair();
        b.external_trades_detected = true;
        b.external_trade_ids = vec!["t-9".to_string(), "t-10".to_string()];
        let participants = [a, b.clone()];

        let outcome = check_external_trades(&participants);
        assert!(!outcome.passed);
        assert_eq!(outcome.metadata["violators"][0], json!(b.user_id));
        assert_eq!(outcome.metadata["tradeIds"], json!(["t-9", "t-10"]));
    }

    #[test]
    fn test_repeated_matchup_counts_current_fight() {
        // 9 completed others + the current = 10, hitting max 10.
        assert!(!repeated_matchup_outcome(9, 10, 24).passed);
        assert!(repeated_matchup_outcome(8, 10, 24).passed);
    }

    #[test]
    fn test_same_ip_two_stage() {
        let ip: IpAddr = "203.0.113.7".parse().unwrap();

        assert!(matches!(same_ip_finding(&[], 5, 2), SameIpFinding::Clean));
        assert!(matches!(
            same_ip_finding(&[ip], 1, 2),
            SameIpFinding::Flagged(_)
        ));
        match same_ip_finding(&[ip], 2, 2) {
            SameIpFinding::Excluded(outcome) => {
                assert!(!outcome.passed);
                assert_eq!(outcome.metadata["priorMatchups"], json!(2));
            }
            other => panic!("expected exclusion, got {other:?}"),
        }
    }

    #[test]
    fn test_shared_ips_requires_both_sides() {
        let a = UserId::new();
        let b = UserId::new();
        let fight_id = FightId::new();
        let shared: IpAddr = "203.0.113.7".parse().unwrap();
        let lone: IpAddr = "198.51.100.2".parse().unwrap();

        let sessions = vec![
            FightSession::new(fight_id, a, shared, "agent", SessionKind::Join),
            FightSession::new(fight_id, a, lone, "agent", SessionKind::Trade),
            FightSession::new(fight_id, b, shared, "agent", SessionKind::Join),
        ];

        assert_eq!(shared_ips(&sessions, a, b), vec![shared]);
    }
}
