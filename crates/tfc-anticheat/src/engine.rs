//! Rule aggregation and the pre-matchmaking gate.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use tfc_core::{FightStatus, RuleCode, UserId};
use tfc_store::FightStore;

use crate::config::AntiCheatConfig;
use crate::error::{AntiCheatError, AntiCheatResult};
use crate::rules::{
    below_min_volume, check_external_trades, check_min_volume, check_zero_zero,
    external_violators, repeated_matchup_outcome, same_ip_finding, shared_ips, FightEvidence,
    RuleOutcome, SameIpFinding,
};

/// Aggregate verdict over all five rules.
#[derive(Debug)]
pub struct FightValidation {
    /// Failed rules.
    pub violations: Vec<RuleOutcome>,
    /// Passed-with-note rules (shared IP below the exclusion threshold).
    pub warnings: Vec<RuleOutcome>,
    /// No excluding violation fired.
    pub should_count_for_ranking: bool,
    /// FINISHED when the fight counts, NO_CONTEST otherwise.
    pub recommended_status: FightStatus,
    /// Participants stamped with external trades, if any.
    pub external_violators: Vec<UserId>,
    /// Participants below the minimum volume, if any.
    pub below_min_volume: Vec<UserId>,
}

impl FightValidation {
    pub fn violated(&self, code: RuleCode) -> bool {
        self.violations.iter().any(|v| v.rule_code == code)
    }
}

/// Runs the rules. Owns the store handle for the two history-based rules.
pub struct AntiCheatEngine {
    store: Arc<dyn FightStore>,
    config: AntiCheatConfig,
}

impl AntiCheatEngine {
    pub fn new(store: Arc<dyn FightStore>, config: AntiCheatConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &AntiCheatConfig {
        &self.config
    }

    /// Run all five rules over the evidence.
    ///
    /// Failed rules land in `violations`. EXTERNAL_TRADES is the one
    /// failure that does not exclude the fight from ranking by itself: the
    /// settlement adjudication handles it, so exclusion here is decided by
    /// the other four.
    pub async fn validate_fight_for_settlement(
        &self,
        evidence: &FightEvidence<'_>,
    ) -> AntiCheatResult<FightValidation> {
        let [a, b] = evidence.participants else {
            return Err(AntiCheatError::MalformedFight {
                fight_id: evidence.fight.id,
                count: evidence.participants.len(),
            });
        };

        let since = Utc::now() - self.config.matchup_window();
        let shared = shared_ips(evidence.sessions, a.user_id, b.user_id);

        let (zero_zero, min_volume, external, matchup, same_ip) = tokio::join!(
            async { check_zero_zero(evidence, self.config.zero_pnl_threshold) },
            async { check_min_volume(evidence, self.config.min_volume_usdc) },
            async { check_external_trades(evidence.participants) },
            self.check_repeated_matchup(evidence, a.user_id, b.user_id, since),
            self.check_same_ip(evidence, a.user_id, b.user_id, &shared, since),
        );

        let mut violations = Vec::new();
        let mut warnings = Vec::new();
        for outcome in [zero_zero, min_volume, external, matchup?] {
            if !outcome.passed {
                violations.push(outcome);
            }
        }
        match same_ip? {
            SameIpFinding::Clean => {}
            SameIpFinding::Flagged(outcome) => warnings.push(outcome),
            SameIpFinding::Excluded(outcome) => violations.push(outcome),
        }

        let excluding = violations
            .iter()
            .filter(|v| v.rule_code != RuleCode::ExternalTrades)
            .count();
        let should_count_for_ranking = excluding == 0;
        let recommended_status = if should_count_for_ranking {
            FightStatus::Finished
        } else {
            FightStatus::NoContest
        };

        info!(
            fight_id = %evidence.fight.id,
            violations = violations.len(),
            warnings = warnings.len(),
            should_count = should_count_for_ranking,
            "Anti-cheat validation complete"
        );

        Ok(FightValidation {
            violations,
            warnings,
            should_count_for_ranking,
            recommended_status,
            external_violators: external_violators(evidence.participants),
            below_min_volume: below_min_volume(evidence, self.config.min_volume_usdc),
        })
    }

    /// Pre-matchmaking gate. Blocks a new fight when the pair already hit
    /// the matchup cap inside the window, LIVE fights included.
    pub async fn can_users_match(&self, a: UserId, b: UserId) -> AntiCheatResult<bool> {
        let since = Utc::now() - self.config.matchup_window();
        let count = self
            .store
            .matchups_between_including_live(a, b, since)
            .await?;
        let allowed = count < self.config.max_matchups_per_window;
        if !allowed {
            debug!(
                user_a = %a,
                user_b = %b,
                count,
                max = self.config.max_matchups_per_window,
                "Pair at matchup cap"
            );
        }
        Ok(allowed)
    }

    async fn check_repeated_matchup(
        &self,
        evidence: &FightEvidence<'_>,
        a: UserId,
        b: UserId,
        since: DateTime<Utc>,
    ) -> AntiCheatResult<RuleOutcome> {
        let completed = self
            .store
            .completed_matchups_between(a, b, since, evidence.fight.id)
            .await?;
        Ok(repeated_matchup_outcome(
            completed,
            self.config.max_matchups_per_window,
            self.config.matchup_window_hours,
        ))
    }

    async fn check_same_ip(
        &self,
        evidence: &FightEvidence<'_>,
        a: UserId,
        b: UserId,
        shared: &[IpAddr],
        since: DateTime<Utc>,
    ) -> AntiCheatResult<SameIpFinding> {
        if shared.is_empty() {
            return Ok(SameIpFinding::Clean);
        }
        let prior = self
            .store
            .shared_ip_matchups(a, b, shared, since, evidence.fight.id)
            .await?;
        Ok(same_ip_finding(
            shared,
            prior,
            self.config.same_ip_exclusion_threshold,
        ))
    }
}
