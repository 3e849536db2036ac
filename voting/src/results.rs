//! Per-option vote counts and shares.

use std::collections::HashMap;

use serde::Serialize;

use agora_types::{VoteRecord, VotingId, VotingOption, VotingOptionId};

use crate::rate::{meets_bps, percent_to_bps, ratio_bps};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionResult {
    pub option_id: VotingOptionId,
    pub text: String,
    pub code: String,
    pub color: String,
    pub count: u64,
    /// Unrounded share of all votes, in percent.
    pub percentage: f64,
    /// Display share, in basis points, rounded half to even.
    pub percentage_bps: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingResults {
    pub voting_id: VotingId,
    pub total_votes: u64,
    pub options: Vec<OptionResult>,
}

impl VotingResults {
    pub fn option_by_code(&self, code: &str) -> Option<&OptionResult> {
        self.options
            .iter()
            .find(|o| o.code.eq_ignore_ascii_case(code))
    }
}

/// Tally `votes` over `options`, in the options' display order.
///
/// Votes for other votings, or for options not in `options`, are ignored.
/// With no counted votes every share is zero.
pub fn results_for(
    voting_id: VotingId,
    votes: &[VoteRecord],
    options: &[VotingOption],
) -> VotingResults {
    let mut counts: HashMap<VotingOptionId, u64> =
        options.iter().map(|o| (o.id, 0)).collect();
    for vote in votes.iter().filter(|v| v.voting_id == voting_id) {
        if let Some(count) = counts.get_mut(&vote.voting_option_id) {
            *count += 1;
        }
    }
    let total: u64 = counts.values().sum();

    let mut ordered: Vec<&VotingOption> = options.iter().collect();
    ordered.sort_by_key(|o| (o.display_order, o.id));

    let options = ordered
        .into_iter()
        .map(|o| {
            let count = counts.get(&o.id).copied().unwrap_or(0);
            let percentage = if total == 0 {
                0.0
            } else {
                count as f64 * 100.0 / total as f64
            };
            OptionResult {
                option_id: o.id,
                text: o.text.clone(),
                code: o.code.clone(),
                color: o.color.clone(),
                count,
                percentage,
                percentage_bps: ratio_bps(count as u128, total as u128),
            }
        })
        .collect();

    VotingResults {
        voting_id,
        total_votes: total,
        options,
    }
}

/// Whether the option with `option_code` holds at least `required_percent`
/// of the votes. False when nobody voted or the code is unknown.
pub fn approval_reached(results: &VotingResults, option_code: &str, required_percent: f64) -> bool {
    match results.option_by_code(option_code) {
        Some(option) => meets_bps(
            option.count as u128,
            results.total_votes as u128,
            percent_to_bps(required_percent),
        ),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::{ResidentId, Timestamp, VoteId};

    fn option(id: u64, code: &str, order: u32) -> VotingOption {
        VotingOption {
            id: VotingOptionId::new(id),
            voting_id: VotingId::new(1),
            text: code.to_lowercase(),
            code: code.into(),
            display_order: order,
            color: format!("#00000{id}"),
            is_active: true,
        }
    }

    fn vote(id: u64, option: u64) -> VoteRecord {
        VoteRecord {
            id: VoteId::new(id),
            voting_id: VotingId::new(1),
            voting_option_id: VotingOptionId::new(option),
            voted_at: Timestamp::new(id),
            option_text: String::new(),
            option_code: String::new(),
            option_color: String::new(),
            resident_id: Some(ResidentId::new(id)),
            resident_name: None,
            property_unit_number: None,
        }
    }

    #[test]
    fn no_votes_means_all_zero() {
        let options = [option(1, "YES", 1), option(2, "NO", 2)];
        let results = results_for(VotingId::new(1), &[], &options);
        assert_eq!(results.total_votes, 0);
        assert!(results
            .options
            .iter()
            .all(|o| o.count == 0 && o.percentage == 0.0 && o.percentage_bps == 0));
    }

    #[test]
    fn shares_follow_display_order_and_carry_color() {
        let options = [option(1, "NO", 2), option(2, "YES", 1), option(3, "ABS", 3)];
        let votes = [vote(1, 2), vote(2, 2), vote(3, 1)];
        let results = results_for(VotingId::new(1), &votes, &options);

        let codes: Vec<_> = results.options.iter().map(|o| o.code.as_str()).collect();
        assert_eq!(codes, ["YES", "NO", "ABS"]);
        assert_eq!(results.options[0].count, 2);
        assert_eq!(results.options[0].percentage_bps, 6667);
        assert_eq!(results.options[1].percentage_bps, 3333);
        assert_eq!(results.options[0].color, "#000002");
        let sum: f64 = results.options.iter().map(|o| o.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn foreign_votes_are_ignored() {
        let options = [option(1, "YES", 1)];
        let mut stray = vote(2, 1);
        stray.voting_id = VotingId::new(2);
        let results = results_for(VotingId::new(1), &[vote(1, 1), stray, vote(3, 9)], &options);
        assert_eq!(results.total_votes, 1);
    }

    #[test]
    fn approval_compares_exactly() {
        let options = [option(1, "YES", 1), option(2, "NO", 2)];
        let votes = [vote(1, 1), vote(2, 1), vote(3, 2)];
        let results = results_for(VotingId::new(1), &votes, &options);
        assert!(approval_reached(&results, "yes", 66.0));
        assert!(!approval_reached(&results, "YES", 67.0));
        assert!(!approval_reached(&results, "MAYBE", 1.0));

        let empty = results_for(VotingId::new(1), &[], &options);
        assert!(!approval_reached(&empty, "YES", 0.0));
    }

    #[test]
    fn results_serialize_in_camel_case() {
        let results = results_for(VotingId::new(1), &[vote(1, 1)], &[option(1, "YES", 1)]);
        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json["totalVotes"], 1);
        assert_eq!(json["options"][0]["percentageBps"], 10_000);
        assert_eq!(json["options"][0]["optionId"], 1);
    }
}
