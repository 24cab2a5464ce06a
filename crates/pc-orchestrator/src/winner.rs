//! Winner determination

use rand::seq::SliceRandom;
use rand::Rng;

use pc_core::config::{ComparisonRule, Objective};
use pc_core::ipc::Standing;
use pc_protocol::{ParticipantId, ResultPayload};

/// Scored outcome of a run, before it is dressed up as a verdict
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub winner: Option<ParticipantId>,
    pub ratio: Option<f64>,
    pub standings: Vec<Standing>,
}

/// Score the collected results.
///
/// A participant loses automatically when its result is missing, marked
/// unsuccessful, or lacks a finite value for the rule's measurement. Equal
/// values go to the participant earlier in canonical order.
pub fn determine_winner(
    rule: &ComparisonRule,
    expected: &[ParticipantId],
    results: &[(ParticipantId, ResultPayload)],
) -> Outcome {
    let mut participants = expected.to_vec();
    participants.sort();
    participants.dedup();

    let standings: Vec<Standing> = participants
        .iter()
        .map(|&device| {
            let value = results
                .iter()
                .find(|(id, _)| *id == device)
                .filter(|(_, result)| result.success)
                .and_then(|(_, result)| result.measurement(rule.measurement))
                .filter(|v| v.is_finite());
            Standing {
                device,
                value,
                lost: value.is_none(),
            }
        })
        .collect();

    let mut ranked: Vec<(ParticipantId, f64)> = standings
        .iter()
        .filter_map(|s| s.value.map(|v| (s.device, v)))
        .collect();
    // Stable sort keeps canonical order among equal values
    ranked.sort_by(|a, b| match rule.objective {
        Objective::Minimize => a.1.total_cmp(&b.1),
        Objective::Maximize => b.1.total_cmp(&a.1),
    });

    let winner = ranked.first().copied();
    let runner_up = ranked.get(1).copied();

    let ratio = match (winner, runner_up) {
        (Some((_, w)), Some((_, r))) => match rule.objective {
            Objective::Minimize if w > 0.0 => Some(r / w),
            Objective::Maximize if r > 0.0 => Some(w / r),
            _ => None,
        },
        _ => None,
    };

    Outcome {
        winner: winner.map(|(id, _)| id),
        ratio,
        standings,
    }
}

/// Announcement line for an outcome
pub fn announce<R: Rng + ?Sized>(outcome: &Outcome, victory_lines: &[String], rng: &mut R) -> String {
    let Some(winner) = outcome.winner else {
        return "No winner - no participant produced a valid result".to_string();
    };

    let mut message = match outcome.ratio {
        Some(ratio) => format!("{} wins by {:.1}x!", winner.display_name(), ratio),
        None => format!("{} wins!", winner.display_name()),
    };
    if let Some(line) = victory_lines.choose(rng) {
        message.push(' ');
        message.push_str(line);
    }
    message
}
