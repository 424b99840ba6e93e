use game_types::{LetterResult, LetterStatus};

use crate::Environment;

pub struct ScoringEngine;

impl ScoringEngine {
    /// Evaluate a guess against the target word, letter by letter.
    ///
    /// Case-insensitive; the returned letters are upper-case. A letter is only
    /// reported `Correct`/`Present` as many times as it occurs in the target,
    /// and when a duplicate has to be shared the leftmost guess position wins.
    pub fn evaluate_guess(word: &str, target: &str) -> Vec<LetterResult> {
        let word_chars: Vec<char> = word.to_uppercase().chars().collect();
        let target_chars: Vec<char> = target.to_uppercase().chars().collect();

        let mut statuses: Vec<Option<LetterStatus>> = vec![None; word_chars.len()];
        let mut consumed = vec![false; target_chars.len()];

        // First pass: mark correct positions
        for (i, &ch) in word_chars.iter().enumerate() {
            if target_chars.get(i) == Some(&ch) {
                statuses[i] = Some(LetterStatus::Correct);
                consumed[i] = true;
            }
        }

        // Second pass: claim the first unconsumed copy elsewhere in the target
        for (i, &ch) in word_chars.iter().enumerate() {
            if statuses[i].is_some() {
                continue;
            }

            let claimed = target_chars
                .iter()
                .enumerate()
                .find(|&(j, &target_ch)| !consumed[j] && target_ch == ch)
                .map(|(j, _)| j);

            statuses[i] = Some(match claimed {
                Some(j) => {
                    consumed[j] = true;
                    LetterStatus::Present
                }
                None => LetterStatus::Absent,
            });
        }

        word_chars
            .into_iter()
            .zip(statuses)
            .map(|(letter, status)| LetterResult {
                letter,
                status: status.unwrap_or(LetterStatus::Absent),
            })
            .collect()
    }

    pub fn is_solved(word: &str, target: &str) -> bool {
        word.to_uppercase() == target.to_uppercase()
    }

    /// Reward for finishing a round, however it finished: a uniform draw
    /// from {10, 20, ..., 100}.
    // TODO: replace with a formula based on elapsed time and attempts once the
    // product rules for round scoring are settled.
    pub fn round_score(env: &dyn Environment) -> u32 {
        (env.random_below(10) as u32 + 1) * 10
    }
}
