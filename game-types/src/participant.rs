use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::{ParticipantId, RoundNumber};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantStatus {
    Waiting,
    Playing,
    /// Done with the current round; reset to `Playing` when the next one starts.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LetterStatus {
    Correct, // right letter, right position
    Present, // right letter, wrong position
    Absent,  // not in the word (or all copies already claimed)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LetterResult {
    pub letter: char,
    pub status: LetterStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Guess {
    pub word: String,
    pub letter_results: Vec<LetterResult>,
    pub submitted_at: DateTime<Utc>,
}

/// One participant's progress within one round.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RoundState {
    pub round_number: RoundNumber,
    pub guesses: Vec<Guess>,
    pub attempts_used: u32,
    pub won: bool,
    pub finished: bool,
    pub first_guess_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_millis: i64,
    pub round_score: u32,
}

impl RoundState {
    pub fn new(round_number: RoundNumber) -> Self {
        Self {
            round_number,
            guesses: Vec::new(),
            attempts_used: 0,
            won: false,
            finished: false,
            first_guess_at: None,
            finished_at: None,
            elapsed_millis: 0,
            round_score: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.finished
    }

    /// Appends a guess and counts the attempt. `first_guess_at` is only set once.
    pub fn record_guess(&mut self, guess: Guess) {
        if self.first_guess_at.is_none() {
            self.first_guess_at = Some(guess.submitted_at);
        }
        self.guesses.push(guess);
        self.attempts_used += 1;
    }

    /// Moves the round to its terminal state.
    ///
    /// Returns `false` without touching anything if the round was already
    /// finished. A participant who never guessed gets `first_guess_at`
    /// defaulted to `started_at`, so the elapsed time is measured from there.
    pub fn finish(
        &mut self,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        won: bool,
        round_score: u32,
    ) -> bool {
        if self.finished {
            return false;
        }

        let first_guess_at = *self.first_guess_at.get_or_insert(started_at);
        self.finished = true;
        self.won = won;
        self.finished_at = Some(finished_at);
        self.elapsed_millis = (finished_at - first_guess_at).num_milliseconds();
        self.round_score = round_score;
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
    pub status: ParticipantStatus,
    pub total_score: u32,
    /// Sparse: a missing round number means that round has not started for
    /// this participant.
    pub rounds: BTreeMap<RoundNumber, RoundState>,
}

impl Participant {
    pub fn new(id: ParticipantId, display_name: String, joined_at: DateTime<Utc>) -> Self {
        Self {
            id,
            display_name,
            joined_at,
            status: ParticipantStatus::Waiting,
            total_score: 0,
            rounds: BTreeMap::new(),
        }
    }

    pub fn round(&self, round_number: RoundNumber) -> Option<&RoundState> {
        self.rounds.get(&round_number)
    }

    pub fn round_mut(&mut self, round_number: RoundNumber) -> Option<&mut RoundState> {
        self.rounds.get_mut(&round_number)
    }

    /// Creates a fresh round state and marks the participant as playing.
    pub fn begin_round(&mut self, round_number: RoundNumber) {
        self.status = ParticipantStatus::Playing;
        self.rounds.insert(round_number, RoundState::new(round_number));
    }

    /// Clears score and round history; identity fields are kept.
    pub fn reset(&mut self) {
        self.total_score = 0;
        self.rounds.clear();
        self.status = ParticipantStatus::Waiting;
    }

    pub fn has_finished_round(&self, round_number: RoundNumber) -> bool {
        self.round(round_number).is_some_and(|round| round.finished)
    }
}

/// Result of a single guess submission.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GuessOutcome {
    pub letter_results: Vec<LetterResult>,
    pub won: bool,
    pub finished: bool,
}

/// A participant's line in the current round's leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RoundStanding {
    pub participant_id: ParticipantId,
    pub display_name: String,
    pub guess_count: u32,
    pub elapsed_millis: i64,
    pub round_score: u32,
    pub total_score: u32,
    pub finished: bool,
    pub won: bool,
}

impl RoundStanding {
    pub fn for_round(participant: &Participant, round_number: RoundNumber) -> Self {
        let round = participant.round(round_number);
        Self {
            participant_id: participant.id.clone(),
            display_name: participant.display_name.clone(),
            guess_count: round.map_or(0, |r| r.guesses.len() as u32),
            elapsed_millis: round.map_or(0, |r| r.elapsed_millis),
            round_score: round.map_or(0, |r| r.round_score),
            total_score: participant.total_score,
            finished: round.is_some_and(|r| r.finished),
            won: round.is_some_and(|r| r.won),
        }
    }
}
