use chrono::{DateTime, Duration, Utc};
use game_types::{
    Guess, GuessOutcome, Participant, ParticipantId, ParticipantStatus, RoomError, RoomEvent,
    RoomId, RoomPhase, RoomSettings, RoomState, SafeRoomState,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::{Environment, ScoringEngine, WordSource};

/// Gap between a start/advance request and the round opening, so clients can
/// show a countdown.
pub const ROUND_COUNTDOWN_SECONDS: i64 = 3;

pub fn round_countdown() -> Duration {
    Duration::seconds(ROUND_COUNTDOWN_SECONDS)
}

/// One room and everything the clients must not see.
///
/// All methods assume the caller holds the room exclusively; none of them
/// block. Each mutation returns the events to publish, in order.
#[derive(Debug, Clone)]
pub struct Room {
    pub state: RoomState,
    answers: Vec<String>, // Hidden from clients
    end_notified: bool,
    pub last_activity: DateTime<Utc>,
}

impl Room {
    /// A new room in `Waiting`, with the leader already joined.
    pub fn new(
        id: RoomId,
        leader_id: ParticipantId,
        leader_display_name: Option<&str>,
        settings: RoomSettings,
        now: DateTime<Utc>,
    ) -> Self {
        let leader = Participant::new(
            leader_id.clone(),
            display_name_or_id(leader_display_name, &leader_id),
            now,
        );
        let mut participants = HashMap::new();
        participants.insert(leader_id.clone(), leader);

        let state = RoomState {
            id,
            leader_id,
            phase: RoomPhase::Waiting,
            settings,
            join_locked: false,
            current_round: 1,
            answer_length: 0,
            round_start_time: None,
            room_start_time: None,
            participants,
            created_at: now,
        };

        Self {
            state,
            answers: Vec::new(),
            end_notified: false,
            last_activity: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.state.id
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn end_notified(&self) -> bool {
        self.end_notified
    }

    pub fn current_answer(&self) -> Option<&str> {
        let index = (self.state.current_round as usize).checked_sub(1)?;
        self.answers.get(index).map(String::as_str)
    }

    pub fn join(
        &mut self,
        participant_id: &str,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Participant, RoomError> {
        if self.state.join_locked || self.state.phase != RoomPhase::Waiting {
            return Err(RoomError::RoomClosed {
                room_id: self.state.id.clone(),
            });
        }

        // Joining twice is not an error
        if let Some(existing) = self.state.participants.get(participant_id) {
            return Ok(existing.clone());
        }

        if self.state.participants.len() >= self.state.settings.max_participants as usize {
            return Err(RoomError::RoomFull {
                room_id: self.state.id.clone(),
            });
        }

        let participant = Participant::new(
            participant_id.to_string(),
            display_name_or_id(display_name, participant_id),
            now,
        );
        self.state
            .participants
            .insert(participant.id.clone(), participant.clone());
        self.touch(now);

        info!(
            "Participant {} joined room {} ({}/{})",
            participant.id,
            self.state.id,
            self.state.participants.len(),
            self.state.settings.max_participants
        );
        Ok(participant)
    }

    pub fn start(
        &mut self,
        leader_id: &str,
        words: &dyn WordSource,
        now: DateTime<Utc>,
    ) -> Result<Vec<RoomEvent>, RoomError> {
        self.ensure_leader(leader_id)?;
        if self.state.phase != RoomPhase::Waiting {
            return Err(RoomError::AlreadyStarted {
                room_id: self.state.id.clone(),
            });
        }

        let answers = self.draw_answers(words)?;
        let start_time = now + round_countdown();
        self.begin_cycle(answers, start_time);
        self.state.join_locked = true;
        self.touch(now);

        info!(
            "Room {} started by {} with {} participants (round 1 opens at {})",
            self.state.id,
            leader_id,
            self.state.participants.len(),
            start_time.to_rfc3339()
        );
        Ok(vec![RoomEvent::update(&self.state.id)])
    }

    /// Records a guess for the participant's current round.
    ///
    /// The round finishes on an exact (case-insensitive) match or when the
    /// attempt budget is spent; finishing assigns the round score.
    pub fn submit_guess(
        &mut self,
        participant_id: &str,
        word: &str,
        env: &dyn Environment,
    ) -> Result<(GuessOutcome, Vec<RoomEvent>), RoomError> {
        let now = env.now();
        let round_number = self.state.current_round;
        let max_attempts = self.state.settings.max_attempts_per_round;
        let round_start = self.state.round_start_time.unwrap_or(now);

        let participant = self
            .state
            .participants
            .get_mut(participant_id)
            .ok_or_else(|| RoomError::ParticipantNotFound {
                participant_id: participant_id.to_string(),
            })?;

        let round = participant
            .rounds
            .get_mut(&round_number)
            .filter(|round| round.is_active())
            .ok_or(RoomError::RoundNotActive)?;

        let answer = (round_number as usize)
            .checked_sub(1)
            .and_then(|index| self.answers.get(index))
            .ok_or(RoomError::RoundNotActive)?;

        // Upper-casing can change the length (ß -> SS), so check the normalized word.
        let word = word.to_uppercase();
        let expected = answer.chars().count();
        let actual = word.chars().count();
        if expected != actual {
            return Err(RoomError::InvalidGuess {
                expected: expected as u32,
                actual: actual as u32,
            });
        }

        let letter_results = ScoringEngine::evaluate_guess(&word, answer);
        let won = ScoringEngine::is_solved(&word, answer);

        round.record_guess(Guess {
            word,
            letter_results: letter_results.clone(),
            submitted_at: now,
        });
        debug!(
            "Guess {}/{} from {} in room {} round {}",
            round.attempts_used, max_attempts, participant_id, self.state.id, round_number
        );

        if won || round.attempts_used >= max_attempts {
            let score = ScoringEngine::round_score(env);
            round.finish(round_start, now, won, score);
            participant.status = ParticipantStatus::Finished;
            participant.total_score += score;

            info!(
                "Participant {} finished round {} of room {} (won: {}, attempts: {}, score: {})",
                participant_id, round_number, self.state.id, won, round.attempts_used, score
            );
        }
        let finished = round.finished;

        self.touch(now);
        let mut events = vec![RoomEvent::update(&self.state.id)];
        events.extend(self.check_room_end());

        Ok((
            GuessOutcome {
                letter_results,
                won,
                finished,
            },
            events,
        ))
    }

    pub fn advance_round(
        &mut self,
        leader_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<RoomEvent>, RoomError> {
        self.ensure_leader(leader_id)?;
        if self.state.phase == RoomPhase::Waiting {
            return Err(RoomError::NotStarted {
                room_id: self.state.id.clone(),
            });
        }
        if self.state.is_last_round() {
            return Err(RoomError::NoMoreRounds);
        }

        let next_round = self.state.current_round + 1;
        self.state.current_round = next_round;
        self.state.round_start_time = Some(now + round_countdown());
        for participant in self.state.participants.values_mut() {
            participant.begin_round(next_round);
        }
        self.touch(now);

        info!(
            "Room {} advanced to round {}/{}",
            self.state.id, next_round, self.state.settings.total_rounds
        );
        Ok(vec![RoomEvent::update(&self.state.id)])
    }

    /// Fresh answers, scores wiped, straight back into round 1.
    pub fn restart(
        &mut self,
        leader_id: &str,
        words: &dyn WordSource,
        now: DateTime<Utc>,
    ) -> Result<Vec<RoomEvent>, RoomError> {
        self.ensure_leader(leader_id)?;

        let answers = self.draw_answers(words)?;
        for participant in self.state.participants.values_mut() {
            participant.reset();
        }
        self.begin_cycle(answers, now);
        self.state.join_locked = false;
        self.touch(now);

        info!("Room {} restarted by {}", self.state.id, leader_id);
        Ok(vec![RoomEvent::update(&self.state.id)])
    }

    /// Force-finishes everyone still playing once the round deadline has
    /// passed.
    ///
    /// Timed-out rounds are stamped with the deadline itself rather than the
    /// sweep time, so elapsed times never exceed the limit by sweep jitter.
    pub fn sweep_timeouts(&mut self, env: &dyn Environment) -> Vec<RoomEvent> {
        let (Some(round_start), Some(deadline)) =
            (self.state.round_start_time, self.state.round_deadline())
        else {
            return Vec::new();
        };
        if env.now() < deadline {
            return Vec::new();
        }

        let round_number = self.state.current_round;
        let mut timed_out = 0;
        for participant in self.state.participants.values_mut() {
            let Some(round) = participant.rounds.get_mut(&round_number) else {
                continue;
            };
            if !round.is_active() {
                continue;
            }

            let score = ScoringEngine::round_score(env);
            round.finish(round_start, deadline, false, score);
            participant.status = ParticipantStatus::Finished;
            participant.total_score += score;
            timed_out += 1;
        }

        let mut events = Vec::new();
        if timed_out > 0 {
            info!(
                "Round {} of room {} timed out for {} participant(s)",
                round_number, self.state.id, timed_out
            );
            events.push(RoomEvent::update(&self.state.id));
        }
        events.extend(self.check_room_end());
        events
    }

    /// Answers of rounds that are already over; all of them once finished.
    pub fn revealed_answers(&self) -> Vec<String> {
        let revealed = match self.state.phase {
            RoomPhase::Finished => self.answers.len(),
            _ => (self.state.current_round as usize)
                .saturating_sub(1)
                .min(self.answers.len()),
        };
        self.answers[..revealed].to_vec()
    }

    pub fn safe_state(&self) -> SafeRoomState {
        SafeRoomState {
            room: self.state.clone(),
            revealed_answers: self.revealed_answers(),
        }
    }

    pub fn is_idle(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.last_activity > timeout
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    fn ensure_leader(&self, leader_id: &str) -> Result<(), RoomError> {
        if self.state.is_leader(leader_id) {
            Ok(())
        } else {
            warn!(
                "{} tried a leader-only action in room {}",
                leader_id, self.state.id
            );
            Err(RoomError::NotAuthorized)
        }
    }

    fn draw_answers(&self, words: &dyn WordSource) -> Result<Vec<String>, RoomError> {
        (0..self.state.settings.total_rounds)
            .map(|_| {
                words.pick_answer().map(|word| word.to_uppercase()).map_err(|e| {
                    warn!("Failed to draw an answer for room {}: {}", self.state.id, e);
                    RoomError::NoAnswersAvailable
                })
            })
            .collect()
    }

    /// Shared by start and restart: install answers and open round 1 for
    /// everyone at `start_time`.
    fn begin_cycle(&mut self, answers: Vec<String>, start_time: DateTime<Utc>) {
        self.state.answer_length = answers
            .first()
            .map_or(0, |answer| answer.chars().count() as u32);
        self.answers = answers;
        self.end_notified = false;
        self.state.phase = RoomPhase::Playing;
        self.state.current_round = 1;
        self.state.room_start_time = Some(start_time);
        self.state.round_start_time = Some(start_time);
        for participant in self.state.participants.values_mut() {
            participant.begin_round(1);
        }
    }

    /// Finishes the room when the last round is over for everyone. Fires at
    /// most once per start/restart cycle.
    fn check_room_end(&mut self) -> Option<RoomEvent> {
        if self.end_notified
            || self.state.current_round != self.state.settings.total_rounds
            || !self.state.everyone_finished_round(self.state.current_round)
        {
            return None;
        }

        self.state.phase = RoomPhase::Finished;
        self.state.join_locked = true;
        self.end_notified = true;

        info!("Room {} finished", self.state.id);
        Some(RoomEvent::class_end(&self.state.id))
    }
}

fn display_name_or_id(display_name: Option<&str>, participant_id: &str) -> String {
    display_name
        .filter(|name| !name.is_empty())
        .unwrap_or(participant_id)
        .to_string()
}
