//! Guess Service - the per-group guessing game state machine
//!
//! Each group is either idle (no entry in `rounds`) or holds exactly one
//! round. `start` reserves the slot with an atomic check-and-insert before it
//! awaits anything; the question is built afterwards and the slot released if
//! that fails. A round ends exactly once: the first correct answer and the
//! round timer both resolve through `remove_if` on the same slot, so whoever
//! loses the race finds nothing to remove and does nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info, instrument};

use crate::application::ports::outbound::{
    ImageError, ImageKind, ImageResolverPort, RandomPort, WinRecordError, WinRecordPort,
};
use crate::application::services::artwork::{crop_patch, resolve_or_placeholder};
use crate::application::services::GameDataService;
use crate::domain::entities::{
    Character, GuessGame, GuessVariant, NameMatch, ProfileHint, Question, Roster,
};
use crate::domain::value_objects::{CharaId, GroupId, RoundId, UserId};

const RANKING_SIZE: u32 = 10;
const EVENT_CAPACITY: usize = 256;
/// Star variants of the artwork a question may be cut from
const ARTWORK_STARS: [u8; 2] = [3, 6];

#[derive(Debug, thiserror::Error)]
pub enum GuessError {
    #[error("A game is already in progress for this group")]
    AlreadyPlaying,
    #[error("No eligible characters for the {0} game")]
    NoCandidates(GuessVariant),
    #[error("Could not build question: {0}")]
    Image(#[from] ImageError),
    #[error(transparent)]
    WinRecord(#[from] WinRecordError),
}

/// Round timing, patch sizes and answer blacklists
#[derive(Debug, Clone)]
pub struct GuessSettings {
    pub avatar_patch_size: u32,
    pub avatar_turn: Duration,
    pub avatar_blacklist: Vec<String>,
    pub card_patch_size: u32,
    pub card_turn: Duration,
    pub card_blacklist: Vec<String>,
    pub desc_prepare: Duration,
    pub desc_turn: Duration,
    pub desc_turn_number: usize,
    /// Minimum fuzzy-match score (percent) for an answer to count
    pub match_threshold: u8,
}

impl Default for GuessSettings {
    fn default() -> Self {
        let ids = |ids: &[u32]| ids.iter().map(|id| id.to_string()).collect();
        Self {
            avatar_patch_size: 32,
            avatar_turn: Duration::from_secs(20),
            avatar_blacklist: ids(&[1072, 1908, 4031, 9000]),
            card_patch_size: 180,
            card_turn: Duration::from_secs(20),
            card_blacklist: ids(&[
                1000, 1073, 1701, 1907, 1908, 1909, 1910, 1911, 1913, 1914, 1915, 1916, 1917,
                1918, 1919, 4031, 9000, 9601, 9602, 9603, 9604,
            ]),
            desc_prepare: Duration::from_secs(5),
            desc_turn: Duration::from_secs(12),
            desc_turn_number: 5,
            match_threshold: 60,
        }
    }
}

/// Round lifecycle notifications
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoundEvent {
    Started {
        gid: GroupId,
        round_id: RoundId,
        variant: GuessVariant,
    },
    Hint {
        gid: GroupId,
        round_id: RoundId,
        index: usize,
        total: usize,
        hint: ProfileHint,
    },
    Solved {
        gid: GroupId,
        round_id: RoundId,
        variant: GuessVariant,
        winner: UserId,
        answer: String,
        wins: Option<u32>,
    },
    Revealed {
        gid: GroupId,
        round_id: RoundId,
        variant: GuessVariant,
        answer: String,
    },
}

impl RoundEvent {
    pub fn gid(&self) -> &GroupId {
        match self {
            Self::Started { gid, .. }
            | Self::Hint { gid, .. }
            | Self::Solved { gid, .. }
            | Self::Revealed { gid, .. } => gid,
        }
    }
}

/// How a group's most recent round ended
#[derive(Debug, Clone, Serialize)]
pub struct RoundOutcome {
    pub round_id: RoundId,
    pub variant: GuessVariant,
    pub answer: String,
    pub chara_id: CharaId,
    /// `None` when the round timed out
    pub winner: Option<UserId>,
    pub ended_at: DateTime<Utc>,
}

impl From<&GuessGame> for RoundOutcome {
    fn from(game: &GuessGame) -> Self {
        Self {
            round_id: game.round_id,
            variant: game.variant(),
            answer: game.answer.name.clone(),
            chara_id: game.answer.id.clone(),
            winner: game.winner.clone(),
            ended_at: Utc::now(),
        }
    }
}

/// Result of one chat message offered as an answer
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The group has no round awaiting answers (never started, already
    /// solved or already expired)
    NoActiveGame,
    Wrong { matched: NameMatch },
    Correct {
        game: GuessGame,
        /// Total wins of the user in this variant, `None` if recording failed
        wins: Option<u32>,
    },
}

/// A freshly started round and the signal that fires when it is solved
pub struct StartedRound {
    pub game: GuessGame,
    pub solved: oneshot::Receiver<UserId>,
}

enum RoundSlot {
    /// Slot reserved, question still being built
    Preparing { round_id: RoundId },
    Active {
        game: GuessGame,
        solved_tx: oneshot::Sender<UserId>,
    },
}

impl RoundSlot {
    fn round_id(&self) -> RoundId {
        match self {
            Self::Preparing { round_id } => *round_id,
            Self::Active { game, .. } => game.round_id,
        }
    }

    fn is_active_round(&self, round_id: RoundId) -> bool {
        matches!(self, Self::Active { game, .. } if game.round_id == round_id)
    }
}

pub struct GuessService {
    data: Arc<GameDataService>,
    random: Arc<dyn RandomPort>,
    images: Arc<dyn ImageResolverPort>,
    wins: Arc<dyn WinRecordPort>,
    settings: GuessSettings,
    rounds: DashMap<GroupId, RoundSlot>,
    outcomes: DashMap<GroupId, RoundOutcome>,
    events: broadcast::Sender<RoundEvent>,
}

impl GuessService {
    pub fn new(
        data: Arc<GameDataService>,
        random: Arc<dyn RandomPort>,
        images: Arc<dyn ImageResolverPort>,
        wins: Arc<dyn WinRecordPort>,
        settings: GuessSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            data,
            random,
            images,
            wins,
            settings,
            rounds: DashMap::new(),
            outcomes: DashMap::new(),
            events,
        }
    }

    pub fn settings(&self) -> &GuessSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: RoundEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// A group counts as playing from the moment its slot is reserved
    pub fn is_playing(&self, gid: &GroupId) -> bool {
        self.rounds.contains_key(gid)
    }

    /// The round currently awaiting answers, if any
    pub fn active_game(&self, gid: &GroupId) -> Option<GuessGame> {
        self.rounds.get(gid).and_then(|slot| match slot.value() {
            RoundSlot::Active { game, .. } => Some(game.clone()),
            RoundSlot::Preparing { .. } => None,
        })
    }

    /// How the group's last finished round ended, kept until the next one ends
    pub fn last_outcome(&self, gid: &GroupId) -> Option<RoundOutcome> {
        self.outcomes.get(gid).map(|outcome| outcome.clone())
    }

    fn finish(&self, game: &GuessGame) {
        self.outcomes
            .insert(game.gid.clone(), RoundOutcome::from(game));
    }

    /// Mark the first `count` hints of a live round as shown
    fn reveal_hints(&self, gid: &GroupId, round_id: RoundId, count: usize) {
        if let Some(mut slot) = self.rounds.get_mut(gid) {
            if let RoundSlot::Active { game, .. } = slot.value_mut() {
                if game.round_id == round_id {
                    game.hints_revealed = count;
                }
            }
        }
    }

    /// Reserve the group, build a question and register the round.
    ///
    /// Does not arm any timer; see [`GuessService::start_round`].
    #[instrument(skip(self, gid), fields(gid = %gid))]
    pub async fn start(
        &self,
        gid: &GroupId,
        variant: GuessVariant,
    ) -> Result<StartedRound, GuessError> {
        let round_id = RoundId::new();
        match self.rounds.entry(gid.clone()) {
            Entry::Occupied(_) => return Err(GuessError::AlreadyPlaying),
            Entry::Vacant(slot) => {
                slot.insert(RoundSlot::Preparing { round_id });
            }
        }

        let (answer, question) = match self.build_question(variant).await {
            Ok(built) => built,
            Err(e) => {
                self.rounds
                    .remove_if(gid, |_, slot| slot.round_id() == round_id);
                return Err(e);
            }
        };

        let game = GuessGame::new(round_id, gid.clone(), answer, question);
        let (solved_tx, solved) = oneshot::channel();
        if let Some(mut slot) = self.rounds.get_mut(gid) {
            if slot.round_id() == round_id {
                *slot = RoundSlot::Active {
                    game: game.clone(),
                    solved_tx,
                };
            }
        }

        debug!(round_id = %round_id, answer = %game.answer.name, "Round answer chosen");
        info!(round_id = %round_id, variant = %variant, "Guess round started");
        self.emit(RoundEvent::Started {
            gid: gid.clone(),
            round_id,
            variant,
        });

        Ok(StartedRound { game, solved })
    }

    /// Start a round and spawn its timer
    pub async fn start_round(
        self: &Arc<Self>,
        gid: &GroupId,
        variant: GuessVariant,
    ) -> Result<GuessGame, GuessError> {
        let StartedRound { game, solved } = self.start(gid, variant).await?;
        let service = Arc::clone(self);
        let driven = game.clone();
        tokio::spawn(async move { service.run_round(driven, solved).await });
        Ok(game)
    }

    /// Drive a round until it is solved or runs out of time.
    ///
    /// Image rounds wait one turn. Description rounds wait the prepare time,
    /// then reveal one hint per turn, stopping as soon as someone is right.
    pub async fn run_round(&self, game: GuessGame, solved: oneshot::Receiver<UserId>) {
        let gid = game.gid.clone();
        let round_id = game.round_id;
        tokio::pin!(solved);

        let finished_early = match &game.question {
            Question::AvatarCrop { .. } => {
                Self::wait_unless_solved(&mut solved, self.settings.avatar_turn).await
            }
            Question::CardCrop { .. } => {
                Self::wait_unless_solved(&mut solved, self.settings.card_turn).await
            }
            Question::Profile { hints } => {
                let mut solved_early =
                    Self::wait_unless_solved(&mut solved, self.settings.desc_prepare).await;
                let total = hints.len();
                for (index, hint) in hints.iter().enumerate() {
                    if solved_early {
                        break;
                    }
                    self.reveal_hints(&gid, round_id, index + 1);
                    self.emit(RoundEvent::Hint {
                        gid: gid.clone(),
                        round_id,
                        index: index + 1,
                        total,
                        hint: hint.clone(),
                    });
                    solved_early =
                        Self::wait_unless_solved(&mut solved, self.settings.desc_turn).await;
                }
                solved_early
            }
        };

        if !finished_early {
            self.expire(&gid, round_id);
        }
    }

    /// `true` when the round was resolved before the deadline
    async fn wait_unless_solved(
        solved: &mut std::pin::Pin<&mut oneshot::Receiver<UserId>>,
        deadline: Duration,
    ) -> bool {
        tokio::select! {
            // a dropped sender means the slot is already gone
            _ = solved.as_mut() => true,
            _ = tokio::time::sleep(deadline) => false,
        }
    }

    /// End a round nobody solved. A no-op unless `round_id` is still the
    /// group's active round.
    pub fn expire(&self, gid: &GroupId, round_id: RoundId) -> Option<GuessGame> {
        let (_, slot) = self
            .rounds
            .remove_if(gid, |_, slot| slot.is_active_round(round_id))?;
        let RoundSlot::Active { game, .. } = slot else {
            return None;
        };

        info!(gid = %gid, round_id = %round_id, answer = %game.answer.name, "Guess round expired");
        self.finish(&game);
        self.emit(RoundEvent::Revealed {
            gid: gid.clone(),
            round_id,
            variant: game.variant(),
            answer: game.answer.name.clone(),
        });
        Some(game)
    }

    /// Offer one message as an answer
    #[instrument(skip(self, gid, text), fields(gid = %gid))]
    pub async fn submit(
        &self,
        gid: &GroupId,
        uid: &UserId,
        text: &str,
    ) -> Result<SubmitOutcome, GuessError> {
        let (round_id, answer) = match self.rounds.get(gid).as_deref() {
            Some(RoundSlot::Active { game, .. }) => (game.round_id, game.answer.clone()),
            _ => return Ok(SubmitOutcome::NoActiveGame),
        };

        let data = self.data.snapshot().await;
        let matched = data.roster.match_name(text);
        let candidate = data.roster.character(&matched.id, answer.star);
        if matched.score < self.settings.match_threshold || candidate != answer {
            return Ok(SubmitOutcome::Wrong { matched });
        }

        let Some((_, slot)) = self
            .rounds
            .remove_if(gid, |_, slot| slot.is_active_round(round_id))
        else {
            return Ok(SubmitOutcome::NoActiveGame);
        };
        let RoundSlot::Active { mut game, solved_tx } = slot else {
            return Ok(SubmitOutcome::NoActiveGame);
        };

        game.winner = Some(uid.clone());
        let _ = solved_tx.send(uid.clone());
        self.finish(&game);

        let variant = game.variant();
        let wins = match self.wins.record_win(variant, gid, uid).await {
            Ok(count) => Some(count),
            Err(e) => {
                error!(uid = %uid, error = %e, "Failed to record guess win");
                None
            }
        };

        info!(round_id = %round_id, uid = %uid, answer = %game.answer.name, "Guess round solved");
        self.emit(RoundEvent::Solved {
            gid: gid.clone(),
            round_id,
            variant,
            winner: uid.clone(),
            answer: game.answer.name.clone(),
            wins,
        });

        Ok(SubmitOutcome::Correct { game, wins })
    }

    pub async fn ranking(
        &self,
        variant: GuessVariant,
        gid: &GroupId,
    ) -> Result<Vec<(UserId, u32)>, GuessError> {
        Ok(self.wins.ranking(variant, gid, RANKING_SIZE).await?)
    }

    fn choose(&self, candidates: &[CharaId]) -> Option<CharaId> {
        if candidates.is_empty() {
            None
        } else {
            Some(candidates[self.random.index(candidates.len())].clone())
        }
    }

    async fn build_question(
        &self,
        variant: GuessVariant,
    ) -> Result<(Character, Question), GuessError> {
        let data = self.data.snapshot().await;
        let roster = &data.roster;

        match variant {
            GuessVariant::Avatar => {
                let id = self
                    .choose(&roster.eligible_ids(&self.settings.avatar_blacklist))
                    .ok_or(GuessError::NoCandidates(variant))?;
                let star = ARTWORK_STARS[self.random.index(ARTWORK_STARS.len())];
                let icon = self.images.resolve(ImageKind::Icon, &id, star).await?;
                let png = crop_patch(&icon, self.settings.avatar_patch_size, self.random.as_ref())?;
                let answer = roster.character(&id, star).with_icon(icon);
                Ok((answer, Question::AvatarCrop { png }))
            }
            GuessVariant::Card => {
                let id = self
                    .choose(&roster.eligible_ids(&self.settings.card_blacklist))
                    .ok_or(GuessError::NoCandidates(variant))?;
                let star = ARTWORK_STARS[self.random.index(ARTWORK_STARS.len())];
                let card = self.images.resolve(ImageKind::Card, &id, star).await?;
                let png = crop_patch(&card, self.settings.card_patch_size, self.random.as_ref())?;
                let answer = roster.character(&id, star).with_card(card);
                Ok((answer, Question::CardCrop { png }))
            }
            GuessVariant::Description => {
                let candidates: Vec<CharaId> = roster
                    .eligible_ids(&[])
                    .into_iter()
                    .filter(|id| roster.profile(id).is_some_and(|p| !p.is_empty()))
                    .collect();
                let id = self
                    .choose(&candidates)
                    .ok_or(GuessError::NoCandidates(variant))?;
                let hints = self.pick_hints(roster, &id);
                let icon =
                    resolve_or_placeholder(self.images.as_ref(), ImageKind::Icon, &id, 3).await;
                let answer = roster.character(&id, 3).with_icon(icon);
                Ok((answer, Question::Profile { hints }))
            }
        }
    }

    /// A shuffled subset of the character's profile facts
    fn pick_hints(&self, roster: &Roster, id: &CharaId) -> Vec<ProfileHint> {
        let mut hints: Vec<ProfileHint> = roster
            .profile(id)
            .map(|profile| {
                profile
                    .iter()
                    .map(|(key, value)| ProfileHint {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        for i in (1..hints.len()).rev() {
            let j = self.random.index(i + 1);
            hints.swap(i, j);
        }
        hints.truncate(self.settings.desc_turn_number);
        hints
    }
}
