//! Guess game entity - one round of "who is this character"

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::Character;
use crate::domain::value_objects::{GroupId, RoundId, UserId};

/// Game mode; each mode keeps its own win table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuessVariant {
    Avatar,
    Card,
    Description,
}

impl GuessVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avatar => "avatar",
            Self::Card => "card",
            Self::Description => "description",
        }
    }
}

impl std::fmt::Display for GuessVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GuessVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "avatar" | "icon" => Ok(Self::Avatar),
            "card" => Ok(Self::Card),
            "description" | "desc" | "profile" => Ok(Self::Description),
            other => Err(format!("Unknown guess variant: {}", other)),
        }
    }
}

/// A single profile fact revealed as a hint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileHint {
    pub key: String,
    pub value: String,
}

/// What the players are shown
#[derive(Debug, Clone, PartialEq)]
pub enum Question {
    /// A square patch cut from the character icon, PNG encoded
    AvatarCrop { png: Vec<u8> },
    /// A square patch cut from the full card art, PNG encoded
    CardCrop { png: Vec<u8> },
    /// Profile facts, revealed one at a time
    Profile { hints: Vec<ProfileHint> },
}

impl Question {
    pub fn variant(&self) -> GuessVariant {
        match self {
            Self::AvatarCrop { .. } => GuessVariant::Avatar,
            Self::CardCrop { .. } => GuessVariant::Card,
            Self::Profile { .. } => GuessVariant::Description,
        }
    }

    pub fn image(&self) -> Option<&[u8]> {
        match self {
            Self::AvatarCrop { png } | Self::CardCrop { png } => Some(png),
            Self::Profile { .. } => None,
        }
    }

    pub fn hints(&self) -> &[ProfileHint] {
        match self {
            Self::Profile { hints } => hints,
            _ => &[],
        }
    }
}

/// An active round for a group
#[derive(Debug, Clone)]
pub struct GuessGame {
    pub round_id: RoundId,
    pub gid: GroupId,
    /// Set once, by the first correct answer
    pub winner: Option<UserId>,
    pub answer: Character,
    pub question: Question,
    /// Profile hints shown so far
    pub hints_revealed: usize,
    pub started_at: DateTime<Utc>,
}

impl GuessGame {
    pub fn new(round_id: RoundId, gid: GroupId, answer: Character, question: Question) -> Self {
        Self {
            round_id,
            gid,
            winner: None,
            answer,
            question,
            hints_revealed: 0,
            started_at: Utc::now(),
        }
    }

    pub fn variant(&self) -> GuessVariant {
        self.question.variant()
    }

    pub fn revealed_hints(&self) -> &[ProfileHint] {
        let hints = self.question.hints();
        &hints[..self.hints_revealed.min(hints.len())]
    }
}
