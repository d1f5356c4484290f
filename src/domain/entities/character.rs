//! Character entity - a drawable / guessable unit

use serde::Serialize;

use crate::domain::value_objects::CharaId;

/// A character as handed out by a draw or used as a guess answer.
///
/// Two characters are the same character when id and name match; star,
/// equip and the attached images are presentation details.
#[derive(Debug, Clone, Serialize)]
pub struct Character {
    pub id: CharaId,
    /// Star rarity (1, 2, 3 or 6)
    pub star: u8,
    pub equip: u32,
    pub name: String,
    /// Icon image bytes, resolved lazily
    #[serde(skip)]
    pub icon: Option<Vec<u8>>,
    /// Full card image bytes, resolved lazily
    #[serde(skip)]
    pub card: Option<Vec<u8>>,
}

impl Character {
    pub fn new(id: CharaId, name: impl Into<String>, star: u8) -> Self {
        Self {
            id,
            star,
            equip: 0,
            name: name.into(),
            icon: None,
            card: None,
        }
    }

    pub fn with_icon(mut self, icon: Vec<u8>) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn with_card(mut self, card: Vec<u8>) -> Self {
        self.card = Some(card);
        self
    }

    pub fn has_icon(&self) -> bool {
        self.icon.is_some()
    }
}

impl PartialEq for Character {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.name == other.name
    }
}

impl Eq for Character {}
