//! Fortune slip data - luck descriptions keyed by frame and luck titles

use serde::{Deserialize, Deserializer, Serialize};

/// One possible reading for a frame
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LuckEntry {
    #[serde(rename = "good-luck")]
    pub good_luck: i32,
    pub content: String,
}

/// Readings shared by a group of frames
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LuckDescription {
    /// Frame ids this group applies to
    #[serde(rename = "charaid", deserialize_with = "deserialize_frame_ids")]
    pub frame_ids: Vec<u32>,
    #[serde(rename = "type")]
    pub entries: Vec<LuckEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LuckType {
    #[serde(rename = "good-luck")]
    pub good_luck: i32,
    pub name: String,
}

/// Everything needed to write a fortune slip
#[derive(Debug, Clone, Default)]
pub struct FortuneData {
    pub descriptions: Vec<LuckDescription>,
    pub types: Vec<LuckType>,
}

impl FortuneData {
    pub fn new(descriptions: Vec<LuckDescription>, types: Vec<LuckType>) -> Self {
        Self {
            descriptions,
            types,
        }
    }

    pub fn readings_for(&self, frame_id: u32) -> Option<&[LuckEntry]> {
        self.descriptions
            .iter()
            .find(|d| d.frame_ids.contains(&frame_id))
            .map(|d| d.entries.as_slice())
    }

    pub fn title_of(&self, good_luck: i32) -> Option<&str> {
        self.types
            .iter()
            .find(|t| t.good_luck == good_luck)
            .map(|t| t.name.as_str())
    }
}

/// A drawn fortune
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FortuneSlip {
    pub frame_id: u32,
    pub title: String,
    pub content: String,
}

/// Frame ids are published as strings in some data sets and numbers in others
fn deserialize_frame_ids<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FrameId {
        Number(u32),
        Text(String),
    }

    Vec::<FrameId>::deserialize(deserializer)?
        .into_iter()
        .map(|id| match id {
            FrameId::Number(n) => Ok(n),
            FrameId::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid frame id: {}", s))),
        })
        .collect()
}
