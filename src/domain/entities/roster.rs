//! Character roster - names, aliases, profiles and fuzzy lookup

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::entities::Character;
use crate::domain::value_objects::{normalize_name, similarity_ratio, CharaId};

/// Ids that exist in the data set but are not playable characters
const UNAVAILABLE: &[&str] = &[
    "1000", "1069", "1072", "1073", "1102", "1183", "1184", "1194", "1195", "1196", "1197",
    "1200", "1201", "1202", "1203", "1204", "1205", "1206",
];

/// Below this similarity the best candidate is not trusted and the first
/// roster entry is returned instead
const CLOSE_MATCH_CUTOFF: f64 = 0.6;

/// Best-effort result of matching free text against the roster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameMatch {
    /// The normalized roster name that was matched
    pub name: String,
    pub id: CharaId,
    /// Similarity in percent, 0..=100
    pub score: u8,
}

/// All character names and profiles.
///
/// `names` keeps every alias per id with the primary (display) name first;
/// `index` maps each normalized alias back to its id.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    names: BTreeMap<CharaId, Vec<String>>,
    index: BTreeMap<String, CharaId>,
    profiles: BTreeMap<CharaId, BTreeMap<String, String>>,
    collisions: Vec<(String, CharaId, CharaId)>,
}

impl Roster {
    pub fn new(
        names: BTreeMap<CharaId, Vec<String>>,
        profiles: BTreeMap<CharaId, BTreeMap<String, String>>,
    ) -> Self {
        let mut index = BTreeMap::new();
        let mut collisions = Vec::new();
        for (id, aliases) in &names {
            for alias in aliases {
                let key = normalize_name(alias);
                match index.get(&key) {
                    None => {
                        index.insert(key, id.clone());
                    }
                    Some(existing) if existing != id => {
                        collisions.push((key, id.clone(), existing.clone()));
                    }
                    Some(_) => {}
                }
            }
        }
        Self {
            names,
            index,
            profiles,
            collisions,
        }
    }

    /// Aliases claimed by more than one id: `(alias, rejected id, kept id)`
    pub fn collisions(&self) -> &[(String, CharaId, CharaId)] {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    /// Exact lookup after normalisation
    pub fn id_of(&self, name: &str) -> Option<&CharaId> {
        self.index.get(&normalize_name(name))
    }

    pub fn primary_name(&self, id: &CharaId) -> Option<&str> {
        self.names
            .get(id)
            .and_then(|aliases| aliases.first())
            .map(String::as_str)
    }

    pub fn profile(&self, id: &CharaId) -> Option<&BTreeMap<String, String>> {
        self.profiles.get(id)
    }

    /// Build a character for an id; unknown ids keep their id as the name
    pub fn character(&self, id: &CharaId, star: u8) -> Character {
        let name = self.primary_name(id).unwrap_or(id.as_str());
        Character::new(id.clone(), name, star)
    }

    /// Build a character from any alias; unresolvable names become the
    /// unknown character but keep the requested name for display
    pub fn character_by_name(&self, name: &str, star: u8) -> Character {
        match self.id_of(name) {
            Some(id) => self.character(id, star),
            None => Character::new(CharaId::unknown(), name, star),
        }
    }

    /// Characters that are not playable units (NPCs, collaborations not
    /// released, placeholders)
    pub fn is_npc(id: &CharaId) -> bool {
        if UNAVAILABLE.contains(&id.as_str()) {
            return true;
        }
        match id.number() {
            Some(n) => !((1000 < n && n < 1214) || (1700 < n && n < 1900)),
            None => true,
        }
    }

    /// Ids that may be used as a guess answer
    pub fn eligible_ids(&self, blacklist: &[String]) -> Vec<CharaId> {
        self.names
            .keys()
            .filter(|id| !Self::is_npc(id))
            .filter(|id| !blacklist.iter().any(|b| b == id.as_str()))
            .cloned()
            .collect()
    }

    /// Fuzzy-match free text against every known alias.
    ///
    /// Always answers: when nothing is close enough the first alias in the
    /// index is returned with its (low) score, and an empty roster answers
    /// with the unknown id at score 0. Callers decide what score to trust.
    pub fn match_name(&self, query: &str) -> NameMatch {
        let query = normalize_name(query);

        let best = self
            .index
            .iter()
            .map(|(name, id)| (name, id, similarity_ratio(&query, name)))
            .fold(None, |best: Option<(&String, &CharaId, f64)>, candidate| match best {
                Some(b) if b.2 >= candidate.2 => Some(b),
                _ => Some(candidate),
            });

        let chosen = match best {
            Some((name, id, ratio)) if ratio >= CLOSE_MATCH_CUTOFF => Some((name, id, ratio)),
            _ => self
                .index
                .iter()
                .next()
                .map(|(name, id)| (name, id, similarity_ratio(&query, name))),
        };

        match chosen {
            Some((name, id, ratio)) => NameMatch {
                name: name.clone(),
                id: id.clone(),
                score: (ratio * 100.0).round() as u8,
            },
            None => NameMatch {
                name: query,
                id: CharaId::unknown(),
                score: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        let mut names = BTreeMap::new();
        names.insert(
            CharaId::from("1018"),
            vec!["镜华".to_string(), "kyouka".to_string(), "小仓唯".to_string()],
        );
        names.insert(
            CharaId::from("1060"),
            vec!["佩可莉姆".to_string(), "pecorine".to_string(), "吃货".to_string()],
        );
        names.insert(CharaId::from("1072"), vec!["可萝爹".to_string()]);
        names.insert(CharaId::from("9000"), vec!["npc".to_string()]);
        let mut profiles = BTreeMap::new();
        let mut kyouka = BTreeMap::new();
        kyouka.insert("年龄".to_string(), "8".to_string());
        kyouka.insert("身高".to_string(), "132".to_string());
        profiles.insert(CharaId::from("1018"), kyouka);
        Roster::new(names, profiles)
    }

    #[test]
    fn test_exact_lookup_is_normalized() {
        let roster = roster();
        assert_eq!(roster.id_of("ＫＹＯＵＫＡ"), Some(&CharaId::from("1018")));
        assert_eq!(roster.id_of("鏡華"), Some(&CharaId::from("1018")));
        assert_eq!(roster.id_of("nobody"), None);
        assert_eq!(roster.primary_name(&CharaId::from("1060")), Some("佩可莉姆"));
    }

    #[test]
    fn test_character_by_name() {
        let roster = roster();
        let c = roster.character_by_name("pecorine", 3);
        assert_eq!(c.id, CharaId::from("1060"));
        assert_eq!(c.name, "佩可莉姆");

        let unknown = roster.character_by_name("谁", 1);
        assert!(unknown.id.is_unknown());
        assert_eq!(unknown.name, "谁");
    }

    #[test]
    fn test_npc_classification() {
        assert!(Roster::is_npc(&CharaId::from("1000")));
        assert!(Roster::is_npc(&CharaId::from("1072")));
        assert!(Roster::is_npc(&CharaId::from("9000")));
        assert!(Roster::is_npc(&CharaId::from("1214")));
        assert!(!Roster::is_npc(&CharaId::from("1018")));
        assert!(!Roster::is_npc(&CharaId::from("1701")));
    }

    #[test]
    fn test_eligible_ids_excludes_npc_and_blacklist() {
        let roster = roster();
        assert_eq!(
            roster.eligible_ids(&[]),
            vec![CharaId::from("1018"), CharaId::from("1060")]
        );
        assert_eq!(
            roster.eligible_ids(&["1060".to_string()]),
            vec![CharaId::from("1018")]
        );
    }

    #[test]
    fn test_match_name_close_and_fallback() {
        let roster = roster();
        let m = roster.match_name("pecorin");
        assert_eq!(m.id, CharaId::from("1060"));
        assert!(m.score >= 80);

        let exact = roster.match_name("Kyouka");
        assert_eq!(exact.id, CharaId::from("1018"));
        assert_eq!(exact.score, 100);

        // a single character of a two-character name still clears the cutoff
        let partial = roster.match_name("镜");
        assert_eq!(partial.id, CharaId::from("1018"));
        assert_eq!(partial.score, 67);

        // nothing close: falls back to the first indexed alias
        let far = roster.match_name("zzzzzzzzzzzz");
        assert!(far.score < 60);
        assert_eq!(far.name, "kyouka");
    }

    #[test]
    fn test_match_name_on_empty_roster() {
        let m = Roster::default().match_name("anyone");
        assert!(m.id.is_unknown());
        assert_eq!(m.score, 0);
    }

    #[test]
    fn test_collisions_are_reported() {
        let mut names = BTreeMap::new();
        names.insert(CharaId::from("1001"), vec!["日和".to_string()]);
        names.insert(CharaId::from("1002"), vec!["日和".to_string()]);
        let roster = Roster::new(names, BTreeMap::new());
        assert_eq!(roster.collisions().len(), 1);
        assert_eq!(roster.id_of("日和"), Some(&CharaId::from("1001")));
    }
}
