//! Deterministic port implementations and fixtures for service tests

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::application::ports::outbound::{
    GroupPoolError, GroupPoolPort, ImageError, ImageKind, ImageResolverPort, PoolVersion,
    RandomPort, SignRecordError, SignRecordPort, WinRecordError, WinRecordPort,
};
use crate::application::services::GameData;
use crate::domain::entities::{GuessVariant, Pool, PoolRegistry, Roster};
use crate::domain::value_objects::{CharaId, GroupId, UserId};

/// Replays a fixed list of picks, then falls back to the low bound.
/// `index` always answers 0.
pub struct ScriptedRandom {
    picks: Mutex<VecDeque<u32>>,
}

impl ScriptedRandom {
    pub fn new(picks: impl IntoIterator<Item = u32>) -> Self {
        Self {
            picks: Mutex::new(picks.into_iter().collect()),
        }
    }
}

impl RandomPort for ScriptedRandom {
    fn pick(&self, low: u32, _high: u32) -> u32 {
        self.picks.lock().unwrap().pop_front().unwrap_or(low)
    }

    fn index(&self, _len: usize) -> usize {
        0
    }
}

/// Reproducible randomness from a fixed seed
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomPort for SeededRandom {
    fn pick(&self, low: u32, high: u32) -> u32 {
        self.rng.lock().unwrap().gen_range(low..=high)
    }

    fn index(&self, len: usize) -> usize {
        self.rng.lock().unwrap().gen_range(0..len)
    }
}

#[derive(Default)]
pub struct InMemoryWinRecords {
    counts: Mutex<HashMap<(GuessVariant, GroupId, UserId), u32>>,
}

#[async_trait]
impl WinRecordPort for InMemoryWinRecords {
    async fn record_win(
        &self,
        variant: GuessVariant,
        gid: &GroupId,
        uid: &UserId,
    ) -> Result<u32, WinRecordError> {
        let mut counts = self.counts.lock().unwrap();
        let count = counts
            .entry((variant, gid.clone(), uid.clone()))
            .or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn ranking(
        &self,
        variant: GuessVariant,
        gid: &GroupId,
        limit: u32,
    ) -> Result<Vec<(UserId, u32)>, WinRecordError> {
        let counts = self.counts.lock().unwrap();
        let mut rows: Vec<(UserId, u32)> = counts
            .iter()
            .filter(|((v, g, _), _)| *v == variant && g == gid)
            .map(|((_, _, uid), count)| (uid.clone(), *count))
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

#[derive(Default)]
struct SignState {
    /// (goodwill, last signed day)
    goodwill: HashMap<(GroupId, UserId), (u32, NaiveDate)>,
    cards: HashMap<(GroupId, UserId), Vec<CharaId>>,
}

#[derive(Default)]
pub struct InMemorySignRecords {
    state: Mutex<SignState>,
}

/// 1-based place of `uid` when ranked by `score`, ties sharing a place
fn place_of<'a>(
    scores: impl Iterator<Item = (&'a UserId, u32)> + Clone,
    uid: &UserId,
) -> Option<u32> {
    let own = scores.clone().find(|(u, _)| *u == uid)?.1;
    Some(scores.filter(|(_, score)| *score > own).count() as u32 + 1)
}

#[async_trait]
impl SignRecordPort for InMemorySignRecords {
    async fn sign_in(
        &self,
        gid: &GroupId,
        uid: &UserId,
        day: NaiveDate,
        goodwill: u32,
    ) -> Result<Option<u32>, SignRecordError> {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .goodwill
            .entry((gid.clone(), uid.clone()))
            .or_insert((0, NaiveDate::MIN));
        if entry.1 == day {
            return Ok(None);
        }
        *entry = (entry.0 + goodwill, day);
        Ok(Some(entry.0))
    }

    async fn add_card(
        &self,
        gid: &GroupId,
        uid: &UserId,
        card: &CharaId,
    ) -> Result<bool, SignRecordError> {
        let mut state = self.state.lock().unwrap();
        let cards = state.cards.entry((gid.clone(), uid.clone())).or_default();
        if cards.contains(card) {
            return Ok(false);
        }
        cards.push(card.clone());
        Ok(true)
    }

    async fn cards(&self, gid: &GroupId, uid: &UserId) -> Result<Vec<CharaId>, SignRecordError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .cards
            .get(&(gid.clone(), uid.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn collection_rank(
        &self,
        gid: &GroupId,
        uid: &UserId,
    ) -> Result<Option<u32>, SignRecordError> {
        let state = self.state.lock().unwrap();
        let sizes = state
            .cards
            .iter()
            .filter(|((g, _), cards)| g == gid && !cards.is_empty())
            .map(|((_, u), cards)| (u, cards.len() as u32));
        Ok(place_of(sizes, uid))
    }

    async fn goodwill_ranking(
        &self,
        gid: &GroupId,
        limit: u32,
    ) -> Result<Vec<(UserId, u32)>, SignRecordError> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<(UserId, u32)> = state
            .goodwill
            .iter()
            .filter(|((g, _), _)| g == gid)
            .map(|((_, uid), (goodwill, _))| (uid.clone(), *goodwill))
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn goodwill_rank(
        &self,
        gid: &GroupId,
        uid: &UserId,
    ) -> Result<Option<u32>, SignRecordError> {
        let state = self.state.lock().unwrap();
        let scores = state
            .goodwill
            .iter()
            .filter(|((g, _), _)| g == gid)
            .map(|((_, u), (goodwill, _))| (u, *goodwill));
        Ok(place_of(scores, uid))
    }
}

#[derive(Default)]
pub struct InMemoryGroupPools {
    pools: Mutex<HashMap<GroupId, String>>,
}

#[async_trait]
impl GroupPoolPort for InMemoryGroupPools {
    async fn get_pool(&self, gid: &GroupId) -> Result<Option<String>, GroupPoolError> {
        Ok(self.pools.lock().unwrap().get(gid).cloned())
    }

    async fn set_pool(&self, gid: &GroupId, pool: &str) -> Result<(), GroupPoolError> {
        self.pools
            .lock()
            .unwrap()
            .insert(gid.clone(), pool.to_string());
        Ok(())
    }
}

/// Serves a generated square PNG for every character, or fails on demand
pub struct StaticImageResolver {
    side: u32,
    fail: bool,
}

impl StaticImageResolver {
    pub fn new(side: u32) -> Self {
        Self { side, fail: false }
    }

    pub fn failing() -> Self {
        Self { side: 8, fail: true }
    }
}

pub const PLACEHOLDER_BYTES: &[u8] = b"placeholder";

#[async_trait]
impl ImageResolverPort for StaticImageResolver {
    async fn resolve(&self, _kind: ImageKind, id: &CharaId, _star: u8) -> Result<Vec<u8>, ImageError> {
        if self.fail {
            return Err(ImageError::Http(format!("refused {}", id)));
        }
        Ok(test_png(self.side))
    }

    async fn placeholder(&self, _kind: ImageKind) -> Vec<u8> {
        PLACEHOLDER_BYTES.to_vec()
    }
}

/// A square gradient PNG
pub fn test_png(side: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(side, side, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn names(entries: &[(&str, &[&str])]) -> BTreeMap<CharaId, Vec<String>> {
    entries
        .iter()
        .map(|(id, aliases)| {
            (
                CharaId::from(*id),
                aliases.iter().map(|a| a.to_string()).collect(),
            )
        })
        .collect()
}

fn pool(up: u32, s3: u32, s2: u32, rosters: [&[&str]; 4]) -> Pool {
    let list = |names: &[&str]| names.iter().map(|n| n.to_string()).collect();
    Pool {
        name: String::new(),
        up_probability: up,
        s3_probability: s3,
        s2_probability: s2,
        up_roster: list(rosters[0]),
        star3_roster: list(rosters[1]),
        star2_roster: list(rosters[2]),
        star1_roster: list(rosters[3]),
    }
}

/// Rates whose bands are exactly 10% / 30% / 40% / 20%
pub fn statistics_pool() -> Pool {
    pool(100, 400, 400, [&["A"], &["B"], &["C"], &["D"]])
}

/// A small roster, a realistic `BL` pool and the single-name `E2E` pool
pub fn sample_data() -> GameData {
    let names = names(&[
        ("1018", &["镜华", "kyouka", "小仓唯"]),
        ("1060", &["佩可莉姆", "pecorine", "吃货"]),
        ("1059", &["可可萝", "kokkoro"]),
        ("1061", &["凯露", "karyl", "臭鼬"]),
        ("1001", &["日和", "hiyori"]),
        ("1701", &["环奈", "kanna"]),
        ("1000", &["未知角色"]),
        ("9000", &["路人"]),
        ("1901", &["A"]),
        ("1902", &["B"]),
        ("1903", &["C"]),
        ("1904", &["D"]),
    ]);

    let mut profiles = BTreeMap::new();
    let profile = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    };
    profiles.insert(
        CharaId::from("1018"),
        profile(&[
            ("年龄", "8"),
            ("身高", "132"),
            ("体重", "29"),
            ("生日", "12月2日"),
            ("血型", "AB"),
            ("种族", "人类"),
            ("公会", "小小甜心"),
        ]),
    );
    profiles.insert(
        CharaId::from("1060"),
        profile(&[("年龄", "17"), ("公会", "美食殿堂"), ("喜好", "吃")]),
    );

    let mut pools = BTreeMap::new();
    pools.insert(
        "BL".to_string(),
        pool(
            7,
            25,
            180,
            [&["环奈"], &["镜华", "凯露"], &["可可萝", "佩可莉姆"], &["日和"]],
        ),
    );
    pools.insert(
        "E2E".to_string(),
        pool(100, 500, 400, [&["A"], &["B"], &["C"], &["D"]]),
    );

    GameData::new(
        Roster::new(names, profiles),
        PoolRegistry::new(pools),
        PoolVersion::new("20240101"),
    )
}
