//! Sign Service - daily sign-in with goodwill and a stamp collection
//!
//! A group member may sign in once per local calendar day. Each sign-in
//! grants 1-10 goodwill, a login present, a suggestion for the day and a
//! random character stamp that is added to the member's collection.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument};

use crate::application::ports::outbound::{RandomPort, SignRecordError, SignRecordPort};
use crate::application::services::GameDataService;
use crate::domain::entities::Character;
use crate::domain::value_objects::{CharaId, GroupId, UserId};

const GOODWILL_RANKING_SIZE: u32 = 10;
const MIN_GOODWILL: u32 = 1;
const MAX_GOODWILL: u32 = 10;
const STAMP_STAR: u8 = 3;

const LOGIN_PRESENTS: &[&str] = &[
    "扫荡券×5",
    "卢币×1000",
    "普通EXP药水×5",
    "宝石×50",
    "玛那×3000",
    "扫荡券×10",
    "卢币×1500",
    "普通EXP药水×15",
    "宝石×80",
    "白金转蛋券×1",
    "扫荡券×15",
    "卢币×2000",
    "上级精炼石×3",
    "宝石×100",
    "白金转蛋券×1",
];

const TODO_LIST: &[&str] = &[
    "找伊绪老师上课",
    "给宫子买布丁",
    "和真琴寻找伤害优衣的人",
    "找镜哥探讨女装",
    "跟吉塔一起登上骑空艇",
    "和霞一起调查伤害优衣的人",
    "和佩可小姐一起吃午饭",
    "找小小甜心玩过家家",
    "帮碧寻找新朋友",
    "去真步真步王国",
    "找镜华补习数学",
    "陪胡桃排练话剧",
    "和初音一起午睡",
    "成为露娜的朋友",
    "帮铃莓打扫咲恋育幼院",
    "和静流小姐一起做巧克力",
    "去伊丽莎白农场给栞小姐送书",
    "观看慈乐之音的演出",
    "解救挂树的队友",
    "来一发十连",
    "井一发当期的限定池",
    "给妈妈买一束康乃馨",
    "购买黄金保值",
    "竞技场背刺",
    "给别的女人打钱",
    "氪一单",
    "努力工作，尽早报答妈妈的养育之恩",
    "成为魔法少女",
    "搓一把日麻",
];

#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error("No characters available as stamps")]
    NoStamps,
    #[error(transparent)]
    Record(#[from] SignRecordError),
}

/// What a successful sign-in hands out
#[derive(Debug, Clone, Serialize)]
pub struct SignCard {
    pub goodwill_gained: u32,
    /// Total goodwill in this group after the sign-in
    pub goodwill: u32,
    pub goodwill_rank: Option<u32>,
    pub present: String,
    pub todo: String,
    pub stamp: Character,
    /// `false` when the stamp was already in the collection
    pub new_stamp: bool,
}

#[derive(Debug, Clone)]
pub enum SignOutcome {
    AlreadySigned,
    Signed(SignCard),
}

#[derive(Debug, Clone, Serialize)]
pub struct GoodwillEntry {
    pub uid: UserId,
    pub goodwill: u32,
}

/// A member's stamp collection and where they stand in the group
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub stamps: Vec<Character>,
    pub owned: usize,
    pub total: usize,
    pub collection_rank: Option<u32>,
    pub goodwill_rank: Option<u32>,
    pub goodwill_ranking: Vec<GoodwillEntry>,
}

pub struct SignService {
    data: Arc<GameDataService>,
    random: Arc<dyn RandomPort>,
    records: Arc<dyn SignRecordPort>,
    offset: FixedOffset,
}

impl SignService {
    pub fn new(
        data: Arc<GameDataService>,
        random: Arc<dyn RandomPort>,
        records: Arc<dyn SignRecordPort>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            data,
            random,
            records,
            offset,
        }
    }

    fn local_day(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    pub async fn sign_in(&self, gid: &GroupId, uid: &UserId) -> Result<SignOutcome, SignError> {
        self.sign_in_at(gid, uid, Utc::now()).await
    }

    #[instrument(skip(self, gid, now), fields(gid = %gid))]
    pub async fn sign_in_at(
        &self,
        gid: &GroupId,
        uid: &UserId,
        now: DateTime<Utc>,
    ) -> Result<SignOutcome, SignError> {
        let data = self.data.snapshot().await;
        let candidates = data.roster.eligible_ids(&[]);
        if candidates.is_empty() {
            return Err(SignError::NoStamps);
        }

        let gained = self.random.pick(MIN_GOODWILL, MAX_GOODWILL);
        let day = self.local_day(now);
        let Some(goodwill) = self.records.sign_in(gid, uid, day, gained).await? else {
            debug!(uid = %uid, day = %day, "Already signed in today");
            return Ok(SignOutcome::AlreadySigned);
        };

        let stamp_id = &candidates[self.random.index(candidates.len())];
        let new_stamp = self
            .records
            .add_card(gid, uid, stamp_id)
            .await
            .inspect_err(|e| error!(uid = %uid, error = %e, "Failed to record stamp"))?;
        let goodwill_rank = self.records.goodwill_rank(gid, uid).await?;

        let present = LOGIN_PRESENTS[self.random.index(LOGIN_PRESENTS.len())];
        let todo = TODO_LIST[self.random.index(TODO_LIST.len())];

        info!(uid = %uid, gained, goodwill, stamp = %stamp_id, "Signed in");
        Ok(SignOutcome::Signed(SignCard {
            goodwill_gained: gained,
            goodwill,
            goodwill_rank,
            present: present.to_string(),
            todo: todo.to_string(),
            stamp: data.roster.character(stamp_id, STAMP_STAR),
            new_stamp,
        }))
    }

    pub async fn collection(&self, gid: &GroupId, uid: &UserId) -> Result<Collection, SignError> {
        let data = self.data.snapshot().await;
        let owned: Vec<CharaId> = self.records.cards(gid, uid).await?;
        let collection_rank = self.records.collection_rank(gid, uid).await?;
        let goodwill_rank = self.records.goodwill_rank(gid, uid).await?;
        let goodwill_ranking = self
            .records
            .goodwill_ranking(gid, GOODWILL_RANKING_SIZE)
            .await?
            .into_iter()
            .map(|(uid, goodwill)| GoodwillEntry { uid, goodwill })
            .collect();

        Ok(Collection {
            owned: owned.len(),
            total: data.roster.eligible_ids(&[]).len(),
            stamps: owned
                .iter()
                .map(|id| data.roster.character(id, STAMP_STAR))
                .collect(),
            collection_rank,
            goodwill_rank,
            goodwill_ranking,
        })
    }
}
