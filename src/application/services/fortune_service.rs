//! Fortune Service - one daily fortune slip per user, up to a limit

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use tracing::{debug, instrument};

use crate::application::ports::outbound::RandomPort;
use crate::domain::entities::{FortuneData, FortuneSlip};
use crate::domain::value_objects::UserId;

/// Fortune frames are numbered 1..=66
pub const FRAME_COUNT: u32 = 66;

#[derive(Debug, thiserror::Error)]
pub enum FortuneError {
    #[error("Daily limit of {0} reached")]
    LimitReached(u32),
    #[error("No luck description for frame {0}")]
    MissingDescription(u32),
    #[error("No luck title for good-luck value {0}")]
    MissingLuckType(i32),
}

/// UTC offset in whole hours; out-of-range offsets fall back to UTC
pub fn utc_offset_hours(hours: i32) -> FixedOffset {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

#[derive(Debug, Default)]
struct LimiterState {
    day: Option<NaiveDate>,
    counts: HashMap<String, u32>,
}

/// Per-key counter that starts over whenever the calendar day changes in
/// the configured timezone
#[derive(Debug)]
pub struct DailyLimiter {
    max: u32,
    offset: FixedOffset,
    state: Mutex<LimiterState>,
}

impl DailyLimiter {
    pub fn new(max: u32, offset: FixedOffset) -> Self {
        Self {
            max,
            offset,
            state: Mutex::new(LimiterState::default()),
        }
    }

    pub fn with_utc_offset_hours(max: u32, hours: i32) -> Self {
        Self::new(max, utc_offset_hours(hours))
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    fn with_state<T>(&self, now: DateTime<Utc>, f: impl FnOnce(&mut LimiterState) -> T) -> T {
        let today = now.with_timezone(&self.offset).date_naive();
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.day != Some(today) {
            state.day = Some(today);
            state.counts.clear();
        }
        f(&mut state)
    }

    /// `true` while the key is under the limit today
    pub fn check(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.count(key, now) < self.max
    }

    pub fn count(&self, key: &str, now: DateTime<Utc>) -> u32 {
        self.with_state(now, |state| state.counts.get(key).copied().unwrap_or(0))
    }

    pub fn increase(&self, key: &str, now: DateTime<Utc>) {
        self.with_state(now, |state| *state.counts.entry(key.to_string()).or_insert(0) += 1);
    }
}

pub struct FortuneService {
    data: FortuneData,
    random: Arc<dyn RandomPort>,
    limiter: DailyLimiter,
}

impl FortuneService {
    pub fn new(data: FortuneData, random: Arc<dyn RandomPort>, limiter: DailyLimiter) -> Self {
        Self {
            data,
            random,
            limiter,
        }
    }

    pub fn draw(&self, uid: &UserId) -> Result<FortuneSlip, FortuneError> {
        self.draw_at(uid, Utc::now())
    }

    /// Draw a slip as of `now`; the attempt counts against the limit even
    /// if the data set turns out to be incomplete
    #[instrument(skip(self, now))]
    pub fn draw_at(&self, uid: &UserId, now: DateTime<Utc>) -> Result<FortuneSlip, FortuneError> {
        if !self.limiter.check(uid.as_str(), now) {
            return Err(FortuneError::LimitReached(self.limiter.max()));
        }
        self.limiter.increase(uid.as_str(), now);

        let frame_id = self.random.pick(1, FRAME_COUNT);
        let readings = self
            .data
            .readings_for(frame_id)
            .filter(|r| !r.is_empty())
            .ok_or(FortuneError::MissingDescription(frame_id))?;
        let reading = &readings[self.random.index(readings.len())];
        let title = self
            .data
            .title_of(reading.good_luck)
            .ok_or(FortuneError::MissingLuckType(reading.good_luck))?;

        debug!(frame_id, title, "Fortune drawn");
        Ok(FortuneSlip {
            frame_id,
            title: title.to_string(),
            content: reading.content.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::ScriptedRandom;
    use crate::domain::entities::{LuckDescription, LuckEntry, LuckType};
    use chrono::TimeZone;

    fn data() -> FortuneData {
        FortuneData::new(
            vec![
                LuckDescription {
                    frame_ids: (1..=33).collect(),
                    entries: vec![LuckEntry {
                        good_luck: 1,
                        content: "诸事顺利".to_string(),
                    }],
                },
                LuckDescription {
                    frame_ids: vec![66],
                    entries: vec![LuckEntry {
                        good_luck: 9,
                        content: "无人知晓".to_string(),
                    }],
                },
            ],
            vec![LuckType {
                good_luck: 1,
                name: "大吉".to_string(),
            }],
        )
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_limiter_resets_on_local_day_change() {
        let limiter = DailyLimiter::with_utc_offset_hours(2, 8);
        let morning = at(2024, 5, 1, 1); // 09:00 UTC+8
        limiter.increase("u1", morning);
        limiter.increase("u1", morning);
        assert!(!limiter.check("u1", morning));
        assert!(limiter.check("u2", morning));

        // 15:00 UTC is still 23:00 on the same local day
        assert!(!limiter.check("u1", at(2024, 5, 1, 15)));
        // 16:00 UTC is local midnight
        assert!(limiter.check("u1", at(2024, 5, 1, 16)));
        assert_eq!(limiter.count("u1", at(2024, 5, 1, 16)), 0);
    }

    #[test]
    fn test_out_of_range_offset_is_utc() {
        assert_eq!(utc_offset_hours(8).local_minus_utc(), 8 * 3600);
        assert_eq!(utc_offset_hours(30).local_minus_utc(), 0);
        assert_eq!(utc_offset_hours(i32::MAX).local_minus_utc(), 0);
    }

    #[test]
    fn test_draw_and_limit() {
        let service = FortuneService::new(
            data(),
            Arc::new(ScriptedRandom::new([7, 12])),
            DailyLimiter::with_utc_offset_hours(1, 8),
        );
        let uid = UserId::from("u1");
        let now = at(2024, 5, 1, 4);

        let slip = service.draw_at(&uid, now).unwrap();
        assert_eq!(slip.frame_id, 7);
        assert_eq!(slip.title, "大吉");
        assert_eq!(slip.content, "诸事顺利");

        let err = service.draw_at(&uid, now).unwrap_err();
        assert!(matches!(err, FortuneError::LimitReached(1)));
        assert!(service.draw_at(&UserId::from("u2"), now).is_ok());
    }

    #[test]
    fn test_incomplete_data_is_reported() {
        let service = FortuneService::new(
            data(),
            Arc::new(ScriptedRandom::new([50, 66])),
            DailyLimiter::with_utc_offset_hours(5, 8),
        );
        let uid = UserId::from("u1");
        let now = at(2024, 5, 1, 4);

        assert!(matches!(
            service.draw_at(&uid, now),
            Err(FortuneError::MissingDescription(50))
        ));
        assert!(matches!(
            service.draw_at(&uid, now),
            Err(FortuneError::MissingLuckType(9))
        ));
    }
}
