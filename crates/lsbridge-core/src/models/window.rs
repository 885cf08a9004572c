//! 조회 시간 창.

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// 쿼리 파라미터용 ISO-8601 형식 (`2024-05-01T12:34:00+00:00`)
const ISO_OFFSET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// 한 번의 실행에서 조회하는 `[oldest, youngest]` 구간
///
/// 두 시각 모두 분 단위로 내림된다. 실행마다 새로 계산하며 캐시하지 않는다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub oldest: DateTime<Utc>,
    pub youngest: DateTime<Utc>,
}

impl TimeWindow {
    /// `now`에서 끝나는 `window_seconds` 길이의 구간
    pub fn ending_at(now: DateTime<Utc>, window_seconds: u64) -> Self {
        let span = i64::try_from(window_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        let start = now
            .checked_sub_signed(span)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        Self {
            oldest: floor_to_minute(start),
            youngest: floor_to_minute(now),
        }
    }

    /// 현재 시각 기준 구간
    pub fn now(window_seconds: u64) -> Self {
        Self::ending_at(Utc::now(), window_seconds)
    }

    /// `oldest-time` 쿼리 값
    pub fn oldest_param(&self) -> String {
        self.oldest.format(ISO_OFFSET_FORMAT).to_string()
    }

    /// `youngest-time` 쿼리 값
    pub fn youngest_param(&self) -> String {
        self.youngest.format(ISO_OFFSET_FORMAT).to_string()
    }
}

/// 초/나노초를 버리고 분 단위로 내림
pub fn floor_to_minute(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .unwrap_or(t)
}
