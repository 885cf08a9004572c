//! 재시도 정책.
//!
//! 전송 호출을 감싸는 명시적 재시도 루프. 시도 횟수와 backoff factor로
//! 매개변수화되며, 재시도 대상 여부는 에러 타입이 [`Retryable`]로 판단한다.
//!
//! k번째 재시도 전 대기: `backoff_factor * 2^(k-1)` 초 (상한 [`DEFAULT_MAX_DELAY`]).

use lsbridge_core::error::DeliveryError;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// 재시도 대기 상한
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(120);

/// 재시도 가능 여부를 판단할 수 있는 에러
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for DeliveryError {
    fn is_retryable(&self) -> bool {
        DeliveryError::is_retryable(self)
    }
}

/// 재시도 소진 또는 재시도 불가 에러
#[derive(Debug)]
pub struct RetryError<E> {
    /// 총 시도 횟수
    pub attempts: u32,
    /// 마지막 에러
    pub last: E,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}회 시도 후 실패: {}", self.attempts, self.last)
    }
}

/// 지수 backoff 재시도 정책
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_factor: f64,
    max_delay: Duration,
}

impl RetryPolicy {
    /// 새 정책 생성: 최초 시도 + 최대 `max_retries`회 재시도
    pub fn new(max_retries: u32, backoff_factor: f64) -> Self {
        Self {
            max_retries,
            backoff_factor,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// 대기 상한 설정
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// 총 허용 시도 횟수
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// `retry`번째 재시도(1부터) 전 대기 시간
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.backoff_factor * 2f64.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        if !capped.is_finite() || capped <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }

    /// 재시도 루프 실행
    ///
    /// `operation`은 1부터 시작하는 시도 번호를 받는다. 재시도 불가 에러는 즉시 반환한다.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "요청 실패 (시도 {attempt}/{max_attempts}): {e}, {delay:?} 후 재시도"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(RetryError { attempts: attempt, last: e }),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            lsbridge_core::config::DEFAULT_RETRIES,
            lsbridge_core::config::DEFAULT_BACKOFF_FACTOR,
        )
    }
}
