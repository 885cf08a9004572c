//! lsbridge 에러 타입.
//!
//! 설정 에러는 시작 시점에 치명적이며, 추출/전송 에러는 해당 타깃의
//! 한 번의 실행(run) 경계 안에서 처리된다.

use thiserror::Error;

/// 설정 에러: 스케줄링 시작 전에 프로세스를 중단시킨다.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 설정 파일 읽기 실패
    #[error("설정 파일 읽기 실패: {path}: {source}")]
    Read {
        /// 설정 파일 경로
        path: String,
        /// 원인 I/O 에러
        #[source]
        source: std::io::Error,
    },

    /// JSON 파싱 실패 (문법 오류, 타입 불일치)
    #[error("설정 파싱 실패: {0}")]
    Parse(String),

    /// 필수 필드 누락
    #[error("필수 설정 누락: {field}")]
    Missing {
        /// 누락된 필드 경로 (예: "targets[0].searches")
        field: String,
    },

    /// 범위/형식 제약 위반
    #[error("잘못된 설정: {field}: {message}")]
    Invalid {
        /// 위반한 필드 경로 (예: "targets[1].retries")
        field: String,
        /// 위반 사유
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 문제가 된 필드 경로 (있는 경우)
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Missing { field } | Self::Invalid { field, .. } => Some(field),
            Self::Read { .. } | Self::Parse(_) => None,
        }
    }
}

/// 타깃 한 번의 실행 중 발생하는 에러
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Lightstep 조회 실패 (non-2xx 또는 전송 에러)
    #[error("업스트림 조회 실패 (search={search}): {reason}")]
    UpstreamFailure {
        /// 실패한 검색 이름
        search: String,
        /// 실패 사유
        reason: String,
    },

    /// 응답 본문이 기대한 형태가 아님
    #[error("응답 파싱 실패 (search={search}): {reason}")]
    ParseFailure {
        /// 응답을 반환한 검색 이름
        search: String,
        /// 실패 사유
        reason: String,
    },

    /// HTTP 클라이언트 초기화 실패
    #[error("조회 클라이언트 초기화 실패: {0}")]
    Client(String),

    /// 배치 전송 실패
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// 수집 엔드포인트 전송 에러
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// 연결/읽기/타임아웃 등 전송 계층 실패
    #[error("전송 에러: {0}")]
    Transport(String),

    /// 수집 엔드포인트가 non-2xx 응답
    #[error("수집 엔드포인트 응답 에러 ({status}): {body}")]
    Status {
        /// HTTP 상태 코드
        status: u16,
        /// 응답 본문
        body: String,
    },

    /// 페이로드 압축 실패
    #[error("압축 실패: {0}")]
    Compression(String),

    /// 재시도 소진 후 최종 거부
    #[error("배치 {batch} 전송 거부 ({attempts}회 시도): {reason}")]
    Rejected {
        /// 0부터 시작하는 배치 순번
        batch: usize,
        /// 총 시도 횟수
        attempts: u32,
        /// 마지막 실패 사유
        reason: String,
    },
}

/// 응답 한 건을 레코드로 변환하지 못함
#[derive(Debug, Error)]
pub enum EncodeError {
    /// 본문이 기대한 JSON 형태가 아님
    #[error("응답 본문 디코딩 실패: {0}")]
    Decode(String),

    /// points-count 대비 배열 길이 부족
    #[error("{field} 길이 부족: {len} < points-count {points}")]
    ShortArray {
        /// 응답 필드 이름 (예: "ops-counts")
        field: String,
        /// 실제 길이
        len: usize,
        /// 선언된 포인트 수
        points: usize,
    },
}

/// 텍스트 레코드 한 줄을 해석하지 못함
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordParseError {
    /// 필수 key=value 토큰 누락 또는 순서 불일치
    #[error("레코드 필드 누락: {0}")]
    MissingField(&'static str),

    /// 값을 해석할 수 없음
    #[error("잘못된 레코드 값: {field}: {value}")]
    InvalidValue {
        /// 필드 이름
        field: &'static str,
        /// 원본 토큰
        value: String,
    },

    /// 해석 후 남은 토큰
    #[error("예상치 못한 토큰: {0}")]
    Trailing(String),
}

/// 재시도할 HTTP 상태 코드
pub const RETRYABLE_STATUS_CODES: [u16; 4] = [429, 502, 503, 504];

impl DeliveryError {
    /// 재시도 가능한 에러인지 판별
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => RETRYABLE_STATUS_CODES.contains(status),
            Self::Compression(_) | Self::Rejected { .. } => false,
        }
    }
}
