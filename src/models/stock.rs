//! 종목 및 시세 데이터 모델
//!
//! KRX 상장 종목과 특정 거래일의 시세 스냅샷을 정의

use serde::{Deserialize, Serialize};

/// 시장 구분
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    /// 유가증권시장
    Kospi,
    /// 코스닥
    Kosdaq,
    /// 코넥스
    Konex,
    /// 전체
    All,
}

impl Market {
    /// KRX 정보데이터시스템의 mktId 값
    pub fn krx_id(&self) -> &'static str {
        match self {
            Market::Kospi => "STK",
            Market::Kosdaq => "KSQ",
            Market::Konex => "KNX",
            Market::All => "ALL",
        }
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Market::Kospi => write!(f, "KOSPI"),
            Market::Kosdaq => write!(f, "KOSDAQ"),
            Market::Konex => write!(f, "KONEX"),
            Market::All => write!(f, "ALL"),
        }
    }
}

/// 상장 종목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    /// 단축코드 (예: 005930)
    pub code: String,
    /// 종목명
    pub name: String,
    /// 표준코드 (예: KR7005930003), 개별 종목 시세 조회에 사용
    pub isin: String,
}

/// 거래일 기준 시세 스냅샷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// 단축코드
    pub code: String,
    /// 종가 (거래가 없으면 0)
    pub current_price: i64,
    /// 상장주식수 (데이터가 없으면 0)
    pub shares_outstanding: i64,
}

impl MarketSnapshot {
    /// 거래 데이터가 없는 날의 스냅샷
    pub fn empty(code: &str) -> Self {
        Self {
            code: code.to_string(),
            current_price: 0,
            shares_outstanding: 0,
        }
    }

    /// 배당수익률 계산용 기준가
    ///
    /// 종가가 0이면 1원으로 대체한다. 저장되는 종가 자체는 바꾸지 않는다.
    pub fn reference_price(&self) -> f64 {
        if self.current_price > 0 {
            self.current_price as f64
        } else {
            1.0
        }
    }
}
