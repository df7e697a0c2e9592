//! 재무 실적 데이터 모델
//!
//! 네이버 금융 "최근 연간 실적" 표에서 추출한 값과
//! 기본값 처리를 거친 최종 재무 레코드를 정의

use serde::{Deserialize, Serialize};

/// 과거 실적 슬롯 수
pub const HISTORY_PERIODS: usize = 4;

/// YoY 비교 시 거슬러 올라가는 컬럼 수
pub const YOY_LOOKBACK: usize = 4;

/// 표의 한 컬럼(기간)에서 읽은 원시 수치
///
/// 셀이 없거나 "-" 같은 자리표시자, 숫자가 아닌 값이면 `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodFigures {
    /// 매출액
    pub revenue: Option<f64>,
    /// 영업이익
    pub operating_income: Option<f64>,
    /// 주당배당금(원)
    pub dividend_per_share: Option<f64>,
    /// 배당성향(%)
    pub payout_ratio: Option<f64>,
}

/// 기본값 처리가 끝난 과거 실적 한 기간
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    pub revenue: f64,
    pub operating_income: f64,
    /// 배당수익률(%)
    pub dividend_yield: f64,
    /// 배당성향(%)
    pub payout_ratio: f64,
}

impl PeriodRecord {
    /// 원시 수치에 기본값을 채워 넣는다
    pub fn from_figures(figures: &PeriodFigures, reference_price: f64) -> Self {
        Self {
            revenue: figures.revenue.unwrap_or(0.0),
            operating_income: figures.operating_income.unwrap_or(0.0),
            dividend_yield: dividend_yield(figures.dividend_per_share, reference_price),
            payout_ratio: figures.payout_ratio.unwrap_or(0.0),
        }
    }
}

/// 종목 하나의 재무 레코드
///
/// `Default`는 모든 값이 0인 레코드이며 페이지 조회 실패 시 그대로 쓰인다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    /// 과거 실적, 오래된 순. 확정 컬럼이 4개보다 적으면 뒤쪽 슬롯은 0
    pub periods: [PeriodRecord; HISTORY_PERIODS],
    /// 확정 실적 기간 수 (최대 4)
    pub period_count: usize,
    /// 영업이익 YoY(%)
    pub operating_income_yoy: f64,
    /// 다음 추정 기간 매출액
    pub estimate_revenue: f64,
    /// 다음 추정 기간 영업이익
    pub estimate_operating_income: f64,
}

/// 소수점 둘째 자리 반올림
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 배당수익률(%) = round(주당배당금 / 기준가 × 100, 2)
///
/// 주당배당금이 없거나 0이면 0.0. 기준가는 1 이상이어야 한다.
pub fn dividend_yield(dividend_per_share: Option<f64>, reference_price: f64) -> f64 {
    match dividend_per_share {
        Some(dps) if dps != 0.0 && reference_price > 0.0 => round2(dps / reference_price * 100.0),
        _ => 0.0,
    }
}

/// 증감률(%) = round((현재 - 이전) / |이전| × 100, 2)
///
/// 어느 한쪽이 없거나 이전 값이 0이면 0.0.
pub fn growth_rate(current: Option<f64>, previous: Option<f64>) -> f64 {
    match (current, previous) {
        (Some(cur), Some(prev)) if prev != 0.0 => round2((cur - prev) / prev.abs() * 100.0),
        _ => 0.0,
    }
}
