//! 시트 출력 행 모델
//!
//! 성공 행과 오류 행 모두 `OutputRow::fields` 하나로 컬럼을 만들어
//! 표가 항상 직사각형이 되도록 한다.

use serde_json::{json, Value};

use super::financial::FinancialRecord;
use super::stock::{MarketSnapshot, Ticker};

/// 시트에서 선행 0이 잘리지 않도록 종목코드 앞에 붙이는 문자
pub const CODE_PREFIX: &str = "A";

/// 오류 행의 종목명
pub const ERROR_NAME: &str = "ERROR";

/// 매출 YoY 컬럼은 자리만 유지하고 항상 0
const REVENUE_YOY_PLACEHOLDER: f64 = 0.0;

/// 시트 한 행
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    /// 접두어가 붙은 종목코드 (예: A005930)
    pub code: String,
    pub name: String,
    pub current_price: i64,
    pub shares_outstanding: i64,
    pub financials: FinancialRecord,
}

impl OutputRow {
    /// 정상 수집된 종목의 행
    pub fn collected(ticker: &Ticker, snapshot: &MarketSnapshot, financials: FinancialRecord) -> Self {
        Self {
            code: format!("{}{}", CODE_PREFIX, ticker.code),
            name: ticker.name.clone(),
            current_price: snapshot.current_price,
            shares_outstanding: snapshot.shares_outstanding,
            financials,
        }
    }

    /// 수집에 실패한 종목의 행 (모든 수치 0)
    pub fn error(code: &str) -> Self {
        Self {
            code: format!("{}{}", CODE_PREFIX, code),
            name: ERROR_NAME.to_string(),
            current_price: 0,
            shares_outstanding: 0,
            financials: FinancialRecord::default(),
        }
    }

    /// 컬럼명과 값 목록 (순서 고정)
    pub fn fields(&self) -> Vec<(String, Value)> {
        let mut fields: Vec<(String, Value)> = vec![
            ("종목코드".to_string(), json!(self.code)),
            ("종목명".to_string(), json!(self.name)),
            ("현재가".to_string(), json!(self.current_price)),
            ("상장주식수".to_string(), json!(self.shares_outstanding)),
        ];

        for (i, period) in self.financials.periods.iter().enumerate() {
            let n = i + 1;
            fields.push((format!("매출_과거{}", n), json!(period.revenue)));
            fields.push((format!("영업이익_과거{}", n), json!(period.operating_income)));
            fields.push((format!("배당수익률_과거{}", n), json!(period.dividend_yield)));
            fields.push((format!("배당성향_과거{}", n), json!(period.payout_ratio)));
        }

        fields.push(("매출_YoY(%)".to_string(), json!(REVENUE_YOY_PLACEHOLDER)));
        fields.push(("영업이익_YoY(%)".to_string(), json!(self.financials.operating_income_yoy)));
        fields.push(("추정_매출_다음분기".to_string(), json!(self.financials.estimate_revenue)));
        fields.push((
            "추정_영업이익_다음분기".to_string(),
            json!(self.financials.estimate_operating_income),
        ));

        fields
    }

    /// 셀 값만
    pub fn values(&self) -> Vec<Value> {
        self.fields().into_iter().map(|(_, value)| value).collect()
    }
}

/// 종목 단위 수집 결과
#[derive(Debug, Clone)]
pub enum TickerOutcome {
    Collected(OutputRow),
    Failed { ticker: Ticker, reason: String },
}

impl TickerOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, TickerOutcome::Failed { .. })
    }

    /// 실패는 오류 행으로 바꾼다
    pub fn into_row(self) -> OutputRow {
        match self {
            TickerOutcome::Collected(row) => row,
            TickerOutcome::Failed { ticker, .. } => OutputRow::error(&ticker.code),
        }
    }
}

/// 시트에 통째로 쓰이는 표
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl OutputTable {
    /// 헤더는 첫 행의 컬럼 순서를 따른다. 행이 없으면 스키마 그대로.
    pub fn from_rows(rows: &[OutputRow]) -> Self {
        let header = rows
            .first()
            .cloned()
            .unwrap_or_else(|| OutputRow::error(""))
            .fields()
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        Self {
            header,
            rows: rows.iter().map(OutputRow::values).collect(),
        }
    }

    /// 헤더 + 데이터 행
    pub fn to_values(&self) -> Vec<Vec<Value>> {
        let mut values = Vec::with_capacity(self.rows.len() + 1);
        values.push(self.header.iter().map(|name| json!(name)).collect());
        values.extend(self.rows.iter().cloned());
        values
    }
}
