//! 공용 상수 및 보조 함수

use chrono::{Duration, NaiveDate, Utc};
use chrono_tz::Asia::Seoul;
use regex::Regex;
use std::sync::OnceLock;

/// 서울 기준 오늘에서 `offset_days`일 전의 날짜
pub fn trading_date(offset_days: i64) -> NaiveDate {
    Utc::now().with_timezone(&Seoul).date_naive() - Duration::days(offset_days)
}

/// YYYYMMDD 형식 문자열
pub fn format_yyyymmdd(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// 표/응답 셀의 수치 파싱
///
/// 천 단위 콤마와 공백을 제거한다. 빈 값, "-", "N/A" 등 숫자가 아니면 `None`.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace() && *c != '\u{a0}')
        .collect();

    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 정수 셀 파싱 (KRX 가격/주식수)
pub fn parse_integer(text: &str) -> Option<i64> {
    parse_number(text).map(|v| v as i64)
}

/// 연속 공백을 하나로 줄이고 양끝을 자른다
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| Regex::new(r"[\s\u{a0}]+").unwrap());
    re.replace_all(text.trim(), " ").trim().to_string()
}
