//! 네이버 금융 기업실적분석 표 추출
//!
//! 종목 메인 페이지(https://finance.naver.com/item/main.naver?code=XXXXXX)에서
//! "최근 연간 실적" 문구가 들어간 표를 찾아 과거 실적, YoY, 다음 추정치를 뽑는다.
//!
//! 표 구조 (헤더 3단, 첫 컬럼은 항목명):
//! ```text
//! 주요재무정보 | 최근 연간 실적 ............... | 최근 분기 실적 ...
//!              | 2021.12 | 2022.12 | 2024.12(E) | 2023.09 | ... | 2024.12(E)
//!              | IFRS연결 | ...
//! 매출액       | 2,796,048 | ...
//! ```

use anyhow::{anyhow, Result};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use super::common::{normalize_whitespace, parse_number};
use crate::models::{
    growth_rate, FinancialRecord, PeriodFigures, PeriodRecord, HISTORY_PERIODS, YOY_LOOKBACK,
};

/// 대상 표를 식별하는 문구
pub const RESULTS_TABLE_MARKER: &str = "최근 연간 실적";

/// 추정치 컬럼 표시
const ESTIMATE_SUFFIX: &str = "(E)";

const ROW_REVENUE: &str = "매출액";
const ROW_OPERATING_INCOME: &str = "영업이익";
const ROW_DIVIDEND_PER_SHARE: &str = "주당배당금(원)";
const ROW_PAYOUT_RATIO: &str = "배당성향(%)";

/// 브라우저와 같은 span 상한
const MAX_COLSPAN: usize = 1000;
const MAX_ROWSPAN: usize = 65534;

/// 항목명 인덱스와 기간 컬럼으로 정리한 표
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsTable {
    /// 기간 컬럼 라벨 (두 번째 헤더 단)
    pub columns: Vec<String>,
    /// (항목명, 컬럼별 셀 텍스트)
    pub rows: Vec<(String, Vec<String>)>,
}

impl ResultsTable {
    /// HTML 문서에서 `marker` 문구를 포함한 가장 안쪽 표를 찾아 파싱
    pub fn locate(html: &str, marker: &str) -> Result<Self> {
        let document = Html::parse_document(html);
        let table_selector = Selector::parse("table").unwrap();

        let candidates: Vec<ElementRef> = document
            .select(&table_selector)
            .filter(|table| table.text().collect::<String>().contains(marker))
            .collect();

        let innermost = candidates.iter().find(|table| {
            !table
                .select(&table_selector)
                .any(|inner| inner.id() != table.id() && inner.text().collect::<String>().contains(marker))
        });

        match innermost {
            Some(table) => Self::from_table(*table),
            None => Err(anyhow!("'{}' 표를 찾지 못했습니다", marker)),
        }
    }

    /// 표 요소를 격자로 펼쳐 헤더와 본문을 나눈다
    fn from_table(table: ElementRef) -> Result<Self> {
        let row_selector = Selector::parse("tr").unwrap();

        let mut header_rows = Vec::new();
        let mut body_rows = Vec::new();
        let mut spans = RowSpans::default();

        for tr in table.select(&row_selector) {
            let in_thead = tr
                .parent()
                .and_then(ElementRef::wrap)
                .map(|parent| parent.value().name() == "thead")
                .unwrap_or(false);

            let cells: Vec<ElementRef> = tr
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| matches!(cell.value().name(), "th" | "td"))
                .collect();
            let has_td = cells.iter().any(|cell| cell.value().name() == "td");

            let grid_row = spans.expand(&cells);

            // thead 가 없으면 td 가 나오기 전까지를 헤더로 본다
            if in_thead || (body_rows.is_empty() && !has_td) {
                header_rows.push(grid_row);
            } else {
                body_rows.push(grid_row);
            }
        }

        if header_rows.is_empty() {
            return Err(anyhow!("표 헤더가 없습니다"));
        }

        let level = if header_rows.len() >= 2 { 1 } else { 0 };
        let columns: Vec<String> = header_rows[level].iter().skip(1).cloned().collect();

        let rows = body_rows
            .into_iter()
            .filter(|row| !row.is_empty())
            .map(|row| {
                let label = row[0].clone();
                let cells = row.into_iter().skip(1).collect();
                (label, cells)
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// 항목명과 컬럼 위치로 수치 조회. 같은 항목명이 여러 번이면 첫 행.
    pub fn value(&self, row_label: &str, column: usize) -> Option<f64> {
        self.rows
            .iter()
            .find(|(label, _)| label == row_label)
            .and_then(|(_, cells)| cells.get(column))
            .and_then(|text| parse_number(text))
    }

    /// 한 기간 컬럼의 원시 수치
    pub fn figures(&self, column: usize) -> PeriodFigures {
        PeriodFigures {
            revenue: self.value(ROW_REVENUE, column),
            operating_income: self.value(ROW_OPERATING_INCOME, column),
            dividend_per_share: self.value(ROW_DIVIDEND_PER_SHARE, column),
            payout_ratio: self.value(ROW_PAYOUT_RATIO, column),
        }
    }

    /// (확정 컬럼, 추정 컬럼) 위치 목록
    ///
    /// 세 글자 이하 라벨은 기간 컬럼이 아니므로 제외한다.
    pub fn partition_columns(&self) -> (Vec<usize>, Vec<usize>) {
        let mut confirmed = Vec::new();
        let mut estimated = Vec::new();

        for (index, label) in self.columns.iter().enumerate() {
            if label.chars().count() <= 3 {
                continue;
            }
            if label.contains(ESTIMATE_SUFFIX) {
                estimated.push(index);
            } else {
                confirmed.push(index);
            }
        }

        (confirmed, estimated)
    }
}

/// rowspan/colspan 을 펼치기 위한 상태
#[derive(Default)]
struct RowSpans {
    /// 컬럼별 (아래로 이어질 텍스트, 남은 행 수)
    pending: Vec<Option<(String, usize)>>,
}

impl RowSpans {
    fn take_pending(&mut self, column: usize) -> Option<String> {
        let slot = self.pending.get_mut(column)?;
        let (text, remaining) = slot.take()?;
        if remaining > 1 {
            *slot = Some((text.clone(), remaining - 1));
        }
        Some(text)
    }

    fn expand(&mut self, cells: &[ElementRef]) -> Vec<String> {
        let mut row = Vec::new();

        for cell in cells {
            while let Some(text) = self.take_pending(row.len()) {
                row.push(text);
            }

            let text = normalize_whitespace(&cell.text().collect::<String>());
            let colspan = span_attr(cell, "colspan", MAX_COLSPAN);
            let rowspan = span_attr(cell, "rowspan", MAX_ROWSPAN);

            for _ in 0..colspan {
                if rowspan > 1 {
                    let column = row.len();
                    if self.pending.len() <= column {
                        self.pending.resize(column + 1, None);
                    }
                    self.pending[column] = Some((text.clone(), rowspan - 1));
                }
                row.push(text.clone());
            }
        }

        while let Some(text) = self.take_pending(row.len()) {
            row.push(text);
        }

        row
    }
}

fn span_attr(cell: &ElementRef, name: &str, max: usize) -> usize {
    cell.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
        .map(|v| v.min(max))
        .unwrap_or(1)
}

/// 정리된 표에서 재무 레코드 계산
///
/// - 과거 실적: 마지막 확정 컬럼 최대 4개, 오래된 순
/// - 영업이익 YoY: 확정 컬럼이 5개 이상일 때 마지막 컬럼과 4칸 앞 컬럼 비교
/// - 추정치: 첫 번째 추정 컬럼
pub fn extract_financials(table: &ResultsTable, reference_price: f64) -> FinancialRecord {
    let (confirmed, estimated) = table.partition_columns();
    let mut record = FinancialRecord::default();

    let recent = &confirmed[confirmed.len().saturating_sub(HISTORY_PERIODS)..];
    for (slot, &column) in recent.iter().enumerate() {
        record.periods[slot] = PeriodRecord::from_figures(&table.figures(column), reference_price);
    }
    record.period_count = recent.len();

    if confirmed.len() > YOY_LOOKBACK {
        let last = table.figures(confirmed[confirmed.len() - 1]);
        let prev = table.figures(confirmed[confirmed.len() - 1 - YOY_LOOKBACK]);
        record.operating_income_yoy = growth_rate(last.operating_income, prev.operating_income);
    }

    if let Some(&column) = estimated.first() {
        let next = table.figures(column);
        record.estimate_revenue = next.revenue.unwrap_or(0.0);
        record.estimate_operating_income = next.operating_income.unwrap_or(0.0);
    }

    record
}

/// 페이지 HTML 에서 바로 재무 레코드 계산
pub fn parse_financials(html: &str, reference_price: f64) -> Result<FinancialRecord> {
    let table = ResultsTable::locate(html, RESULTS_TABLE_MARKER)?;
    Ok(extract_financials(&table, reference_price))
}

/// Content-Type 의 charset 을 보고 디코딩 (기본 EUC-KR)
fn decode_body(bytes: &[u8], content_type: &str) -> String {
    if content_type.to_ascii_lowercase().contains("utf-8") {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        encoding_rs::EUC_KR.decode(bytes).0.into_owned()
    }
}

/// 네이버 금융 클라이언트
pub struct NaverClient {
    client: Client,
    base_url: String,
}

impl NaverClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 종목 메인 페이지 HTML
    pub async fn fetch_main_page(&self, code: &str) -> Result<String> {
        let url = format!("{}/item/main.naver", self.base_url);
        log::debug!("📡 네이버 금융 요청 {}?code={}", url, code);

        let response = self.client.get(&url).query(&[("code", code)]).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("네이버 금융 페이지 요청 실패: {}", response.status()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let bytes = response.bytes().await?;

        Ok(decode_body(&bytes, &content_type))
    }

    /// 종목 재무 레코드
    ///
    /// 페이지 요청이나 표 찾기에 실패하면 경고만 남기고 0으로 채운 레코드를 돌려준다.
    pub async fn get_financials(&self, code: &str, reference_price: f64) -> FinancialRecord {
        let result = match self.fetch_main_page(code).await {
            Ok(html) => parse_financials(&html, reference_price),
            Err(e) => Err(e),
        };

        match result {
            Ok(record) => {
                log::debug!("{} 확정 실적 {}기간", code, record.period_count);
                record
            }
            Err(e) => {
                log::warn!("{} 재무 데이터 없음, 0으로 채움: {:#}", code, e);
                FinancialRecord::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarketSnapshot, OutputRow, Ticker};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMSUNG_HTML: &str = include_str!("../../testdata/naver_main_005930.html");

    /// 헤더 2단, 항목 행은 (항목명, 셀들)
    fn build_table_html(labels: &[&str], rows: &[(&str, Vec<&str>)]) -> String {
        let mut html = String::from("<html><body><table><thead><tr><th rowspan=\"2\">주요재무정보</th>");
        html.push_str(&format!(
            "<th colspan=\"{}\">최근 연간 실적</th></tr><tr>",
            labels.len()
        ));
        for label in labels {
            html.push_str(&format!("<th>{}</th>", label));
        }
        html.push_str("</tr></thead><tbody>");
        for (name, cells) in rows {
            html.push_str(&format!("<tr><th>{}</th>", name));
            for cell in cells {
                html.push_str(&format!("<td>{}</td>", cell));
            }
            html.push_str("</tr>");
        }
        html.push_str("</tbody></table></body></html>");
        html
    }

    #[test]
    fn test_locate_flattens_header() {
        println!("\n========== 기업실적분석 표 헤더 ==========");
        let table = ResultsTable::locate(SAMSUNG_HTML, RESULTS_TABLE_MARKER).unwrap();
        println!("  컬럼: {:?}", table.columns);

        assert_eq!(table.columns.len(), 10);
        assert_eq!(table.columns[0], "2021.12");
        assert_eq!(table.columns[3], "2024.12 (E)");
        assert_eq!(table.columns[4], "2023.09");
        assert_eq!(table.rows[0].0, "매출액");
        assert_eq!(table.value("영업이익", 2), Some(65_670.0));
        assert_eq!(table.value("주당배당금(원)", 9), None);
    }

    #[test]
    fn test_partition_columns() {
        let table = ResultsTable::locate(SAMSUNG_HTML, RESULTS_TABLE_MARKER).unwrap();
        let (confirmed, estimated) = table.partition_columns();
        assert_eq!(confirmed, vec![0, 1, 2, 4, 5, 6, 7, 8]);
        assert_eq!(estimated, vec![3, 9]);
    }

    #[test]
    fn test_extract_samsung_page() {
        println!("\n========== 삼성전자 재무 추출 ==========");
        let record = parse_financials(SAMSUNG_HTML, 53_000.0).unwrap();
        for (i, p) in record.periods.iter().enumerate() {
            println!("  과거{}: {:?}", i + 1, p);
        }

        assert_eq!(record.period_count, 4);

        assert_eq!(record.periods[0].revenue, 677_799.0);
        assert_eq!(record.periods[0].operating_income, 28_247.0);
        assert_eq!(record.periods[0].dividend_yield, 0.72);
        assert_eq!(record.periods[0].payout_ratio, 0.0);

        assert_eq!(record.periods[1].dividend_yield, 0.68);
        assert_eq!(record.periods[1].payout_ratio, 0.0);

        assert_eq!(record.periods[2].operating_income, 104_439.0);
        assert_eq!(record.periods[2].payout_ratio, 10.21);

        assert_eq!(record.periods[3].revenue, 790_987.0);
        assert_eq!(record.periods[3].operating_income, 91_834.0);
        assert_eq!(record.periods[3].payout_ratio, 11.9);

        assert_eq!(record.operating_income_yoy, 277.37);

        assert_eq!(record.estimate_revenue, 3_008_709.0);
        assert_eq!(record.estimate_operating_income, 327_260.0);
    }

    #[test]
    fn test_six_confirmed_columns_without_estimates() {
        let labels = ["2019.12", "2020.12", "2021.12", "2022.12", "2023.12", "2024.12"];
        let html = build_table_html(
            &labels,
            &[
                ("매출액", vec!["1,000", "1,100", "1,200", "1,300", "1,400", "1,500"]),
                ("영업이익", vec!["100", "110", "120", "130", "140", "150"]),
            ],
        );

        let record = parse_financials(&html, 1.0).unwrap();
        let op: Vec<f64> = record.periods.iter().map(|p| p.operating_income).collect();

        assert_eq!(record.period_count, 4);
        assert_eq!(op, vec![120.0, 130.0, 140.0, 150.0]);
        assert_eq!(record.operating_income_yoy, 36.36);
        assert_eq!(record.estimate_revenue, 0.0);
        assert_eq!(record.estimate_operating_income, 0.0);
    }

    #[test]
    fn test_fewer_than_four_columns() {
        let html = build_table_html(
            &["2022.12", "2023.12", "2024.12(E)"],
            &[
                ("매출액", vec!["500", "-", "700"]),
                ("영업이익", vec!["50", "abc", ""]),
                ("주당배당금(원)", vec!["100", "0", "120"]),
                ("배당성향(%)", vec!["-", "20.5", ""]),
            ],
        );

        let record = parse_financials(&html, 10_000.0).unwrap();

        assert_eq!(record.period_count, 2);
        assert_eq!(record.periods[0].revenue, 500.0);
        assert_eq!(record.periods[0].dividend_yield, 1.0);
        assert_eq!(record.periods[0].payout_ratio, 0.0);
        assert_eq!(record.periods[1].revenue, 0.0);
        assert_eq!(record.periods[1].operating_income, 0.0);
        assert_eq!(record.periods[1].dividend_yield, 0.0);
        assert_eq!(record.periods[1].payout_ratio, 20.5);
        // 채워지지 않은 슬롯
        assert_eq!(record.periods[2], PeriodRecord::default());
        assert_eq!(record.periods[3], PeriodRecord::default());
        // 확정 컬럼 5개 미만
        assert_eq!(record.operating_income_yoy, 0.0);
        assert_eq!(record.estimate_revenue, 700.0);
        assert_eq!(record.estimate_operating_income, 0.0);
    }

    #[test]
    fn test_yoy_zero_previous() {
        let html = build_table_html(
            &["2020.12", "2021.12", "2022.12", "2023.12", "2024.12"],
            &[("영업이익", vec!["0", "10", "20", "30", "40"])],
        );
        let record = parse_financials(&html, 1.0).unwrap();
        assert_eq!(record.operating_income_yoy, 0.0);
    }

    #[test]
    fn test_short_labels_are_ignored() {
        let html = build_table_html(
            &["2023.12", "비고", "2024.12"],
            &[("영업이익", vec!["10", "999", "20"])],
        );
        let record = parse_financials(&html, 1.0).unwrap();
        assert_eq!(record.period_count, 2);
        assert_eq!(record.periods[1].operating_income, 20.0);
    }

    #[test]
    fn test_revenue_yoy_column_stays_zero() {
        println!("\n========== 매출 YoY 컬럼 ==========");
        let html = build_table_html(
            &["2020.12", "2021.12", "2022.12", "2023.12", "2024.12"],
            &[
                ("매출액", vec!["100", "1", "1", "1", "200"]),
                ("영업이익", vec!["100", "1", "1", "1", "200"]),
            ],
        );
        let record = parse_financials(&html, 1.0).unwrap();
        assert_eq!(record.operating_income_yoy, 100.0);

        let ticker = Ticker {
            code: "005930".to_string(),
            name: "삼성전자".to_string(),
            isin: "KR7005930003".to_string(),
        };
        let row = OutputRow::collected(&ticker, &MarketSnapshot::empty("005930"), record);
        let fields = row.fields();
        let (_, revenue_yoy) = fields.iter().find(|(name, _)| name == "매출_YoY(%)").unwrap();
        let (_, op_yoy) = fields.iter().find(|(name, _)| name == "영업이익_YoY(%)").unwrap();
        assert_eq!(revenue_yoy.as_f64(), Some(0.0));
        assert_eq!(op_yoy.as_f64(), Some(100.0));
    }

    #[test]
    fn test_dash_dividend_gives_zero_yield() {
        let html = build_table_html(
            &["2022.12", "2023.12"],
            &[
                ("매출액", vec!["500", "600"]),
                ("주당배당금(원)", vec!["-", "250"]),
            ],
        );
        let record = parse_financials(&html, 5_000.0).unwrap();
        assert_eq!(record.periods[0].dividend_yield, 0.0);
        assert_eq!(record.periods[1].dividend_yield, 5.0);
    }

    #[test]
    fn test_oversized_span_is_clamped() {
        println!("\n========== 비정상 colspan/rowspan ==========");
        let html = "<html><body><table><thead>\
            <tr><th rowspan=\"99999999\">주요재무정보</th><th colspan=\"50000000\">최근 연간 실적</th></tr>\
            <tr><th>2023.12</th><th>2024.12</th></tr>\
            </thead><tbody><tr><th>영업이익</th><td>10</td><td>20</td></tr></tbody></table></body></html>";

        let table = ResultsTable::locate(html, RESULTS_TABLE_MARKER).unwrap();
        println!("  컬럼 수: {}", table.columns.len());

        assert!(table.columns.len() <= MAX_COLSPAN);
        assert_eq!(table.columns[0], "2023.12");
        assert_eq!(table.columns[1], "2024.12");
    }

    #[test]
    fn test_table_not_found() {
        let html = "<html><body><table><tr><td>시세</td></tr></table></body></html>";
        assert!(parse_financials(html, 1.0).is_err());
    }

    #[test]
    fn test_decode_body() {
        let (bytes, _, _) = encoding_rs::EUC_KR.encode("최근 연간 실적");
        assert_eq!(decode_body(&bytes, "text/html;charset=EUC-KR"), "최근 연간 실적");
        assert_eq!(decode_body("영업이익".as_bytes(), "text/html; charset=UTF-8"), "영업이익");
    }

    #[tokio::test]
    async fn test_get_financials_from_server() {
        let server = MockServer::start().await;
        let (body, _, _) = encoding_rs::EUC_KR.encode(SAMSUNG_HTML);
        Mock::given(method("GET"))
            .and(path("/item/main.naver"))
            .and(query_param("code", "005930"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body.into_owned(), "text/html;charset=EUC-KR"))
            .mount(&server)
            .await;

        let naver = NaverClient::new(Client::new(), &server.uri());
        let record = naver.get_financials("005930", 53_000.0).await;

        assert_eq!(record.period_count, 4);
        assert_eq!(record.estimate_operating_income, 327_260.0);
    }

    #[tokio::test]
    async fn test_get_financials_failure_is_zero_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let naver = NaverClient::new(Client::new(), &server.uri());
        let record = naver.get_financials("005930", 53_000.0).await;
        assert_eq!(record, FinancialRecord::default());
    }
}
