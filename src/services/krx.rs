//! KRX 정보데이터시스템 시세 조회
//!
//! 전종목 시세(MDCSTAT01501)로 상장 종목 목록을 만들고,
//! 개별종목 시세 추이(MDCSTAT01701)로 기준일 종가와 상장주식수를 가져온다.
//! 모든 요청은 http://data.krx.co.kr/comm/bldAttendant/getJsonData.cmd 로 보내는 form POST.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;

use super::common::parse_integer;
use crate::models::{Market, MarketSnapshot, Ticker};

const KRX_REFERER: &str = "http://data.krx.co.kr/contents/MDC/MDI/mdiLoader";
const BLD_ALL_ISSUES: &str = "dbms/MDC/STAT/standard/MDCSTAT01501";
const BLD_ISSUE_TREND: &str = "dbms/MDC/STAT/standard/MDCSTAT01701";

/// 전종목 시세 응답
#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(rename = "OutBlock_1", default)]
    rows: Vec<ListingRow>,
}

#[derive(Debug, Deserialize)]
struct ListingRow {
    #[serde(rename = "ISU_SRT_CD")]
    short_code: String,
    #[serde(rename = "ISU_CD", default)]
    isin: String,
    #[serde(rename = "ISU_ABBRV", default)]
    name: String,
}

/// 개별종목 시세 추이 응답
#[derive(Debug, Deserialize)]
struct TrendResponse {
    #[serde(default)]
    output: Vec<TrendRow>,
}

#[derive(Debug, Deserialize)]
struct TrendRow {
    #[serde(rename = "TRD_DD", default)]
    date: String,
    #[serde(rename = "TDD_CLSPRC", default)]
    close: String,
    #[serde(rename = "LIST_SHRS", default)]
    listed_shares: String,
}

/// KRX 시세 클라이언트
pub struct KrxClient {
    client: Client,
    url: String,
}

impl KrxClient {
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    async fn post_form<T: DeserializeOwned>(&self, form: &[(&str, &str)]) -> Result<T> {
        log::debug!("📡 KRX 요청 {} {:?}", self.url, form);

        let response = self
            .client
            .post(&self.url)
            .header("Referer", KRX_REFERER)
            .form(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("KRX 요청 실패: {}", response.status()));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).context("KRX 응답 JSON 파싱 실패")
    }

    /// 기준일의 시장별 종목 목록
    ///
    /// 응답 순서를 유지하고 코드 중복은 처음 것만 남긴 뒤 `limit`개로 자른다.
    pub async fn list_tickers(&self, date: &str, market: Market, limit: usize) -> Result<Vec<Ticker>> {
        let response: ListingResponse = self
            .post_form(&[
                ("bld", BLD_ALL_ISSUES),
                ("locale", "ko_KR"),
                ("mktId", market.krx_id()),
                ("trdDd", date),
                ("share", "1"),
                ("money", "1"),
                ("csvxls_isNo", "false"),
            ])
            .await
            .with_context(|| format!("{} {} 종목 목록 조회 실패", date, market))?;

        let tickers = dedup_tickers(response.rows, limit);
        log::info!("📊 {} {} 종목 {}개", date, market, tickers.len());
        Ok(tickers)
    }

    /// 기준일 종가와 상장주식수
    ///
    /// 해당일 거래 데이터가 없으면(휴장일 등) 0으로 채운 스냅샷을 돌려준다.
    pub async fn get_snapshot(&self, ticker: &Ticker, date: &str) -> Result<MarketSnapshot> {
        let response: TrendResponse = self
            .post_form(&[
                ("bld", BLD_ISSUE_TREND),
                ("locale", "ko_KR"),
                ("isuCd", ticker.isin.as_str()),
                ("strtDd", date),
                ("endDd", date),
                ("adjStkPrc", "2"),
                ("share", "1"),
                ("money", "1"),
                ("csvxls_isNo", "false"),
            ])
            .await
            .with_context(|| format!("{} 시세 조회 실패", ticker.code))?;

        Ok(snapshot_from_rows(&ticker.code, &response.output))
    }
}

fn dedup_tickers(rows: Vec<ListingRow>, limit: usize) -> Vec<Ticker> {
    let mut seen = HashSet::new();

    rows.into_iter()
        .filter(|row| !row.short_code.trim().is_empty())
        .filter(|row| seen.insert(row.short_code.trim().to_string()))
        .take(limit)
        .map(|row| Ticker {
            code: row.short_code.trim().to_string(),
            name: row.name.trim().to_string(),
            isin: row.isin.trim().to_string(),
        })
        .collect()
}

/// 가장 최근 거래일 행의 값을 쓴다
fn snapshot_from_rows(code: &str, rows: &[TrendRow]) -> MarketSnapshot {
    let latest = rows.iter().max_by(|a, b| a.date.cmp(&b.date));

    match latest {
        Some(row) => MarketSnapshot {
            code: code.to_string(),
            current_price: parse_integer(&row.close).unwrap_or(0),
            shares_outstanding: parse_integer(&row.listed_shares).unwrap_or(0),
        },
        None => MarketSnapshot::empty(code),
    }
}
