//! 종목별 수집 및 행 조립
//!
//! 종목마다 순서대로 시세 → 기준가 → 재무 추출 → 행 조립을 수행한다.
//! 한 종목의 실패는 오류 행으로 대체되고 다음 종목으로 넘어간다.

use anyhow::Result;
use std::time::Duration;

use super::krx::KrxClient;
use super::naver::NaverClient;
use crate::models::{Market, OutputRow, Ticker, TickerOutcome};

/// 진행 상황 로그 간격
const PROGRESS_INTERVAL: usize = 100;

pub struct Collector {
    krx: KrxClient,
    naver: NaverClient,
    /// 성공한 종목 뒤에 쉬는 시간
    delay: Duration,
}

impl Collector {
    pub fn new(krx: KrxClient, naver: NaverClient, delay: Duration) -> Self {
        Self { krx, naver, delay }
    }

    /// 기준일 종목 목록 (실패 시 그대로 전파)
    pub async fn tickers(&self, date: &str, market: Market, limit: usize) -> Result<Vec<Ticker>> {
        self.krx.list_tickers(date, market, limit).await
    }

    async fn assemble(&self, ticker: &Ticker, date: &str) -> Result<OutputRow> {
        let snapshot = self.krx.get_snapshot(ticker, date).await?;
        log::debug!(
            "{} 종가 {} / 상장주식수 {}",
            snapshot.code,
            snapshot.current_price,
            snapshot.shares_outstanding
        );

        let reference_price = snapshot.reference_price();
        let financials = self.naver.get_financials(&ticker.code, reference_price).await;
        Ok(OutputRow::collected(ticker, &snapshot, financials))
    }

    /// 종목 하나 수집
    pub async fn collect_ticker(&self, ticker: &Ticker, date: &str) -> TickerOutcome {
        match self.assemble(ticker, date).await {
            Ok(row) => TickerOutcome::Collected(row),
            Err(e) => TickerOutcome::Failed {
                ticker: ticker.clone(),
                reason: format!("{:#}", e),
            },
        }
    }

    /// 전체 종목을 순서대로 수집해 행 목록을 만든다
    pub async fn collect_all(&self, tickers: &[Ticker], date: &str) -> Vec<OutputRow> {
        let mut rows = Vec::with_capacity(tickers.len());
        let mut failed = 0;

        for (idx, ticker) in tickers.iter().enumerate() {
            if idx % PROGRESS_INTERVAL == 0 {
                log::info!("{}개 완료...", idx);
            }
            log::info!("Processing {}: {}", ticker.code, ticker.name);

            let outcome = self.collect_ticker(ticker, date).await;
            if let TickerOutcome::Failed { ticker, reason } = &outcome {
                log::error!("Error processing {}: {}", ticker.code, reason);
            }

            if outcome.is_failed() {
                failed += 1;
            } else if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            rows.push(outcome.into_row());
        }

        log::info!(
            "수집 완료: 전체 {} / 성공 {} / 실패 {}",
            tickers.len(),
            tickers.len() - failed,
            failed
        );
        rows
    }
}
