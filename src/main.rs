//! KRX 종목 재무 수집기
//!
//! KRX 시세와 네이버 금융 실적 표를 종목별로 모아 구글 시트에 통째로 기록한다.
//! 데이터 소스: KRX 정보데이터시스템, 네이버 금융

mod config;   // 실행 설정
mod models;   // 데이터 모델 정의
mod services; // 수집 및 출력 서비스

use anyhow::Result;
use env_logger::Env;

use crate::config::AppConfig;
use crate::models::OutputTable;
use crate::services::collector::Collector;
use crate::services::common::{format_yyyymmdd, trading_date};
use crate::services::krx::KrxClient;
use crate::services::naver::NaverClient;
use crate::services::sheets::{SheetCredentials, SheetsClient};

/// 애플리케이션 진입점
///
/// 수집 → 조립 → 시트 기록을 한 번 수행하고 종료한다.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let (config, config_message) = AppConfig::load();

    // 로그 초기화, 기본 레벨은 설정값 (RUST_LOG 우선)
    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));
    log::info!("{}", config_message);

    if let Err(e) = run(&config).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: &AppConfig) -> Result<()> {
    // 키가 없으면 어떤 요청도 보내기 전에 중단
    let credentials = SheetCredentials::from_env(&config.sheet.credential_env)?;

    let client = config.http.build_client()?;
    let date = format_yyyymmdd(trading_date(config.collector.date_offset_days));
    log::info!("데이터 수집 시작... 기준일 {}", date);

    let collector = Collector::new(
        KrxClient::new(client.clone(), &config.sources.krx_url),
        NaverClient::new(client.clone(), &config.sources.naver_url),
        config.collector.request_delay(),
    );

    let tickers = collector
        .tickers(&date, config.collector.market, config.collector.sample_size)
        .await?;
    log::info!("총 {}개 종목 수집 시작", tickers.len());

    let rows = collector.collect_all(&tickers, &date).await;
    let table = OutputTable::from_rows(&rows);

    log::info!("구글 시트에 저장 중...");
    let sheets = SheetsClient::connect(client, &credentials, &config.sheet)
        .await
        .map_err(|e| e.context("구글 시트 연결 실패"))?;
    sheets.write_table(&table).await?;

    log::info!("완료! ({})", sheets.sheet_title());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::any;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_missing_key_stops_before_any_request() {
        println!("\n========== 키 없이 실행 ==========");
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = AppConfig::default();
        config.sheet.credential_env = "KRX_SHEET_COLLECTOR_TEST_NO_KEY".to_string();
        config.sources.krx_url = format!("{}/krx", server.uri());
        config.sources.naver_url = server.uri();
        config.sheet.sheets_api_url = format!("{}/v4", server.uri());
        config.sheet.drive_api_url = format!("{}/drive/v3", server.uri());

        let result = run(&config).await;
        println!("  결과: {:?}", result);

        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("KRX_SHEET_COLLECTOR_TEST_NO_KEY"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
