//! 설정 모듈
//!
//! JSON 파일에서 실행 파라미터를 읽고, 없으면 기본값을 사용

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::models::Market;

/// 수집 대상 및 속도 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// 시장 구분
    #[serde(default = "default_market")]
    pub market: Market,
    /// 수집할 종목 수 (앞에서부터)
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// 기준일 = 오늘(서울) - N일
    #[serde(default = "default_date_offset_days")]
    pub date_offset_days: i64,
    /// 종목 간 대기 시간(밀리초)
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

/// 데이터 소스 주소
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// KRX 정보데이터시스템 JSON 엔드포인트
    #[serde(default = "default_krx_url")]
    pub krx_url: String,
    /// 네이버 금융 루트
    #[serde(default = "default_naver_url")]
    pub naver_url: String,
}

/// 구글 시트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    /// 드라이브에 있는 스프레드시트 파일명
    #[serde(default = "default_spreadsheet_name")]
    pub spreadsheet_name: String,
    /// 서비스 계정 JSON 을 담은 환경변수 이름
    #[serde(default = "default_credential_env")]
    pub credential_env: String,
    #[serde(default = "default_sheets_api_url")]
    pub sheets_api_url: String,
    #[serde(default = "default_drive_api_url")]
    pub drive_api_url: String,
}

/// HTTP 클라이언트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// 요청 타임아웃(초)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 연결 타임아웃(초)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// 로그 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 로그 레벨: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 전체 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub sources: SourceConfig,
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub log: LogConfig,
}

// 기본값 함수
fn default_market() -> Market { Market::Kospi }
fn default_sample_size() -> usize { 10 }
fn default_date_offset_days() -> i64 { 1 }
fn default_request_delay_ms() -> u64 { 100 }
fn default_krx_url() -> String { "http://data.krx.co.kr/comm/bldAttendant/getJsonData.cmd".to_string() }
fn default_naver_url() -> String { "https://finance.naver.com".to_string() }
fn default_spreadsheet_name() -> String { "StockData_Gems".to_string() }
fn default_credential_env() -> String { "GOOGLE_SHEET_KEY".to_string() }
fn default_sheets_api_url() -> String { "https://sheets.googleapis.com/v4".to_string() }
fn default_drive_api_url() -> String { "https://www.googleapis.com/drive/v3".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_connect_timeout() -> u64 { 10 }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}
fn default_log_level() -> String { "info".to_string() }

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            market: default_market(),
            sample_size: default_sample_size(),
            date_offset_days: default_date_offset_days(),
            request_delay_ms: default_request_delay_ms(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            krx_url: default_krx_url(),
            naver_url: default_naver_url(),
        }
    }
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            spreadsheet_name: default_spreadsheet_name(),
            credential_env: default_credential_env(),
            sheets_api_url: default_sheets_api_url(),
            drive_api_url: default_drive_api_url(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl CollectorConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl HttpConfig {
    /// 설정값으로 공용 HTTP 클라이언트 생성
    pub fn build_client(&self) -> anyhow::Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .user_agent(self.user_agent.clone())
            .build()?;
        Ok(client)
    }
}

impl AppConfig {
    /// JSON 파일에서 설정 읽기
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 파일이 있으면 읽고, 실패하면 기본값
    ///
    /// 로거 초기화 전에 호출되므로 결과 메시지는 함께 돌려준다.
    pub fn load() -> (Self, String) {
        let config_paths = ["config.json", "config/config.json"];

        for path in config_paths {
            if Path::new(path).exists() {
                match Self::from_file(path) {
                    Ok(config) => {
                        return (config, format!("{} 에서 설정을 읽었습니다", path));
                    }
                    Err(e) => {
                        return (Self::default(), format!("설정 파일 {} 읽기 실패, 기본값 사용: {}", path, e));
                    }
                }
            }
        }

        (Self::default(), "설정 파일 없음, 기본값 사용".to_string())
    }
}
