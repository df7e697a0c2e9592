//! 구글 시트 출력
//!
//! 서비스 계정 JWT 로 액세스 토큰을 받고, 드라이브에서 이름으로 스프레드시트를 찾아
//! 첫 번째 워크시트를 지운 뒤 표 전체를 한 번에 쓴다.
//! 지우기와 쓰기 사이에 중단되면 시트가 빈 채로 남을 수 있다.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;
use url::Url;

use crate::config::SheetConfig;
use crate::models::OutputTable;

const SCOPES: &str = "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive";
const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const TOKEN_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// 서비스 계정 키 (GOOGLE_SHEET_KEY 의 JSON)
#[derive(Clone, Deserialize)]
pub struct SheetCredentials {
    pub client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for SheetCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetCredentials")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl SheetCredentials {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("서비스 계정 JSON 파싱 실패")
    }

    /// 환경변수에서 읽기. 없거나 비어 있으면 에러.
    pub fn from_env(var: &str) -> Result<Self> {
        let json = env::var(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("구글 시트 키가 없습니다. 환경변수 {} 를 확인하세요", var))?;
        Self::from_json(&json)
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

/// 연결된 워크시트 핸들
pub struct SheetsClient {
    client: Client,
    api_url: String,
    token: String,
    spreadsheet_id: String,
    sheet_title: String,
}

impl SheetsClient {
    /// 토큰 발급, 스프레드시트 검색, 첫 워크시트 확인
    ///
    /// 여기서 실패하면 시트는 전혀 건드리지 않은 상태다.
    pub async fn connect(client: Client, credentials: &SheetCredentials, config: &SheetConfig) -> Result<Self> {
        let token = fetch_access_token(&client, credentials).await?;

        let spreadsheet_id =
            find_spreadsheet(&client, &config.drive_api_url, &token, &config.spreadsheet_name).await?;

        let api_url = config.sheets_api_url.trim_end_matches('/').to_string();
        let sheet_title = first_sheet_title(&client, &api_url, &token, &spreadsheet_id).await?;

        log::info!(
            "구글 시트 연결: {} ({}) / {}",
            config.spreadsheet_name,
            spreadsheet_id,
            sheet_title
        );

        Ok(Self {
            client,
            api_url,
            token,
            spreadsheet_id,
            sheet_title,
        })
    }

    pub fn sheet_title(&self) -> &str {
        &self.sheet_title
    }

    /// 기존 내용을 지우고 헤더 + 전체 행을 A1 부터 쓴다
    pub async fn write_table(&self, table: &OutputTable) -> Result<()> {
        let sheet_range = quote_sheet_title(&self.sheet_title);

        let clear_url = self.values_url(&format!("{}:clear", sheet_range))?;
        let response = self
            .client
            .post(clear_url)
            .bearer_auth(&self.token)
            .json(&json!({}))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("시트 지우기 실패: {}", response.status()));
        }

        let range = format!("{}!A1", sheet_range);
        let values = table.to_values();
        let row_count = values.len();

        let mut update_url = self.values_url(&range)?;
        update_url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let response = self
            .client
            .put(update_url)
            .bearer_auth(&self.token)
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": values,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("시트 쓰기 실패: {}", response.status()));
        }

        log::info!("시트 '{}' 에 {}행 기록", self.sheet_title, row_count);
        Ok(())
    }

    fn values_url(&self, range: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/spreadsheets/{}/values", self.api_url, self.spreadsheet_id))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("잘못된 Sheets API 주소: {}", self.api_url))?
            .push(range);
        Ok(url)
    }
}

async fn fetch_access_token(client: &Client, credentials: &SheetCredentials) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        iss: &credentials.client_email,
        scope: SCOPES,
        aud: &credentials.token_uri,
        iat: now,
        exp: now + TOKEN_LIFETIME_SECS,
    };

    let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes()).context("서비스 계정 개인키가 올바르지 않습니다")?;
    let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)?;

    log::debug!("📡 토큰 요청 {}", credentials.token_uri);
    let response = client
        .post(&credentials.token_uri)
        .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", assertion.as_str())])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!("액세스 토큰 발급 실패: {}", response.status()));
    }

    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}

async fn find_spreadsheet(client: &Client, drive_url: &str, token: &str, name: &str) -> Result<String> {
    let query = format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escape_query_literal(name),
        SPREADSHEET_MIME
    );

    let response = client
        .get(format!("{}/files", drive_url.trim_end_matches('/')))
        .bearer_auth(token)
        .query(&[
            ("q", query.as_str()),
            ("fields", "files(id,name)"),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!("드라이브 검색 실패: {}", response.status()));
    }

    let list: FileList = response.json().await?;
    list.files
        .into_iter()
        .next()
        .map(|file| file.id)
        .ok_or_else(|| anyhow!("스프레드시트 '{}' 를 찾지 못했습니다. 서비스 계정에 공유되어 있는지 확인하세요", name))
}

async fn first_sheet_title(client: &Client, api_url: &str, token: &str, spreadsheet_id: &str) -> Result<String> {
    let response = client
        .get(format!("{}/spreadsheets/{}", api_url, spreadsheet_id))
        .bearer_auth(token)
        .query(&[("fields", "sheets.properties")])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!("스프레드시트 정보 조회 실패: {}", response.status()));
    }

    let meta: SpreadsheetMeta = response.json().await?;
    meta.sheets
        .into_iter()
        .next()
        .map(|sheet| sheet.properties.title)
        .ok_or_else(|| anyhow!("워크시트가 없습니다"))
}

/// 드라이브 검색식 문자열 리터럴 이스케이프
fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// A1 표기용 시트 이름. 작은따옴표로 감싸고 안쪽 따옴표는 두 번 쓴다.
fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}
