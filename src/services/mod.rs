//! 수집 파이프라인 서비스 모듈
//!
//! 데이터 소스 클라이언트와 시트 출력, 종목별 조립 로직

pub mod common;     // 공용 보조 함수
pub mod krx;        // KRX 종목 목록 및 시세
pub mod naver;      // 네이버 금융 실적 표
pub mod sheets;     // 구글 시트 출력
pub mod collector;  // 종목별 행 조립
