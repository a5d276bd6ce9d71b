//! 주기적 텔레메트리 리포터.
//!
//! 주기마다 저장소를 비워 제출하고, 응답의 서버 지시사항(주기 변경, 중단)을 따른다.
//! 종료 신호를 받으면 남은 카운트를 한 번 더 제출하고 끝난다.

use flagmetry_core::config::TelemetryConfig;
use flagmetry_core::error::CoreError;
use flagmetry_core::ports::transport::ServerDirectives;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::storage::MetricStorage;
use crate::submitter::{SubmitOutcome, TelemetrySubmitter};

/// 서버가 지정할 수 있는 최소 전송 주기
pub const MIN_INTERVAL: Duration = Duration::from_secs(10);

/// 리포터 종료 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterExit {
    /// 설정에서 비활성화됨
    Disabled,
    /// 종료 신호 수신
    Shutdown,
    /// 서버가 전송 중단을 요청함
    ServerShutdown,
}

/// 텔레메트리 리포터
pub struct TelemetryReporter {
    submitter: Arc<TelemetrySubmitter>,
    storage: Arc<MetricStorage>,
    config: TelemetryConfig,
}

impl TelemetryReporter {
    pub fn new(
        submitter: Arc<TelemetrySubmitter>,
        storage: Arc<MetricStorage>,
        config: TelemetryConfig,
    ) -> Self {
        Self {
            submitter,
            storage,
            config,
        }
    }

    /// 공유 저장소
    pub fn storage(&self) -> &Arc<MetricStorage> {
        &self.storage
    }

    /// 저장소를 비워 한 번 제출
    ///
    /// 분류되지 않은 에러로 실패하면 꺼낸 카운트를 저장소에 되돌린다.
    pub async fn flush(&self) -> Result<SubmitOutcome, CoreError> {
        let counts = self.storage.drain();
        if counts.is_empty() {
            return Ok(SubmitOutcome::Skipped);
        }

        match self.submitter.call(&counts).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.storage.restore(counts);
                Err(e)
            }
        }
    }

    /// 리포터 루프 실행
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) -> ReporterExit {
        if !self.config.enabled {
            info!("텔레메트리 비활성화: 리포터 시작 안 함");
            return ReporterExit::Disabled;
        }

        let mut period = self.config.interval().max(MIN_INTERVAL);
        let mut interval = make_interval(period);
        info!("텔레메트리 리포터 시작: 주기 {}초", period.as_secs());

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let Some(directives) = self.flush_and_log().await else {
                        continue;
                    };
                    if directives.shutdown {
                        info!("서버 요청으로 텔레메트리 전송 중단");
                        return ReporterExit::ServerShutdown;
                    }
                    if let Some(requested) = directives.interval {
                        let next = requested.max(MIN_INTERVAL);
                        if next != period {
                            info!("텔레메트리 주기 변경: {}초 → {}초", period.as_secs(), next.as_secs());
                            period = next;
                            interval = make_interval(period);
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    debug!("종료 신호 수신: 마지막 제출");
                    self.flush_and_log().await;
                    info!("텔레메트리 리포터 종료");
                    return ReporterExit::Shutdown;
                }
            }
        }
    }

    /// 제출 후 결과를 로그로 남기고, 전송에 성공했으면 서버 지시사항 반환
    async fn flush_and_log(&self) -> Option<ServerDirectives> {
        match self.flush().await {
            Ok(SubmitOutcome::Skipped) => {
                debug!("제출할 메트릭 없음");
                None
            }
            Ok(outcome) => {
                if outcome.is_delivered() {
                    debug!("텔레메트리 제출 완료 (시도 {}회)", outcome.attempts());
                }
                outcome.directives()
            }
            Err(e) => {
                warn!("텔레메트리 제출 실패: {e}");
                None
            }
        }
    }
}

/// 첫 틱이 한 주기 뒤에 오는 interval
fn make_interval(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
