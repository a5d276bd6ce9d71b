//! CLI 하위 명령 구현.

use anyhow::{anyhow, Context, Result};
use flagmetry_core::config::AppConfig;
use flagmetry_core::models::metric::{Metric, MetricCounts};
use flagmetry_core::models::payload::EnabledMetric;
use flagmetry_network::reporter::{ReporterExit, TelemetryReporter};
use flagmetry_network::storage::MetricStorage;
use flagmetry_network::submitter::{DiscardReason, SubmitOutcome, TelemetrySubmitter};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::lifecycle::LifecycleManager;

/// 스냅샷 파일 로드
///
/// 형식은 페이로드의 `enabled_metrics` 배열과 같다.
/// 같은 키가 여러 번 나오면 합산한다.
pub fn load_snapshot(path: &Path) -> Result<MetricCounts> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("스냅샷 읽기 실패: {}", path.display()))?;
    parse_snapshot(&raw).with_context(|| format!("스냅샷 파싱 실패: {}", path.display()))
}

fn parse_snapshot(raw: &str) -> Result<MetricCounts> {
    let entries: Vec<EnabledMetric> = serde_json::from_str(raw)?;
    let mut counts = MetricCounts::new();
    for entry in entries {
        counts.increment(Metric::new(entry.key, entry.result, entry.time), entry.value);
    }
    Ok(counts)
}

/// `name,true|false` 한 줄 파싱
pub fn parse_evaluation(line: &str) -> Result<(&str, bool)> {
    let (name, result) = line
        .split_once(',')
        .ok_or_else(|| anyhow!("쉼표 구분자가 없습니다: {line:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("플래그 이름이 비어 있습니다: {line:?}"));
    }
    let result = match result.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => true,
        "false" | "0" => false,
        other => return Err(anyhow!("평가 결과는 true/false여야 합니다: {other:?}")),
    };
    Ok((name, result))
}

/// 결과 요약 문자열
pub fn describe(outcome: &SubmitOutcome) -> String {
    match outcome {
        SubmitOutcome::Skipped => "제출할 메트릭 없음".to_string(),
        SubmitOutcome::Delivered { response, attempts } => {
            format!("전송 완료: status={}, 시도 {attempts}회", response.status)
        }
        SubmitOutcome::Discarded(DiscardReason::Rejected { status, attempts }) => {
            format!("서버 거부로 폐기: status={status}, 시도 {attempts}회")
        }
        SubmitOutcome::Discarded(DiscardReason::Exhausted {
            attempts,
            last_failure,
        }) => format!("재시도 소진으로 폐기: 시도 {attempts}회, 마지막 실패: {last_failure}"),
    }
}

/// `submit`: 스냅샷을 한 번 제출
pub async fn submit(config: &AppConfig, file: &Path) -> Result<SubmitOutcome> {
    let counts = load_snapshot(file)?;
    info!("스냅샷 로드: {}개 항목, 총 {}건", counts.len(), counts.total());

    let submitter = TelemetrySubmitter::from_config(&config.cloud, &config.telemetry)?;
    let outcome = submitter.call(&counts).await?;
    println!("{}", describe(&outcome));
    Ok(outcome)
}

/// `watch`: 표준 입력의 평가 기록을 모아 주기적으로 제출
pub async fn watch(config: &AppConfig) -> Result<ReporterExit> {
    watch_input(config, BufReader::new(tokio::io::stdin())).await
}

/// 입력의 평가 기록을 모아 주기적으로 제출
///
/// 입력이 끝나거나(읽기 에러 포함) 종료 시그널을 받으면 마지막으로 한 번 더 제출하고 끝난다.
pub async fn watch_input<R>(config: &AppConfig, input: R) -> Result<ReporterExit>
where
    R: AsyncBufRead + Unpin,
{
    let submitter = Arc::new(TelemetrySubmitter::from_config(
        &config.cloud,
        &config.telemetry,
    )?);
    let storage = Arc::new(MetricStorage::new());
    let reporter = Arc::new(TelemetryReporter::new(
        submitter,
        storage.clone(),
        config.telemetry.clone(),
    ));
    let lifecycle = LifecycleManager::new();

    let mut reporter_task = tokio::spawn({
        let reporter = reporter.clone();
        let shutdown_rx = lifecycle.subscribe();
        async move { reporter.run(shutdown_rx).await }
    });

    let read_result = tokio::select! {
        read = read_evaluations(input, &storage) => {
            match &read {
                Ok(recorded) => info!("입력 종료: {recorded}건 기록"),
                Err(e) => warn!("입력 읽기 중단: {e:#}"),
            }
            lifecycle.shutdown();
            read.map(|_| ())
        }
        _ = lifecycle.wait_for_signal() => Ok(()),
        exit = &mut reporter_task => {
            let exit = exit.context("리포터 태스크 실패")?;
            info!("입력 종료 전 리포터 종료: {exit:?}");
            return Ok(exit);
        }
    };

    // 읽기 에러여도 리포터의 마지막 제출을 기다린 뒤 에러를 돌려준다
    let exit = reporter_task.await.context("리포터 태스크 실패")?;
    info!("리포터 종료: {exit:?}");
    read_result?;
    Ok(exit)
}

/// 줄 단위 평가 기록을 저장소에 쌓는다
///
/// 형식이 틀리거나 UTF-8이 아닌 줄은 경고만 남기고 건너뛴다.
/// 에러는 입력 자체를 읽을 수 없을 때만 돌려준다.
pub async fn read_evaluations<R>(mut reader: R, storage: &MetricStorage) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut line_no: u64 = 0;
    let mut recorded = 0;
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .context("입력 읽기 실패")?;
        if read == 0 {
            break;
        }
        line_no += 1;

        let Ok(line) = std::str::from_utf8(&buf) else {
            warn!("입력 줄 무시 ({line_no}번째): UTF-8이 아님");
            continue;
        };
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            continue;
        }
        match parse_evaluation(line) {
            Ok((name, result)) => {
                storage.record(name, result);
                recorded += 1;
            }
            Err(e) => warn!("입력 줄 무시 ({line_no}번째): {e}"),
        }
    }
    Ok(recorded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_evaluation_lines() {
        assert_eq!(parse_evaluation("search,true").unwrap(), ("search", true));
        assert_eq!(parse_evaluation(" search , FALSE ").unwrap(), ("search", false));
        assert_eq!(parse_evaluation("beta,1").unwrap(), ("beta", true));
        assert!(parse_evaluation("search").is_err());
        assert!(parse_evaluation(",true").is_err());
        assert!(parse_evaluation("search,maybe").is_err());
    }

    #[test]
    fn snapshot_sums_duplicate_keys() {
        let raw = r#"[
            {"key": "search", "time": 1696793160, "result": true, "value": 10},
            {"key": "search", "time": 1696793160, "result": true, "value": 5},
            {"key": "search", "time": 1696793160, "result": false, "value": 1}
        ]"#;
        let counts = parse_snapshot(raw).unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(
            counts.get(&Metric::new("search", true, 1_696_793_160)),
            Some(15)
        );
    }

    #[test]
    fn load_snapshot_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"key": "analytics", "time": 60, "result": true, "value": 3}}]"#
        )
        .unwrap();

        let counts = load_snapshot(file.path()).unwrap();
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn load_snapshot_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(load_snapshot(file.path()).is_err());
    }

    #[tokio::test]
    async fn read_evaluations_skips_bad_lines() {
        let input: &[u8] = b"search,true\nsearch,true\n\nbroken\nbeta,false\n";
        let storage = MetricStorage::new();

        let recorded = read_evaluations(input, &storage).await.unwrap();

        assert_eq!(recorded, 3);
        let counts = storage.drain();
        assert_eq!(counts.total(), 3);
    }

    #[tokio::test]
    async fn read_evaluations_skips_non_utf8_lines() {
        let input: &[u8] = b"search,true\nbeta,\xff\xfe\nsearch,false\r\nlast,true";
        let storage = MetricStorage::new();

        let recorded = read_evaluations(input, &storage).await.unwrap();

        assert_eq!(recorded, 3);
        let counts = storage.drain();
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.len(), 3);
    }

    struct FailingInput;

    impl tokio::io::AsyncRead for FailingInput {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::other("pipe broken")))
        }
    }

    #[tokio::test]
    async fn watch_flushes_before_returning_read_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/telemetry")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let mut config = AppConfig::default_config();
        config.cloud.token = "asdf".to_string();
        config.cloud.base_url = server.url();

        let input = BufReader::new(tokio::io::AsyncReadExt::chain(
            &b"search,true\n"[..],
            FailingInput,
        ));
        let result = watch_input(&config, input).await;

        assert!(result.is_err());
        mock.assert_async().await;
    }

    #[test]
    fn describe_outcomes() {
        assert!(describe(&SubmitOutcome::Skipped).contains("없음"));
        let rejected = SubmitOutcome::Discarded(DiscardReason::Rejected {
            status: 403,
            attempts: 1,
        });
        assert!(describe(&rejected).contains("403"));
    }
}
