use std::sync::Arc;

use linguist_client::clients::{HttpRemoteClient, LocalFile, RemoteService};
use linguist_client::config::Config;
use linguist_client::error::{ApiError, AppError, PollError};
use linguist_client::models::{
    DictionaryKind, FileRef, ProcessingOptions, ShieldingDictionary, StartProcessingRequest,
    TaskStatus,
};
use linguist_client::orchestrator::{Phase, TaskOrchestrator};
use linguist_client::services::{AutoSaveCoordinator, UploadService};
use linguist_client::utils::logging;
use linguist_client::{SaveStatus, SegmentKind};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    Config {
        api_base_url: format!("{}/api", server.uri()),
        poll_interval_ms: 20,
        simulation_tick_ms: 10,
        autosave_debounce_ms: 50,
        saved_status_reset_ms: 100,
        simulation_seed: Some(11),
        ..Config::default()
    }
}

fn client_for(server: &MockServer) -> Arc<HttpRemoteClient> {
    Arc::new(HttpRemoteClient::new(&config_for(server)).expect("client"))
}

#[tokio::test]
async fn status_response_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/processing/status/t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "processing",
            "progress": 40,
            "processed_files": 2,
            "total_files": 5
        })))
        .mount(&server)
        .await;

    let status = client_for(&server).get_status("t-1").await.expect("status");
    assert_eq!(status.status, TaskStatus::Processing);
    assert_eq!(status.progress, 40);
    assert_eq!(status.processed_files, 2);
    assert_eq!(status.total_files, 5);
}

#[tokio::test]
async fn non_success_status_carries_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/processing/result/t-9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "任务不存在"})))
        .mount(&server)
        .await;

    let err = client_for(&server).get_result("t-9").await.unwrap_err();
    match err {
        ApiError::BadResponse {
            endpoint,
            status,
            detail,
        } => {
            assert_eq!(endpoint, "/processing/result/t-9");
            assert_eq!(status, 404);
            assert_eq!(detail.as_deref(), Some("任务不存在"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dictionaries/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_dictionary_stats().await.unwrap_err();
    assert!(matches!(err, ApiError::JsonParseFailed { .. }));
    assert!(!err.is_transport());
}

#[tokio::test]
async fn start_processing_sends_files_and_options() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/processing/start"))
        .and(body_json(json!({
            "files": [{"file_id": "f1", "filename": "ep01.srt"}],
            "use_correction": true,
            "use_shielding": false,
            "use_noise_removal": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "t-42"})))
        .expect(1)
        .mount(&server)
        .await;

    let request = StartProcessingRequest {
        files: vec![FileRef {
            file_id: "f1".to_string(),
            filename: "ep01.srt".to_string(),
        }],
        options: ProcessingOptions {
            use_shielding: false,
            ..ProcessingOptions::default()
        },
    };
    let task_id = client_for(&server)
        .start_processing(&request)
        .await
        .expect("start");
    assert_eq!(task_id, "t-42");
}

#[tokio::test]
async fn upload_is_multipart_and_maps_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files/upload"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                {"file_id": "u-1", "filename": "a.srt", "size": 3},
                {"file_id": "u-2", "filename": "b.srt", "size": 3}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = UploadService::new(client_for(&server));
    let files = service
        .upload(&[LocalFile::new("a.srt", "abc"), LocalFile::new("b.srt", "def")])
        .await
        .expect("upload");

    let ids: Vec<_> = files.iter().map(|f| f.file_id.clone().unwrap()).collect();
    assert_eq!(ids, vec!["u-1", "u-2"]);
}

#[tokio::test]
async fn upload_count_mismatch_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{"file_id": "u-1"}]
        })))
        .mount(&server)
        .await;

    let service = UploadService::new(client_for(&server));
    let err = service
        .upload(&[LocalFile::new("a.srt", "abc"), LocalFile::new("b.srt", "def")])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("期望 2 个"));
}

#[tokio::test]
async fn batch_runs_to_completion_over_http() {
    logging::init_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/processing/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "t-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/processing/status/t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "processing", "progress": 0, "processed_files": 0, "total_files": 1
        })))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/processing/status/t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed", "progress": 100, "processed_files": 1, "total_files": 1
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/processing/result/t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{
                "file_id": "f1",
                "statistics": {
                    "total_replacements": 1,
                    "term_corrections": 1,
                    "noise_removals": 0,
                    "top_replacements": [{"source": "快", "target": "慢", "count": 1}]
                },
                "diff_data": [{
                    "index": 1,
                    "time": "00:00:01,000 --> 00:00:02,000",
                    "original": "飞船速度过快",
                    "modified": "飞船速度过慢",
                    "changed": true
                }],
                "output_path": "/processed/f1.srt"
            }],
            "statistics": {"total_replacements": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = TaskOrchestrator::new(client_for(&server), config_for(&server));
    let files = vec![linguist_client::SubtitleFile::uploaded("ep01.srt", "f1", 64)];

    let task_id = orchestrator.submit(files).await.expect("submit");
    assert_eq!(task_id, "t-1");

    let snapshot = orchestrator.wait_for_terminal().await.expect("completed");
    assert_eq!(snapshot.phase, Phase::Completed);
    assert_eq!(snapshot.display_progress, 100);
    assert_eq!(snapshot.task.as_ref().unwrap().statistics.total_replacements, 1);

    let segments = snapshot.files[0].diff_data[0].diff();
    let kinds: Vec<_> = segments.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![SegmentKind::Unchanged, SegmentKind::Removed, SegmentKind::Added]
    );
    assert_eq!(snapshot.files[0].corrected_srt(), "1\n00:00:01,000 --> 00:00:02,000\n飞船速度过慢\n");
}

#[tokio::test]
async fn server_error_during_polling_fails_the_task() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/processing/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "t-2"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/processing/status/t-2"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "内部错误"})))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = TaskOrchestrator::new(client_for(&server), config_for(&server));
    orchestrator
        .submit(vec![linguist_client::SubtitleFile::uploaded("ep01.srt", "f1", 64)])
        .await
        .expect("submit");

    let err = orchestrator.wait_for_terminal().await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Poll(PollError::StatusFailed {
            source: ApiError::BadResponse { status: 500, .. },
            ..
        })
    ));
    assert_eq!(orchestrator.snapshot().phase, Phase::Failed);
}

#[tokio::test]
async fn dictionary_edits_are_saved_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dictionaries/shielding"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"protected_words": ["星舰"]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/dictionaries/shielding"))
        .and(body_json(json!({"protected_words": ["星舰", "曲率引擎"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let coordinator =
        AutoSaveCoordinator::<ShieldingDictionary, _>::load(client_for(&server), &config)
            .await
            .expect("load");
    assert_eq!(coordinator.document().kind(), DictionaryKind::Shielding);

    coordinator.edit(|d| d.add_word("  曲率引擎 ")).expect("edit");
    coordinator.flush().await.expect("flush");
    assert_eq!(coordinator.status(), SaveStatus::Saved);
    assert!(!coordinator.document().dirty);
}
