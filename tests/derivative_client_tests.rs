use std::sync::{Arc, Mutex};
use std::time::Duration;

use apsflow::derivative::{encode_urn, DerivativeClient, JobState, PollError, Poller};
use apsflow::error::{ApsError, ErrorCategory};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const URN: &str = "dXJuOmFkc2sub2JqZWN0czpvcy5vYmplY3Q6YnVja2V0L2hvdXNlLnJ2dA";

fn client(server: &MockServer) -> DerivativeClient {
    DerivativeClient::new("token-1").with_base_url(server.uri())
}

fn manifest_path() -> String {
    format!("/modelderivative/v2/designdata/{URN}/manifest")
}

#[test]
fn encode_urn_matches_known_value() {
    assert_eq!(
        encode_urn("urn:adsk.objects:os.object:bucket/house.rvt"),
        URN
    );
}

#[tokio::test]
async fn submit_translation_posts_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/modelderivative/v2/designdata/job"))
        .and(header("authorization", "Bearer token-1"))
        .and(body_partial_json(json!({
            "input": { "urn": URN },
            "output": { "formats": [{ "type": "svf2", "views": ["2d", "3d"] }] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "created",
            "urn": URN,
            "acceptedJobs": { "output": { "formats": [{ "type": "svf2" }] } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let job = client(&server)
        .submit_translation(URN, &["svf2"])
        .await
        .expect("submit");

    assert_eq!(job.urn, URN);
    assert_eq!(job.result, "created");
}

#[tokio::test]
async fn submit_translation_surfaces_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/modelderivative/v2/designdata/job"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    let err = client(&server)
        .submit_translation(URN, &["svf2"])
        .await
        .unwrap_err();

    match &err {
        ApsError::Api { status, message } => {
            assert_eq!(*status, 401);
            assert_eq!(message, "token expired");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert_eq!(err.category(), ErrorCategory::Authentication);
}

#[tokio::test]
async fn submit_translation_requires_a_format() {
    let server = MockServer::start().await;
    let err = client(&server).submit_translation(URN, &[]).await.unwrap_err();
    assert!(matches!(err, ApsError::InvalidArgument(_)));
}

#[tokio::test]
async fn fetch_status_reads_in_progress_manifest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(manifest_path()))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "manifest",
            "status": "inprogress",
            "progress": "33% complete"
        })))
        .mount(&server)
        .await;

    let status = client(&server).fetch_status(URN).await.expect("status");

    assert_eq!(status.state, JobState::InProgress);
    assert_eq!(status.progress.as_deref(), Some("33% complete"));
}

#[tokio::test]
async fn fetch_status_maps_http_failure_to_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(manifest_path()))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server).fetch_status(URN).await.unwrap_err();

    assert!(matches!(err, PollError::Transport(ref m) if m.contains("503")));
}

#[tokio::test]
async fn watch_translation_converges_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(manifest_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "inprogress",
            "progress": "50% complete"
        })))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(manifest_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "progress": "complete",
            "derivatives": [{ "outputType": "svf2", "status": "success" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let progress = Arc::new(Mutex::new(Vec::new()));
    let sink = progress.clone();
    let poller = Poller::new(URN)
        .with_interval(Duration::from_millis(10))
        .on_progress(move |event| {
            sink.lock()
                .unwrap()
                .push(event.progress.map(str::to_string));
        });

    let status = client(&server)
        .watch_translation(URN, poller)
        .await
        .expect("converges");

    assert_eq!(status.state, JobState::Success);
    assert!(status.manifest.is_some());
    assert_eq!(progress.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn watch_translation_rejects_failed_job_with_diagnostics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(manifest_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "failed",
            "progress": "complete",
            "derivatives": [{
                "status": "failed",
                "messages": [{ "type": "error", "code": "TranslationWorker-InternalFailure" }]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .watch_translation(URN, Poller::new(URN).with_interval(Duration::from_millis(10)))
        .await
        .unwrap_err();

    let diagnostics = err.diagnostics().expect("diagnostics").clone();
    assert_eq!(
        diagnostics["messages"][0]["code"],
        "TranslationWorker-InternalFailure"
    );
    assert_eq!(ApsError::from(err).category(), ErrorCategory::JobFailed);
}
