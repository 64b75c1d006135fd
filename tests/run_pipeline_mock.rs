use chrono::NaiveDate;
use datever::config::{FileConfig, PublishMode, RunConfig, RunInputs};
use datever::error::Error;
use datever::github::GitHub;
use datever::output::actions::StepOutputs;
use datever::runner;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 7).expect("valid date")
}

fn run_config(server: &MockServer, level: &str, mode: PublishMode, dry_run: bool) -> RunConfig {
    RunConfig::resolve(
        RunInputs {
            level: level.to_string(),
            mode: Some(mode),
            sha: Some(SHA.to_string()),
            repository: Some("octo/widgets".to_string()),
            token: Some("test-token".to_string()),
            api_url: Some(server.uri()),
            server_url: Some("https://github.example".to_string()),
            dry_run,
        },
        &FileConfig::default(),
        |_| None,
    )
    .expect("valid run config")
}

async fn mount_tags(server: &MockServer, names: &[&str]) {
    let body: Vec<serde_json::Value> = names
        .iter()
        .map(|name| serde_json::json!({ "name": name }))
        .collect();

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn tag_mode_bumps_patch_for_same_day_and_creates_tag_and_ref() {
    let server = MockServer::start().await;
    mount_tags(&server, &["latest", "v2.20240307.3", "release-1", "v2.20240306.9"]).await;

    Mock::given(method("POST"))
        .and(path("/repos/octo/widgets/git/tags"))
        .and(body_json(serde_json::json!({
            "tag": "v2.20240307.4",
            "message": "Version v2.20240307.4",
            "object": SHA,
            "type": "commit"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "tag": "v2.20240307.4",
            "sha": "tagobjsha"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/repos/octo/widgets/git/refs"))
        .and(body_json(serde_json::json!({
            "ref": "refs/tags/v2.20240307.4",
            "sha": "tagobjsha"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "ref": "refs/tags/v2.20240307.4"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = run_config(&server, "patch", PublishMode::Tag, false);
    let github = GitHub::with_base_url(&config.api_url, config.token.clone()).unwrap();
    let outcome = runner::run(&github, &config, today()).await.unwrap();

    assert_eq!(outcome.previous, "v2.20240307.3");
    assert_eq!(outcome.version, "v2.20240307.4");
    assert_eq!((outcome.major, outcome.minor, outcome.patch), (2, 20240307, 4));
    let published = outcome.published.as_ref().expect("published");
    assert_eq!(published.tag_object_sha.as_deref(), Some("tagobjsha"));
    assert_eq!(published.target_sha, SHA);

    let outputs = StepOutputs::from_outcome(&outcome);
    assert_eq!(outputs.get("version"), Some("v2.20240307.4"));
    assert_eq!(outputs.get("patch"), Some("4"));
    assert!(outputs.get("version_dns").is_none());
}

#[tokio::test]
async fn release_mode_creates_release_with_changelog_link() {
    let server = MockServer::start().await;
    mount_tags(&server, &["v2.20240307.3"]).await;

    Mock::given(method("POST"))
        .and(path("/repos/octo/widgets/releases"))
        .and(body_json(serde_json::json!({
            "tag_name": "v3.20240307.0",
            "name": "v3.20240307.0",
            "body": "**Full Changelog**: https://github.example/octo/widgets/commits/v3.20240307.0",
            "draft": false,
            "prerelease": false,
            "target_commitish": SHA
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": 1,
            "html_url": "https://github.example/octo/widgets/releases/tag/v3.20240307.0"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = run_config(&server, "major", PublishMode::Release, false);
    let github = GitHub::with_base_url(&config.api_url, config.token.clone()).unwrap();
    let outcome = runner::run(&github, &config, today()).await.unwrap();

    assert_eq!(outcome.version, "v3.20240307.0");
    assert_eq!(outcome.version_dns, "v3-20240307-0");

    let outputs = StepOutputs::from_outcome(&outcome);
    assert_eq!(outputs.get("version_dns"), Some("v3-20240307-0"));
}

#[tokio::test]
async fn empty_repository_starts_from_baseline_in_dry_run() {
    let server = MockServer::start().await;
    mount_tags(&server, &["latest", "nightly"]).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let config = run_config(&server, "minor", PublishMode::Tag, true);
    let github = GitHub::with_base_url(&config.api_url, config.token.clone()).unwrap();
    let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let outcome = runner::run(&github, &config, day).await.unwrap();

    assert_eq!(outcome.previous, "v0.0.0");
    assert_eq!(outcome.version, "v0.20240101.0");
    assert!(outcome.published.is_none());
}

#[tokio::test]
async fn ref_failure_after_tag_object_fails_the_run() {
    let server = MockServer::start().await;
    mount_tags(&server, &["v2.20240306.5"]).await;

    Mock::given(method("POST"))
        .and(path("/repos/octo/widgets/git/tags"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "tag": "v2.20240307.0",
            "sha": "orphan"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/repos/octo/widgets/git/refs"))
        .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "message": "Reference already exists"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = run_config(&server, "patch", PublishMode::Tag, false);
    let github = GitHub::with_base_url(&config.api_url, config.token.clone()).unwrap();
    let result = runner::run(&github, &config, today()).await;

    assert!(
        matches!(result, Err(Error::Api(ref msg)) if msg.contains("Reference already exists")),
        "expected API error, got: {:?}",
        result.map(|outcome| outcome.version)
    );
}

#[tokio::test]
async fn tag_listing_failure_stops_before_publishing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/tags"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "message": "Bad credentials"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let config = run_config(&server, "minor", PublishMode::Release, false);
    let github = GitHub::with_base_url(&config.api_url, config.token.clone()).unwrap();
    let result = runner::run(&github, &config, today()).await;

    assert!(matches!(result, Err(Error::Api(ref msg)) if msg.contains("401")));
}
