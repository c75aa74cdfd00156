//! Integration tests for the crawler
//!
//! Most tests drive `execute` with scripted listing delegates and an in-memory
//! progress store; the last ones use wiremock to run `run_crawl` end-to-end.

use async_trait::async_trait;
use publiccode_crawler::config::{
    ClientApi, Config, CrawlerConfig, DomainConfig, MetricsConfig, ProgressConfig,
    UserAgentConfig,
};
use publiccode_crawler::crawler::{
    execute, run_crawl, CrawlOutcome, DomainCrawler, FetchClient, FetchResponse, FileStore,
    Repository, RetryPolicy, TaskContext, ValidationPipeline,
};
use publiccode_crawler::listing::{ListingPage, PageProcessor};
use publiccode_crawler::metrics::{
    MetricsRegistry, PAGINATION_ABANDONED, REPOSITORY_FILE_SAVED, REPOSITORY_FILE_SAVED_VALID,
    REPOSITORY_PROCESSED,
};
use publiccode_crawler::publiccode::PubliccodeValidator;
use publiccode_crawler::storage::{
    open_progress_store, ProgressStatus, ProgressStore, SqliteProgressStore,
};
use publiccode_crawler::CrawlerError;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VALID_MANIFEST: &str = r#"
publiccodeYmlVersion: "0.2"
name: Sample App
url: https://example.com/sample/app
platforms:
  - web
developmentStatus: stable
softwareType: standalone/web
legal:
  license: AGPL-3.0-or-later
maintenance:
  type: community
description:
  en:
    shortDescription: A sample application
"#;

/// One scripted answer of a listing page
#[derive(Clone)]
enum Step {
    Page(Vec<&'static str>, Option<&'static str>),
    Fail,
}

/// Listing delegate answering from a script and recording every call
///
/// Each call also records the checkpoint status of the requested URL at the
/// time the page was processed.
struct ScriptedProcessor {
    domain: &'static str,
    script: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<(String, Option<ProgressStatus>)>>,
    progress: Arc<dyn ProgressStore>,
}

impl ScriptedProcessor {
    fn new(
        domain: &'static str,
        progress: Arc<dyn ProgressStore>,
        steps: Vec<(&'static str, Vec<Step>)>,
    ) -> Arc<Self> {
        let script = steps
            .into_iter()
            .map(|(url, steps)| (url.to_string(), steps.into_iter().collect()))
            .collect();

        Arc::new(Self {
            domain,
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
            progress,
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }
}

#[async_trait]
impl PageProcessor for ScriptedProcessor {
    async fn process_page(&self, url: &str) -> Result<ListingPage, CrawlerError> {
        let status = self.progress.get_status(self.domain, url).unwrap();
        self.calls.lock().unwrap().push((url.to_string(), status));

        let step = {
            let mut script = self.script.lock().unwrap();
            let steps = script.get_mut(url).expect("unscripted url");
            // The last step repeats forever
            if steps.len() > 1 {
                steps.pop_front().unwrap()
            } else {
                steps.front().cloned().unwrap()
            }
        };

        match step {
            Step::Page(names, next) => Ok(ListingPage {
                repositories: names
                    .into_iter()
                    .map(|name| Repository {
                        name: name.to_string(),
                        file_raw_url: format!("https://raw.test/{}/{}/publiccode.yml", self.domain, name),
                        domain: self.domain.to_string(),
                        headers: HashMap::new(),
                    })
                    .collect(),
                next_url: next.map(str::to_string),
            }),
            Step::Fail => Err(CrawlerError::Listing {
                url: url.to_string(),
                message: "scripted failure".to_string(),
            }),
        }
    }
}

/// Manifest host answering from a fixed table, 404 for anything else
struct ManifestHost(HashMap<String, &'static str>);

#[async_trait]
impl FetchClient for ManifestHost {
    async fn get(
        &self,
        url: &str,
        _headers: &HashMap<String, String>,
    ) -> Result<FetchResponse, CrawlerError> {
        Ok(match self.0.get(url) {
            Some(body) => FetchResponse {
                status: 200,
                headers: HashMap::new(),
                body: body.as_bytes().to_vec(),
            },
            None => FetchResponse {
                status: 404,
                headers: HashMap::new(),
                body: b"Not Found".to_vec(),
            },
        })
    }
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
    }
}

fn domain(id: &str, url: &str) -> DomainConfig {
    DomainConfig {
        id: id.to_string(),
        description: String::new(),
        client_api: ClientApi::Github,
        url: url.to_string(),
        headers: BTreeMap::new(),
    }
}

fn task_context(
    dir: &TempDir,
    metrics: &Arc<MetricsRegistry>,
    manifests: &[(&str, &'static str)],
) -> TaskContext {
    let table = manifests
        .iter()
        .map(|(url, body)| (url.to_string(), *body))
        .collect();

    TaskContext {
        client: Arc::new(ManifestHost(table)),
        files: FileStore::new(dir.path(), "publiccode.yml", metrics.clone()),
        validation: ValidationPipeline::new(
            Arc::new(PubliccodeValidator::new()),
            "publiccode.yml",
            metrics.clone(),
        ),
        metrics: metrics.clone(),
    }
}

fn crawler(
    id: &str,
    url: &str,
    processor: Arc<ScriptedProcessor>,
    progress: &Arc<dyn ProgressStore>,
    metrics: &Arc<MetricsRegistry>,
    retry: RetryPolicy,
) -> DomainCrawler {
    DomainCrawler::new(
        domain(id, url),
        processor,
        progress.clone(),
        metrics.clone(),
        retry,
    )
}

fn memory_store() -> Arc<dyn ProgressStore> {
    Arc::new(SqliteProgressStore::new_in_memory().unwrap())
}

#[tokio::test]
async fn test_two_domains_process_every_repository() {
    let dir = TempDir::new().unwrap();
    let progress = memory_store();
    let metrics = Arc::new(MetricsRegistry::with_crawl_counters());

    let a = ScriptedProcessor::new(
        "a",
        progress.clone(),
        vec![
            ("a1", vec![Step::Page(vec!["v/one", "v/two"], Some("a2"))]),
            ("a2", vec![Step::Page(vec!["v/three"], Some("a3"))]),
            ("a3", vec![Step::Page(vec!["v/four"], None)]),
        ],
    );
    let b = ScriptedProcessor::new(
        "b",
        progress.clone(),
        vec![("b1", vec![Step::Page(vec!["w/five"], None)])],
    );

    let crawlers = vec![
        crawler("a", "a1", a.clone(), &progress, &metrics, fast_retry(3)),
        crawler("b", "b1", b.clone(), &progress, &metrics, fast_retry(3)),
    ];

    let outcomes = tokio::time::timeout(
        Duration::from_secs(5),
        execute(crawlers, task_context(&dir, &metrics, &[]), 4),
    )
    .await
    .expect("crawl did not terminate");

    assert_eq!(metrics.get(REPOSITORY_PROCESSED), 5);
    assert_eq!(metrics.get("a"), 4);
    assert_eq!(metrics.get("b"), 1);
    assert_eq!(metrics.get(REPOSITORY_FILE_SAVED), 0);

    assert_eq!(a.calls(), vec!["a1", "a2", "a3"]);
    assert_eq!(b.calls(), vec!["b1"]);
    assert!(outcomes.contains(&(
        "a".to_string(),
        CrawlOutcome::Completed {
            pages: 3,
            repositories: 4
        }
    )));
    assert!(progress.all_entries().unwrap().is_empty());
}

#[tokio::test]
async fn test_no_domains_terminates() {
    let dir = TempDir::new().unwrap();
    let metrics = Arc::new(MetricsRegistry::with_crawl_counters());

    let outcomes = tokio::time::timeout(
        Duration::from_secs(5),
        execute(Vec::new(), task_context(&dir, &metrics, &[]), 4),
    )
    .await
    .expect("crawl did not terminate");

    assert!(outcomes.is_empty());
    assert_eq!(metrics.get(REPOSITORY_PROCESSED), 0);
}

#[tokio::test]
async fn test_failed_page_is_retried_and_checkpointed() {
    let dir = TempDir::new().unwrap();
    let progress = memory_store();
    let metrics = Arc::new(MetricsRegistry::with_crawl_counters());

    let a = ScriptedProcessor::new(
        "a",
        progress.clone(),
        vec![
            ("p1", vec![Step::Page(vec!["v/one"], Some("p2"))]),
            (
                "p2",
                vec![Step::Fail, Step::Page(vec!["v/two", "v/three"], None)],
            ),
        ],
    );

    let outcomes = execute(
        vec![crawler("a", "p1", a.clone(), &progress, &metrics, fast_retry(3))],
        task_context(&dir, &metrics, &[]),
        2,
    )
    .await;

    // The first page is never revisited; the failing one is retried in place
    assert_eq!(a.calls(), vec!["p1", "p2", "p2"]);

    // Every page is checkpointed as failed while it is being processed
    let statuses: Vec<_> = a.calls.lock().unwrap().iter().map(|(_, s)| *s).collect();
    assert!(statuses.iter().all(|s| *s == Some(ProgressStatus::Failed)));

    assert_eq!(progress.get_status("a", "p2").unwrap(), None);
    assert_eq!(metrics.get(REPOSITORY_PROCESSED), 3);
    assert_eq!(metrics.get(PAGINATION_ABANDONED), 0);
    assert_eq!(
        outcomes,
        vec![(
            "a".to_string(),
            CrawlOutcome::Completed {
                pages: 2,
                repositories: 3
            }
        )]
    );
}

#[tokio::test]
async fn test_abandoned_domain_keeps_checkpoint() {
    let dir = TempDir::new().unwrap();
    let progress = memory_store();
    let metrics = Arc::new(MetricsRegistry::with_crawl_counters());

    let broken = ScriptedProcessor::new(
        "broken",
        progress.clone(),
        vec![
            ("x1", vec![Step::Page(vec!["v/one"], Some("x2"))]),
            ("x2", vec![Step::Fail]),
        ],
    );
    let healthy = ScriptedProcessor::new(
        "healthy",
        progress.clone(),
        vec![("h1", vec![Step::Page(vec!["w/one", "w/two"], None)])],
    );

    let outcomes = tokio::time::timeout(
        Duration::from_secs(5),
        execute(
            vec![
                crawler("broken", "x1", broken.clone(), &progress, &metrics, fast_retry(3)),
                crawler("healthy", "h1", healthy, &progress, &metrics, fast_retry(3)),
            ],
            task_context(&dir, &metrics, &[]),
            4,
        ),
    )
    .await
    .expect("crawl did not terminate");

    assert_eq!(broken.calls(), vec!["x1", "x2", "x2", "x2"]);
    assert!(outcomes.contains(&(
        "broken".to_string(),
        CrawlOutcome::Abandoned {
            url: "x2".to_string(),
            attempts: 3
        }
    )));

    assert_eq!(
        progress.get_status("broken", "x2").unwrap(),
        Some(ProgressStatus::Failed)
    );
    assert_eq!(progress.resume_point("broken").unwrap().as_deref(), Some("x2"));
    assert_eq!(progress.resume_point("healthy").unwrap(), None);

    assert_eq!(metrics.get(PAGINATION_ABANDONED), 1);
    assert_eq!(metrics.get(REPOSITORY_PROCESSED), 3);
}

#[tokio::test]
async fn test_resume_starts_from_checkpoint() {
    let dir = TempDir::new().unwrap();
    let progress = memory_store();
    let metrics = Arc::new(MetricsRegistry::with_crawl_counters());
    progress
        .set_status("a", "p2", ProgressStatus::Failed)
        .unwrap();

    let script = || {
        vec![
            ("p1", vec![Step::Page(vec!["v/one"], Some("p2"))]),
            ("p2", vec![Step::Page(vec!["v/two"], None)]),
        ]
    };

    let resumed = ScriptedProcessor::new("a", progress.clone(), script());
    execute(
        vec![crawler("a", "p1", resumed.clone(), &progress, &metrics, fast_retry(3))],
        task_context(&dir, &metrics, &[]),
        2,
    )
    .await;
    assert_eq!(resumed.calls(), vec!["p2"]);
    assert!(progress.entries("a").unwrap().is_empty());

    progress
        .set_status("a", "p2", ProgressStatus::Failed)
        .unwrap();
    let fresh = ScriptedProcessor::new("a", progress.clone(), script());
    execute(
        vec![crawler("a", "p1", fresh.clone(), &progress, &metrics, fast_retry(3)).with_resume(false)],
        task_context(&dir, &metrics, &[]),
        2,
    )
    .await;
    assert_eq!(fresh.calls(), vec!["p1", "p2"]);
}

#[tokio::test]
async fn test_manifests_are_saved_and_validated() {
    let dir = TempDir::new().unwrap();
    let progress = memory_store();
    let metrics = Arc::new(MetricsRegistry::with_crawl_counters());

    let a = ScriptedProcessor::new(
        "a",
        progress.clone(),
        vec![(
            "p1",
            vec![Step::Page(
                vec!["good/app", "bad/app", "none/app", "malformed"],
                None,
            )],
        )],
    );

    let context = task_context(
        &dir,
        &metrics,
        &[
            ("https://raw.test/a/good/app/publiccode.yml", VALID_MANIFEST),
            ("https://raw.test/a/bad/app/publiccode.yml", "name: [unterminated"),
            ("https://raw.test/a/malformed/publiccode.yml", VALID_MANIFEST),
        ],
    );

    execute(
        vec![crawler("a", "p1", a, &progress, &metrics, fast_retry(3))],
        context,
        2,
    )
    .await;

    assert_eq!(metrics.get(REPOSITORY_PROCESSED), 4);
    assert_eq!(metrics.get(REPOSITORY_FILE_SAVED), 2);
    // The malformed name is not written but its manifest is still validated
    assert_eq!(metrics.get(REPOSITORY_FILE_SAVED_VALID), 2);

    let good = dir.path().join("a/good/app/publiccode.yml");
    let bad = dir.path().join("a/bad/app/publiccode.yml");
    assert_eq!(std::fs::read_to_string(good).unwrap(), VALID_MANIFEST);
    assert_eq!(std::fs::read_to_string(bad).unwrap(), "name: [unterminated");
    assert!(!dir.path().join("a/none").exists());
    assert!(!dir.path().join("a/malformed").exists());
}

#[tokio::test]
async fn test_many_repositories_are_each_processed_once() {
    let dir = TempDir::new().unwrap();
    let progress = memory_store();
    let metrics = Arc::new(MetricsRegistry::with_crawl_counters());

    let names: Vec<&'static str> = (0..200)
        .map(|i| &*Box::leak(format!("vendor/repo{}", i).into_boxed_str()))
        .collect();
    let a = ScriptedProcessor::new(
        "a",
        progress.clone(),
        vec![
            ("p1", vec![Step::Page(names[..120].to_vec(), Some("p2"))]),
            ("p2", vec![Step::Page(names[120..].to_vec(), None)]),
        ],
    );

    tokio::time::timeout(
        Duration::from_secs(10),
        execute(
            vec![crawler("a", "p1", a, &progress, &metrics, fast_retry(3))],
            task_context(&dir, &metrics, &[]),
            8,
        ),
    )
    .await
    .expect("crawl did not terminate");

    assert_eq!(metrics.get(REPOSITORY_PROCESSED), 200);
    assert_eq!(metrics.get("a"), 200);
}

fn e2e_config(dir: &TempDir, domain_url: String, max_attempts: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            crawled_filename: "publiccode.yml".to_string(),
            data_dir: dir.path().join("data").to_string_lossy().into_owned(),
            max_concurrent_fetches: 4,
            request_timeout: 5,
            pagination_max_attempts: max_attempts,
            pagination_initial_backoff: 1,
            pagination_max_backoff: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
        },
        progress: ProgressConfig {
            database_path: dir
                .path()
                .join("progress.db")
                .to_string_lossy()
                .into_owned(),
        },
        metrics: MetricsConfig::default(),
        domains: vec![DomainConfig {
            id: "gitlab-test".to_string(),
            description: "Mock GitLab instance".to_string(),
            client_api: ClientApi::Gitlab,
            url: domain_url,
            headers: BTreeMap::new(),
        }],
    }
}

#[tokio::test]
async fn test_run_crawl_against_mock_gitlab() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let link = format!("<{}/api/v4/projects/page2>; rel=\"next\"", base);

    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r#"[{{"path_with_namespace": "group/app", "web_url": "{0}/group/app", "default_branch": "main"}}]"#,
                    base
                ))
                .insert_header("Link", link.as_str()),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects/page2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"[{{"path_with_namespace": "group/tool", "web_url": "{0}/group/tool", "default_branch": "master"}}]"#,
            base
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/group/app/raw/main/publiccode.yml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(VALID_MANIFEST))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = e2e_config(&dir, format!("{}/api/v4/projects", base), 3);

    let report = run_crawl(config, false).await.unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.saved, 1);
    assert_eq!(report.valid, 1);
    assert!(report.abandoned_domains.is_empty());
    assert!(report
        .counters
        .contains(&("gitlab-test".to_string(), 2)));

    let saved = dir.path().join("data/gitlab-test/group/app/publiccode.yml");
    assert_eq!(std::fs::read_to_string(saved).unwrap(), VALID_MANIFEST);
    assert!(!dir.path().join("data/gitlab-test/group/tool").exists());
}

#[tokio::test]
async fn test_run_crawl_abandons_and_fresh_clears_checkpoint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let listing = format!("{}/api/v4/projects", mock_server.uri());
    let config = e2e_config(&dir, listing.clone(), 2);
    let db_path = dir.path().join("progress.db");

    let report = run_crawl(config.clone(), false).await.unwrap();

    assert_eq!(report.processed, 0);
    assert_eq!(
        report.abandoned_domains,
        vec![("gitlab-test".to_string(), listing.clone())]
    );
    {
        let store = open_progress_store(&db_path).unwrap();
        assert_eq!(
            store.resume_point("gitlab-test").unwrap().as_deref(),
            Some(listing.as_str())
        );
    }

    mock_server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&mock_server)
        .await;

    let report = run_crawl(config, true).await.unwrap();
    assert!(report.abandoned_domains.is_empty());

    let store = open_progress_store(&db_path).unwrap();
    assert!(store.all_entries().unwrap().is_empty());
}
