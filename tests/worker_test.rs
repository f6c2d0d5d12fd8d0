//! Reference worker tests: classifier invocation and a full run against
//! a live dispatcher.

mod common;

use common::fast_lease;
use photo_dispatch::model::post::NewPost;
use photo_dispatch::queue::MemoryQueue;
use photo_dispatch::server::{AppState, serve};
use photo_dispatch::worker::{WorkerConfig, classify, run_once};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Classifier that says "1" only for the photo named `good`.
fn shell_classifier(url: &str) -> WorkerConfig {
    WorkerConfig {
        url: url.to_string(),
        classifier: PathBuf::from("sh"),
        classifier_args: vec![
            "-c".to_string(),
            r#"if [ "$PHOTO_REF" = good ]; then echo 1; else echo 0; fi"#.to_string(),
        ],
        reconnect_delay: Duration::from_millis(50),
    }
}

#[tokio::test]
async fn classifier_output_decides_verdict() {
    let config = shell_classifier("ws://unused");
    assert!(classify(&config, "good").await);
    assert!(!classify(&config, "bad").await);
}

#[tokio::test]
async fn classifier_failure_is_negative() {
    let mut config = shell_classifier("ws://unused");
    config.classifier_args = vec!["-c".to_string(), "echo 1; exit 3".to_string()];
    assert!(!classify(&config, "good").await);

    config.classifier = PathBuf::from("/nonexistent/classifier");
    config.classifier_args.clear();
    assert!(!classify(&config, "good").await);
}

#[tokio::test]
async fn run_once_fails_when_dispatcher_is_unreachable() {
    // Bind then drop to get a port nobody listens on.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let config = shell_classifier(&format!("ws://{addr}/ws"));
    assert!(run_once(&config).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn worker_drains_queue_through_dispatcher() {
    let queue = Arc::new(MemoryQueue::new());
    let positive = queue
        .insert(NewPost::new().photo("bad").photo("good").photo("bad"))
        .unwrap();
    let negative = queue.insert(NewPost::new().photo("bad").other()).unwrap();
    let photoless = queue.insert(NewPost::new().other()).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState {
        queue: queue.clone(),
        lease: fast_lease(),
    };
    tokio::spawn(serve(listener, state, std::future::pending()));

    let config = shell_classifier(&format!("ws://{addr}/ws"));
    let worker = tokio::spawn(async move { run_once(&config).await });

    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let posts = queue.all().unwrap();
            if posts.iter().all(|p| p.verdict.is_some()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("worker should resolve every post");
    worker.abort();

    assert_eq!(queue.get(positive.id).unwrap().verdict, Some(true));
    assert_eq!(queue.get(negative.id).unwrap().verdict, Some(false));
    assert_eq!(queue.get(photoless.id).unwrap().verdict, Some(false));
}
