mod common;

use std::time::Duration;

use imdedup::Ingestor;
use imdedup::batch::BatchOptions;
use imdedup::db::ImageDB;
use imdedup::embedding::ClipClient;
use imdedup::fetch::SourceFetcher;
use imdedup::server::{AppState, create_app};
use imdedup::storage::FileStorage;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

use common::{one_hot, serve_clip};

struct TestServer {
    dir: TempDir,
    base: String,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let dir = TempDir::new().unwrap();
        let clip = serve_clip().await;

        let db = ImageDB::open(dir.path().join("imdedup.db")).await.unwrap();
        let embedder =
            ClipClient::new(format!("http://{clip}/clip/encode"), Duration::from_secs(5)).unwrap();
        let ingestor =
            Ingestor::new(embedder, db, FileStorage::new(dir.path().join("images")), 90.0);
        let state = AppState::new(
            ingestor,
            SourceFetcher::new(Duration::from_secs(5)).unwrap(),
            BatchOptions::default(),
            dir.path().join("report_similarity.csv"),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, create_app(state)).await.unwrap() });

        Self { dir, base, client: reqwest::Client::new() }
    }

    async fn upload(&self, name: &str, content: &str) -> (StatusCode, Value) {
        let part = Part::bytes(content.as_bytes().to_vec()).file_name(name.to_string());
        let resp = self
            .client
            .post(format!("{}/upload", self.base))
            .multipart(Form::new().part("files", part))
            .send()
            .await
            .unwrap();
        (resp.status(), resp.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(format!("{}{}", self.base, path)).send().await.unwrap()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn upload_status_codes() {
    let server = TestServer::start().await;

    let (status, body) = server.upload("a.jpg", "1,0,0").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], "a.jpg");
    assert!(body["data"].get("embedding").is_none());

    let (status, body) = server.upload("a_copy.jpg", "1,0,0").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("a.jpg"));

    let (status, _) = server.upload("a.gif", "0,1,0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.upload("bad.jpg", "not a vector").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, _) = server.upload("b.png", "0,1,0").await;
    assert_eq!(status, StatusCode::CREATED);

    let list: Vec<Value> = server.get("/?page=1&limit=10").await.json().await.unwrap();
    assert_eq!(list.len(), 2);

    let resp = server.get(&format!("/?page={}&limit=100", i64::MAX)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list: Vec<Value> = resp.json().await.unwrap();
    assert!(list.is_empty());

    let resp = server.get("/metrics").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = resp.text().await.unwrap();
    assert!(text.contains("imdedup_ingest_total"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn get_and_delete() {
    let server = TestServer::start().await;
    let (_, body) = server.upload("a.jpg", "1,2,3").await;
    let id = body["data"]["id"].as_i64().unwrap();

    let resp = server.get(&format!("/images/{id}")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let record: Value = resp.json().await.unwrap();
    assert_eq!(record["name"], "a.jpg");

    let resp = server.get("/images/name/a.jpg").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(server.get("/images/name/b.jpg").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.get("/images/999").await.status(), StatusCode::NOT_FOUND);

    let delete = |id: i64| server.client.delete(format!("{}/delete/{id}", server.base)).send();
    let resp = delete(id).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], format!("Deleted image {id}"));

    assert_eq!(delete(id).await.unwrap().status(), StatusCode::NOT_FOUND);
    assert!(!server.dir.path().join("images/a.jpg").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn upload_csv_writes_report() {
    let server = TestServer::start().await;
    let src = server.dir.path().join("src");
    std::fs::create_dir_all(&src).unwrap();

    let mut manifest = String::from("filename,url\n");
    for i in 0..3 {
        let path = src.join(format!("{i}.jpg"));
        std::fs::write(&path, one_hot(3, i)).unwrap();
        manifest.push_str(&format!("{i}.jpg,{}\n", path.display()));
    }

    let part = Part::bytes(manifest.into_bytes()).file_name("list.csv");
    let resp = server
        .client
        .post(format!("{}/upload_csv", server.base))
        .multipart(Form::new().part("file", part))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["inserted"], 3);

    let report = std::fs::read_to_string(server.dir.path().join("report_similarity.csv")).unwrap();
    assert_eq!(report.lines().count(), 4);
    assert!(report.starts_with("input_name,matched_name,similarity\n"));

    let list: Vec<Value> = server.get("/").await.json().await.unwrap();
    assert_eq!(list.len(), 3);
}
