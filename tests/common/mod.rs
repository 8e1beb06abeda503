#![allow(dead_code)]

use std::net::SocketAddr;

use axum::Json;
use axum::Router;
use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::routing::post;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// 模拟 CLIP 服务：把上传的文件内容当作逗号分隔的向量返回
async fn encode(mut multipart: Multipart) -> Result<Json<Value>, StatusCode> {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        let text = String::from_utf8(data.to_vec()).map_err(|_| StatusCode::BAD_REQUEST)?;
        let vector = text
            .trim()
            .split(',')
            .map(|v| v.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        return Ok(Json(json!({ "vector": vector })));
    }
    Err(StatusCode::BAD_REQUEST)
}

pub async fn serve_clip() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/clip/encode", post(encode));
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
}

/// 在后台线程中启动模拟服务，返回 encode 地址
pub fn spawn_clip_thread() -> String {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            tx.send(serve_clip().await).unwrap();
            std::future::pending::<()>().await;
        });
    });
    format!("http://{}/clip/encode", rx.recv().unwrap())
}

pub fn one_hot(dim: usize, i: usize) -> String {
    (0..dim).map(|j| if i == j { "1" } else { "0" }).collect::<Vec<_>>().join(",")
}
