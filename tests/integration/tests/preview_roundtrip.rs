use std::net::SocketAddr;
use std::sync::Arc;

use httpmock::prelude::*;
use serde_json::json;
use tokio::net::TcpListener;
use vitrine_core::{BundleDescriptor, EntrySource};
use vitrine_render::{
    build_preview_host_router, BlobStore, FrameState, PreviewHostState, SandboxPolicy,
};
use vitrine_runtime::{
    HttpDocumentFetcher, HttpFetcherConfig, MemoryDocumentFetcher, PreviewConfig,
    RenderController, RenderError, RenderOutcome,
};
use vitrine_storage::{FirebaseStorageConfig, FirebaseStorageLister, MemoryStorage};

fn fast_config() -> PreviewConfig {
    PreviewConfig {
        retry_delay_ms: 1,
        ..PreviewConfig::default()
    }
}

fn bundle(id: &str, upload_id: &str) -> BundleDescriptor {
    BundleDescriptor {
        id: id.to_string(),
        upload_id: Some(upload_id.to_string()),
        ..BundleDescriptor::default()
    }
}

async fn spawn_host(state: PreviewHostState) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("listener addr");
    let app = build_preview_host_router(state);
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, handle)
}

async fn get_text(url: String) -> (u16, String) {
    let response = reqwest::get(url).await.expect("http response");
    let status = response.status().as_u16();
    (status, response.text().await.expect("http body"))
}

#[tokio::test]
async fn integration_memory_bundle_renders_through_preview_host() {
    let storage = Arc::new(MemoryStorage::new("memory://bucket"));
    storage.put(
        "uploads/u1/index.html",
        r#"<link href="./css/site.css"><img src="data:image/png;base64,AAAA">"#,
    );
    storage.put("uploads/u1/css/site.css", "body{}");

    let host = PreviewHostState::new(BlobStore::new("vitrine://local"), SandboxPolicy::interactive());
    let surface = Arc::new(host.renderer("card-1"));
    let controller = RenderController::new(
        "card-1",
        storage.clone(),
        Arc::new(MemoryDocumentFetcher::new(storage.clone())),
        surface.clone(),
        fast_config(),
    );

    let report = controller.render(&bundle("b1", "u1")).await;
    let RenderOutcome::Rendered { entry } = &report.outcome else {
        panic!("expected rendered outcome, got {:?}", report.outcome);
    };
    assert_eq!(entry.source, EntrySource::Index);

    let object_url = surface.current_object_url().expect("live object url");
    let (addr, handle) = spawn_host(host.clone()).await;

    let (status, markup) = get_text(format!("http://{addr}/frames/card-1")).await;
    assert_eq!(status, 200);
    assert!(markup.contains(&format!("src=\"/blobs/{}\"", object_url.id)));
    assert!(markup.contains("allow-scripts allow-same-origin"));

    let (status, document) = get_text(format!("http://{addr}/blobs/{}", object_url.id)).await;
    assert_eq!(status, 200);
    assert!(document.contains(r#"href="memory://bucket/uploads/u1/css/site.css?v="#));
    assert!(document.contains(r#"src="data:image/png;base64,AAAA""#));

    // A second render replaces and revokes the first object URL.
    storage.put("uploads/u1/index.html", "<p>second upload</p>");
    storage.expire_issued_urls();
    let report = controller.render(&bundle("b1", "u1")).await;
    assert!(matches!(report.outcome, RenderOutcome::Rendered { .. }));
    let (status, _) = get_text(format!("http://{addr}/blobs/{}", object_url.id)).await;
    assert_eq!(status, 404);

    let fresh = surface.current_object_url().expect("fresh object url");
    let (_, document) = get_text(format!("http://{addr}/blobs/{}", fresh.id)).await;
    assert_eq!(document, "<p>second upload</p>");

    controller.dispose();
    assert_eq!(host.frame("card-1").current(), FrameState::Blank);
    assert_eq!(host.blobs().live_count(), 0);
    handle.abort();
}

#[tokio::test]
async fn integration_no_entry_bundle_shows_error_document_in_frame() {
    let storage = Arc::new(MemoryStorage::new("memory://bucket"));
    storage.put("uploads/u2/readme.txt", "no html here");

    let host = PreviewHostState::new(BlobStore::default(), SandboxPolicy::document());
    let controller = RenderController::new(
        "card-2",
        storage.clone(),
        Arc::new(MemoryDocumentFetcher::new(storage)),
        Arc::new(host.renderer("card-2")),
        fast_config(),
    );

    let report = controller.render(&bundle("b2", "u2")).await;
    assert_eq!(
        report.error(),
        Some(&RenderError::NoEntryPointFound { id: "b2".into() })
    );

    let (addr, handle) = spawn_host(host.clone()).await;
    let (_, markup) = get_text(format!("http://{addr}/frames/card-2")).await;
    assert!(markup.contains("srcdoc="));
    assert!(markup.contains("No entry point found: the bundle contains no HTML file."));
    assert_eq!(host.blobs().live_count(), 0);
    handle.abort();
}

fn firebase_lister(server: &MockServer) -> FirebaseStorageLister {
    FirebaseStorageLister::new(FirebaseStorageConfig {
        api_base: server.base_url(),
        bucket: "demo.appspot.com".to_string(),
        bearer_token: None,
        request_timeout_ms: 5_000,
        page_size: 100,
    })
    .expect("firebase lister")
}

fn http_fetcher() -> HttpDocumentFetcher {
    HttpDocumentFetcher::new(HttpFetcherConfig {
        request_timeout_ms: 5_000,
    })
    .expect("http fetcher")
}

#[tokio::test]
async fn integration_firebase_bundle_renders_with_token_urls() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/v0/b/demo.appspot.com/o")
            .query_param("prefix", "uploads/u3/");
        then.status(200).json_body(json!({
            "items": [{"name": "uploads/u3/index.html"}, {"name": "uploads/u3/app.js"}]
        }));
    });
    for (suffix, token) in [("index.html", "tok-index"), ("app.js", "tok-app")] {
        server.mock(|when, then| {
            when.method(GET)
                .path_prefix("/v0/b/demo.appspot.com/o/uploads")
                .path_suffix(suffix)
                .query_param_missing("alt");
            then.status(200)
                .json_body(json!({ "downloadTokens": token }));
        });
    }
    let media = server.mock(|when, then| {
        when.method(GET)
            .path_suffix("index.html")
            .query_param("alt", "media")
            .query_param("token", "tok-index");
        then.status(200)
            .header("content-type", "text/html")
            .body(r#"<script src="app.js"></script>"#);
    });

    let host = PreviewHostState::new(BlobStore::default(), SandboxPolicy::interactive());
    let surface = Arc::new(host.renderer("card-3"));
    let controller = RenderController::new(
        "card-3",
        Arc::new(firebase_lister(&server)),
        Arc::new(http_fetcher()),
        surface.clone(),
        fast_config(),
    );

    let report = controller.render(&bundle("b3", "u3")).await;
    assert!(
        matches!(report.outcome, RenderOutcome::Rendered { .. }),
        "unexpected outcome {:?}",
        report.outcome
    );
    media.assert();

    let object_url = surface.current_object_url().expect("object url");
    let blob = host.blobs().get(&object_url.id).expect("live blob");
    assert_eq!(
        blob.body,
        format!(
            r#"<script src="{}/v0/b/demo.appspot.com/o/uploads%2Fu3%2Fapp.js?alt=media&token=tok-app"></script>"#,
            server.base_url()
        )
    );
}

#[tokio::test]
async fn integration_persistent_forbidden_entry_stops_after_three_cycles() {
    let server = MockServer::start();
    let listing = server.mock(|when, then| {
        when.method(GET)
            .path("/v0/b/demo.appspot.com/o")
            .query_param("prefix", "uploads/u4/");
        then.status(200)
            .json_body(json!({"items": [{"name": "uploads/u4/index.html"}]}));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path_suffix("index.html")
            .query_param_missing("alt");
        then.status(200)
            .json_body(json!({"downloadTokens": "expired"}));
    });
    let media = server.mock(|when, then| {
        when.method(GET)
            .path_suffix("index.html")
            .query_param("alt", "media");
        then.status(403).body("token expired");
    });

    let host = PreviewHostState::new(BlobStore::default(), SandboxPolicy::interactive());
    let controller = RenderController::new(
        "card-4",
        Arc::new(firebase_lister(&server)),
        Arc::new(http_fetcher()),
        Arc::new(host.renderer("card-4")),
        fast_config(),
    );

    let report = controller.render(&bundle("b4", "u4")).await;

    media.assert_calls(3);
    listing.assert_calls(3);
    assert_eq!(report.fetch_cycles, 3);
    assert!(matches!(
        report.error(),
        Some(RenderError::MaxRetriesExceeded { attempts: 3, .. })
    ));
    assert!(matches!(
        host.frame("card-4").current(),
        FrameState::Inline { html, .. } if html.contains("after several attempts")
    ));
}

