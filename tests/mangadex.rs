use mgcli::{Catalog, ImageRef, MangadexCatalog};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manga"))
        .and(query_param("title", "cafe"))
        .and(query_param("availableTranslatedLanguage[]", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "data": [
                {"id": "m1", "type": "manga", "attributes": {"title": {"en": "The Cafe Terrace"}}},
                {"id": "m2", "type": "manga", "attributes": {"title": {"ja-ro": "Kafe"}}}
            ]
        })))
        .mount(&server)
        .await;

    let catalog = MangadexCatalog::new().base_url(server.uri()).language("en");
    let results = catalog.search("cafe").await.unwrap();

    let titles: Vec<_> = results.iter().map(|m| (m.id().as_str(), m.title().as_str())).collect();
    assert_eq!(titles, [("m1", "The Cafe Terrace"), ("m2", "Kafe")]);
}

#[tokio::test]
async fn test_latest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manga"))
        .and(query_param("order[latestUploadedChapter]", "desc"))
        .and(query_param("availableTranslatedLanguage[]", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "data": [
                {"id": "m7", "type": "manga", "attributes": {"title": {"en": "Fresh"}}}
            ]
        })))
        .mount(&server)
        .await;

    let catalog = MangadexCatalog::new().base_url(server.uri());
    let results = catalog.latest().await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id(), "m7");
    assert_eq!(results[0].title(), "Fresh");
}

#[tokio::test]
async fn test_manga_details() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manga/m1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "data": {"id": "m1", "type": "manga", "attributes": {
                "title": {"en": "The Cafe Terrace"},
                "description": {"en": "A cafe by the sea.\n", "fr": "Un café."},
                "status": "ongoing",
                "year": null
            }}
        })))
        .mount(&server)
        .await;

    let catalog = MangadexCatalog::new().base_url(server.uri());
    let details = catalog.manga_details("m1").await.unwrap();

    assert_eq!(details.title(), "The Cafe Terrace");
    assert_eq!(details.description(), "A cafe by the sea.");
    assert_eq!(details.status().as_deref(), Some("ongoing"));
    assert_eq!(*details.year(), None);
}

#[tokio::test]
async fn test_list_chapters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manga/m1/aggregate"))
        .and(query_param("translatedLanguage[]", "fr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "volumes": {
                "2": {"volume": "2", "count": 2, "chapters": {
                    "11": {"chapter": "11", "id": "c11", "count": 1, "others": []},
                    "10.5": {"chapter": "10.5", "id": "c10.5", "count": 1, "others": []}
                }},
                "1": {"volume": "1", "count": 2, "chapters": {
                    "2": {"chapter": "2", "id": "c2", "count": 1, "others": []},
                    "1": {"chapter": "1", "id": "c1", "count": 1, "others": []}
                }}
            }
        })))
        .mount(&server)
        .await;

    let catalog = MangadexCatalog::new().base_url(server.uri()).language("fr");
    let chapters = catalog.list_chapters("m1").await.unwrap();

    let numbers: Vec<_> = chapters.iter().map(|c| c.number().as_str()).collect();
    assert_eq!(numbers, ["1", "2", "10.5", "11"]);
    assert_eq!(chapters[2].id(), "c10.5");
}

#[tokio::test]
async fn test_list_chapters_without_translation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manga/m1/aggregate"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": "ok", "volumes": []})),
        )
        .mount(&server)
        .await;

    let catalog = MangadexCatalog::new().base_url(server.uri()).language("xxx");
    assert!(catalog.list_chapters("m1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_chapter_pages_and_image() {
    let server = MockServer::start().await;
    let body = json!({
        "result": "ok",
        "baseUrl": server.uri(),
        "chapter": {
            "hash": "abc",
            "data": ["1-full.png", "2-full.jpg"],
            "dataSaver": ["1-small.jpg", "2-small.jpg"]
        }
    });
    Mock::given(method("GET"))
        .and(path("/at-home/server/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/abc/1-full.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
        .mount(&server)
        .await;

    let saver = MangadexCatalog::new().base_url(server.uri());
    let pages = saver.fetch_chapter_pages("c1").await.unwrap();
    assert_eq!(
        pages,
        [
            ImageRef::new(format!("{}/data-saver/abc/1-small.jpg", server.uri())),
            ImageRef::new(format!("{}/data-saver/abc/2-small.jpg", server.uri())),
        ]
    );

    let raw = MangadexCatalog::new().base_url(server.uri()).data_saver(false);
    let pages = raw.fetch_chapter_pages("c1").await.unwrap();
    assert_eq!(pages[0].extension(), "png");
    assert_eq!(raw.download_image(&pages[0]).await.unwrap(), b"png");
}

#[tokio::test]
async fn test_http_errors_are_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/at-home/server/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let catalog = MangadexCatalog::new().base_url(server.uri());
    assert!(matches!(
        catalog.fetch_chapter_pages("missing").await,
        Err(mgcli::CatalogError::Request(_))
    ));
}

#[tokio::test]
#[ignore = "talks to api.mangadex.org"]
async fn test_live_chapter_download() {
    use std::sync::Arc;

    let tmpdir = tempfile::tempdir().unwrap();
    let mut session = mgcli::Session::new(
        Arc::new(MangadexCatalog::new().language("fr")),
        mgcli::DownloadOptions::new(tmpdir.path()),
    );
    let report = session
        .download("d7037b2a-874a-4360-8a7b-07f2899152fd", &"1".parse().unwrap())
        .await
        .expect("Some error");

    assert_eq!(report.succeeded_count(), 1);
    let (chapter, download) = &report.succeeded[0];
    assert!(download.path.ends_with(chapter.dir_name()));
    assert!(download.pages > 0);
}
