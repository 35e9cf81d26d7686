//! Template sources against a mock server and the filesystem.

use std::io::Write;
use std::sync::Arc;

use firedb_template::{DefaultSource, FileSource, HttpSource, Page, Template, TemplateError, TemplateSource};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn http_source_fetches_template_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/templates/menu.hbs"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<nav>{{title}}</nav>"))
        .expect(1)
        .mount(&server)
        .await;

    let page = Arc::new(Page::with_regions(["menu"]));
    let mut menu = Template::new(
        format!("{}/templates/menu.hbs", server.uri()),
        "menu",
        json!({"title": "Site"}),
        Arc::new(HttpSource::new().unwrap()),
        page.clone(),
    )
    .unwrap();

    menu.display_main().await.unwrap();
    assert_eq!(page.html("menu").as_deref(), Some("<nav>Site</nav>"));
}

#[tokio::test]
async fn http_failure_status_is_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = HttpSource::new()
        .unwrap()
        .fetch(&format!("{}/missing.hbs", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, TemplateError::Fetch { ref message, .. } if message == "HTTP 404"));
}

#[tokio::test]
async fn file_source_reads_relative_to_root() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = std::fs::File::create(dir.path().join("footer.hbs")).unwrap();
    file.write_all(b"<footer>{{year}}</footer>").unwrap();

    let source = FileSource::with_root(dir.path());
    assert_eq!(source.fetch("footer.hbs").await.unwrap(), "<footer>{{year}}</footer>");
    assert!(source.fetch("absent.hbs").await.is_err());
}

#[tokio::test]
async fn default_source_dispatches_by_scheme() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/remote.hbs"))
        .respond_with(ResponseTemplate::new(200).set_body_string("remote"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("local.hbs"), "local").unwrap();

    let source = DefaultSource::with_file_root(dir.path()).unwrap();
    assert_eq!(source.fetch(&format!("{}/remote.hbs", server.uri())).await.unwrap(), "remote");
    assert_eq!(source.fetch("local.hbs").await.unwrap(), "local");
}
