//! Requests over a real socket.

use std::sync::Arc;

use oxide_front::{controller, Discoverer, Dispatcher, Registry};
use oxide_front_server::{serve, DirectoryResources, TemplateViews};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
pub struct Greeter;

#[controller]
impl Greeter {
    #[get_mapping("/greet/{name}")]
    fn greet(&self, name: String) -> String {
        format!("hi {name}")
    }

    #[post_mapping("/greet")]
    fn greet_form(&self, name: String) -> oxide_front::ModelView {
        oxide_front::ModelView::new("greet.html").with("name", name)
    }
}

async fn start(context_path: &'static str) -> (std::net::SocketAddr, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("static")).unwrap();
    std::fs::create_dir(dir.path().join("views")).unwrap();
    std::fs::write(dir.path().join("static/robots.txt"), "User-agent: *\n").unwrap();
    std::fs::write(dir.path().join("views/greet.html"), "<p>{{ name }}</p>").unwrap();

    let registry = Registry::scan_packages(&Discoverer::global(), [module_path!()]).unwrap();
    let dispatcher = Dispatcher::new(Arc::new(registry))
        .with_resources(DirectoryResources::new(dir.path().join("static")))
        .with_views(TemplateViews::new(dir.path().join("views")));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { serve(listener, dispatcher, context_path).await });
    (addr, dir)
}

async fn send(addr: std::net::SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_get_handler() {
    let (addr, _dir) = start("").await;
    let response = send(
        addr,
        "GET /greet/ada HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.ends_with("hi ada"));
}

#[tokio::test]
async fn test_form_post_renders_view() {
    let (addr, _dir) = start("").await;
    let body = "name=Grace";
    let raw = format!(
        "POST /greet HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    let response = send(addr, &raw).await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.ends_with("<p>Grace</p>"));
}

#[tokio::test]
async fn test_static_file_and_404() {
    let (addr, _dir) = start("/app").await;

    let response = send(
        addr,
        "GET /app/robots.txt HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains("User-agent: *"));

    let response = send(
        addr,
        "GET /app/missing HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found"));
}

#[tokio::test]
async fn test_unrouted_verb_is_405() {
    let (addr, _dir) = start("").await;
    let response = send(
        addr,
        "DELETE /greet/ada HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 405 Method Not Allowed"));
}
