//! Shared test fixtures.

use std::io::Write;
use std::path::{Path, PathBuf};

/// Serves `app` on an ephemeral local port and returns its base URL with a trailing slash.
pub async fn spawn_server(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

/// Writes a minimal Argos package archive: one top-level directory holding `metadata.json`
/// and a placeholder model file.
pub fn write_package(dir: &Path, from: &str, to: &str, version: &str) -> PathBuf {
    let name = format!("translate-{}_{}-{}", from, to, version.replace('.', "_"));
    let path = dir.join(format!("{}.argosmodel", name));
    let file = std::fs::File::create(&path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();

    let metadata = serde_json::json!({
        "package_version": version,
        "from_code": from,
        "to_code": to,
        "from_name": from.to_uppercase(),
        "to_name": to.to_uppercase(),
    });

    zip.add_directory(format!("{}/", name), options).unwrap();
    zip.start_file(format!("{}/metadata.json", name), options)
        .unwrap();
    zip.write_all(metadata.to_string().as_bytes()).unwrap();
    zip.start_file(format!("{}/model/model.bin", name), options)
        .unwrap();
    zip.write_all(b"weights").unwrap();
    zip.finish().unwrap();

    path
}
