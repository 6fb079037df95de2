// Static file serving route handlers

use hyper::{Body, Response, StatusCode};
use std::convert::Infallible;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::web::models::AppState;
use crate::web::response_helpers::{asset_response, html_response, json_error};

const FALLBACK_INDEX: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>BlenderBot Chat</title></head>
<body>
<h1>BlenderBot Chat</h1>
<div id="log"></div>
<form id="chat">
  <input id="prompt" autocomplete="off" placeholder="Say something">
  <button type="submit">Send</button>
</form>
<script>
function append(who, text) {
  const p = document.createElement('p');
  const label = document.createElement('b');
  label.textContent = who + ': ';
  p.appendChild(label);
  p.appendChild(document.createTextNode(text));
  document.getElementById('log').appendChild(p);
}
document.getElementById('chat').addEventListener('submit', async (event) => {
  event.preventDefault();
  const input = document.getElementById('prompt');
  const prompt = input.value;
  input.value = '';
  append('You', prompt);
  const res = await fetch('/chatbot', {
    method: 'POST',
    headers: {'Content-Type': 'application/json'},
    body: JSON.stringify({prompt}),
  });
  const data = await res.json();
  append('Bot', data.response ?? data.error);
});
</script>
</body>
</html>
"#;

pub async fn handle_index(state: AppState) -> Result<Response<Body>, Infallible> {
    let index = state.config.static_dir.join("index.html");
    match fs::read_to_string(&index).await {
        Ok(content) => Ok(html_response(StatusCode::OK, content)),
        Err(e) => {
            log::debug!("No index at {}: {e}; serving built-in page", index.display());
            Ok(html_response(StatusCode::OK, FALLBACK_INDEX))
        }
    }
}

/// Serve `relative` from the static directory. `relative` is the request path
/// with the `/static/` prefix removed.
pub async fn handle_static_asset(relative: &str, state: AppState) -> Result<Response<Body>, Infallible> {
    let Some(relative) = confined(relative) else {
        return Ok(json_error(StatusCode::NOT_FOUND, "Not Found"));
    };

    let file_path = state.config.static_dir.join(relative);
    match fs::read(&file_path).await {
        Ok(content) => Ok(asset_response(content_type_for(&file_path), content)),
        Err(_) => Ok(json_error(StatusCode::NOT_FOUND, "Not Found")),
    }
}

/// `relative` as a path under the static directory, or `None` when it could
/// leave it. Only plain name components are accepted, so root, prefix, `.`
/// and `..` all fail.
fn confined(relative: &str) -> Option<PathBuf> {
    let path = Path::new(relative);
    let mut components = path.components().peekable();
    components.peek()?;
    if components.all(|c| matches!(c, Component::Normal(_))) {
        Some(path.to_path_buf())
    } else {
        None
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
