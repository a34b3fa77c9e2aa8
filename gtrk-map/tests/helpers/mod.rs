//! Mock upstream servers for integration tests

#![allow(dead_code)]

use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Serve `app` on an ephemeral local port and return its base URL
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Request counter shared with a mock handler
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn artists_json() -> Value {
    json!([
        {
            "id": 1,
            "name": "Queen",
            "image": "https://img.test/queen.jpeg",
            "members": ["Freddie Mercury", "Brian May", "Roger Taylor", "John Deacon"],
            "creationDate": 1970,
            "firstAlbum": "14-12-1973"
        },
        {
            "id": 2,
            "name": "Pink Floyd",
            "image": "https://img.test/pinkfloyd.jpeg",
            "members": ["Roger Waters", "David Gilmour"],
            "creationDate": 1965,
            "firstAlbum": "05-08-1967"
        },
        {
            "id": 3,
            "name": "Nameless",
            "image": "",
            "members": [],
            "creationDate": 2001,
            "firstAlbum": "01-01-2002"
        }
    ])
}

pub fn relation_json() -> Value {
    json!({
        "index": [
            {
                "id": 1,
                "datesLocations": {
                    "london-uk": ["*14-07-1985", "15-07-1985"],
                    "paris-france": ["20-06-1986"]
                }
            },
            {
                "id": 2,
                "datesLocations": {
                    "london-uk": ["02-07-2005"],
                    "atlantis-ocean": ["01-01-1999"]
                }
            }
        ]
    })
}

/// Upstream that answers the remote API routes, plus the proxy routes
/// unless `proxy_up` is false (then every proxy route returns 500)
pub fn upstream(proxy_up: bool, proxy_hits: Hits, remote_hits: Hits) -> Router {
    let proxy = move |body: Value, hits: Hits| {
        move || {
            let body = body.clone();
            let hits = hits.clone();
            async move {
                hits.bump();
                if proxy_up {
                    Ok(Json(body))
                } else {
                    Err(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }
    };
    let remote = |body: Value, hits: Hits| {
        move || {
            let body = body.clone();
            let hits = hits.clone();
            async move {
                hits.bump();
                Json(body)
            }
        }
    };

    Router::new()
        .route("/api/artists-proxy", get(proxy(artists_json(), proxy_hits.clone())))
        .route("/api/relation-proxy", get(proxy(relation_json(), proxy_hits)))
        .route("/api/artists", get(remote(artists_json(), remote_hits.clone())))
        .route("/api/relation", get(remote(relation_json(), remote_hits)))
}

/// Upstream where every route fails
pub fn broken_upstream() -> Router {
    Router::new().fallback(|| async { StatusCode::SERVICE_UNAVAILABLE })
}
