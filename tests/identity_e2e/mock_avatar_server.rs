//! Mock avatar host for E2E tests.
//!
//! Serves a fixed PNG payload and a 404 so the social login pipeline can
//! download avatars without reaching the internet. Each test starts its own
//! server because every `actix_rt::test` runs on a separate runtime.

use actix_web::{App, HttpResponse, HttpServer, get};
use std::net::TcpListener;

/// Bytes returned by `/avatar.png`. Only the signature matters to the tests.
pub const AVATAR_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nmock-avatar";

#[get("/avatar.png")]
async fn avatar() -> HttpResponse {
    HttpResponse::Ok().content_type("image/png").body(AVATAR_BYTES)
}

#[get("/missing.png")]
async fn missing() -> HttpResponse {
    HttpResponse::NotFound().finish()
}

/// Mock avatar server bound to an ephemeral port.
pub struct MockAvatarServer {
    pub base_url: String,
}

impl MockAvatarServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
        let port = listener.local_addr().unwrap().port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let server = HttpServer::new(|| App::new().service(avatar).service(missing))
            .listen(listener)
            .expect("failed to listen")
            .disable_signals()
            .workers(1)
            .run();

        // Fire and forget; the server lives for the process lifetime
        tokio::spawn(server);

        MockAvatarServer { base_url }
    }

    pub fn avatar_url(&self) -> String {
        format!("{}/avatar.png", self.base_url)
    }

    pub fn missing_url(&self) -> String {
        format!("{}/missing.png", self.base_url)
    }
}
