//! Local provisioning portal. One connection at a time, one request per
//! connection, no keep-alive: the caller's connection is read once,
//! answered once, and torn down.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use airnode_common::http::{
    self, RouteId, HDR_400, HDR_404, HDR_503, HDR_CSS, HDR_HTML, HDR_JS, HDR_JSON_NO_CACHE,
    HEADER_EMAIL, HEADER_NAME, HEADER_PASSWORD, HEADER_SSID,
};
use airnode_common::{HttpConfig, RegistrationInfo};

use crate::assets;
use crate::net::{NetHandle, StationConfig};
use crate::registration;
use crate::store::NodeStore;

const REQUEST_BUFFER_LEN: usize = 2_048;

pub struct Portal {
    net: NetHandle,
    store: NodeStore,
    limits: HttpConfig,
    registration_url: String,
    device_mac: String,
}

impl Portal {
    pub fn new(
        net: NetHandle,
        store: NodeStore,
        limits: HttpConfig,
        registration_url: String,
        device_mac: String,
    ) -> Self {
        Self {
            net,
            store,
            limits,
            registration_url,
            device_mac,
        }
    }

    pub async fn run(self, listener: TcpListener) {
        if let Ok(addr) = listener.local_addr() {
            info!("portal listening on http://{addr}");
        }

        // Connections are served inline; a slow client stalls only this
        // task, never the session manager.
        loop {
            match listener.accept().await {
                Ok((mut stream, peer)) => {
                    debug!("portal connection from {peer}");
                    if let Err(err) = self.serve(&mut stream).await {
                        warn!("portal request from {peer} failed: {err:#}");
                    }
                    let _ = stream.shutdown().await;
                }
                Err(err) => {
                    warn!("portal accept failed: {err}");
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            }
        }
    }

    /// Serves exactly one request: a single read of the stream buffer,
    /// one route table pass, one response.
    pub(crate) async fn serve<S>(&self, stream: &mut S) -> anyhow::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut buf = vec![0_u8; REQUEST_BUFFER_LEN];
        let read = stream.read(&mut buf).await?;
        let text = String::from_utf8_lossy(&buf[..read]).into_owned();

        // An empty request answers 404, not 400; historical behavior
        // kept deliberately.
        let Some((line, headers)) = http::split_request(&text) else {
            return write_response(stream, HDR_404, b"").await;
        };

        let Some(route) = http::match_route(line) else {
            debug!("no route for request line `{line}`");
            return write_response(stream, HDR_400, b"").await;
        };

        match route {
            RouteId::Index => write_response(stream, HDR_HTML, assets::INDEX_HTML.as_bytes()).await,
            RouteId::JqueryJs => {
                write_response(stream, HDR_JS, assets::JQUERY_JS.as_bytes()).await
            }
            RouteId::CodeJs => write_response(stream, HDR_JS, assets::CODE_JS.as_bytes()).await,
            RouteId::StyleCss => {
                write_response(stream, HDR_CSS, assets::STYLE_CSS.as_bytes()).await
            }
            RouteId::ApList => self.serve_ap_list(stream).await,
            RouteId::Status => self.serve_status(stream).await,
            RouteId::RegistrationInfo => self.serve_registration_info(stream).await,
            RouteId::Connect => self.handle_connect(stream, headers).await,
            RouteId::Disconnect => {
                self.net.disconnect_async();
                write_response(stream, HDR_JSON_NO_CACHE, b"").await
            }
            RouteId::Register => self.handle_register(stream, headers).await,
        }
    }

    async fn serve_ap_list<S>(&self, stream: &mut S) -> anyhow::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let result = match self.net.lock_buffers().await {
            Ok(shared) => {
                write_response(stream, HDR_JSON_NO_CACHE, shared.ap_list.as_bytes()).await
            }
            Err(_) => {
                debug!("ap list request hit the shared-state lock timeout");
                write_response(stream, HDR_503, b"").await
            }
        };

        // Rescan runs decoupled from the response either way.
        self.net.scan_async();
        result
    }

    async fn serve_status<S>(&self, stream: &mut S) -> anyhow::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self.net.lock_buffers().await {
            Ok(shared) if !shared.ip_info.is_empty() => {
                write_response(stream, HDR_JSON_NO_CACHE, shared.ip_info.as_bytes()).await
            }
            Ok(_) => write_response(stream, HDR_503, b"").await,
            Err(_) => {
                debug!("status request hit the shared-state lock timeout");
                write_response(stream, HDR_503, b"").await
            }
        }
    }

    async fn serve_registration_info<S>(&self, stream: &mut S) -> anyhow::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let Ok(mut shared) = self.net.lock_buffers().await else {
            debug!("registration request hit the shared-state lock timeout");
            return write_response(stream, HDR_503, b"").await;
        };

        match self.store.load_registration().await {
            Ok(Some(info)) => {
                shared.registration = info.to_json();
                write_response(stream, HDR_JSON_NO_CACHE, shared.registration.as_bytes()).await
            }
            Ok(None) => write_response(stream, HDR_503, b"").await,
            Err(err) => {
                warn!("registration config fetch failed: {err:#}");
                write_response(stream, HDR_503, b"").await
            }
        }
    }

    async fn handle_connect<S>(&self, stream: &mut S, headers: &str) -> anyhow::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let ssid = http::bounded_header(headers, HEADER_SSID, self.limits.max_ssid_len);
        let password = http::bounded_header(headers, HEADER_PASSWORD, self.limits.max_password_len);

        match (ssid, password) {
            (Some(ssid), Some(password)) => {
                self.net.stage_station_config(StationConfig {
                    ssid: ssid.to_string(),
                    password: password.to_string(),
                });
                self.net.connect_async();
                write_response(stream, HDR_JSON_NO_CACHE, b"").await
            }
            _ => write_response(stream, HDR_400, b"").await,
        }
    }

    async fn handle_register<S>(&self, stream: &mut S, headers: &str) -> anyhow::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let name = http::bounded_header(headers, HEADER_NAME, self.limits.max_name_len);
        let email = http::bounded_header(headers, HEADER_EMAIL, self.limits.max_email_len);

        let (Some(name), Some(email)) = (name, email) else {
            return write_response(stream, HDR_400, b"").await;
        };

        let info = RegistrationInfo::new(name, email, &self.device_mac);
        if let Err(err) = self.store.save_registration(&info).await {
            warn!("failed to persist registration: {err:#}");
            return write_response(stream, HDR_503, b"").await;
        }

        let result = write_response(stream, HDR_JSON_NO_CACHE, b"").await;
        registration::spawn_notification(self.registration_url.clone(), info);
        result
    }
}

async fn write_response<S>(stream: &mut S, header: &str, body: &[u8]) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(header.as_bytes()).await?;
    if !body.is_empty() {
        stream.write_all(body).await?;
    }
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn scratch_portal(label: &str) -> Portal {
        let dir = std::env::temp_dir().join(format!("airnode-portal-{}-{label}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        Portal::new(
            NetHandle::standalone(10),
            NodeStore::at(dir),
            HttpConfig::default(),
            "http://127.0.0.1:9/api/registerSensor".to_string(),
            "24A160FFEE01".to_string(),
        )
    }

    async fn exchange(portal: &Portal, request: &[u8]) -> Vec<u8> {
        let (mut client, mut server) = duplex(64 * 1024);
        client.write_all(request).await.unwrap();
        client.shutdown().await.unwrap();

        portal.serve(&mut server).await.unwrap();
        drop(server);

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn index_serves_the_embedded_page() {
        let portal = scratch_portal("index");
        let response = exchange(&portal, b"GET / HTTP/1.1\r\n\r\n").await;
        let text = String::from_utf8(response).unwrap();

        assert!(text.starts_with(HDR_HTML));
        assert!(text.contains("Air Sensor Setup"));
    }

    #[tokio::test]
    async fn unmatched_route_answers_400() {
        let portal = scratch_portal("unmatched");
        let response = exchange(&portal, b"GET /nope.json HTTP/1.1\r\n\r\n").await;

        assert_eq!(response, HDR_400.as_bytes());
    }

    #[tokio::test]
    async fn empty_request_answers_404() {
        let portal = scratch_portal("empty");
        let response = exchange(&portal, b"").await;

        assert_eq!(response, HDR_404.as_bytes());
    }

    #[tokio::test]
    async fn held_lock_degrades_ap_list_to_503() {
        let portal = scratch_portal("held-lock");

        let guard = portal.net.lock_buffers().await.expect("acquire");
        let response = exchange(&portal, b"GET /ap.json HTTP/1.1\r\n\r\n").await;
        drop(guard);

        assert_eq!(response, HDR_503.as_bytes());
    }

    #[tokio::test]
    async fn ap_list_serves_the_shared_buffer() {
        let portal = scratch_portal("ap-list");
        {
            let mut shared = portal.net.lock_buffers().await.unwrap();
            shared.ap_list = "[{\"ssid\":\"lab-2g\"}]".to_string();
        }

        let response = exchange(&portal, b"GET /ap.json HTTP/1.1\r\n\r\n").await;
        let text = String::from_utf8(response).unwrap();

        assert!(text.starts_with(HDR_JSON_NO_CACHE));
        assert!(text.ends_with("[{\"ssid\":\"lab-2g\"}]"));
    }

    #[tokio::test]
    async fn status_without_data_answers_503() {
        let portal = scratch_portal("status-empty");
        let response = exchange(&portal, b"GET /status.json HTTP/1.1\r\n\r\n").await;

        assert_eq!(response, HDR_503.as_bytes());
    }

    #[tokio::test]
    async fn connect_requires_both_credential_headers() {
        let portal = scratch_portal("connect-missing");
        let response = exchange(
            &portal,
            b"POST /connect.json HTTP/1.1\r\nX-Custom-ssid: lab-2g\r\n\r\n",
        )
        .await;

        assert_eq!(response, HDR_400.as_bytes());
        assert!(portal.net.staged_station_config().is_none());
    }

    #[tokio::test]
    async fn connect_rejects_oversized_ssid_without_truncating() {
        let portal = scratch_portal("connect-oversized");
        let ssid = "s".repeat(33);
        let request =
            format!("POST /connect.json HTTP/1.1\r\nX-Custom-ssid: {ssid}\r\nX-Custom-pwd: pw\r\n\r\n");

        let response = exchange(&portal, request.as_bytes()).await;

        assert_eq!(response, HDR_400.as_bytes());
        assert!(portal.net.staged_station_config().is_none());
    }

    #[tokio::test]
    async fn connect_at_exact_bounds_stages_the_config() {
        let portal = scratch_portal("connect-bounds");
        let ssid = "s".repeat(32);
        let password = "p".repeat(64);
        let request = format!(
            "POST /connect.json HTTP/1.1\r\nX-Custom-ssid: {ssid}\r\nX-Custom-pwd: {password}\r\n\r\n"
        );

        let response = exchange(&portal, request.as_bytes()).await;

        assert_eq!(response, HDR_JSON_NO_CACHE.as_bytes());
        assert_eq!(
            portal.net.staged_station_config(),
            Some(StationConfig {
                ssid,
                password,
            })
        );
    }

    #[tokio::test]
    async fn disconnect_always_answers_200() {
        let portal = scratch_portal("disconnect");
        let response = exchange(&portal, b"DELETE /connect.json HTTP/1.1\r\n\r\n").await;

        assert_eq!(response, HDR_JSON_NO_CACHE.as_bytes());
    }

    #[tokio::test]
    async fn register_persists_then_serves_the_info() {
        let portal = scratch_portal("register");
        let request = b"POST /register.json HTTP/1.1\r\nX-Custom-name: Ada Lovelace\r\nX-Custom-email: ada@example.org\r\n\r\n";

        let response = exchange(&portal, request).await;
        assert_eq!(response, HDR_JSON_NO_CACHE.as_bytes());

        let saved = portal.store.load_registration().await.unwrap().unwrap();
        assert_eq!(saved.name, "Ada Lovelace");
        assert_eq!(saved.mac, "24A160FFEE01");

        let info = exchange(&portal, b"GET /register.json HTTP/1.1\r\n\r\n").await;
        let text = String::from_utf8(info).unwrap();
        assert!(text.starts_with(HDR_JSON_NO_CACHE));
        assert!(text.contains("ada@example.org"));
    }

    #[tokio::test]
    async fn register_without_prior_registration_answers_503() {
        let portal = scratch_portal("register-unset");
        let response = exchange(&portal, b"GET /register.json HTTP/1.1\r\n\r\n").await;

        assert_eq!(response, HDR_503.as_bytes());
    }

    #[tokio::test]
    async fn register_rejects_oversized_name() {
        let portal = scratch_portal("register-oversized");
        let name = "n".repeat(65);
        let request = format!(
            "POST /register.json HTTP/1.1\r\nX-Custom-name: {name}\r\nX-Custom-email: a@b.c\r\n\r\n"
        );

        let response = exchange(&portal, request.as_bytes()).await;

        assert_eq!(response, HDR_400.as_bytes());
        assert!(portal.store.load_registration().await.unwrap().is_none());
    }
}
