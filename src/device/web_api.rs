//! Web API client for the music provider's remote player endpoints

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{DeviceError, DeviceState, PlaybackDevice};
use crate::session::Session;

const WEB_API_LOG_TARGET: &str = "r_radiocli::device::web_api";

/// Provider URI for a bare track id.
pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}

#[derive(Serialize, Debug)]
struct PlayRequest {
    uris: Vec<String>,
    position_ms: u64,
}

#[derive(Deserialize, Debug)]
struct PlayerResponse {
    #[serde(default)]
    is_playing: bool,
    #[serde(default)]
    progress_ms: Option<u64>,
    #[serde(default)]
    item: Option<PlayerItem>,
    #[serde(default)]
    device: Option<PlayerDevice>,
}

#[derive(Deserialize, Debug)]
struct PlayerItem {
    #[serde(default)]
    duration_ms: u64,
}

#[derive(Deserialize, Debug)]
struct PlayerDevice {
    #[serde(default)]
    id: Option<String>,
}

/// Parses a `GET me/player` body. The device counts as active only when the
/// provider reports it as the one currently playing.
pub(crate) fn parse_player_state(body: &str, device_id: &str) -> Result<DeviceState, DeviceError> {
    if body.trim().is_empty() {
        return Ok(DeviceState::inactive());
    }
    let player: PlayerResponse = serde_json::from_str(body)?;
    let active = match player.device.and_then(|d| d.id) {
        Some(id) => id == device_id,
        None => true,
    };
    Ok(DeviceState {
        active,
        paused: !player.is_playing,
        position_ms: player.progress_ms.unwrap_or(0),
        duration_ms: player.item.map(|i| i.duration_ms).unwrap_or(0),
    })
}

/// Client for a single remote playback device.
#[derive(Clone, Debug)]
pub struct WebApiDevice {
    client: Client,
    base_url: Url,
    device_id: String,
    session: Session,
}

impl WebApiDevice {
    /// Create a device client rooted at `base_url` (e.g. `https://api.spotify.com/v1`).
    pub fn new(base_url: &str, device_id: &str, session: Session) -> Result<Self, DeviceError> {
        let client = match Client::builder().timeout(std::time::Duration::from_secs(30)).build() {
            Ok(client) => client,
            Err(e) => {
                warn!(target: WEB_API_LOG_TARGET, "Error creating HTTP client with timeout: {:?}. Falling back to default.", e);
                Client::new()
            }
        };

        // `Url::join` drops the last path segment unless the base ends with '/'
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)?;
        debug!(target: WEB_API_LOG_TARGET, %base_url, device_id, "Created web API device client.");

        Ok(WebApiDevice { client, base_url, device_id: device_id.to_string(), session })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Replaces the session, e.g. after a token refresh.
    pub fn set_session(&mut self, session: Session) {
        self.session = session;
    }

    // --- Private Helper Methods ---

    pub(crate) fn endpoint(&self, path: &str, with_device: bool) -> Result<Url, DeviceError> {
        let mut url = self.base_url.join(path)?;
        if with_device {
            url.query_pairs_mut().append_pair("device_id", &self.device_id);
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, DeviceError> {
        if self.session.is_expired() {
            return Err(DeviceError::SessionExpired);
        }
        Ok(request.bearer_auth(self.session.access_token()))
    }

    async fn check(response: Response) -> Result<Response, DeviceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            warn!(target: WEB_API_LOG_TARGET, "Provider rejected the access token.");
            return Err(DeviceError::SessionExpired);
        }
        Err(DeviceError::Rejected { status: status.as_u16(), body })
    }

    async fn put(&self, path: &str, body: Option<&PlayRequest>) -> Result<(), DeviceError> {
        let url = self.endpoint(path, true)?;
        let mut request = self.client.put(url);
        request = match body {
            Some(body) => request.json(body),
            None => request.header(reqwest::header::CONTENT_LENGTH, 0),
        };
        let response = self.authorized(request)?.send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl PlaybackDevice for WebApiDevice {
    #[instrument(skip(self), fields(device_id = %self.device_id))]
    async fn play_at(&self, track_id: &str, offset_seconds: f64) -> Result<(), DeviceError> {
        let request = PlayRequest {
            uris: vec![track_uri(track_id)],
            position_ms: (offset_seconds.max(0.0) * 1000.0).round() as u64,
        };
        info!(target: WEB_API_LOG_TARGET, "Playing {} from {}ms", request.uris[0], request.position_ms);
        self.put("me/player/play", Some(&request)).await
    }

    #[instrument(skip(self), fields(device_id = %self.device_id))]
    async fn pause(&self) -> Result<(), DeviceError> {
        debug!(target: WEB_API_LOG_TARGET, "Pausing device.");
        self.put("me/player/pause", None).await
    }

    #[instrument(skip(self), fields(device_id = %self.device_id))]
    async fn resume(&self) -> Result<(), DeviceError> {
        debug!(target: WEB_API_LOG_TARGET, "Resuming device.");
        self.put("me/player/play", None).await
    }

    async fn active_state(&self) -> Result<DeviceState, DeviceError> {
        let url = self.endpoint("me/player", false)?;
        let response = self.authorized(self.client.get(url))?.send().await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(DeviceState::inactive());
        }
        let response = Self::check(response).await?;
        let body = response.text().await?;
        parse_player_state(&body, &self.device_id)
    }
}
