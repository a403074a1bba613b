//! Client for the public-page publish API.
//!
//! Publishing takes a [`PublishSnapshot`] from the store, uploads local
//! images, then posts the profile. Remote image URLs are kept as they are;
//! images that fail to upload are left out rather than failing the publish.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use creator_shared::models::{Availability, Deliverable, SocialLink, Testimonial};
use creator_shared::types::normalize_username;
use creator_store::PublishSnapshot;

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Please set a username in your profile first.")]
    MissingUsername,

    #[error("Please add a contact email in your profile first.")]
    MissingContactEmail,

    #[error("Publishing is not configured")]
    NotConfigured,

    #[error("Could not read image: {0}")]
    LocalImage(#[from] std::io::Error),

    #[error("Network error. Please check your connection. ({0})")]
    Network(#[from] reqwest::Error),

    #[error("{message}")]
    Rejected { status: u16, message: String },
}

/// Progress steps reported while publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    UploadingAvatar,
    UploadingPortfolio,
    Publishing,
}

impl std::fmt::Display for PublishStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UploadingAvatar => write!(f, "Uploading avatar..."),
            Self::UploadingPortfolio => write!(f, "Uploading portfolio..."),
            Self::Publishing => write!(f, "Publishing profile..."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Avatar,
    Portfolio,
}

impl ImageKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Avatar => "avatar",
            Self::Portfolio => "portfolio",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishPayload {
    pub username: String,
    pub profile: PublishedProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedProfile {
    pub name: String,
    pub bio: String,
    pub avatar_url: String,
    pub contact_email: String,
    pub availability: Availability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booked_until: Option<String>,
    pub niches: Vec<String>,
    pub social_links: Vec<SocialLink>,
    pub deliverables: Vec<Deliverable>,
    pub portfolio: Vec<PublishedPortfolioItem>,
    pub testimonials: Vec<Testimonial>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPortfolioItem {
    pub id: String,
    pub uri: String,
    pub category: String,
    pub brand_name: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct PublishResponse {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
}

/// Username and contact email the public page needs, checked before any
/// network traffic. Returns the slugged username.
pub fn check_publishable(snapshot: &PublishSnapshot) -> Result<String, PublishError> {
    let username = normalize_username(&snapshot.profile.username);
    if username.is_empty() {
        return Err(PublishError::MissingUsername);
    }
    if snapshot.profile.contact_email.trim().is_empty() {
        return Err(PublishError::MissingContactEmail);
    }
    Ok(username)
}

/// Assemble the publish body from a snapshot and already-resolved image URLs.
///
/// `portfolio_urls` pairs up with `snapshot.portfolio`; items whose URL is
/// empty are dropped. Only active deliverables are published.
pub fn build_payload(
    snapshot: &PublishSnapshot,
    username: String,
    avatar_url: String,
    portfolio_urls: Vec<String>,
) -> PublishPayload {
    let profile = &snapshot.profile;
    let portfolio = snapshot
        .portfolio
        .iter()
        .zip(portfolio_urls)
        .filter(|(_, uri)| !uri.is_empty())
        .map(|(item, uri)| PublishedPortfolioItem {
            id: item.id.clone(),
            uri,
            category: item.category.clone(),
            brand_name: item.brand_name.clone().unwrap_or_default(),
            description: item.description.clone().unwrap_or_default(),
        })
        .collect();

    PublishPayload {
        username,
        profile: PublishedProfile {
            name: profile.name.clone(),
            bio: profile.bio.clone(),
            avatar_url,
            contact_email: profile.contact_email.clone(),
            availability: profile.availability,
            booked_until: profile.booked_until.clone(),
            niches: profile.niches.clone(),
            social_links: profile.social_links.clone(),
            deliverables: snapshot
                .deliverables
                .iter()
                .filter(|d| d.is_active)
                .cloned()
                .collect(),
            portfolio,
            testimonials: snapshot.testimonials.clone(),
        },
    }
}

fn is_remote(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://")
}

fn image_extension(uri: &str) -> String {
    let name = uri.rsplit('/').next().unwrap_or(uri);
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => "jpg".to_string(),
    }
}

pub struct PublishClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl PublishClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, PublishError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Publish the snapshot and return the public page URL.
    pub async fn publish(
        &self,
        snapshot: &PublishSnapshot,
        mut progress: impl FnMut(PublishStep),
    ) -> Result<String, PublishError> {
        let username = check_publishable(snapshot)?;

        progress(PublishStep::UploadingAvatar);
        let avatar_url = self
            .resolve_image(&snapshot.profile.avatar_url, &username, ImageKind::Avatar)
            .await;

        progress(PublishStep::UploadingPortfolio);
        let mut portfolio_urls = Vec::with_capacity(snapshot.portfolio.len());
        for item in &snapshot.portfolio {
            portfolio_urls.push(self.resolve_image(&item.uri, &username, ImageKind::Portfolio).await);
        }

        progress(PublishStep::Publishing);
        let payload = build_payload(snapshot, username.clone(), avatar_url, portfolio_urls);
        let response = self
            .client
            .post(format!("{}/api/publish", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorResponse = response.json().await.unwrap_or_default();
            let message = body.error.unwrap_or_else(|| "Failed to publish".to_string());
            warn!(status = status.as_u16(), %message, "publish rejected");
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: PublishResponse = response.json().await?;
        let url = body
            .url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| format!("{}/{}", self.base_url, username));
        info!(%url, "profile published");
        Ok(url)
    }

    /// Remote URL of an image, uploading it first when it is local. Empty
    /// when there is no image or the upload failed.
    async fn resolve_image(&self, uri: &str, username: &str, kind: ImageKind) -> String {
        if uri.is_empty() || is_remote(uri) {
            return uri.to_string();
        }
        match self.upload_image(uri, username, kind).await {
            Ok(url) => url,
            Err(e) => {
                warn!(%uri, kind = kind.as_str(), error = %e, "image upload failed, skipping");
                String::new()
            }
        }
    }

    pub async fn upload_image(
        &self,
        uri: &str,
        username: &str,
        kind: ImageKind,
    ) -> Result<String, PublishError> {
        let path = Path::new(uri.strip_prefix("file://").unwrap_or(uri));
        let bytes = tokio::fs::read(path).await?;

        let ext = image_extension(uri);
        let mime = if ext == "png" { "image/png" } else { "image/jpeg" };
        let file_name = format!("{}_{}.{}", kind.as_str(), Utc::now().timestamp_millis(), ext);
        debug!(%file_name, bytes = bytes.len(), "uploading image");

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name).mime_str(mime)?)
            .text("username", username.to_string())
            .text("type", kind.as_str());

        let response = self
            .client
            .post(format!("{}/api/upload", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                message: "Upload failed".to_string(),
            });
        }
        let body: UploadResponse = response.json().await?;
        Ok(body.url)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Multipart, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use creator_shared::models::{default_deliverables, CreatorProfile, MediaKind, PortfolioItem};

    use super::*;

    #[derive(Clone, Default)]
    struct Captured {
        uploads: Arc<Mutex<Vec<Vec<String>>>>,
        published: Arc<Mutex<Option<Value>>>,
    }

    async fn upload(
        State(captured): State<Captured>,
        headers: HeaderMap,
        mut multipart: Multipart,
    ) -> (StatusCode, Json<Value>) {
        if headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) != Some("secret") {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid API key"})));
        }
        let mut fields = Vec::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            fields.push(field.name().unwrap_or_default().to_string());
        }
        captured.uploads.lock().unwrap().push(fields);
        (
            StatusCode::OK,
            Json(json!({"success": true, "url": "https://cdn.test/uploaded.png"})),
        )
    }

    async fn publish(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) != Some("secret") {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid API key"})));
        }
        *captured.published.lock().unwrap() = Some(body);
        (StatusCode::OK, Json(json!({"success": true})))
    }

    async fn serve() -> (String, Captured) {
        let captured = Captured::default();
        let app = Router::new()
            .route("/api/upload", post(upload))
            .route("/api/publish", post(publish))
            .with_state(captured.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), captured)
    }

    fn snapshot() -> PublishSnapshot {
        PublishSnapshot {
            profile: CreatorProfile {
                name: "Ana".into(),
                username: "Ana Eats!".into(),
                contact_email: "ana@example.com".into(),
                avatar_url: "https://img.test/ana.jpg".into(),
                ..Default::default()
            },
            portfolio: Vec::new(),
            deliverables: default_deliverables(),
            testimonials: Vec::new(),
        }
    }

    #[test]
    fn test_required_fields_are_checked_first() {
        let mut snap = snapshot();
        assert_eq!(check_publishable(&snap).unwrap(), "anaeats");

        snap.profile.contact_email = "  ".into();
        assert!(matches!(
            check_publishable(&snap),
            Err(PublishError::MissingContactEmail)
        ));

        snap.profile.username = "!!!".into();
        assert!(matches!(check_publishable(&snap), Err(PublishError::MissingUsername)));
    }

    #[test]
    fn test_payload_keeps_active_rates_and_resolved_images() {
        let mut snap = snapshot();
        let now = Utc::now();
        snap.portfolio = vec![
            PortfolioItem::new(MediaKind::Photo, "file:///a.jpg", "Food", now),
            PortfolioItem::new(MediaKind::Photo, "file:///b.jpg", "Food", now),
        ];

        let payload = build_payload(
            &snap,
            "anaeats".into(),
            String::new(),
            vec!["https://cdn.test/a.jpg".into(), String::new()],
        );
        assert_eq!(payload.profile.deliverables.len(), 3);
        assert_eq!(payload.profile.portfolio.len(), 1);
        assert_eq!(payload.profile.portfolio[0].uri, "https://cdn.test/a.jpg");
        assert_eq!(payload.profile.portfolio[0].brand_name, "");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["profile"]["availability"], "available");
        assert!(json["profile"].get("bookedUntil").is_none());
        assert_eq!(json["profile"]["avatarUrl"], "");
    }

    #[test]
    fn test_extensions_default_to_jpg() {
        assert_eq!(image_extension("file:///x/photo.PNG"), "png");
        assert_eq!(image_extension("file:///x.y/photo"), "jpg");
    }

    #[tokio::test]
    async fn test_publish_uploads_local_images_and_falls_back_to_profile_url() {
        let (base, captured) = serve().await;
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("clip.png");
        std::fs::write(&local, b"\x89PNG fake").unwrap();

        let mut snap = snapshot();
        snap.portfolio = vec![
            PortfolioItem::new(MediaKind::Photo, format!("file://{}", local.display()), "Beauty", Utc::now()),
            PortfolioItem::new(MediaKind::Photo, "file:///does/not/exist.jpg", "Beauty", Utc::now()),
        ];

        let client = PublishClient::new(&base, "secret").unwrap();
        let mut steps = Vec::new();
        let url = client.publish(&snap, |s| steps.push(s)).await.unwrap();

        assert_eq!(url, format!("{base}/anaeats"));
        assert_eq!(
            steps,
            vec![
                PublishStep::UploadingAvatar,
                PublishStep::UploadingPortfolio,
                PublishStep::Publishing
            ]
        );

        let uploads = captured.uploads.lock().unwrap().clone();
        assert_eq!(uploads, vec![vec!["file".to_string(), "username".into(), "type".into()]]);

        let published = captured.published.lock().unwrap().clone().unwrap();
        assert_eq!(published["username"], "anaeats");
        assert_eq!(published["profile"]["avatarUrl"], "https://img.test/ana.jpg");
        let portfolio = published["profile"]["portfolio"].as_array().unwrap();
        assert_eq!(portfolio.len(), 1);
        assert_eq!(portfolio[0]["uri"], "https://cdn.test/uploaded.png");
    }

    #[tokio::test]
    async fn test_rejection_carries_server_message() {
        let (base, _) = serve().await;
        let client = PublishClient::new(base, "wrong").unwrap();
        let err = client.publish(&snapshot(), |_| {}).await.unwrap_err();
        match err {
            PublishError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_network_error() {
        let client = PublishClient::new("http://127.0.0.1:9", "secret").unwrap();
        let err = client.publish(&snapshot(), |_| {}).await.unwrap_err();
        assert!(matches!(err, PublishError::Network(_)));
    }
}
