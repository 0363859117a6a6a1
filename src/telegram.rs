// src/telegram.rs
//
// Forwards the annotated frame to a Telegram chat: a fresh photo message,
// or an edit of an existing one carrying an inline "Update" button so the
// chat can request a re-run. Credentials arrive per request, never from
// config.

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{error, info, warn};

const API_BASE: &str = "https://api.telegram.org";

/// Inline keyboard with the single "Update" button; its callback data is
/// what the chat bot turns into the next /process request.
const UPDATE_KEYBOARD: &str =
    r#"{"inline_keyboard": [[{"text": "Update 🤓", "callback_data": "/camera_update"}]]}"#;

/// Telegram delivery target for one request.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub chat_id: i64,
    pub token: String,
    /// When set, edit this message's media instead of sending a new photo.
    pub message_id: Option<String>,
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

pub struct TelegramClient {
    http_client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http_client })
    }

    /// Uploads the annotated JPEG. Picks `editMessageMedia` when the
    /// delivery names a message to update, `sendPhoto` otherwise. Failures
    /// are logged and returned; the classification result is already
    /// produced by then, so callers treat this as a delivery problem only.
    pub async fn send(&self, delivery: &Delivery, jpeg: Vec<u8>) -> Result<()> {
        match &delivery.message_id {
            Some(message_id) => {
                self.edit_message_media(delivery, message_id.clone(), jpeg)
                    .await
            }
            None => self.send_photo(delivery, jpeg).await,
        }
    }

    async fn send_photo(&self, delivery: &Delivery, jpeg: Vec<u8>) -> Result<()> {
        let url = format!("{}/bot{}/sendPhoto", API_BASE, delivery.token);

        let form = Form::new()
            .text("chat_id", delivery.chat_id.to_string())
            .part("photo", photo_part(jpeg)?);

        info!(chat_id = delivery.chat_id, "sending photo to Telegram");
        self.execute(url, form).await
    }

    async fn edit_message_media(
        &self,
        delivery: &Delivery,
        message_id: String,
        jpeg: Vec<u8>,
    ) -> Result<()> {
        let url = format!("{}/bot{}/editMessageMedia", API_BASE, delivery.token);

        let mut form = Form::new()
            .text("chat_id", delivery.chat_id.to_string())
            .text("message_id", message_id)
            .text("disable_notification", "true")
            .text("media", r#"{"type": "photo", "media": "attach://photo"}"#)
            .text("reply_markup", UPDATE_KEYBOARD)
            .part("photo", photo_part(jpeg)?);
        if let Some(thread_id) = &delivery.thread_id {
            form = form.text("message_thread_id", thread_id.clone());
        }

        info!(chat_id = delivery.chat_id, "updating Telegram photo message");
        self.execute(url, form).await
    }

    async fn execute(&self, url: String, form: Form) -> Result<()> {
        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context("Telegram request failed")?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!(%status, %body, "Telegram API rejected the upload");
            anyhow::bail!("Telegram API returned {status}");
        }

        match serde_json::from_str::<ApiResponse>(&body) {
            Ok(api) if api.ok => info!("Telegram upload acknowledged"),
            Ok(api) => {
                let description = api.description.unwrap_or_else(|| "<none>".to_string());
                error!(%description, "Telegram API reported failure");
                anyhow::bail!("Telegram API error: {description}");
            }
            Err(e) => warn!("unparseable Telegram response ({e}): {body}"),
        }

        Ok(())
    }
}

fn photo_part(jpeg: Vec<u8>) -> Result<Part> {
    Part::bytes(jpeg)
        .file_name("photo.jpg")
        .mime_str("image/jpeg")
        .context("invalid mime type for photo part")
}
