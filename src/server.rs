// src/server.rs
//
// HTTP intake and pass orchestration. One still frame per request:
// `GET /form` serves the upload page, `POST /process` decodes the frame,
// runs the scan/classify/annotate batch, replies with a per-region summary,
// and forwards the annotated JPEG to Telegram when the form names a chat.

use crate::annotate;
use crate::classifier::{self, Classification};
use crate::density;
use crate::frame_pipeline;
use crate::region::Region;
use crate::telegram::{Delivery, TelegramClient};
use crate::types::{Config, Decision};
use anyhow::{Context, Result};
use bytes::BufMut;
use futures_util::TryStreamExt;
use image::RgbaImage;
use serde::Serialize;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::multipart::{FormData, Part};
use warp::{Filter, Rejection, Reply};

pub struct AppState {
    pub config: Config,
    pub regions: Vec<Region>,
    pub telegram: TelegramClient,
}

const FORM_HTML: &str = r#"<html>
<body>
<form action="/process" method="post" enctype="multipart/form-data">
<input type="text" name="target" placeholder="target">
<input type="text" name="token" placeholder="token">
<input type="checkbox" name="day" value="1"> is day
<input type="checkbox" name="update" value="1"> update
<input type="file" name="file" />
<input type="submit" value="Upload" />
</form>
</body>
</html>
"#;

pub async fn run(state: Arc<AppState>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()
        .context("invalid server bind address")?;

    info!("Server is running on {}", addr);
    warp::serve(routes(state)).run(addr).await;
    Ok(())
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let max_upload = state.config.server.max_upload_bytes;
    let with_state = warp::any().map(move || state.clone());

    let form_page = warp::path("form")
        .and(warp::get())
        .map(|| warp::reply::html(FORM_HTML));

    let process = warp::path("process")
        .and(warp::post())
        .and(warp::multipart::form().max_length(max_upload))
        .and(with_state)
        .and_then(handle_process);

    form_page.or(process)
}

/// Fields of one /process submission.
#[derive(Debug, Default)]
struct ProcessRequest {
    file: Vec<u8>,
    target: Option<String>,
    token: Option<String>,
    day: bool,
    update: bool,
    message_id: Option<String>,
    thread_id: Option<String>,
}

#[derive(Serialize)]
struct ProcessResponse {
    profile: String,
    results: Vec<crate::types::OccupancyResult>,
    empty: usize,
    occupied: usize,
    indeterminate: usize,
    delivered: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

async fn handle_process(
    form: FormData,
    state: Arc<AppState>,
) -> std::result::Result<impl Reply, Rejection> {
    info!("Processing image...");

    match process_request(form, state).await {
        Ok(response) => Ok(warp::reply::with_status(
            warp::reply::json(&response),
            StatusCode::OK,
        )),
        Err(e) => {
            error!("request failed: {e:#}");
            Ok(warp::reply::with_status(
                warp::reply::json(&ErrorResponse {
                    error: format!("{e:#}"),
                }),
                StatusCode::BAD_REQUEST,
            ))
        }
    }
}

async fn process_request(form: FormData, state: Arc<AppState>) -> Result<ProcessResponse> {
    let mut request = parse_form(form).await?;
    if request.file.is_empty() {
        anyhow::bail!("no file field in upload");
    }

    let (profile, threshold) = resolve_profile(&state.config, request.day)?;

    let pass_state = state.clone();
    let file = std::mem::take(&mut request.file);
    let output = tokio::task::spawn_blocking(move || {
        run_pass(&pass_state.config, &pass_state.regions, &file, threshold)
    })
    .await
    .context("classification task panicked")??;

    for result in &output.classification.results {
        info!(
            "region {}: {:.1}% empty -> {:?}",
            result.region_id, result.percentage_empty, result.decision
        );
    }

    let empty = output.classification.count(Decision::Empty);
    let occupied = output.classification.count(Decision::Occupied);
    let indeterminate = output.classification.indeterminate.len();
    info!(
        "✓ Frame classified: {} empty, {} occupied, {} indeterminate (profile '{}')",
        empty, occupied, indeterminate, profile
    );

    let delivered = deliver(&state, &request, output.jpeg).await;

    Ok(ProcessResponse {
        profile,
        results: output.classification.results,
        empty,
        occupied,
        indeterminate,
        delivered,
    })
}

/// Picks the scene profile for this request: the `day` form flag selects
/// the "day" profile, otherwise the configured default applies.
fn resolve_profile(config: &Config, day: bool) -> Result<(String, f64)> {
    let name = if day {
        "day".to_string()
    } else {
        config.thresholds.default_profile.clone()
    };

    match config.thresholds.resolve(&name) {
        Some(threshold) => Ok((name, threshold)),
        None => {
            warn!("threshold profile '{}' not configured, using default", name);
            let default = &config.thresholds.default_profile;
            let threshold = config
                .thresholds
                .resolve(default)
                .with_context(|| format!("default threshold profile '{default}' missing"))?;
            Ok((default.clone(), threshold))
        }
    }
}

struct PassOutput {
    classification: Classification,
    jpeg: Vec<u8>,
}

/// The synchronous classification batch: pipeline, scan, classify,
/// annotate, encode. Runs on a blocking thread; the scan itself fans out
/// over raster rows internally.
fn run_pass(
    config: &Config,
    regions: &[Region],
    file: &[u8],
    profile_threshold: f64,
) -> Result<PassOutput> {
    let frame = frame_pipeline::prepare(file, &config.transform)?;
    let mut canvas = frame.canvas;

    let tallies = density::scan(
        &frame.raster,
        config.raster.empty_value,
        config.raster.scale,
        regions,
    )?;
    let classification = classifier::classify(regions, &tallies, profile_threshold);

    annotate::annotate(&mut canvas, regions, &classification, config.annotate.jitter);
    let jpeg = encode_jpeg(canvas)?;

    Ok(PassOutput {
        classification,
        jpeg,
    })
}

fn encode_jpeg(canvas: RgbaImage) -> Result<Vec<u8>> {
    let rgb = image::DynamicImage::ImageRgba8(canvas).to_rgb8();
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .context("failed to encode annotated frame")?;
    Ok(buf)
}

/// Sends the annotated frame when the form names a chat and token. Returns
/// whether delivery succeeded; a failed upload does not fail the request.
async fn deliver(state: &AppState, request: &ProcessRequest, jpeg: Vec<u8>) -> bool {
    let (Some(target), Some(token)) = (&request.target, &request.token) else {
        return false;
    };

    let chat_id: i64 = match target.parse() {
        Ok(id) => id,
        Err(_) => {
            warn!("target '{}' is not a chat id, skipping delivery", target);
            return false;
        }
    };

    let delivery = Delivery {
        chat_id,
        token: token.clone(),
        message_id: if request.update {
            request.message_id.clone()
        } else {
            None
        },
        thread_id: request.thread_id.clone(),
    };

    match state.telegram.send(&delivery, jpeg).await {
        Ok(()) => true,
        Err(e) => {
            error!("Telegram delivery failed: {e:#}");
            false
        }
    }
}

async fn parse_form(form: FormData) -> Result<ProcessRequest> {
    let fields: Vec<(String, Vec<u8>)> = form
        .and_then(|mut part: Part| async move {
            let mut data = Vec::new();
            while let Some(chunk) = part.data().await {
                data.put(chunk?);
            }
            Ok((part.name().to_string(), data))
        })
        .try_collect()
        .await
        .context("malformed multipart body")?;

    let mut request = ProcessRequest::default();
    for (name, data) in fields {
        match name.as_str() {
            "file" => request.file = data,
            "target" => request.target = non_empty(data),
            "token" => request.token = non_empty(data),
            "day" => request.day = is_set(&data),
            "update" => request.update = is_set(&data),
            "message_id" => request.message_id = non_empty(data),
            "thread_id" => request.thread_id = non_empty(data),
            other => warn!("ignoring unknown form field '{}'", other),
        }
    }

    Ok(request)
}

fn non_empty(data: Vec<u8>) -> Option<String> {
    let text = String::from_utf8_lossy(&data).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn is_set(data: &[u8]) -> bool {
    String::from_utf8_lossy(data).trim() == "1"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AnnotateConfig, CropConfig, RasterConfig, RegionConfig, ServerConfig, ThresholdConfig,
        TransformConfig,
    };
    use image::{DynamicImage, Rgba};

    fn test_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                max_upload_bytes: 1024 * 1024,
            },
            transform: TransformConfig {
                rotate_degrees: 0.0,
                resize_scale: 1.0,
                canny_low: 50.0,
                canny_high: 100.0,
                crop: CropConfig {
                    x: 0,
                    y: 0,
                    width: 48,
                    height: 48,
                },
            },
            raster: RasterConfig {
                scale: 1.0,
                empty_value: 255,
            },
            thresholds: ThresholdConfig {
                default_profile: "day".to_string(),
                profiles: [("day".to_string(), 98.5)].into_iter().collect(),
            },
            annotate: AnnotateConfig { jitter: false },
            regions: vec![RegionConfig::Rect {
                min: [8.0, 8.0],
                max: [24.0, 24.0],
                threshold: None,
            }],
        }
    }

    fn test_state() -> Arc<AppState> {
        let config = test_config();
        let regions = crate::config::build_regions(&config.regions);
        Arc::new(AppState {
            config,
            regions,
            telegram: TelegramClient::new(5).unwrap(),
        })
    }

    fn encoded_uniform_frame() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            48,
            48,
            Rgba([90, 90, 90, 255]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_run_pass_on_uniform_frame_reports_empty_region() {
        let config = test_config();
        let regions = crate::config::build_regions(&config.regions);

        let output = run_pass(&config, &regions, &encoded_uniform_frame(), 98.5).unwrap();
        assert_eq!(output.classification.results.len(), 1);
        assert_eq!(output.classification.results[0].percentage_empty, 100.0);
        assert_eq!(
            output.classification.results[0].decision,
            Decision::Empty
        );
        assert!(!output.jpeg.is_empty());
    }

    #[test]
    fn test_resolve_profile_day_flag_and_default() {
        let config = test_config();
        let (name, threshold) = resolve_profile(&config, true).unwrap();
        assert_eq!(name, "day");
        assert_eq!(threshold, 98.5);

        let (name, _) = resolve_profile(&config, false).unwrap();
        assert_eq!(name, "day");
    }

    #[tokio::test]
    async fn test_form_page_is_served() {
        let routes = routes(test_state());
        let response = warp::test::request()
            .method("GET")
            .path("/form")
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(String::from_utf8_lossy(response.body()).contains("/process"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_rejected() {
        let routes = routes(test_state());
        let response = warp::test::request()
            .method("GET")
            .path("/nope")
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
