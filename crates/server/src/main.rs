use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use axum::http::HeaderValue;
use clap::Parser;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};

use real_or_render_core::classification::domain::face_scorer::FaceScorer;
use real_or_render_core::classification::infrastructure::onnx_deepfake_classifier::OnnxDeepfakeClassifier;
use real_or_render_core::detection::domain::face_candidate_extractor::FaceCandidateExtractor;
use real_or_render_core::detection::infrastructure::onnx_yunet_detector::OnnxYunetDetector;
use real_or_render_core::media::domain::video_reader::VideoReader;
use real_or_render_core::media::infrastructure::exif_frame_decoder::ExifFrameDecoder;
use real_or_render_core::media::infrastructure::ffmpeg_reader::FfmpegReader;
use real_or_render_core::media::infrastructure::jpeg_preview_encoder::JpegPreviewEncoder;
use real_or_render_core::pipeline::analyze_image_use_case::AnalyzeImageUseCase;
use real_or_render_core::pipeline::analyze_video_use_case::AnalyzeVideoUseCase;
use real_or_render_core::pipeline::frame_analyzer::FrameAnalyzer;
use real_or_render_core::shared::config::AnalysisSettings;
use real_or_render_core::shared::constants::{
    CLASSIFIER_MODEL_NAME, YUNET_MODEL_NAME, YUNET_MODEL_URL,
};
use real_or_render_core::shared::model_resolver::{self, ModelSource};
use real_or_render_core::shared::onnx_session::ModelLoadError;
use real_or_render_server::{router, AppState, ReaderFactory};

/// Deepfake detection service for uploaded images and videos.
#[derive(Parser)]
#[command(name = "real-or-render")]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value = "8000")]
    port: u16,

    /// JSON file with analysis settings; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// YuNet face detector model (.onnx).
    #[arg(long)]
    detector_model: Option<PathBuf>,

    /// Deepfake classifier model (.onnx).
    #[arg(long)]
    classifier_model: Option<PathBuf>,

    /// Directory searched for bundled models.
    #[arg(long, default_value = "models")]
    models_dir: PathBuf,

    /// Analyse every Nth video frame.
    #[arg(long)]
    frame_stride: Option<usize>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    score_threshold: Option<f32>,

    /// Face detection NMS IoU threshold (0.0-1.0).
    #[arg(long)]
    nms_threshold: Option<f32>,

    /// Maximum faces kept per frame before NMS.
    #[arg(long)]
    top_k: Option<usize>,

    /// Origin allowed to call the API (repeatable).
    #[arg(long = "allowed-origin", default_value = "http://localhost:3000")]
    allowed_origins: Vec<String>,

    /// Largest accepted upload, in megabytes.
    #[arg(long, default_value = "200")]
    max_upload_mb: usize,

    /// Directory for staged video uploads (defaults to the system temp dir).
    #[arg(long)]
    upload_dir: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    validate(&cli)?;

    // Model resolution may download with a blocking client, so it runs
    // before the async runtime starts.
    let state = build_state(&cli, &settings)?;
    let cors = cors_layer(&cli.allowed_origins)?;
    let app = router(state, cli.max_upload_mb * 1024 * 1024).layer(cors);

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("Listening on http://{addr}");
        axum::serve(listener, app).await
    })?;
    Ok(())
}

fn load_settings(cli: &Cli) -> Result<AnalysisSettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.config {
        Some(path) => AnalysisSettings::load(path)?,
        None => AnalysisSettings::default(),
    };
    if let Some(stride) = cli.frame_stride {
        settings.frame_stride = stride;
    }
    if let Some(t) = cli.score_threshold {
        settings.detection.score_threshold = t;
    }
    if let Some(t) = cli.nms_threshold {
        settings.detection.nms_threshold = t;
    }
    if let Some(k) = cli.top_k {
        settings.detection.top_k = k;
    }
    settings.validate()?;
    Ok(settings)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.max_upload_mb == 0 {
        return Err("Max upload size must be at least 1 MB".into());
    }
    if let Some(dir) = &cli.upload_dir {
        if !dir.is_dir() {
            return Err(format!("Upload directory not found: {}", dir.display()).into());
        }
    }
    Ok(())
}

fn build_state(
    cli: &Cli,
    settings: &AnalysisSettings,
) -> Result<AppState, Box<dyn std::error::Error>> {
    let bundled = Some(cli.models_dir.as_path());

    log::info!("Resolving model: {YUNET_MODEL_NAME}");
    let detector_path = model_resolver::resolve(
        ModelSource {
            file_name: YUNET_MODEL_NAME,
            url: Some(YUNET_MODEL_URL),
        },
        cli.detector_model.as_deref(),
        bundled,
        Some(Box::new(download_progress)),
    )?;
    let detector = OnnxYunetDetector::new(&detector_path, settings.detection.clone())
        .map_err(|source| ModelLoadError::DetectorUnavailable {
            path: detector_path.clone(),
            source,
        })?;

    log::info!("Resolving model: {CLASSIFIER_MODEL_NAME}");
    let classifier_path = model_resolver::resolve(
        ModelSource {
            file_name: CLASSIFIER_MODEL_NAME,
            url: None,
        },
        cli.classifier_model.as_deref(),
        bundled,
        None,
    )?;
    let classifier = OnnxDeepfakeClassifier::new(&classifier_path).map_err(|source| {
        ModelLoadError::ClassifierUnavailable {
            path: classifier_path.clone(),
            source,
        }
    })?;
    log::info!("Face detector loaded from {}", detector_path.display());
    log::info!("Deepfake classifier loaded from {}", classifier_path.display());

    let analyzer = FrameAnalyzer::new(
        FaceCandidateExtractor::new(Arc::new(detector)),
        FaceScorer::new(Arc::new(classifier), settings.classifier_input_size),
    );
    let encoder = Arc::new(JpegPreviewEncoder::new(settings.preview_quality));
    let new_reader: ReaderFactory =
        Arc::new(|| -> Box<dyn VideoReader> { Box::new(FfmpegReader::new()) });

    Ok(AppState {
        image: AnalyzeImageUseCase::new(
            analyzer.clone(),
            Arc::new(ExifFrameDecoder),
            encoder.clone(),
        ),
        video: AnalyzeVideoUseCase::new(analyzer, encoder, settings.frame_stride),
        new_reader,
        real_threshold: settings.real_threshold,
        upload_dir: cli.upload_dir.clone(),
    })
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, Box<dyn std::error::Error>> {
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
