use anyhow::Result;
use portal_service::api;
use portal_service::config::{PipelineVariant, PortalConfig};
use portal_service::detect::ContourPlateDetector;
use portal_service::matcher::AllowList;
use portal_service::pipeline::{FramePipeline, PlateReader, RegionPipeline};
use portal_service::recognize::TextRecognizer;
use portal_service::state::PortalState;
use portal_service::storage::UploadStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_structured_logging(telemetry::LogConfig::new("portal-service"));

    info!("Starting portal service...");

    let config = PortalConfig::from_env()?;
    let allow_list = AllowList::new(config.allow_list.clone());
    info!(
        "Portal configuration: bind={}, variant={:?}, allow_list={} entries, fuzzy_min_similarity={}",
        config.bind_addr,
        config.variant,
        allow_list.len(),
        config.fuzzy_min_similarity
    );

    let recognizer = build_recognizer(&config);
    let reader: Arc<dyn PlateReader> = match config.variant {
        PipelineVariant::Frame => {
            Arc::new(FramePipeline::new(recognizer, config.pipeline.clone())?)
        }
        PipelineVariant::Region => {
            let detector = ContourPlateDetector::new(config.pipeline.min_region_size);
            Arc::new(RegionPipeline::new(
                Box::new(detector),
                recognizer,
                config.pipeline.clone(),
            )?)
        }
    };

    let store = UploadStore::new(&config.upload_dir)?;
    let state = PortalState::new(
        reader,
        allow_list,
        store,
        config.fuzzy_min_similarity,
        config.hall_sensor_phrase.clone(),
    );

    let app = api::router(state);

    info!("Binding to {}", config.bind_addr);
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Portal service listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[cfg(feature = "tesseract")]
fn build_recognizer(config: &PortalConfig) -> Box<dyn TextRecognizer> {
    use portal_service::recognize::TesseractRecognizer;

    // Single line for whole frames, single word for cropped regions
    let (lang, page_seg_mode) = match config.variant {
        PipelineVariant::Frame => ("rus", "7"),
        PipelineVariant::Region => ("eng", "8"),
    };
    info!("Using tesseract recognizer: lang={}, psm={}", lang, page_seg_mode);
    Box::new(TesseractRecognizer::new(
        lang,
        config.pipeline.charset.clone(),
        page_seg_mode,
    ))
}

#[cfg(not(feature = "tesseract"))]
fn build_recognizer(_config: &PortalConfig) -> Box<dyn TextRecognizer> {
    use portal_service::recognize::ScriptedRecognizer;

    let script = std::env::var("PORTAL_SCRIPTED_TOKENS").unwrap_or_default();
    info!("Using scripted recognizer (built without the tesseract feature)");
    Box::new(ScriptedRecognizer::from_script(&script))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
