use anyhow::Result;
use clap::Parser;
use classroom_pipeline::http::{create_router, AppState};
use classroom_pipeline::pipeline::{
    CommandStageOps, MemoryRunLog, PipelineOrchestrator, ProgressProjector, Stage,
    StageArtifactProbe,
};
use classroom_pipeline::recording::{
    FfmpegLauncher, ProcessSupervisor, RecordingRegistry, SupervisorConfig,
};
use classroom_pipeline::Config;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "classroom-pipeline",
    about = "Processing pipeline and live-capture service for classroom video review"
)]
struct Args {
    /// Config file (without extension, resolved by the config loader)
    #[arg(long, default_value = "config/classroom-pipeline")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} starting", cfg.service.name);
    info!("Processing root: {}", cfg.storage.processing_root);
    info!("Recordings dir: {}", cfg.storage.recordings_dir);

    let run_log = Arc::new(MemoryRunLog::new());

    let ops = CommandStageOps::new(&cfg.storage.processing_root)
        .with_command(Stage::CutVideo, cfg.stages.cut_video.clone())
        .with_command(Stage::ConvertAudio, cfg.stages.convert_audio.clone())
        .with_command(Stage::Transcribe, cfg.stages.transcribe.clone())
        .with_command(Stage::Summary, cfg.stages.summary.clone())
        .with_command(Stage::Evaluate, cfg.stages.evaluate.clone());

    let pipeline = Arc::new(PipelineOrchestrator::new(
        run_log.clone(),
        StageArtifactProbe::new(&cfg.storage.processing_root),
        Arc::new(ops),
    ));
    let progress = Arc::new(ProgressProjector::new(run_log));

    let supervisor_config = SupervisorConfig {
        recordings_dir: cfg.storage.recordings_dir.clone().into(),
        ready_timeout: cfg.recording.ready_timeout(),
        grace_period: cfg.recording.grace_period(),
    };
    let recorder = Arc::new(ProcessSupervisor::new(
        Arc::new(FfmpegLauncher::new(cfg.recording.ffmpeg_binary.clone())),
        Arc::new(RecordingRegistry::new()),
        supervisor_config,
    ));

    let app = create_router(AppState::new(pipeline, progress, recorder));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
