//! Encoder service example
//!
//! Run with: cargo run --example encoder_service
//!
//! Reads ingest events from stdin, one per line, and drives ffmpeg:
//!
//!   publish <key>       start encoding rtmp://$RTMP_SERVER:$RTMP_PORT/live/<key>
//!   unpublish <key>     stop encoding
//!   {"stream_key": "<key>", "action": "publish"}
//!   tasks               list running tasks
//!   stats               print registry stats and counters
//!
//! ## Environment
//!
//! - `RTMP_SERVER` / `RTMP_PORT`: ingest server (default `rtmp:1935`)
//! - `HLS_OUTPUT_DIR`: local output root (default `/tmp/hls`)
//! - `FFMPEG_PATH`: ffmpeg binary (default `ffmpeg`)
//! - `DATABASE_URL`: PostgreSQL registry (feature `postgres`, otherwise in-memory)
//! - `MINIO_ENDPOINT`, `MINIO_ACCESS_KEY`, `MINIO_SECRET_KEY`, `MINIO_BUCKET`,
//!   `MINIO_REGION`, `CDN_BASE_URL`: object storage (feature `oss`, otherwise
//!   in-memory)

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use stream_encoder::{
    EncoderConfig, FfmpegConfig, FfmpegEngine, MemoryRegistry, Orchestrator, SegmentPublisher,
    StreamEvent, StreamRegistry, TaskEvent,
};

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn build_config() -> Result<EncoderConfig, Box<dyn std::error::Error>> {
    let port: u16 = env_or("RTMP_PORT", "1935").parse()?;

    Ok(EncoderConfig::with_output_root(env_or("HLS_OUTPUT_DIR", "/tmp/hls"))
        .ingest(env_or("RTMP_SERVER", "rtmp"), port))
}

#[cfg(feature = "postgres")]
async fn build_registry() -> Result<Arc<dyn StreamRegistry>, Box<dyn std::error::Error>> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let registry = stream_encoder::registry::PgStreamRegistry::connect(&url).await?;
            registry.migrate().await?;
            Ok(Arc::new(registry))
        }
        Err(_) => Ok(Arc::new(MemoryRegistry::new())),
    }
}

#[cfg(not(feature = "postgres"))]
async fn build_registry() -> Result<Arc<dyn StreamRegistry>, Box<dyn std::error::Error>> {
    Ok(Arc::new(MemoryRegistry::new()))
}

#[cfg(feature = "oss")]
fn build_publisher() -> Result<Arc<dyn SegmentPublisher>, Box<dyn std::error::Error>> {
    use stream_encoder::storage::{OssConfig, OssPublisher};

    let defaults = OssConfig::default();
    let config = OssConfig {
        endpoint: env_or("MINIO_ENDPOINT", &defaults.endpoint),
        access_key_id: env_or("MINIO_ACCESS_KEY", &defaults.access_key_id),
        secret_access_key: env_or("MINIO_SECRET_KEY", &defaults.secret_access_key),
        bucket: env_or("MINIO_BUCKET", &defaults.bucket),
        region: env_or("MINIO_REGION", &defaults.region),
        cdn_base_url: env_or("CDN_BASE_URL", ""),
    };

    Ok(Arc::new(OssPublisher::new(config)?))
}

#[cfg(not(feature = "oss"))]
fn build_publisher() -> Result<Arc<dyn SegmentPublisher>, Box<dyn std::error::Error>> {
    Ok(Arc::new(stream_encoder::MemoryPublisher::new()))
}

async fn handle_line(orchestrator: &Arc<Orchestrator>, line: &str) {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let arg = parts.next().unwrap_or_default();

    let event = match command {
        "" => return,
        "tasks" => {
            for task in orchestrator.active_tasks().await {
                println!(
                    "{}  task={} phase={} age={:?} dir={}",
                    task.key,
                    task.task_id,
                    task.phase,
                    task.age,
                    task.output_dir.display()
                );
            }
            return;
        }
        "stats" => {
            match orchestrator.get_stats().await {
                Ok(stats) => println!("registry: {:?}", stats),
                Err(e) => eprintln!("Failed to read stats: {}", e),
            }
            println!("counters: {:?}", orchestrator.counters().snapshot());
            return;
        }
        "publish" => StreamEvent::from_callback(Some("publish"), arg),
        "unpublish" => StreamEvent::from_callback(Some("publish_done"), arg),
        _ => StreamEvent::from_body(line),
    };

    let result = match event {
        Ok(event) => orchestrator.handle_event(&event).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stream_encoder=debug".parse()?)
                .add_directive("encoder_service=debug".parse()?),
        )
        .init();

    let config = build_config()?;
    let engine = FfmpegEngine::new(
        FfmpegConfig::default().program(env_or("FFMPEG_PATH", "ffmpeg")),
        config.layout.clone(),
    );

    println!("Writing HLS output under {}", config.output_root.display());
    println!(
        "Reading streams from {}://{}:{}/{}/<key>",
        config.ingest.scheme, config.ingest.host, config.ingest.port, config.ingest.app
    );
    println!("Type `publish <key>` or `unpublish <key>`; Ctrl+C to quit");
    println!();

    let orchestrator = Arc::new(
        Orchestrator::new(config, Arc::new(engine), build_registry().await?)
            .with_publisher(build_publisher()?),
    );

    let mut events = orchestrator.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                TaskEvent::Started { key, task_id, pid } => {
                    println!("[{}] task {} started (pid {:?})", key, task_id, pid)
                }
                TaskEvent::Retired {
                    key,
                    task_id,
                    outcome,
                } => println!("[{}] task {} ended: {:?}", key, task_id, outcome),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => handle_line(&orchestrator, line.trim()).await,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    orchestrator.shutdown().await;
    Ok(())
}
