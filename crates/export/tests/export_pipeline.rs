//! End-to-end export pipeline scenarios driven by the scripted engine.

use std::io::Cursor;
use std::time::{Duration, Instant};

use lumo_common::LumoError;
use lumo_engine::{
    shared_surface, AnimationAsset, AnimationEngine, RasterSurface, ScriptedEngine, SurfaceHandle,
};
use lumo_export::{
    CancelToken, DirectorySink, DownloadSink, ExportCatalog, ExportOrchestrator, ExportSpec,
    Format, GifSpec, ImageSpec, VideoSpec,
};

fn asset(width: u32, height: u32, frames: u32, fps: f64) -> AnimationAsset {
    AnimationAsset {
        version: "5.7.4".to_string(),
        frame_rate: fps,
        width,
        height,
        in_point: 0.0,
        out_point: frames as f64,
    }
}

fn scripted(width: u32, height: u32, frames: u32) -> (SurfaceHandle, ScriptedEngine) {
    let surface = shared_surface(RasterSurface::new(1, 1));
    let engine = ScriptedEngine::load(&asset(width, height, frames, 30.0), surface.clone());
    (surface, engine)
}

fn gif_spec(fps: u32) -> ExportSpec {
    ExportSpec::Gif(GifSpec {
        format: Format::new("gif", "image/gif", "gif"),
        width: None,
        height: None,
        fps,
    })
}

fn video_spec(codec: &str, duration_secs: f64) -> ExportSpec {
    ExportSpec::Video(VideoSpec {
        format: Format::new("mp4 (MJPEG)", "video/mp4", "mp4"),
        width: None,
        height: None,
        fps: 25,
        codec: codec.to_string(),
        duration_secs,
    })
}

fn png_spec() -> ExportSpec {
    ExportSpec::Image(ImageSpec {
        format: Format::new("png", "image/png", "png"),
        width: None,
        height: None,
        quality: None,
    })
}

#[tokio::test]
async fn gif_export_writes_every_frame_with_spec_delay() {
    let (surface, mut engine) = scripted(100, 100, 10);
    let orchestrator = ExportOrchestrator::new();

    let blob = orchestrator
        .submit(&surface, Some(&mut engine), &gif_spec(10), &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(blob.mime, "image/gif");

    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(Cursor::new(&blob.bytes)).unwrap();
    assert_eq!(decoder.width(), 100);
    assert_eq!(decoder.height(), 100);

    let mut frames = 0;
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        // 10 fps is 100 ms per frame, 10 hundredths of a second.
        assert_eq!(frame.delay, 10);
        frames += 1;
    }
    assert_eq!(frames, 10);
}

#[tokio::test]
async fn gif_frames_are_visually_distinct() {
    let (surface, mut engine) = scripted(64, 64, 4);
    let orchestrator = ExportOrchestrator::new();

    let blob = orchestrator
        .submit(&surface, Some(&mut engine), &gif_spec(10), &CancelToken::new())
        .await
        .unwrap();

    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(Cursor::new(&blob.bytes)).unwrap();
    let first = decoder.read_next_frame().unwrap().unwrap().buffer.to_vec();
    let second = decoder.read_next_frame().unwrap().unwrap().buffer.to_vec();
    assert_ne!(first, second);
}

#[tokio::test]
async fn gif_without_engine_is_rejected() {
    let surface = shared_surface(RasterSurface::new(32, 32));
    let orchestrator = ExportOrchestrator::new();

    let err = orchestrator
        .submit(&surface, None, &gif_spec(10), &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LumoError::NoAnimation));
}

#[tokio::test]
async fn detached_surface_fails_without_touching_dimensions() {
    let surface = shared_surface(RasterSurface::new(40, 30));
    surface.lock().unwrap().detach();
    let orchestrator = ExportOrchestrator::new();

    let spec = png_spec().with_dimensions(Some(800), Some(600));
    let err = orchestrator
        .submit(&surface, None, &spec, &CancelToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, LumoError::NoSurface));
    let guard = surface.lock().unwrap();
    assert_eq!((guard.width(), guard.height()), (40, 30));
}

#[tokio::test]
async fn surface_dimensions_are_restored_after_export() {
    let (surface, mut engine) = scripted(100, 100, 3);
    let orchestrator = ExportOrchestrator::new();

    let spec = gif_spec(10).with_dimensions(Some(50), Some(40));
    orchestrator
        .submit(&surface, Some(&mut engine), &spec, &CancelToken::new())
        .await
        .unwrap();

    let guard = surface.lock().unwrap();
    assert_eq!((guard.width(), guard.height()), (100, 100));
}

#[tokio::test]
async fn video_recording_honours_the_spec_duration() {
    let (surface, mut engine) = scripted(48, 48, 30);
    let orchestrator = ExportOrchestrator::new();

    let started = Instant::now();
    let blob = orchestrator
        .submit(
            &surface,
            Some(&mut engine),
            &video_spec("mjpeg", 1.0),
            &CancelToken::new(),
        )
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(blob.mime, "video/mp4");
    assert_eq!(&blob.bytes[4..8], b"ftyp");
    assert!(elapsed >= Duration::from_millis(950), "stopped early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(2500), "overran: {elapsed:?}");
}

#[tokio::test]
async fn unsupported_codec_fails_before_the_recording_window() {
    let (surface, mut engine) = scripted(48, 48, 30);
    let orchestrator = ExportOrchestrator::new();

    let started = Instant::now();
    let err = orchestrator
        .submit(
            &surface,
            Some(&mut engine),
            &video_spec("vp9", 5.0),
            &CancelToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, LumoError::UnsupportedCodec { .. }));
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn second_submission_is_rejected_while_one_runs() {
    let (surface, mut engine) = scripted(32, 32, 30);
    let orchestrator = ExportOrchestrator::new();
    let cancel = CancelToken::new();

    let video = async {
        orchestrator
            .submit(&surface, Some(&mut engine), &video_spec("mjpeg", 0.6), &cancel)
            .await
    };
    let late_still = async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        orchestrator
            .submit(&surface, None, &png_spec(), &cancel)
            .await
    };

    let (video_result, still_result) = tokio::join!(video, late_still);
    assert!(video_result.is_ok());
    assert!(matches!(still_result.unwrap_err(), LumoError::ExportInProgress));
}

#[tokio::test]
async fn cancelling_an_export_surfaces_cancelled() {
    let (surface, mut engine) = scripted(32, 32, 30);
    let orchestrator = ExportOrchestrator::new();
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = orchestrator
        .submit(&surface, Some(&mut engine), &video_spec("mjpeg", 30.0), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, LumoError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn still_export_matches_the_rendered_frame() {
    let (surface, mut engine) = scripted(60, 60, 5);
    engine.seek(2, true);
    let rendered = surface.lock().unwrap().read_rgba().unwrap();
    let orchestrator = ExportOrchestrator::new();

    let blob = orchestrator
        .submit(&surface, Some(&mut engine), &png_spec(), &CancelToken::new())
        .await
        .unwrap();

    let decoded = image::load_from_memory(&blob.bytes).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (60, 60));
    assert_eq!(decoded.into_raw(), rendered);
}

#[tokio::test]
async fn catalog_quality_edit_flows_into_the_encoder() {
    let (surface, mut engine) = scripted(120, 120, 5);
    let orchestrator = ExportOrchestrator::new();

    let mut catalog = ExportCatalog::standard();
    assert!(catalog.update("image/jpeg", |spec| spec.with_quality(0.95)));
    let fine_spec = catalog.select("image/jpeg").unwrap().clone();
    assert_eq!(fine_spec.quality(), Some(0.95));
    let coarse_spec = fine_spec.with_quality(0.5);

    let fine = orchestrator
        .submit(&surface, Some(&mut engine), &fine_spec, &CancelToken::new())
        .await
        .unwrap();
    let coarse = orchestrator
        .submit(&surface, Some(&mut engine), &coarse_spec, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(fine.mime, "image/jpeg");
    assert!(coarse.len() < fine.len());
}

#[tokio::test]
async fn delivered_export_lands_in_the_sink_directory() {
    let (surface, mut engine) = scripted(40, 40, 3);
    let orchestrator = ExportOrchestrator::new();
    let spec = png_spec();

    let blob = orchestrator
        .submit(&surface, Some(&mut engine), &spec, &CancelToken::new())
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let sink = DirectorySink::new(dir.path());
    let filename = lumo_export::suggested_filename(&spec);
    sink.download(&filename, &blob);

    let written = std::fs::read(dir.path().join("image.png")).unwrap();
    assert_eq!(written, blob.bytes);
}
