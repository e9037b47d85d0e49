// ============================================================================
// Camera Tests
// ============================================================================
//
// `sh -c '<script>'` stands in for raspiyuv: the capture flags end up as the
// script's positional parameters and are ignored.

use std::time::Duration;

use futures::StreamExt;

use super::{Camera, FrameReader};
use crate::{CameraConfig, CaptureError, Format, Image, ShortFramePolicy};

const WAIT: Duration = Duration::from_secs(5);

fn fake_camera(script: &str, width: u32, height: u32, format: Format) -> CameraConfig {
    CameraConfig::new(width, height, format)
        .program("sh")
        .program_arg("-c")
        .program_arg(script)
}

async fn read_raw(reader: &FrameReader) -> anyhow::Result<Result<crate::RawFrame, CaptureError>> {
    Ok(tokio::time::timeout(WAIT, reader.read_raw()).await?)
}

// ------------------------------------------------------------------------
// Start
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_start_missing_program() {
    let config = CameraConfig::new(640, 480, Format::Yuv420).program("/nonexistent/raspiyuv");
    match Camera::with_config(config) {
        Err(CaptureError::Start { program, .. }) => assert_eq!(program, "/nonexistent/raspiyuv"),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("expected start error"),
    }
}

#[tokio::test]
async fn test_start_rejects_zero_size() {
    let config = fake_camera("exec cat /dev/zero", 0, 480, Format::Gray);
    assert!(matches!(
        Camera::with_config(config),
        Err(CaptureError::InvalidSize {
            width: 0,
            height: 480
        })
    ));
}

#[tokio::test]
async fn test_start_rejects_oversized_width() {
    let width = u32::MAX - 1;
    let config = fake_camera("exec cat /dev/zero", width, 480, Format::Yuv420);
    match Camera::with_config(config) {
        Err(CaptureError::InvalidSize { width: w, height: 480 }) => assert_eq!(w, width),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("expected invalid size"),
    }
}

#[tokio::test]
async fn test_session_attributes() -> anyhow::Result<()> {
    let cam = Camera::with_config(fake_camera("exec sleep 30", 100, 100, Format::Yuv420))?;
    assert_eq!(cam.width(), 100);
    assert_eq!(cam.height(), 100);
    assert_eq!(cam.format(), Format::Yuv420);
    assert_eq!(cam.raw_size(), 21_504);
    assert!(cam.pid().is_some());
    assert!(cam.is_running());
    cam.close().await;
    Ok(())
}

// ------------------------------------------------------------------------
// Frame sizes
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_read_raw_sizes() -> anyhow::Result<()> {
    let cases = [
        (Format::Yuv420, 640, 480, 640 * 480 + 640 * 480 / 2),
        (Format::Rgb, 640, 480, 640 * 480 * 3),
        (Format::Gray, 640, 480, 640 * 480),
        (Format::Yuv420, 320, 240, 320 * 240 + 320 * 240 / 2),
        (Format::Yuv420, 100, 100, 128 * 112 + 128 * 112 / 2),
        (Format::Rgb, 320, 240, 320 * 240 * 3),
        (Format::Gray, 320, 240, 320 * 240),
    ];

    for (format, width, height, want) in cases {
        let cam = Camera::with_config(fake_camera("exec cat /dev/zero", width, height, format))?;

        let raw = tokio::time::timeout(WAIT, cam.read_raw()).await??;
        assert_eq!(raw.len(), want, "{format} ({width},{height})");
        assert!(!raw.is_partial());

        let img = tokio::time::timeout(WAIT, cam.read_image()).await??;
        assert_eq!(img.dimensions(), (width, height), "{format} ({width},{height})");
        assert_eq!(img.format(), format);

        cam.close().await;
    }
    Ok(())
}

#[tokio::test]
async fn test_read_image_variants() -> anyhow::Result<()> {
    let cam = Camera::with_config(fake_camera("exec cat /dev/zero", 64, 48, Format::Rgb))?;
    let img = tokio::time::timeout(WAIT, cam.read_image()).await??;
    match img {
        Image::Rgba(rgba) => assert!(rgba.pixels().all(|p| p.0 == [0, 0, 0, 255])),
        _ => panic!("expected rgba image"),
    }
    cam.close().await;

    let cam = Camera::with_config(fake_camera("exec cat /dev/zero", 64, 48, Format::Gray))?;
    let img = tokio::time::timeout(WAIT, cam.read_image()).await??;
    assert!(matches!(img, Image::Gray(_)));
    cam.close().await;
    Ok(())
}

// ------------------------------------------------------------------------
// Stream end
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_last_frame_then_stream_ended() -> anyhow::Result<()> {
    let cam = Camera::with_config(fake_camera("printf abcdefgh", 4, 2, Format::Gray))?;
    let reader = cam.reader();

    let frame = read_raw(&reader).await??;
    assert_eq!(frame.data(), b"abcdefgh");

    assert!(matches!(read_raw(&reader).await?, Err(CaptureError::StreamEnded)));
    assert!(matches!(
        cam.read_image().await,
        Err(CaptureError::StreamEnded)
    ));
    assert!(!cam.is_running());
    cam.close().await;
    Ok(())
}

#[tokio::test]
async fn test_short_frame_discarded_by_default() -> anyhow::Result<()> {
    let cam = Camera::with_config(fake_camera("printf abc", 4, 2, Format::Gray))?;
    let result = tokio::time::timeout(WAIT, cam.read_raw()).await?;
    assert!(matches!(result, Err(CaptureError::StreamEnded)));
    cam.close().await;
    Ok(())
}

#[tokio::test]
async fn test_short_frame_delivered_when_asked() -> anyhow::Result<()> {
    let config =
        fake_camera("printf abc", 4, 2, Format::Gray).short_frame(ShortFramePolicy::Deliver);
    let cam = Camera::with_config(config)?;

    let frame = tokio::time::timeout(WAIT, cam.read_raw()).await??;
    assert!(frame.is_partial());
    assert_eq!(frame.data(), b"abc");
    cam.close().await;

    let config =
        fake_camera("printf abc", 4, 2, Format::Gray).short_frame(ShortFramePolicy::Deliver);
    let cam = Camera::with_config(config)?;
    let result = tokio::time::timeout(WAIT, cam.read_image()).await?;
    assert!(matches!(
        result,
        Err(CaptureError::ShortFrame {
            expected: 8,
            actual: 3
        })
    ));
    cam.close().await;
    Ok(())
}

#[tokio::test]
async fn test_frames_stream_ends_with_capture() -> anyhow::Result<()> {
    let cam = Camera::with_config(fake_camera("printf aaaabbbb", 2, 2, Format::Gray))?;
    let frames: Vec<_> = tokio::time::timeout(WAIT, cam.reader().frames().collect()).await?;

    assert!(!frames.is_empty() && frames.len() <= 2);
    assert_eq!(frames.last().map(|f| f.data().to_vec()), Some(b"bbbb".to_vec()));
    cam.close().await;
    Ok(())
}

// ------------------------------------------------------------------------
// Close
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_close_wakes_pending_reader() -> anyhow::Result<()> {
    let cam = Camera::with_config(fake_camera("exec sleep 30", 640, 480, Format::Yuv420))?;
    let reader = cam.reader();
    let pending = tokio::spawn(async move { reader.read_raw().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!pending.is_finished());

    tokio::time::timeout(WAIT, cam.close()).await?;
    let result = tokio::time::timeout(WAIT, pending).await??;
    assert!(matches!(result, Err(CaptureError::StreamEnded)));
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_close_kills_process() -> anyhow::Result<()> {
    let cam = Camera::with_config(fake_camera("exec sleep 30", 4, 2, Format::Gray))?;
    let pid = cam.pid().ok_or(anyhow::anyhow!("no pid"))?;
    let proc_path = std::path::PathBuf::from(format!("/proc/{pid}"));
    assert!(proc_path.exists());

    tokio::time::timeout(WAIT, cam.close()).await?;
    assert!(!proc_path.exists());
    Ok(())
}

#[tokio::test]
async fn test_close_while_streaming() -> anyhow::Result<()> {
    let cam = Camera::with_config(fake_camera("exec cat /dev/zero", 640, 480, Format::Yuv420))?;
    let reader = cam.reader();
    tokio::time::timeout(WAIT, cam.read_raw()).await??;

    tokio::time::timeout(WAIT, cam.close()).await?;

    // at most one frame was left unclaimed before the stream closed
    let mut remaining = 0;
    while read_raw(&reader).await?.is_ok() {
        remaining += 1;
    }
    assert!(remaining <= 1);
    Ok(())
}

#[tokio::test]
async fn test_drop_stops_capture() -> anyhow::Result<()> {
    let cam = Camera::with_config(fake_camera("exec sleep 30", 4, 2, Format::Gray))?;
    let reader = cam.reader();
    drop(cam);

    assert!(matches!(read_raw(&reader).await?, Err(CaptureError::StreamEnded)));
    Ok(())
}

// ------------------------------------------------------------------------
// Read variants
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_read_timeout() -> anyhow::Result<()> {
    let cam = Camera::with_config(fake_camera("exec sleep 30", 4, 2, Format::Gray))?;
    let result = cam.read_raw_timeout(Duration::from_millis(50)).await;
    assert!(matches!(result, Err(CaptureError::Timeout)));
    assert!(cam.try_read_raw()?.is_none());
    cam.close().await;
    Ok(())
}

#[tokio::test]
async fn test_read_image_timeout_gets_frame() -> anyhow::Result<()> {
    let cam = Camera::with_config(fake_camera("exec cat /dev/zero", 4, 2, Format::Gray))?;
    let img = cam.read_image_timeout(WAIT).await?;
    assert_eq!(img.dimensions(), (4, 2));
    cam.close().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_read_outside_runtime() -> anyhow::Result<()> {
    let cam = Camera::with_config(fake_camera("exec cat /dev/zero", 8, 8, Format::Gray))?;
    let reader = cam.reader();

    let frame = tokio::task::spawn_blocking(move || reader.blocking_read_raw()).await??;
    assert_eq!(frame.len(), 64);

    let reader = cam.reader();
    let img = tokio::task::spawn_blocking(move || reader.blocking_read_image()).await??;
    assert_eq!(img.dimensions(), (8, 8));

    cam.close().await;
    Ok(())
}

#[tokio::test]
async fn test_stats_count_frames() -> anyhow::Result<()> {
    let cam = Camera::with_config(fake_camera("exec cat /dev/zero", 8, 8, Format::Gray))?;
    tokio::time::timeout(WAIT, cam.read_raw()).await??;
    tokio::time::timeout(WAIT, cam.read_raw()).await??;

    let stats = cam.stats();
    assert!(stats.frames_read >= 2);
    assert!(stats.frames_dropped <= stats.frames_read);
    cam.close().await;
    Ok(())
}
