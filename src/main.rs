use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use zoomlens::{
    FilterQuality, MagnifierConfig, PatternCaptureSource, Point, Size, TrackingMode, ZoomEngine,
    ZoomEngineBuilder,
};

/// Real-time screen magnifier:
/// captures the region around the focus point, scales it by the zoom level
/// and reports frame statistics while it runs.
#[derive(Parser, Debug)]
#[command(name = "zoomlens")]
#[command(about = "🔍 Run the screen magnifier engine and report frame statistics")]
#[command(long_about = "Run the screen magnifier engine for a while and report frame statistics.
Without the screen-capture feature (or with --synthetic) a generated test display is magnified instead of the real screen.")]
struct Args {
    /// Zoom level
    #[arg(short, long, help = "Zoom level, clamped to the configured bounds (default from config)")]
    level: Option<f64>,

    /// Output window size
    #[arg(short, long, value_parser = parse_size, help = "Output window size, e.g. 400x300")]
    window: Option<Size>,

    /// Focus mode
    #[arg(short, long, value_enum, help = "Where to look: follow (pointer), fixed (--center), fullscreen")]
    mode: Option<TrackingMode>,

    /// Fixed focus point
    #[arg(short, long, value_parser = parse_point, help = "Fixed focus point, e.g. 960,540")]
    center: Option<Point>,

    /// Run time
    #[arg(short, long, default_value = "10s",
          help = "How long to run: 30s (30 seconds), 2m (2 minutes), 1h (1 hour)")]
    duration: String,

    /// JSON configuration file
    #[arg(long, help = "Path to a JSON configuration file")]
    config: Option<String>,

    /// Interpolation filter
    #[arg(long, value_enum, help = "CPU interpolation filter")]
    filter: Option<FilterQuality>,

    /// Skip the GPU path
    #[arg(long, help = "Render on the CPU only")]
    cpu_only: bool,

    /// Synthetic display size
    #[arg(long, value_parser = parse_size, help = "Magnify a generated WxH test display instead of the screen")]
    synthetic: Option<Size>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let run_for = Duration::from_secs(parse_duration(&args.duration)?);

    let mut config = match &args.config {
        Some(path) => MagnifierConfig::from_json_file(path)?,
        None => MagnifierConfig::default(),
    };
    if args.cpu_only {
        config.prefer_gpu = false;
    }
    if let Some(filter) = args.filter {
        config.filter = filter;
    }

    let engine = with_sources(ZoomEngine::builder().with_config(config), args.synthetic).build()?;
    if !engine.is_capture_available() {
        return Err(anyhow!("screen capture is not available"));
    }

    if let Some(level) = args.level {
        engine.set_level(level);
    }
    if let Some(window) = args.window {
        engine.set_window_size(window);
    }
    if let Some(center) = args.center {
        engine.set_center(center);
    }
    if let Some(mode) = args.mode {
        engine.set_mode(mode);
    } else if args.center.is_some() {
        engine.set_mode(TrackingMode::FixedPosition);
    }

    engine.start()?;
    let deadline = tokio::time::Instant::now() + run_for;
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupted");
                break;
            }
            _ = ticker.tick() => {
                let metrics = engine.performance_metrics();
                let indicator = engine.zoom_indicator();
                log::info!(
                    "{:.1} fps, {:.2} ms/frame, level {:.1} at ({:.0}, {:.0}), {}",
                    metrics.fps,
                    metrics.avg_frame_time_ms,
                    indicator.level,
                    indicator.center.x,
                    indicator.center.y,
                    if metrics.is_gpu_accelerated { "gpu" } else { "cpu" },
                );
            }
        }
    }
    engine.stop().await?;

    let metrics = engine.performance_metrics();
    println!("frames rendered: {}", metrics.frames_rendered);
    println!("frames dropped:  {}", metrics.frames_dropped);
    println!("over budget:     {}", metrics.budget_overruns);
    println!("average:         {:.1} fps ({:.2} ms/frame)", metrics.fps, metrics.avg_frame_time_ms);
    if let Some(frame) = engine.current_frame() {
        println!(
            "last frame:      #{} {}x{} from {:.0}x{:.0} at level {:.1}",
            frame.sequence,
            frame.image.width,
            frame.image.height,
            frame.capture_rect.size.width,
            frame.capture_rect.size.height,
            frame.level,
        );
    }
    Ok(())
}

/// Attach the capture and pointer sources this build supports.
fn with_sources(builder: ZoomEngineBuilder, synthetic: Option<Size>) -> ZoomEngineBuilder {
    #[cfg(feature = "pointer")]
    let builder = builder.with_pointer_source(zoomlens::DevicePointerSource::new());

    match synthetic {
        Some(size) => builder.with_capture_source(PatternCaptureSource::new(
            size.width as u32,
            size.height as u32,
        )),
        None => with_screen(builder),
    }
}

#[cfg(feature = "screen-capture")]
fn with_screen(builder: ZoomEngineBuilder) -> ZoomEngineBuilder {
    builder.with_capture_source(zoomlens::ScrapCaptureSource::new())
}

#[cfg(not(feature = "screen-capture"))]
fn with_screen(builder: ZoomEngineBuilder) -> ZoomEngineBuilder {
    log::warn!("built without screen-capture; using a synthetic 1920x1080 display");
    builder.with_capture_source(PatternCaptureSource::new(1920, 1080))
}

/// Parse duration string like "30s", "2m", "1h" into seconds
fn parse_duration(duration: &str) -> Result<u64> {
    if let Ok(seconds) = duration.parse::<u64>() {
        return Ok(seconds);
    }

    let len = duration.len();
    if len < 2 {
        return Err(anyhow!("Invalid duration format: {}", duration));
    }

    let (num_str, unit) = duration.split_at(len - 1);
    let num: u64 = num_str.parse().map_err(|_| anyhow!("Invalid number in duration: {}", num_str))?;

    match unit {
        "s" => Ok(num),
        "m" => Ok(num * 60),
        "h" => Ok(num * 3600),
        _ => Err(anyhow!("Invalid duration unit: {}. Use 's' for seconds, 'm' for minutes, 'h' for hours", unit)),
    }
}

/// Parse "WxH" into a size
fn parse_size(value: &str) -> Result<Size> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("Invalid size: {}. Use WxH, e.g. 400x300", value))?;
    let width: f64 = w.trim().parse().map_err(|_| anyhow!("Invalid width: {}", w))?;
    let height: f64 = h.trim().parse().map_err(|_| anyhow!("Invalid height: {}", h))?;
    if !(width > 0.0 && height > 0.0) {
        return Err(anyhow!("Size must be positive: {}", value));
    }
    Ok(Size::new(width, height))
}

/// Parse "X,Y" into a point
fn parse_point(value: &str) -> Result<Point> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| anyhow!("Invalid point: {}. Use X,Y, e.g. 960,540", value))?;
    let x: f64 = x.trim().parse().map_err(|_| anyhow!("Invalid x: {}", x))?;
    let y: f64 = y.trim().parse().map_err(|_| anyhow!("Invalid y: {}", y))?;
    Ok(Point::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_accept_units() {
        assert_eq!(parse_duration("45").unwrap(), 45);
        assert_eq!(parse_duration("2m").unwrap(), 120);
        assert!(parse_duration("5d").is_err());
    }

    #[test]
    fn sizes_and_points_parse() {
        assert_eq!(parse_size("400x300").unwrap(), Size::new(400.0, 300.0));
        assert!(parse_size("400").is_err());
        assert!(parse_size("0x10").is_err());
        assert_eq!(parse_point("10, 20").unwrap(), Point::new(10.0, 20.0));
    }
}
