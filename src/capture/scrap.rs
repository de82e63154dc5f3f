//! # Scrap Capture Source
//!
//! Primary-display capture through the `scrap` library.
//!
//! ## Threading
//!
//! `scrap::Capturer` is not `Send`, so it lives on a dedicated worker thread
//! for as long as the engine is active:
//!
//! ```text
//! ┌─────────────────┐  Request{rect, reply}  ┌─────────────────┐
//! │  capture loop   │───────────────────────▶│  worker thread  │
//! │  (tokio task)   │◀───────────────────────│  owns Capturer  │
//! └─────────────────┘   oneshot RawImage     └─────────────────┘
//! ```
//!
//! `initialize` spawns the worker, `shutdown` closes the request channel and
//! joins it, which drops the capturer and releases the OS capture session.
//! Each request grabs a full display frame and crops it to the rectangle.

use std::io::ErrorKind;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use crossbeam_channel::{bounded, Receiver, Sender};
use scrap::{Capturer, Display};
use tokio::sync::oneshot;
use zoom_scale::crop::{crop_bgra, Region};
use zoom_scale::plan::Size;

use crate::capture::CaptureSource;
use crate::frame::RawImage;
use crate::geometry::{PixelRect, Rect};

/// How long one request waits for the compositor to deliver a new frame.
const FRAME_WAIT: Duration = Duration::from_millis(100);

struct Request {
    rect: PixelRect,
    reply: oneshot::Sender<Result<Option<RawImage>>>,
}

/// Capture source for the primary display.
pub struct ScrapCaptureSource {
    width: u32,
    height: u32,
    available: bool,
    requests: Option<Sender<Request>>,
    worker: Option<JoinHandle<()>>,
}

impl ScrapCaptureSource {
    /// Probe the primary display. Never fails; a missing display is reported
    /// through [`CaptureSource::is_available`].
    pub fn new() -> Self {
        let (width, height, available) = match Display::primary() {
            Ok(display) => (display.width() as u32, display.height() as u32, true),
            Err(e) => {
                log::warn!("scrap: no primary display: {}", e);
                (0, 0, false)
            }
        };
        Self {
            width,
            height,
            available,
            requests: None,
            worker: None,
        }
    }
}

impl Default for ScrapCaptureSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureSource for ScrapCaptureSource {
    async fn initialize(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        let (tx, rx) = bounded::<Request>(1);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();
        let worker = thread::Builder::new()
            .name("zoomlens-capture".into())
            .spawn(move || capture_worker(rx, ready_tx))
            .context("failed to spawn capture worker")?;

        ready_rx
            .await
            .map_err(|_| anyhow!("capture worker exited during startup"))??;
        self.requests = Some(tx);
        self.worker = Some(worker);
        log::info!("scrap capture session started ({}x{})", self.width, self.height);
        Ok(())
    }

    async fn capture(&mut self, rect: Rect) -> Result<Option<RawImage>> {
        let Some(requests) = &self.requests else {
            return Ok(None);
        };
        let (reply, answer) = oneshot::channel();
        requests
            .send(Request {
                rect: rect.to_pixels(),
                reply,
            })
            .map_err(|_| anyhow!("capture worker is gone"))?;
        answer
            .await
            .map_err(|_| anyhow!("capture worker dropped the request"))?
    }

    fn display_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f64, self.height as f64)
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn shutdown(&mut self) -> Result<()> {
        // Closing the channel ends the worker's request loop.
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            tokio::task::spawn_blocking(move || worker.join())
                .await?
                .map_err(|_| anyhow!("capture worker panicked"))?;
            log::info!("scrap capture session stopped");
        }
        Ok(())
    }
}

fn capture_worker(requests: Receiver<Request>, ready: oneshot::Sender<Result<()>>) {
    let opened = Display::primary()
        .context("scrap: no primary display")
        .and_then(|display| {
            let size = Size {
                w: display.width() as u32,
                h: display.height() as u32,
            };
            Capturer::new(display)
                .context("scrap: cannot create capturer")
                .map(|capturer| (capturer, size))
        });
    let (mut capturer, size) = match opened {
        Ok(opened) => {
            let _ = ready.send(Ok(()));
            opened
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    for request in requests.iter() {
        let result = grab(&mut capturer, size, request.rect);
        let _ = request.reply.send(result);
    }
}

fn grab(capturer: &mut Capturer, size: Size, rect: PixelRect) -> Result<Option<RawImage>> {
    let Some(region) = region_within(rect, size) else {
        return Ok(None);
    };
    let deadline = Instant::now() + FRAME_WAIT;
    loop {
        match capturer.frame() {
            Ok(frame) => {
                let stride = frame.len() / size.h.max(1) as usize;
                let data = crop_bgra(&frame, size, stride, region)?;
                return Ok(Some(RawImage::from_bgra(data, region.w, region.h)));
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Ok(None);
                }
                thread::sleep(Duration::from_millis(2));
            }
            Err(e) => return Err(e).context("scrap: frame capture failed"),
        }
    }
}

fn region_within(rect: PixelRect, size: Size) -> Option<Region> {
    let x0 = rect.x.max(0) as u32;
    let y0 = rect.y.max(0) as u32;
    let x1 = (rect.x as i64 + rect.width as i64).clamp(0, size.w as i64) as u32;
    let y1 = (rect.y as i64 + rect.height as i64).clamp(0, size.h as i64) as u32;
    (x1 > x0 && y1 > y0).then_some(Region {
        x: x0,
        y: y0,
        w: x1 - x0,
        h: y1 - y0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_is_clipped_to_the_display() {
        let size = Size { w: 100, h: 50 };
        let rect = PixelRect {
            x: -10,
            y: 40,
            width: 30,
            height: 30,
        };
        assert_eq!(
            region_within(rect, size),
            Some(Region {
                x: 0,
                y: 40,
                w: 20,
                h: 10
            })
        );
        let outside = PixelRect {
            x: 200,
            y: 0,
            width: 10,
            height: 10,
        };
        assert_eq!(region_within(outside, size), None);
    }
}
