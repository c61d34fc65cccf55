//! FrameSource - Exclusive Camera Access
//!
//! ## Responsibilities
//!
//! - Own the physical camera handle (open/read/close)
//! - Serialize all hardware access through a single worker
//! - Deterministic handle release on stop and shutdown
//!
//! The camera handle lives on a dedicated worker thread; every operation is a
//! command sent over a bounded channel with a oneshot reply. The channel is the
//! mutual-exclusion region: commands execute one at a time, and a full channel
//! means the hardware is busy. Callers that must not accumulate backlog (the
//! streaming tick) use [`FrameSource::try_read_frame`] and skip the cycle.

use crate::error::CameraError;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
    Camera,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};

/// One raw frame out of the camera, RGB8.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Encode to JPEG at the given quality (1-100).
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, CameraError> {
        use image::ImageEncoder;

        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
        encoder
            .write_image(
                &self.data,
                self.width,
                self.height,
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| CameraError::ReadFailed(format!("JPEG encode failed: {e}")))?;
        Ok(buf)
    }
}

/// Camera backend seam. Implementations run on the worker thread and never
/// cross it, so the underlying handle does not need to be `Send`.
pub trait FrameGrabber {
    /// Open the device at the given resolution, releasing any prior handle.
    fn open(&mut self, width: u32, height: u32) -> Result<(), CameraError>;
    /// Read one frame. Only valid while open.
    fn read(&mut self) -> Result<Frame, CameraError>;
    /// Release the handle. No-op when already closed.
    fn close(&mut self);
}

/// Default grabber backed by nokhwa (V4L2 on Linux).
struct NokhwaGrabber {
    index: u32,
    camera: Option<Camera>,
}

impl NokhwaGrabber {
    fn new(index: u32) -> Self {
        Self { index, camera: None }
    }
}

impl FrameGrabber for NokhwaGrabber {
    fn open(&mut self, width: u32, height: u32) -> Result<(), CameraError> {
        // Release any prior handle first so re-open is idempotent-safe
        self.close();

        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(Resolution::new(width, height), FrameFormat::MJPEG, 30),
        ));

        let mut camera = Camera::new(CameraIndex::Index(self.index), requested)
            .map_err(|e| CameraError::Unavailable(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| CameraError::Unavailable(e.to_string()))?;

        self.camera = Some(camera);
        Ok(())
    }

    fn read(&mut self) -> Result<Frame, CameraError> {
        let camera = self
            .camera
            .as_mut()
            .ok_or_else(|| CameraError::Unavailable("camera is not open".to_string()))?;

        let buffer = camera
            .frame()
            .map_err(|e| CameraError::ReadFailed(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::ReadFailed(e.to_string()))?;

        Ok(Frame {
            width: decoded.width(),
            height: decoded.height(),
            data: decoded.into_raw(),
        })
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            let _ = camera.stop_stream();
        }
    }
}

/// Commands executed by the camera worker
enum CameraCommand {
    Open {
        width: u32,
        height: u32,
        respond_to: oneshot::Sender<Result<(), CameraError>>,
    },
    Read {
        respond_to: oneshot::Sender<Result<Frame, CameraError>>,
    },
    Close {
        respond_to: oneshot::Sender<()>,
    },
}

/// FrameSource instance
pub struct FrameSource {
    tx: mpsc::Sender<CameraCommand>,
    open: AtomicBool,
    reads: AtomicU64,
}

impl FrameSource {
    /// Create a FrameSource for the local camera at `index`.
    pub fn new(index: u32) -> Self {
        Self::with_grabber(move || Box::new(NokhwaGrabber::new(index)))
    }

    /// Create a FrameSource with an injected grabber backend.
    ///
    /// The factory runs on the worker thread, so the grabber itself does not
    /// need to be `Send`.
    pub fn with_grabber<F>(factory: F) -> Self
    where
        F: FnOnce() -> Box<dyn FrameGrabber> + Send + 'static,
    {
        // Capacity 1: one command in flight, at most one queued. The stream
        // tick uses try_send and skips when full rather than queueing.
        let (tx, mut rx) = mpsc::channel::<CameraCommand>(1);

        std::thread::Builder::new()
            .name("camera-worker".to_string())
            .spawn(move || {
                let mut grabber = factory();

                while let Some(cmd) = rx.blocking_recv() {
                    match cmd {
                        CameraCommand::Open {
                            width,
                            height,
                            respond_to,
                        } => {
                            let _ = respond_to.send(grabber.open(width, height));
                        }
                        CameraCommand::Read { respond_to } => {
                            let _ = respond_to.send(grabber.read());
                        }
                        CameraCommand::Close { respond_to } => {
                            grabber.close();
                            let _ = respond_to.send(());
                        }
                    }
                }

                // Channel closed: release the handle before the thread exits
                grabber.close();
                tracing::debug!("camera worker stopped");
            })
            .expect("failed to spawn camera worker thread");

        Self {
            tx,
            open: AtomicBool::new(false),
            reads: AtomicU64::new(0),
        }
    }

    /// Open the camera at the requested resolution.
    ///
    /// Releases any prior handle first, so calling open on an already-open
    /// source is safe.
    pub async fn open(&self, width: u32, height: u32) -> Result<(), CameraError> {
        let (respond_to, rx) = oneshot::channel();
        self.tx
            .send(CameraCommand::Open {
                width,
                height,
                respond_to,
            })
            .await
            .map_err(|_| CameraError::Unavailable("camera worker stopped".to_string()))?;

        let result = rx
            .await
            .map_err(|_| CameraError::Unavailable("camera worker stopped".to_string()))?;

        if result.is_ok() {
            self.open.store(true, Ordering::SeqCst);
            tracing::info!(width, height, "Camera opened");
        }
        result
    }

    /// Read one frame, waiting for the hardware if another producer holds it.
    pub async fn read_frame(&self) -> Result<Frame, CameraError> {
        if !self.is_open() {
            return Err(CameraError::Unavailable("camera is not open".to_string()));
        }

        let (respond_to, rx) = oneshot::channel();
        self.tx
            .send(CameraCommand::Read { respond_to })
            .await
            .map_err(|_| CameraError::Unavailable("camera worker stopped".to_string()))?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        rx.await
            .map_err(|_| CameraError::Unavailable("camera worker stopped".to_string()))?
    }

    /// Read one frame without waiting: returns `None` when the hardware is
    /// busy with another producer. Used by the streaming tick to skip a cycle
    /// instead of queueing behind captures.
    pub async fn try_read_frame(&self) -> Option<Result<Frame, CameraError>> {
        if !self.is_open() {
            return Some(Err(CameraError::Unavailable(
                "camera is not open".to_string(),
            )));
        }

        let (respond_to, rx) = oneshot::channel();
        match self.tx.try_send(CameraCommand::Read { respond_to }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => return None,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                return Some(Err(CameraError::Unavailable(
                    "camera worker stopped".to_string(),
                )))
            }
        }
        self.reads.fetch_add(1, Ordering::Relaxed);

        Some(rx.await.unwrap_or_else(|_| {
            Err(CameraError::Unavailable("camera worker stopped".to_string()))
        }))
    }

    /// Release the hardware handle. Safe to call when already closed.
    pub async fn close(&self) {
        self.open.store(false, Ordering::SeqCst);

        let (respond_to, rx) = oneshot::channel();
        if self.tx.send(CameraCommand::Close { respond_to }).await.is_ok() {
            let _ = rx.await;
        }
        tracing::info!("Camera closed");
    }

    /// Whether the device is currently open
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Total frame reads issued to the hardware (instrumentation)
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted grabber that counts calls and never touches hardware
    struct StubGrabber {
        open: bool,
    }

    impl FrameGrabber for StubGrabber {
        fn open(&mut self, _width: u32, _height: u32) -> Result<(), CameraError> {
            self.open = true;
            Ok(())
        }

        fn read(&mut self) -> Result<Frame, CameraError> {
            if !self.open {
                return Err(CameraError::Unavailable("not open".to_string()));
            }
            Ok(Frame {
                data: vec![0u8; 12],
                width: 2,
                height: 2,
            })
        }

        fn close(&mut self) {
            self.open = false;
        }
    }

    fn stub_source() -> FrameSource {
        FrameSource::with_grabber(|| Box::new(StubGrabber { open: false }))
    }

    #[tokio::test]
    async fn read_before_open_is_unavailable() {
        let source = stub_source();
        let err = source.read_frame().await.unwrap_err();
        assert!(matches!(err, CameraError::Unavailable(_)));
        assert_eq!(source.read_count(), 0);
    }

    #[tokio::test]
    async fn open_read_close_cycle() {
        let source = stub_source();
        source.open(672, 672).await.unwrap();
        assert!(source.is_open());

        let frame = source.read_frame().await.unwrap();
        assert_eq!((frame.width, frame.height), (2, 2));
        assert_eq!(source.read_count(), 1);

        source.close().await;
        assert!(!source.is_open());

        // close is a no-op when already closed
        source.close().await;
        assert!(!source.is_open());
    }

    #[tokio::test]
    async fn reopen_after_close_works() {
        let source = stub_source();
        source.open(672, 672).await.unwrap();
        source.close().await;
        source.open(320, 240).await.unwrap();
        assert!(source.read_frame().await.is_ok());
    }
}
