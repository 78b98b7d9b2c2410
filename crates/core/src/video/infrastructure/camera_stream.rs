use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

type SendError = Box<dyn std::error::Error + Send + Sync>;
type FrameResult = Result<Frame, SendError>;

/// Reads a live source on a background thread and keeps only the newest
/// frame, so a slow consumer always sees the current picture instead of a
/// growing backlog.
///
/// Decode errors are forwarded once and end the stream.
pub struct CameraStream {
    metadata: VideoMetadata,
    frame_rx: Receiver<FrameResult>,
    stopped: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CameraStream {
    /// Opens `path` with `reader` and starts capturing.
    pub fn start(
        mut reader: Box<dyn VideoReader>,
        path: &Path,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let metadata = reader.open(path)?;
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<FrameResult>(1);
        let stopped = Arc::new(AtomicBool::new(false));

        let handle = spawn_capture(reader, frame_tx, frame_rx.clone(), stopped.clone());
        log::info!("Capture started on {}", path.display());

        Ok(Self {
            metadata,
            frame_rx,
            stopped,
            handle: Some(handle),
        })
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Blocks until the next frame is available. `None` once the source
    /// has ended or the stream was stopped.
    pub fn read(&self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let result = self.frame_rx.recv().ok()?;
        Some(result.map_err(|e| -> Box<dyn std::error::Error> { e }))
    }

    /// Iterator over [`read`](Self::read).
    pub fn frames(
        &self,
    ) -> impl Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_ {
        std::iter::from_fn(move || self.read())
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signals the capture thread and waits for it. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Capture thread panicked");
            } else {
                log::info!("Capture stopped");
            }
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_capture(
    mut reader: Box<dyn VideoReader>,
    frame_tx: Sender<FrameResult>,
    drain_rx: Receiver<FrameResult>,
    stopped: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for frame_result in reader.frames() {
            if stopped.load(Ordering::Relaxed) {
                break;
            }
            let item = frame_result.map_err(|e| -> SendError { e.to_string().into() });
            let failed = item.is_err();
            if !send_latest(&frame_tx, &drain_rx, item) || failed {
                break;
            }
        }
        reader.close();
    })
}

/// Sends `item`, evicting whatever the consumer has not picked up yet.
/// Returns `false` when the consumer is gone.
fn send_latest<T>(tx: &Sender<T>, drain_rx: &Receiver<T>, mut item: T) -> bool {
    loop {
        match tx.try_send(item) {
            Ok(()) => return true,
            Err(TrySendError::Full(back)) => {
                let _ = drain_rx.try_recv();
                item = back;
            }
            Err(TrySendError::Disconnected(_)) => return false,
        }
    }
}
