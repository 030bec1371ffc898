use std::path::{Path, PathBuf};

use markerpose_image::Image;

use crate::{
    error::IoError,
    functional::{read_image_any_rgb8, write_image_rgb8},
};

/// A source of RGB frames, such as a camera.
pub trait FrameSource {
    /// Grab the next frame.
    ///
    /// Returns `Ok(None)` once the source has no more frames.
    fn next_frame(&mut self) -> Result<Option<Image<u8, 3>>, IoError>;

    /// Release the source. Later calls to [`FrameSource::next_frame`] yield no frame.
    fn shutdown(&mut self);
}

/// A frame source replaying image files in order.
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    running: bool,
}

impl ImageSequenceSource {
    /// Create a source from a list of image files.
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            next: 0,
            running: true,
        }
    }

    /// Create a source from the image files of a directory, sorted by name.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, IoError> {
        let mut paths = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| {
                        matches!(
                            e.to_ascii_lowercase().as_str(),
                            "png" | "jpg" | "jpeg" | "bmp" | "tif" | "tiff"
                        )
                    })
            })
            .collect::<Vec<_>>();
        paths.sort();
        Ok(Self::new(paths))
    }

    /// Whether the source has not been shut down.
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<Image<u8, 3>>, IoError> {
        if !self.running {
            return Ok(None);
        }
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        read_image_any_rgb8(path).map(Some)
    }

    fn shutdown(&mut self) {
        self.running = false;
    }
}

/// The state of a [`CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Frames are pulled for preview.
    Previewing,
    /// The latest frame is being written.
    Saving,
    /// The source was shut down.
    Stopped,
}

/// An input to a [`CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Pull a new frame.
    Frame,
    /// Save the latest frame.
    Save,
    /// Stop the session.
    Quit,
}

/// What a [`CaptureSession`] did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A new frame is available for preview.
    Previewed,
    /// The latest frame was written to this file.
    Saved(PathBuf),
    /// Nothing happened.
    Idle,
    /// The session stopped.
    Stopped,
}

/// Drive a frame source: preview frames, save them on demand and stop.
pub struct CaptureSession<S: FrameSource> {
    source: S,
    output_dir: PathBuf,
    state: CaptureState,
    latest: Option<Image<u8, 3>>,
    next_index: usize,
}

impl<S: FrameSource> CaptureSession<S> {
    /// Create a session writing its frames to `output_dir`.
    pub fn new(source: S, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            output_dir: output_dir.into(),
            state: CaptureState::Previewing,
            latest: None,
            next_index: 0,
        }
    }

    /// The current state.
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// The last frame pulled from the source.
    pub fn latest_frame(&self) -> Option<&Image<u8, 3>> {
        self.latest.as_ref()
    }

    /// The frame source.
    pub fn source(&self) -> &S {
        &self.source
    }

    fn pull_frame(&mut self) -> Result<bool, IoError> {
        match self.source.next_frame()? {
            Some(frame) => {
                self.latest = Some(frame);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // the first img{i}.png that does not exist yet
    fn next_free_path(&mut self) -> PathBuf {
        loop {
            let path = self.output_dir.join(format!("img{}.png", self.next_index));
            self.next_index += 1;
            if !path.exists() {
                return path;
            }
        }
    }

    /// Process one event.
    ///
    /// Events received once the session is stopped are ignored. A source
    /// running out of frames stops the session.
    pub fn handle(&mut self, event: CaptureEvent) -> Result<CaptureOutcome, IoError> {
        if self.state == CaptureState::Stopped {
            return Ok(CaptureOutcome::Idle);
        }

        match event {
            CaptureEvent::Frame => {
                if self.pull_frame()? {
                    Ok(CaptureOutcome::Previewed)
                } else {
                    log::info!("frame source exhausted");
                    self.stop();
                    Ok(CaptureOutcome::Stopped)
                }
            }
            CaptureEvent::Save => {
                if self.latest.is_none() && !self.pull_frame()? {
                    return Ok(CaptureOutcome::Idle);
                }
                let path = self.next_free_path();
                let Some(frame) = self.latest.as_ref() else {
                    return Ok(CaptureOutcome::Idle);
                };

                self.state = CaptureState::Saving;
                let written = write_image_rgb8(&path, frame);
                self.state = CaptureState::Previewing;
                written?;

                log::info!("saved {}", path.display());
                Ok(CaptureOutcome::Saved(path))
            }
            CaptureEvent::Quit => {
                self.stop();
                Ok(CaptureOutcome::Stopped)
            }
        }
    }

    fn stop(&mut self) {
        self.source.shutdown();
        self.state = CaptureState::Stopped;
    }
}

impl<S: FrameSource> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        if self.state != CaptureState::Stopped {
            self.source.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markerpose_image::ImageSize;

    // a source yielding `count` frames filled with their index
    struct CountingSource {
        count: u8,
        sent: u8,
        shut: bool,
    }

    impl FrameSource for CountingSource {
        fn next_frame(&mut self) -> Result<Option<Image<u8, 3>>, IoError> {
            if self.shut || self.sent == self.count {
                return Ok(None);
            }
            self.sent += 1;
            let size = ImageSize {
                width: 2,
                height: 2,
            };
            Ok(Some(Image::from_size_val(size, self.sent)?))
        }

        fn shutdown(&mut self) {
            self.shut = true;
        }
    }

    fn source(count: u8) -> CountingSource {
        CountingSource {
            count,
            sent: 0,
            shut: false,
        }
    }

    #[test]
    fn preview_save_quit() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        // img0.png is taken
        std::fs::write(tmp_dir.path().join("img0.png"), b"")?;

        let mut session = CaptureSession::new(source(5), tmp_dir.path());
        assert_eq!(session.state(), CaptureState::Previewing);

        assert_eq!(session.handle(CaptureEvent::Frame)?, CaptureOutcome::Previewed);
        assert_eq!(session.handle(CaptureEvent::Frame)?, CaptureOutcome::Previewed);

        let saved = session.handle(CaptureEvent::Save)?;
        let path = tmp_dir.path().join("img1.png");
        assert_eq!(saved, CaptureOutcome::Saved(path.clone()));
        assert_eq!(read_image_any_rgb8(&path)?.get_pixel(0, 0, 0)?, 2);
        assert_eq!(session.state(), CaptureState::Previewing);

        assert_eq!(
            session.handle(CaptureEvent::Save)?,
            CaptureOutcome::Saved(tmp_dir.path().join("img2.png"))
        );

        assert_eq!(session.handle(CaptureEvent::Quit)?, CaptureOutcome::Stopped);
        assert_eq!(session.state(), CaptureState::Stopped);
        assert!(session.source().shut);

        // ignored once stopped
        assert_eq!(session.handle(CaptureEvent::Frame)?, CaptureOutcome::Idle);
        assert_eq!(session.handle(CaptureEvent::Save)?, CaptureOutcome::Idle);
        Ok(())
    }

    #[test]
    fn exhausted_source_stops() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let mut session = CaptureSession::new(source(1), tmp_dir.path());
        assert_eq!(session.handle(CaptureEvent::Frame)?, CaptureOutcome::Previewed);
        assert_eq!(session.handle(CaptureEvent::Frame)?, CaptureOutcome::Stopped);
        assert_eq!(session.state(), CaptureState::Stopped);
        Ok(())
    }

    #[test]
    fn save_pulls_a_frame_first() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let mut session = CaptureSession::new(source(1), tmp_dir.path());
        assert!(matches!(
            session.handle(CaptureEvent::Save)?,
            CaptureOutcome::Saved(_)
        ));
        assert!(session.latest_frame().is_some());
        Ok(())
    }

    #[test]
    fn image_sequence_replays_files() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let size = ImageSize {
            width: 3,
            height: 2,
        };
        for (name, value) in [("b.png", 20u8), ("a.png", 10u8)] {
            write_image_rgb8(tmp_dir.path().join(name), &Image::from_size_val(size, value)?)?;
        }
        std::fs::write(tmp_dir.path().join("notes.txt"), b"skip me")?;

        let mut src = ImageSequenceSource::from_dir(tmp_dir.path())?;
        let first = src.next_frame()?.ok_or(IoError::SourceExhausted)?;
        assert_eq!(first.get_pixel(0, 0, 0)?, 10);
        let second = src.next_frame()?.ok_or(IoError::SourceExhausted)?;
        assert_eq!(second.get_pixel(2, 1, 1)?, 20);
        assert!(src.next_frame()?.is_none());

        src.shutdown();
        assert!(!src.is_running());
        Ok(())
    }
}
