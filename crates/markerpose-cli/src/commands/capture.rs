use std::{
    io::BufRead,
    path::PathBuf,
    sync::{atomic::Ordering, mpsc},
    time::Duration,
};

use argh::FromArgs;
use markerpose::io::capture::{
    CaptureEvent, CaptureOutcome, CaptureSession, CaptureState, ImageSequenceSource,
};

/// Preview frames from a source and save the selected ones.
///
/// Reads one command per line on stdin: `s` saves the latest frame, `q`
/// quits and anything else shows the next frame.
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "capture")]
pub struct CaptureArgs {
    /// directory of images to replay as the frame source
    #[argh(option)]
    source: PathBuf,

    /// directory to save the frames to
    #[argh(option, short = 'o')]
    output: PathBuf,
}

fn event_from_key(line: &str) -> CaptureEvent {
    match line.trim() {
        "s" => CaptureEvent::Save,
        "q" => CaptureEvent::Quit,
        _ => CaptureEvent::Frame,
    }
}

pub fn run(args: CaptureArgs) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&args.output)?;

    let source = ImageSequenceSource::from_dir(&args.source)?;
    let mut session = CaptureSession::new(source, &args.output);

    let cancel_token = super::cancel_token()?;

    // stdin is read on its own thread so that Ctrl-C is noticed while waiting
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(event_from_key(&line)).is_err() {
                break;
            }
        }
    });

    let mut event = CaptureEvent::Frame;
    loop {
        match session.handle(event)? {
            CaptureOutcome::Previewed => {
                if let Some(frame) = session.latest_frame() {
                    log::info!("preview {}x{}", frame.width(), frame.height());
                }
            }
            CaptureOutcome::Saved(path) => println!("{}", path.display()),
            CaptureOutcome::Idle => log::warn!("no frame to save"),
            CaptureOutcome::Stopped => {}
        }
        if session.state() == CaptureState::Stopped {
            break;
        }

        event = loop {
            if cancel_token.load(Ordering::SeqCst) {
                break CaptureEvent::Quit;
            }
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => break event,
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => break CaptureEvent::Quit,
            }
        };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_events() {
        assert_eq!(event_from_key("s"), CaptureEvent::Save);
        assert_eq!(event_from_key(" q\n"), CaptureEvent::Quit);
        assert_eq!(event_from_key(""), CaptureEvent::Frame);
    }
}
