use crate::error::{LoadError, PlayerError};
use crate::session::{AudioOutput, LoadedMedia, TrackOutput};
use crate::stems::Stem;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

/// Default audio device. Every attached track gets its own [`Sink`] on the
/// shared mixer so gain and position stay per-stem.
pub struct RodioOutput {
    stream: OutputStream,
}

impl RodioOutput {
    pub fn open_default() -> Result<Self, LoadError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| LoadError::Output(e.to_string()))?;
        // The TUI owns stderr; keep the drop notice out of it.
        stream.log_on_drop(false);
        log::info!("Opened default audio output");
        Ok(Self { stream })
    }
}

impl AudioOutput for RodioOutput {
    fn attach(&self, stem: Stem, media: &LoadedMedia) -> Result<Box<dyn TrackOutput>, LoadError> {
        let decoder = Decoder::new(Cursor::new(Arc::clone(&media.data)))
            .map_err(|e| LoadError::Undecodable(e.to_string()))?;

        let sink = Sink::connect_new(self.stream.mixer());
        sink.pause();
        sink.append(decoder);

        log::debug!(
            "Attached {stem}: {:.1}s, {} ch @ {} Hz",
            media.duration.as_secs_f64(),
            media.channels,
            media.sample_rate
        );
        Ok(Box::new(SinkOutput { sink }))
    }
}

struct SinkOutput {
    sink: Sink,
}

impl TrackOutput for SinkOutput {
    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn seek(&mut self, position: Duration) -> Result<(), PlayerError> {
        self.sink
            .try_seek(position)
            .map_err(|e| PlayerError::Output(e.to_string()))
    }

    fn set_gain(&mut self, gain: f32) {
        self.sink.set_volume(gain);
    }

    fn position(&self) -> Duration {
        self.sink.get_pos()
    }

    fn stop(&mut self) {
        self.sink.stop();
    }
}
