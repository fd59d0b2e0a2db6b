//! Background acquisition of stem audio: fetch the bytes (HTTP or local
//! file), then probe them for duration and a first decodable frame.
//!
//! Workers give up once a newer generation has been requested, checking
//! before the fetch, between body chunks and again before the probe.

use crate::error::LoadError;
use crate::session::{LoadOutcome, LoadRequest, LoadedMedia, MediaLoader, PlayerEvent};
use reqwest::blocking::Client;
use rodio::{Decoder, Source};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

const MAX_PREALLOC: u64 = 32 * 1024 * 1024;

/// Loads each stem on its own short-lived worker thread.
pub struct ThreadedLoader {
    client: Client,
    latest: Arc<AtomicU64>,
}

impl ThreadedLoader {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            latest: Arc::new(AtomicU64::new(0)),
        })
    }
}

impl MediaLoader for ThreadedLoader {
    fn spawn(&self, request: LoadRequest, events: Sender<PlayerEvent>) {
        let LoadRequest {
            generation,
            stem,
            url,
        } = request;
        let client = self.client.clone();
        let fallback = events.clone();
        self.latest.fetch_max(generation, Ordering::AcqRel);
        let latest = Arc::clone(&self.latest);

        let spawned = thread::Builder::new()
            .name(format!("load-{stem}"))
            .spawn(move || {
                let superseded = || latest.load(Ordering::Acquire) > generation;
                let result = fetch_bytes_until(&client, &url, &superseded).and_then(|data| {
                    if superseded() {
                        return Err(LoadError::Superseded);
                    }
                    probe(data)
                });
                let outcome = match result {
                    Ok(media) => LoadOutcome::Loaded(media),
                    Err(LoadError::Superseded) => {
                        log::debug!("Dropped {stem} load for replaced generation {generation}");
                        LoadOutcome::Failed(LoadError::Superseded)
                    }
                    Err(e) => LoadOutcome::Failed(e),
                };
                if events
                    .send(PlayerEvent {
                        generation,
                        stem,
                        outcome,
                    })
                    .is_err()
                {
                    log::debug!("Player gone before {stem} finished loading");
                }
            });

        if let Err(e) = spawned {
            log::error!("Could not start loader for {stem}: {e}");
            let _ = fallback.send(PlayerEvent {
                generation,
                stem,
                outcome: LoadOutcome::Failed(LoadError::Io(e.to_string())),
            });
        }
    }
}

/// Read a stem from an `http(s)://` URL, a `file://` URL or a plain path.
pub fn fetch_bytes(client: &Client, url: &str) -> Result<Arc<[u8]>, LoadError> {
    fetch_bytes_until(client, url, &|| false)
}

/// [`fetch_bytes`] that stops with [`LoadError::Superseded`] as soon as
/// `cancelled` reports true.
pub fn fetch_bytes_until(
    client: &Client,
    url: &str,
    cancelled: &dyn Fn() -> bool,
) -> Result<Arc<[u8]>, LoadError> {
    if cancelled() {
        return Err(LoadError::Superseded);
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        let mut response = client
            .get(url)
            .send()
            .map_err(|e| LoadError::Unreachable(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let expected = response.content_length().unwrap_or(0).min(MAX_PREALLOC);
        let mut data = Vec::with_capacity(expected as usize);
        let mut chunk = [0u8; 64 * 1024];
        loop {
            if cancelled() {
                return Err(LoadError::Superseded);
            }
            let n = response
                .read(&mut chunk)
                .map_err(|e| LoadError::Io(format!("{url}: {e}")))?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);
        }
        log::debug!("Fetched {} bytes from {url}", data.len());
        return Ok(Arc::from(data));
    }

    let path = url.strip_prefix("file://").unwrap_or(url);
    let expanded = shellexpand::tilde(path);
    let data = fs::read(Path::new(expanded.as_ref()))?;
    log::debug!("Read {} bytes from {expanded}", data.len());
    Ok(Arc::from(data))
}

/// Decode far enough to know the stream is playable and how long it is.
pub fn probe(data: Arc<[u8]>) -> Result<LoadedMedia, LoadError> {
    let mut decoder = Decoder::new(Cursor::new(Arc::clone(&data)))
        .map_err(|e| LoadError::Undecodable(e.to_string()))?;

    let channels = decoder.channels().max(1);
    let sample_rate = decoder.sample_rate().max(1);
    let known = decoder.total_duration();

    if decoder.next().is_none() {
        return Err(LoadError::Undecodable("no audio frames".to_string()));
    }

    // Some containers (VBR mp3 without a Xing header) carry no duration;
    // count the rest of the samples instead.
    let duration = match known {
        Some(duration) if !duration.is_zero() => duration,
        _ => {
            let samples = 1 + decoder.count();
            Duration::from_secs_f64(samples as f64 / (channels as f64 * sample_rate as f64))
        }
    };

    Ok(LoadedMedia {
        data,
        duration,
        channels,
        sample_rate,
    })
}
