use std::time::Duration;
use stemdeck::error::PlayerError;
use stemdeck::session::fake::{self, FakeOutput, ManualLoader, OutputOp};
use stemdeck::session::{
    FailureReason, FailurePolicy, LoadState, PlayerStatus, SessionConfig, SessionNotice,
    StemPlayer,
};
use stemdeck::stems::{Stem, StemSet};

fn player_with(policy: FailurePolicy) -> (StemPlayer, ManualLoader, FakeOutput) {
    let loader = ManualLoader::new();
    let output = FakeOutput::new();
    let config = SessionConfig {
        failure_policy: policy,
        ..SessionConfig::default()
    };
    let player = StemPlayer::new(Box::new(loader.clone()), Box::new(output.clone()), config);
    (player, loader, output)
}

#[test]
fn test_out_of_order_readiness_enables_transport_after_fifth() {
    let (mut player, loader, output) = player_with(FailurePolicy::FailClosed);
    let generation = player.load_stems(StemSet::from_base("files/abc", "mp3"));

    let urls: Vec<String> = loader
        .requests_for(generation)
        .into_iter()
        .map(|r| r.url)
        .collect();
    assert_eq!(
        urls,
        vec![
            "files/abc/original.mp3",
            "files/abc/bass.mp3",
            "files/abc/drums.mp3",
            "files/abc/other.mp3",
            "files/abc/vocals.mp3",
        ]
    );

    let order = [Stem::Drums, Stem::Vocals, Stem::Original, Stem::Other];
    for stem in order {
        assert!(player.handle_event(fake::loaded(generation, stem, 180.0)).is_empty());
        assert_eq!(
            player.set_transport(true),
            Err(PlayerError::TransportOnUnready)
        );
    }
    assert_eq!(player.state().ready_count, 4);

    let notices = player.handle_event(fake::loaded(generation, Stem::Bass, 180.0));
    assert_eq!(notices, vec![SessionNotice::AllReady]);
    assert_eq!(player.status(), &PlayerStatus::Ready);

    assert_eq!(player.set_transport(true), Ok(true));
    assert_eq!(output.count(&OutputOp::Play), 5);
    assert!(player.state().playing);
}

#[test]
fn test_duplicate_ready_is_idempotent() {
    let (mut player, _loader, _output) = player_with(FailurePolicy::FailClosed);
    let generation = player.load_stems(StemSet::from_base("job", "mp3"));

    player.handle_event(fake::loaded(generation, Stem::Bass, 60.0));
    player.handle_event(fake::loaded(generation, Stem::Bass, 60.0));
    assert_eq!(player.state().ready_count, 1);

    let mut all_ready = 0;
    for stem in Stem::ALL {
        all_ready += player
            .handle_event(fake::loaded(generation, stem, 60.0))
            .iter()
            .filter(|n| **n == SessionNotice::AllReady)
            .count();
    }
    for stem in Stem::ALL {
        player.handle_event(fake::loaded(generation, stem, 60.0));
    }
    assert_eq!(all_ready, 1);
    assert_eq!(player.state().ready_count, 5);
}

#[test]
fn test_fail_closed_blocks_and_names_failed_stem() {
    let (mut player, _loader, output) = player_with(FailurePolicy::FailClosed);
    let generation = player.load_stems(StemSet::from_base("job", "mp3"));

    let mut notices = Vec::new();
    for stem in Stem::ALL {
        let event = if stem == Stem::Other {
            fake::failed(generation, stem)
        } else {
            fake::loaded(generation, stem, 60.0)
        };
        notices.extend(player.handle_event(event));
    }

    assert!(!notices.contains(&SessionNotice::AllReady));
    assert!(notices.iter().any(|n| matches!(
        n,
        SessionNotice::LoadFailed {
            stem: Stem::Other,
            ..
        }
    )));
    assert_eq!(
        player.status(),
        &PlayerStatus::Failed {
            reason: FailureReason::Stems(vec![Stem::Other])
        }
    );
    assert_eq!(
        player.toggle_transport(),
        Err(PlayerError::TransportOnUnready)
    );
    assert_eq!(output.count(&OutputOp::Play), 0);
}

#[test]
fn test_fail_open_drops_failed_stem() {
    let (mut player, _loader, output) = player_with(FailurePolicy::FailOpen);
    let generation = player.load_stems(StemSet::from_base("job", "mp3"));

    player.handle_event(fake::failed(generation, Stem::Vocals));
    for stem in [Stem::Original, Stem::Bass, Stem::Drums, Stem::Other] {
        player.handle_event(fake::loaded(generation, stem, 60.0));
    }

    assert_eq!(player.status(), &PlayerStatus::Ready);
    assert_eq!(player.toggle_transport(), Ok(true));
    assert_eq!(output.count(&OutputOp::Play), 4);
    assert!(output.ops(Stem::Vocals).is_empty());
}

#[test]
fn test_master_seek_while_follower_loading_is_applied_on_ready() {
    let (mut player, _loader, output) = player_with(FailurePolicy::FailClosed);
    let generation = player.load_stems(StemSet::from_base("job", "mp3"));

    for stem in [Stem::Original, Stem::Drums, Stem::Other, Stem::Vocals] {
        player.handle_event(fake::loaded(generation, stem, 100.0));
    }
    player.seek_master(0.42).unwrap();

    assert!(output.seeks(Stem::Bass).is_empty());
    assert_eq!(output.seeks(Stem::Drums), vec![Duration::from_secs_f64(42.0)]);

    player.handle_event(fake::loaded(generation, Stem::Bass, 200.0));
    assert_eq!(output.seeks(Stem::Bass), vec![Duration::from_secs_f64(84.0)]);
    assert_eq!(player.status(), &PlayerStatus::Ready);
}

#[test]
fn test_master_seek_reaches_each_follower_exactly_once() {
    let (mut player, _loader, output) = player_with(FailurePolicy::FailClosed);
    let generation = player.load_stems(StemSet::from_base("job", "mp3"));
    for stem in Stem::ALL {
        player.handle_event(fake::loaded(generation, stem, 100.0));
    }

    assert_eq!(player.seek_master(0.25), Ok(4));
    for stem in Stem::ALL {
        assert_eq!(output.seeks(stem).len(), 1, "{stem}");
    }
}

#[test]
fn test_follower_seek_never_propagates() {
    let (mut player, _loader, output) = player_with(FailurePolicy::FailClosed);
    let generation = player.load_stems(StemSet::from_base("job", "mp3"));
    for stem in Stem::ALL {
        player.handle_event(fake::loaded(generation, stem, 100.0));
    }

    assert_eq!(
        player.user_seek(Stem::Drums, 0.7),
        Err(PlayerError::InteractionDisabled(Stem::Drums))
    );
    for stem in Stem::ALL {
        assert!(output.seeks(stem).is_empty(), "{stem}");
    }
}

#[test]
fn test_late_callbacks_from_replaced_session_are_ignored() {
    let (mut player, loader, output) = player_with(FailurePolicy::FailClosed);
    let first = player.load_stems(StemSet::from_base("old", "mp3"));
    player.handle_event(fake::loaded(first, Stem::Original, 60.0));

    let second = player.load_stems(StemSet::from_base("new", "mp3"));
    assert_eq!(output.count(&OutputOp::Stop), 1);
    assert_eq!(loader.requests_for(second).len(), 5);

    let attached = output.attach_count();
    for stem in Stem::ALL {
        assert!(player.handle_event(fake::loaded(first, stem, 60.0)).is_empty());
    }
    assert!(player.handle_event(fake::failed(first, Stem::Bass)).is_empty());

    assert_eq!(output.attach_count(), attached);
    assert_eq!(player.state().ready_count, 0);
    assert_eq!(player.status(), &PlayerStatus::AwaitingStems);
    assert!(
        player
            .tracks()
            .iter()
            .all(|t| t.load_state == LoadState::Loading)
    );
}

#[test]
fn test_reload_after_failure_recovers() {
    let (mut player, _loader, _output) = player_with(FailurePolicy::FailClosed);
    let first = player.load_stems(StemSet::from_base("job", "mp3"));
    player.handle_event(fake::failed(first, Stem::Drums));
    assert!(matches!(player.status(), PlayerStatus::Failed { .. }));

    let second = player.reload().unwrap();
    for stem in Stem::ALL {
        player.handle_event(fake::loaded(second, stem, 30.0));
    }
    assert_eq!(player.status(), &PlayerStatus::Ready);
}

#[cfg(feature = "player")]
mod threaded {
    use super::*;
    use std::time::Instant;
    use stemdeck::backend::ThreadedLoader;
    use tempfile::TempDir;

    fn write_silence(dir: &std::path::Path, stem: Stem) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let path = dir.join(format!("{stem}.wav"));
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..8000 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_threaded_loader_drives_session_to_ready() {
        let dir = TempDir::new().unwrap();
        for stem in Stem::ALL {
            write_silence(dir.path(), stem);
        }

        let output = FakeOutput::new();
        let loader = ThreadedLoader::new(Duration::from_secs(5)).unwrap();
        let mut player = StemPlayer::new(
            Box::new(loader),
            Box::new(output.clone()),
            SessionConfig::default(),
        );
        player.load_stems(StemSet::from_base(&dir.path().to_string_lossy(), "wav"));

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut notices = Vec::new();
        while player.status() == &PlayerStatus::AwaitingStems && Instant::now() < deadline {
            notices.extend(player.pump());
            std::thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(notices, vec![SessionNotice::AllReady]);
        assert_eq!(output.attach_count(), 5);
        let tracks = player.tracks();
        assert!(tracks.iter().all(|t| t.load_state == LoadState::Ready));
        assert!(
            tracks
                .iter()
                .all(|t| (t.duration_secs.unwrap() - 1.0).abs() < 0.01)
        );
    }
}
