use std::path::Path;
use std::time::Duration;

use lofty::prelude::*;
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::model::{Track, TrackId, UNKNOWN_ALBUM, UNKNOWN_ARTIST};

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn non_blank(value: Option<std::borrow::Cow<'_, str>>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read tags and duration for `path`. Unreadable files keep the filename as
/// title and an unknown duration.
fn read_track(path: &Path) -> (Track, Option<Duration>) {
    let mut title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string();
    let mut artist: Option<String> = None;
    let mut album: Option<String> = None;
    let mut duration: Option<Duration> = None;

    if let Ok(tagged) = lofty::read_from_path(path) {
        duration = Some(tagged.properties().duration());

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            if let Some(v) = non_blank(tag.title()) {
                title = v;
            }
            artist = non_blank(tag.artist());
            album = non_blank(tag.album());
        }
    }

    let track = Track {
        id: TrackId::from_path(path),
        path: path.to_path_buf(),
        title,
        artist: artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        album: album.unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
        duration: duration.unwrap_or(Duration::ZERO),
    };
    (track, duration)
}

/// Walk `dir` and collect audio tracks according to `settings`.
///
/// Files whose measured duration is below `min_duration_ms` (ringtones,
/// notification blips) are skipped; files whose duration cannot be read are
/// kept.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();
    let min_duration = Duration::from_millis(settings.min_duration_ms);

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file()
            || (!settings.include_hidden && is_hidden(path))
            || !is_audio_file(path, settings)
        {
            continue;
        }

        let (track, measured) = read_track(path);
        if measured.is_some_and(|d| d < min_duration) {
            log::debug!("skipping short file {}", path.display());
            continue;
        }
        tracks.push(track);
    }

    tracks.sort_by(|a, b| a.display().to_lowercase().cmp(&b.display().to_lowercase()));
    log::info!("scanned {} track(s) under {}", tracks.len(), dir.display());
    tracks
}
