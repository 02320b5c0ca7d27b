use std::io::{self, BufRead};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::config;
use crate::controller::PlaybackController;
use crate::error::StoreError;
use crate::library::{Catalog, GroupEntry, LibraryCatalog, Track, TrackId};
use crate::store::Favorites;

/// A parsed stdin line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Resume, or play the first track matching the query.
    Play(Option<String>),
    Pause,
    Toggle,
    Next,
    Prev,
    /// Absolute position in seconds.
    Seek(u64),
    Stop,
    Queue,
    Add(String),
    Remove(TrackId),
    Shuffle(bool),
    Reshuffle,
    Clear,
    Albums(Option<String>),
    Artists(Option<String>),
    Fav(FavCommand),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavCommand {
    Lists,
    New(String),
    Delete(String),
    /// Add the current track to a list.
    Add(String),
    /// Remove the current track from a list.
    Remove(String),
    Show(String),
}

const HELP: &str = "\
commands:
  play [query]      resume, or play the first matching track
  pause | toggle    pause or toggle playback
  next | prev       skip forward or back
  seek <secs>       jump to an absolute position
  stop              stop and clear the queue
  queue             list the queue
  add <query>       queue every matching track
  remove <id>       remove a track from the queue
  shuffle on|off    random next-track selection
  reshuffle         shuffle the queue order
  clear             clear the queue
  albums [query]    list albums
  artists [query]   list artists
  fav [new|delete|add|remove|show <list>]
  status            show what is playing
  quit";

fn rest(arg: &str) -> Option<String> {
    let arg = arg.trim();
    (!arg.is_empty()).then(|| arg.to_string())
}

fn required(arg: &str, what: &str) -> Result<String, String> {
    rest(arg).ok_or_else(|| format!("missing {what}"))
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, arg) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

    let cmd = match word.to_lowercase().as_str() {
        "play" | "p" => Command::Play(rest(arg)),
        "pause" => Command::Pause,
        "toggle" | "t" => Command::Toggle,
        "next" | "n" => Command::Next,
        "prev" | "previous" => Command::Prev,
        "seek" => {
            let secs = arg
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("seek needs whole seconds, got {:?}", arg.trim()))?;
            Command::Seek(secs)
        }
        "stop" => Command::Stop,
        "queue" | "q" => Command::Queue,
        "add" => Command::Add(required(arg, "search query")?),
        "remove" | "rm" => {
            let id = arg
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("remove needs a track id, got {:?}", arg.trim()))?;
            Command::Remove(TrackId::new(id))
        }
        "shuffle" => match arg.trim() {
            "on" => Command::Shuffle(true),
            "off" => Command::Shuffle(false),
            other => return Err(format!("shuffle takes on|off, got {other:?}")),
        },
        "reshuffle" => Command::Reshuffle,
        "clear" => Command::Clear,
        "albums" => Command::Albums(rest(arg)),
        "artists" => Command::Artists(rest(arg)),
        "fav" => Command::Fav(parse_fav(arg)?),
        "status" | "s" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "" => return Err("empty command".to_string()),
        other => return Err(format!("unknown command {other:?}, try `help`")),
    };
    Ok(cmd)
}

fn parse_fav(arg: &str) -> Result<FavCommand, String> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Ok(FavCommand::Lists);
    }
    let (sub, name) = arg.split_once(char::is_whitespace).unwrap_or((arg, ""));
    let name = required(name, "list name")?;
    match sub {
        "new" => Ok(FavCommand::New(name)),
        "delete" | "del" => Ok(FavCommand::Delete(name)),
        "add" => Ok(FavCommand::Add(name)),
        "remove" | "rm" => Ok(FavCommand::Remove(name)),
        "show" => Ok(FavCommand::Show(name)),
        other => Err(format!("unknown fav command {other:?}")),
    }
}

/// `mm:ss`, or `h:mm:ss` past an hour.
pub fn format_time(ms: u64) -> String {
    let secs = ms / 1000;
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

pub fn status_line(ctl: &PlaybackController) -> String {
    let Some(track) = ctl.current_track() else {
        return "[stopped]".to_string();
    };
    let state = if ctl.is_playing() { "playing" } else { "paused" };
    format!(
        "[{state}] {}  {} / {}",
        track.display(),
        format_time(ctl.position_ms()),
        format_time(ctl.duration_ms())
    )
}

fn print_tracks(tracks: &[Track], current: Option<TrackId>) {
    if tracks.is_empty() {
        println!("(empty)");
    }
    for t in tracks {
        let marker = if Some(t.id) == current { '>' } else { ' ' };
        println!(
            "{marker} {:>19}  {}  [{}]",
            t.id.get(),
            t.display(),
            format_time(t.duration_ms())
        );
    }
}

fn print_groups(groups: &[GroupEntry]) {
    if groups.is_empty() {
        println!("(none)");
    }
    for g in groups {
        println!("{} ({})", g.name, g.count);
    }
}

/// Apply one command. Returns `true` when the user asked to quit.
fn handle_command(
    cmd: Command,
    catalog: &LibraryCatalog,
    ctl: &mut PlaybackController,
    favorites: &mut dyn Favorites,
) -> bool {
    match cmd {
        Command::Play(None) => {
            if !ctl.is_playing() {
                ctl.toggle_play_pause();
            }
        }
        Command::Play(Some(query)) => match catalog.search_tracks(&query).into_iter().next() {
            Some(track) => ctl.play_if_queued(track),
            None => println!("no track matches {query:?}"),
        },
        Command::Pause => ctl.pause(),
        Command::Toggle => ctl.toggle_play_pause(),
        Command::Next => ctl.next(),
        Command::Prev => ctl.prev(),
        Command::Seek(secs) => ctl.seek(secs.saturating_mul(1000)),
        Command::Stop => ctl.stop(),
        Command::Clear => ctl.clear_queue(),
        Command::Queue => print_tracks(ctl.queue(), ctl.current_track().map(|t| t.id)),
        Command::Add(query) => {
            let found = catalog.search_tracks(&query);
            let before = ctl.queue().len();
            ctl.add_tracks(found);
            println!("queued {} track(s)", ctl.queue().len() - before);
        }
        Command::Remove(id) => {
            if !ctl.is_queued(id) {
                println!("track {id} is not queued");
            }
            ctl.remove_by_id(id);
        }
        Command::Shuffle(enabled) => ctl.set_shuffle_mode(enabled),
        Command::Reshuffle => ctl.shuffle_queue(),
        Command::Albums(query) => print_groups(&match query {
            Some(q) => catalog.search_albums(&q),
            None => catalog.albums(),
        }),
        Command::Artists(query) => print_groups(&match query {
            Some(q) => catalog.search_artists(&q),
            None => catalog.artists(),
        }),
        Command::Fav(fav) => handle_fav(fav, catalog, ctl, favorites),
        Command::Status => println!("{}", status_line(ctl)),
        Command::Help => println!("{HELP}"),
        Command::Quit => return true,
    }
    false
}

fn handle_fav(
    fav: FavCommand,
    catalog: &LibraryCatalog,
    ctl: &PlaybackController,
    favorites: &mut dyn Favorites,
) {
    let current = ctl.current_track().map(|t| t.id);
    let result = match fav {
        FavCommand::Lists => {
            for name in favorites.list_names() {
                println!("{name} ({})", favorites.ids_in_list(&name).len());
            }
            Ok(true)
        }
        FavCommand::New(name) => favorites.create_list(&name),
        FavCommand::Delete(name) => favorites.delete_list(&name),
        FavCommand::Add(name) => match current {
            Some(id) => favorites.add_track_to_list(&name, id),
            None => nothing_playing(&name),
        },
        FavCommand::Remove(name) => match current {
            Some(id) => favorites.remove_track_from_list(&name, id),
            None => nothing_playing(&name),
        },
        FavCommand::Show(name) => {
            let tracks: Vec<Track> = favorites
                .ids_in_list(&name)
                .into_iter()
                .filter_map(|id| catalog.track(id))
                .collect();
            print_tracks(&tracks, current);
            Ok(true)
        }
    };
    match result {
        Ok(true) => {}
        Ok(false) => println!("nothing changed"),
        Err(e) => log::warn!("favorites update failed: {e}"),
    }
}

fn nothing_playing(list: &str) -> Result<bool, StoreError> {
    println!("nothing is playing, cannot change {list:?}");
    Ok(true)
}

/// Read stdin lines on a helper thread so the loop can keep interpolating
/// progress and draining engine events between commands.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Headless command loop. Returns when the user quits or stdin closes.
pub fn run(
    settings: &config::Settings,
    catalog: &LibraryCatalog,
    ctl: &mut PlaybackController,
    favorites: &mut dyn Favorites,
) -> Result<(), Box<dyn std::error::Error>> {
    let lines = spawn_stdin_reader();
    let interval = Duration::from_millis(settings.controller.progress_interval_ms.max(1));
    let mut last_shown: Option<(Option<TrackId>, bool)> = None;

    println!("{} tracks in library, type `help` for commands", catalog.len());

    loop {
        match lines.recv_timeout(interval) {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => match parse_command(&line) {
                Ok(cmd) => {
                    if handle_command(cmd, catalog, ctl, favorites) {
                        return Ok(());
                    }
                }
                Err(msg) => println!("{msg}"),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log::debug!("stdin closed");
                return Ok(());
            }
        }

        ctl.poll_events();
        ctl.update_progress();

        let shown = (ctl.current_track().map(|t| t.id), ctl.is_playing());
        if last_shown != Some(shown) {
            println!("{}", status_line(ctl));
            last_shown = Some(shown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_commands() {
        assert_eq!(parse_command("play"), Ok(Command::Play(None)));
        assert_eq!(parse_command("  NEXT "), Ok(Command::Next));
        assert_eq!(parse_command("seek 42"), Ok(Command::Seek(42)));
        assert_eq!(parse_command("shuffle on"), Ok(Command::Shuffle(true)));
        assert_eq!(parse_command("remove 17"), Ok(Command::Remove(TrackId::new(17))));
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
    }

    #[test]
    fn keeps_query_text_intact() {
        assert_eq!(
            parse_command("add  Kind of Blue "),
            Ok(Command::Add("Kind of Blue".to_string()))
        );
        assert_eq!(
            parse_command("play so what"),
            Ok(Command::Play(Some("so what".to_string())))
        );
        assert_eq!(parse_command("albums"), Ok(Command::Albums(None)));
    }

    #[test]
    fn parses_favorites() {
        assert_eq!(parse_command("fav"), Ok(Command::Fav(FavCommand::Lists)));
        assert_eq!(
            parse_command("fav new late night"),
            Ok(Command::Fav(FavCommand::New("late night".to_string())))
        );
        assert!(parse_command("fav add").is_err());
        assert!(parse_command("fav frobnicate x").is_err());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("seek -3").is_err());
        assert!(parse_command("remove abc").is_err());
        assert!(parse_command("shuffle maybe").is_err());
        assert!(parse_command("add").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn formats_times() {
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(65_999), "01:05");
        assert_eq!(format_time(3_725_000), "1:02:05");
    }
}
