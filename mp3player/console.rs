use crate::app::error::App;
use log::{error, info, warn};
use mp3player::{ControlMessage, PlayerError, QueueHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

const HELP: &str = "commands: play <file> | stop | + | - | quit | {\"command\":N,\"file_path\":..}";

#[derive(Debug, PartialEq)]
pub enum Input {
    Message(ControlMessage),
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> Result<Option<Input>, App> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line.starts_with('{') {
        let msg: ControlMessage = serde_json::from_str(line)?;
        return Ok(Some(Input::Message(msg)));
    }

    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(word, rest)| (word, rest.trim()));
    let input = match word {
        "play" | "p" if !rest.is_empty() => Input::Message(ControlMessage::play_file(rest)),
        "stop" | "s" => Input::Message(ControlMessage::stop()),
        "+" | "up" | "vol+" => Input::Message(ControlMessage::volume_up()),
        "-" | "down" | "vol-" => Input::Message(ControlMessage::volume_down()),
        "quit" | "exit" | "q" => Input::Quit,
        _ => Input::Help,
    };
    Ok(Some(input))
}

/// Reads commands from stdin and forwards them to the player queue until
/// `quit` or end of input.
pub async fn run_console(queue: QueueHandle, stop_signal: watch::Sender<()>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Console read error: {}", e);
                break;
            }
        };

        match parse_line(&line) {
            Ok(Some(Input::Message(msg))) => match queue.try_enqueue(msg) {
                Ok(()) => {}
                Err(PlayerError::QueueFull) => warn!("Player busy, command dropped"),
                Err(e) => {
                    error!("Failed to send command: {}", e);
                    break;
                }
            },
            Ok(Some(Input::Help)) => println!("{HELP}"),
            Ok(Some(Input::Quit)) => break,
            Ok(None) => {}
            Err(e) => warn!("Invalid message: {}", e),
        }
    }

    info!("Console closed");
    if let Err(e) = stop_signal.send(()) {
        error!("Console: Failed to send stop signal: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mp3player::PlayerCommand;

    fn parse(line: &str) -> Option<Input> {
        parse_line(line).unwrap()
    }

    #[test]
    fn parses_shorthand_commands() {
        assert_eq!(
            parse("play album/track 1.mp3"),
            Some(Input::Message(ControlMessage::play_file("album/track 1.mp3")))
        );
        assert_eq!(parse(" stop "), Some(Input::Message(ControlMessage::stop())));
        assert_eq!(parse("+"), Some(Input::Message(ControlMessage::volume_up())));
        assert_eq!(parse("-"), Some(Input::Message(ControlMessage::volume_down())));
        assert_eq!(parse("quit"), Some(Input::Quit));
        assert_eq!(parse(""), None);
    }

    #[test]
    fn play_without_file_shows_help() {
        assert_eq!(parse("play"), Some(Input::Help));
        assert_eq!(parse("rewind"), Some(Input::Help));
    }

    #[test]
    fn parses_wire_json() {
        let Some(Input::Message(msg)) = parse(r#"{"command":3}"#) else {
            panic!("expected a message");
        };
        assert_eq!(msg.command, PlayerCommand::VolumeUp);
        assert!(matches!(parse_line("{oops"), Err(App::Message(_))));
    }
}
