//! Console line parsing.

use clawlink::prelude::{ArmSide, Direction};

pub(crate) const HELP: &str = "\
commands:
  enter <machine>   enter a machine's room
  exit              leave the current room
  start             start a round
  up|down|left|right|grab
  arm left|right    drive an auxiliary arm
  say <text>        chat with roommates
  status            show connection status
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Input {
    Enter(String),
    Exit,
    Start,
    Move(Direction),
    Arm(ArmSide),
    Say(String),
    Status,
    Help,
    Quit,
}

/// Parses one console line. Blank lines yield `Ok(None)`.
pub(crate) fn parse(line: &str) -> Result<Option<Input>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let input = match word.to_ascii_lowercase().as_str() {
        "enter" if !rest.is_empty() => Input::Enter(rest.to_string()),
        "enter" => return Err("usage: enter <machine>".into()),
        "exit" => Input::Exit,
        "start" => Input::Start,
        "up" => Input::Move(Direction::Up),
        "down" => Input::Move(Direction::Down),
        "left" => Input::Move(Direction::Left),
        "right" => Input::Move(Direction::Right),
        "grab" => Input::Move(Direction::Grab),
        "arm" => match rest.to_ascii_lowercase().as_str() {
            "left" => Input::Arm(ArmSide::Left),
            "right" => Input::Arm(ArmSide::Right),
            _ => return Err("usage: arm left|right".into()),
        },
        "say" if !rest.is_empty() => Input::Say(rest.to_string()),
        "say" => return Err("usage: say <text>".into()),
        "status" => Input::Status,
        "help" | "?" => Input::Help,
        "quit" | "q" => Input::Quit,
        other => return Err(format!("unknown command `{other}` (try `help`)")),
    };
    Ok(Some(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line_is_ignored() {
        assert_eq!(parse("   "), Ok(None));
    }

    #[test]
    fn test_moves() {
        assert_eq!(parse("grab"), Ok(Some(Input::Move(Direction::Grab))));
        assert_eq!(parse("  LEFT "), Ok(Some(Input::Move(Direction::Left))));
    }

    #[test]
    fn test_enter_needs_machine() {
        assert_eq!(parse("enter M42"), Ok(Some(Input::Enter("M42".into()))));
        assert!(parse("enter").is_err());
    }

    #[test]
    fn test_say_keeps_whole_text() {
        assert_eq!(
            parse("say nice grab, well done"),
            Ok(Some(Input::Say("nice grab, well done".into())))
        );
    }

    #[test]
    fn test_arm_side() {
        assert_eq!(parse("arm right"), Ok(Some(Input::Arm(ArmSide::Right))));
        assert!(parse("arm up").is_err());
    }

    #[test]
    fn test_unknown_command() {
        let err = parse("dance").unwrap_err();
        assert!(err.contains("dance"));
    }
}
