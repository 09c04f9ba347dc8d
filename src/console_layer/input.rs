/*
 * Parses one line of user input into the events it stands for. Item commands
 * accept several numbers at once (`t 3 5 8`), producing one event per number.
 */
use super::types::{AppEvent, TreeItemId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    UnknownCommand(String),
    MissingItem(&'static str),
    InvalidItem(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnknownCommand(c) => {
                write!(f, "Unknown command '{c}'. Type 'help' for a list of commands.")
            }
            ParseError::MissingItem(c) => write!(f, "'{c}' needs at least one item number."),
            ParseError::InvalidItem(s) => write!(f, "'{s}' is not a valid item number."),
        }
    }
}

impl std::error::Error for ParseError {}

fn parse_items(
    command: &'static str,
    args: &str,
    make: fn(TreeItemId) -> AppEvent,
) -> Result<Vec<AppEvent>, ParseError> {
    let mut events = Vec::new();
    for token in args.split([' ', ',']).filter(|t| !t.is_empty()) {
        let id = token
            .parse::<u64>()
            .map_err(|_| ParseError::InvalidItem(token.to_string()))?;
        events.push(make(TreeItemId(id)));
    }
    if events.is_empty() {
        return Err(ParseError::MissingItem(command));
    }
    Ok(events)
}

// An empty line yields no events.
pub fn parse_line(line: &str) -> Result<Vec<AppEvent>, ParseError> {
    let line = line.trim();
    let (command, args) = match line.split_once(char::is_whitespace) {
        Some((command, args)) => (command, args.trim()),
        None => (line, ""),
    };
    let event = match command.to_lowercase().as_str() {
        "" => return Ok(Vec::new()),
        "t" | "toggle" => return parse_items("toggle", args, AppEvent::Toggle),
        "a" | "all" => return parse_items("all", args, AppEvent::SelectAllUnder),
        "n" | "none" => return parse_items("none", args, AppEvent::DeselectAllUnder),
        "c" | "clear" => AppEvent::ClearSelection,
        "l" | "ls" | "tree" => AppEvent::ShowTree,
        "r" | "rescan" => AppEvent::Rescan,
        "p" | "preview" => AppEvent::Preview,
        "e" | "export" => AppEvent::Export,
        "f" | "filter" => AppEvent::Filter((!args.is_empty()).then(|| args.to_string())),
        "files" => AppEvent::ToggleShowFiles,
        "h" | "help" | "?" => AppEvent::Help,
        "q" | "quit" | "exit" => AppEvent::Quit,
        _ => return Err(ParseError::UnknownCommand(command.to_string())),
    };
    Ok(vec![event])
}

pub const HELP_TEXT: &str = "\
Commands:
  t, toggle <n>...   toggle a file, or every text file in a directory
  a, all <n>...      select every text file at or below an item
  n, none <n>...     deselect every file at or below an item
  c, clear           deselect everything
  l, ls, tree        show the tree again
  f, filter [text]   show only entries whose name contains text (no text clears)
  files              show or hide files in the tree
  p, preview         show statistics for the current selection
  e, export          export the selection in the background
  r, rescan          scan the directory again
  h, help            show this help
  q, quit            leave (waits for a running export)
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_commands_accept_several_numbers() {
        assert_eq!(
            parse_line("t 3 5,8"),
            Ok(vec![
                AppEvent::Toggle(TreeItemId(3)),
                AppEvent::Toggle(TreeItemId(5)),
                AppEvent::Toggle(TreeItemId(8)),
            ])
        );
        assert_eq!(
            parse_line("  ALL 2 "),
            Ok(vec![AppEvent::SelectAllUnder(TreeItemId(2))])
        );
        assert_eq!(
            parse_line("none 4"),
            Ok(vec![AppEvent::DeselectAllUnder(TreeItemId(4))])
        );
    }

    #[test]
    fn test_item_command_errors() {
        assert_eq!(parse_line("t"), Err(ParseError::MissingItem("toggle")));
        assert_eq!(
            parse_line("t 3 x"),
            Err(ParseError::InvalidItem("x".to_string()))
        );
        assert_eq!(
            parse_line("a -1"),
            Err(ParseError::InvalidItem("-1".to_string()))
        );
    }

    #[test]
    fn test_filter_keeps_inner_spaces_and_clears_when_empty() {
        assert_eq!(
            parse_line("f  my file "),
            Ok(vec![AppEvent::Filter(Some("my file".to_string()))])
        );
        assert_eq!(parse_line("filter"), Ok(vec![AppEvent::Filter(None)]));
    }

    #[test]
    fn test_simple_commands_and_empty_line() {
        assert_eq!(parse_line(""), Ok(vec![]));
        assert_eq!(parse_line("   "), Ok(vec![]));
        assert_eq!(parse_line("e"), Ok(vec![AppEvent::Export]));
        assert_eq!(parse_line("Quit"), Ok(vec![AppEvent::Quit]));
        assert_eq!(parse_line("?"), Ok(vec![AppEvent::Help]));
        assert_eq!(parse_line("files"), Ok(vec![AppEvent::ToggleShowFiles]));
    }

    #[test]
    fn test_unknown_command() {
        let err = parse_line("frobnicate 3").unwrap_err();
        assert_eq!(err, ParseError::UnknownCommand("frobnicate".to_string()));
        assert!(err.to_string().contains("help"));
    }
}
