use std::path::PathBuf;

/// One line typed into an interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Dictation(String),
    Photo(PathBuf),                         // attach to the next turn
    WorkplacePhoto { name: String, path: PathBuf },
    Report,
    Reset,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_line(line: &str) -> ConsoleCommand {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleCommand::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ConsoleCommand::Dictation(line.to_string());
    };
    let (cmd, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let args = args.trim();
    match cmd {
        "photo" | "foto" if !args.is_empty() => ConsoleCommand::Photo(PathBuf::from(args)),
        "workplace-photo" | "foto-luogo" => match split_name_and_path(args) {
            Some((name, path)) => ConsoleCommand::WorkplacePhoto { name, path },
            None => ConsoleCommand::Unknown(line.to_string()),
        },
        "report" => ConsoleCommand::Report,
        "reset" | "svuota" => ConsoleCommand::Reset,
        "quit" | "exit" => ConsoleCommand::Quit,
        _ => ConsoleCommand::Unknown(line.to_string()),
    }
}

/// `"Area di scavo" foto.jpg` or `Magazzino foto.jpg`; the path is the last word.
fn split_name_and_path(args: &str) -> Option<(String, PathBuf)> {
    let (name, path) = args.rsplit_once(char::is_whitespace)?;
    let name = name.trim().trim_matches('"').trim();
    if name.is_empty() || path.is_empty() {
        return None;
    }
    Some((name.to_string(), PathBuf::from(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_dictation() {
        assert_eq!(
            parse_line("  Iniziamo il sopralluogo in officina "),
            ConsoleCommand::Dictation("Iniziamo il sopralluogo in officina".into())
        );
        assert_eq!(parse_line("   "), ConsoleCommand::Empty);
    }

    #[test]
    fn slash_commands() {
        assert_eq!(parse_line("/photo img/quadro.jpg"), ConsoleCommand::Photo("img/quadro.jpg".into()));
        assert_eq!(parse_line("/reset"), ConsoleCommand::Reset);
        assert_eq!(parse_line("/quit"), ConsoleCommand::Quit);
        assert_eq!(parse_line("/report"), ConsoleCommand::Report);
        assert!(matches!(parse_line("/photo"), ConsoleCommand::Unknown(_)));
        assert!(matches!(parse_line("/boh"), ConsoleCommand::Unknown(_)));
    }

    #[test]
    fn workplace_photo_takes_multiword_names() {
        assert_eq!(
            parse_line(r#"/workplace-photo "Area di scavo" scavo.png"#),
            ConsoleCommand::WorkplacePhoto { name: "Area di scavo".into(), path: "scavo.png".into() }
        );
        assert_eq!(
            parse_line("/workplace-photo Magazzino m.jpg"),
            ConsoleCommand::WorkplacePhoto { name: "Magazzino".into(), path: "m.jpg".into() }
        );
        assert!(matches!(parse_line("/workplace-photo solo.jpg"), ConsoleCommand::Unknown(_)));
    }
}
