//! Terminal input parsing
//!
//! A plain line is sent after whatever dictation left in the buffer; an empty
//! line sends the dictated text alone. Lines starting with `/` are commands.

use crate::runtime::Command;

pub const HELP: &str = "\
Escribe un mensaje y pulsa Enter para enviarlo (se añade al texto dictado). Una línea vacía envía solo el texto dictado.
  /voice                       activar o detener el dictado
  /stop                        detener el dictado
  /new                         nueva conversación
  /history [texto]             conversaciones anteriores
  /open <id>                   abrir una conversación
  /delete <id>                 eliminar una conversación
  /feedback <id> <1-5> [texto] calificar una respuesta
  /suggest [n]                 ver sugerencias o enviar la número n
  /quit                        salir";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Commands(Vec<Command>),
    ShowHistory { query: Option<String> },
    ShowSuggestions,
    /// 1-based index into the current suggestions
    SendSuggestion(usize),
    Help,
    Quit,
    Usage(&'static str),
}

pub fn parse_line(line: &str) -> Action {
    let line = line.trim_end_matches(['\r', '\n']);

    let Some(rest) = line.trim_start().strip_prefix('/') else {
        if line.trim().is_empty() {
            return Action::Commands(vec![Command::Submit]);
        }
        return Action::Commands(vec![Command::SubmitLine(line.to_string())]);
    };

    let (name, args) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(name, args)| (name, args.trim()));

    match name {
        "voice" => Action::Commands(vec![Command::ToggleVoice]),
        "stop" => Action::Commands(vec![Command::StopVoice]),
        "new" => Action::Commands(vec![Command::NewConversation]),
        "history" => Action::ShowHistory {
            query: (!args.is_empty()).then(|| args.to_string()),
        },
        "open" => match single_arg(args) {
            Some(id) => Action::Commands(vec![Command::LoadConversation(id)]),
            None => Action::Usage("/open <id>"),
        },
        "delete" => match single_arg(args) {
            Some(id) => Action::Commands(vec![Command::DeleteConversation(id)]),
            None => Action::Usage("/delete <id>"),
        },
        "feedback" => parse_feedback(args),
        "suggest" if args.is_empty() => Action::ShowSuggestions,
        "suggest" => match args.parse::<usize>() {
            Ok(n) if n > 0 => Action::SendSuggestion(n),
            _ => Action::Usage("/suggest [n]"),
        },
        "quit" | "exit" => Action::Quit,
        _ => Action::Help,
    }
}

fn single_arg(args: &str) -> Option<String> {
    let mut parts = args.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(arg), None) => Some(arg.to_string()),
        _ => None,
    }
}

fn parse_feedback(args: &str) -> Action {
    const USAGE: &str = "/feedback <id> <1-5> [comentario]";

    let mut parts = args.splitn(3, char::is_whitespace);
    let (Some(message_id), Some(rating)) = (parts.next(), parts.next()) else {
        return Action::Usage(USAGE);
    };
    if message_id.is_empty() {
        return Action::Usage(USAGE);
    }
    // Range is checked by the session, which owns the user-facing message
    let Ok(rating) = rating.parse::<u8>() else {
        return Action::Usage(USAGE);
    };

    Action::Commands(vec![Command::Feedback {
        message_id: message_id.to_string(),
        rating,
        comment: parts.next().unwrap_or_default().trim().to_string(),
    }])
}
