use tokio::io::{ AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt };
use log::debug;

use super::palette::{ prompt_category, CommandPalette, PROMPT_CATEGORIES };
use super::render::Renderer;
use super::session::{ ChatSession, Key, KeyAction, SendOutcome };
use super::transport::ChatTransport;

const HELP: &str = "Type a message and press Enter. Start with / for commands.
  :search     toggle web search
  :research   toggle deep research
  :reason     toggle reasoning
  :attach     attach a placeholder file
  :detach N   remove attachment N
  :suggest [CATEGORY [N]]
              list or pick a starter prompt (learn, code, write)
  :quit       leave";

enum Meta {
    Quit,
    Help,
    Search,
    Research,
    Reason,
    Attach,
    Detach(Option<usize>),
    Suggest(Option<String>, Option<usize>),
    Unknown(String),
}

fn parse_meta(line: &str) -> Option<Meta> {
    let rest = line.trim().strip_prefix(':')?;
    let mut parts = rest.split_whitespace();
    let meta = match parts.next().unwrap_or_default() {
        "q" | "quit" | "exit" => Meta::Quit,
        "help" | "h" => Meta::Help,
        "search" => Meta::Search,
        "research" => Meta::Research,
        "reason" => Meta::Reason,
        "attach" => Meta::Attach,
        "detach" => Meta::Detach(parts.next().and_then(|n| n.parse::<usize>().ok())),
        "suggest" => Meta::Suggest(
            parts.next().map(str::to_string),
            parts.next().and_then(|n| n.parse::<usize>().ok()),
        ),
        other => Meta::Unknown(other.to_string()),
    };
    Some(meta)
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

/// Line-oriented chat loop. Each input line is appended to the composer, so a
/// completed slash command (`/clone `) is continued by the next line.
pub async fn run_repl<R, W, T>(
    session: &mut ChatSession,
    transport: &T,
    renderer: Renderer,
    reader: R,
    mut out: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    T: ChatTransport + ?Sized,
{
    let mut lines = reader.lines();
    out.write_all(b"How can I help today?\n(:help for commands)\n").await?;

    loop {
        out.write_all(format!("\n› {}", session.input()).as_bytes()).await?;
        out.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim_end_matches('\r');

        if let Some(meta) = parse_meta(line) {
            let reply = match meta {
                Meta::Quit => break,
                Meta::Help => HELP.to_string(),
                Meta::Search => format!("search {}", on_off(session.toggle_search())),
                Meta::Research => format!("deep research {}", on_off(session.toggle_deep_research())),
                Meta::Reason => format!("reason {}", on_off(session.toggle_reason())),
                Meta::Attach => format!("attached {}", session.attach_file()),
                Meta::Detach(Some(n)) if n >= 1 => match session.remove_attachment(n - 1) {
                    Some(name) => format!("removed {}", name),
                    None => format!("no attachment {}", n),
                },
                Meta::Detach(_) => "usage: :detach N".to_string(),
                Meta::Suggest(None, _) => {
                    let names: Vec<&str> = PROMPT_CATEGORIES.iter().map(|c| c.name).collect();
                    format!("categories: {}", names.join(", "))
                }
                Meta::Suggest(Some(name), pick) => match (prompt_category(&name), pick) {
                    (None, _) => format!("no category {}", name),
                    (Some(category), Some(n)) if (1..=category.prompts.len()).contains(&n) => {
                        session.set_input(category.prompts[n - 1]);
                        "input set; press Enter to send".to_string()
                    }
                    (Some(category), _) => category
                        .prompts
                        .iter()
                        .enumerate()
                        .map(|(i, prompt)| format!("  {}. {}", i + 1, prompt))
                        .collect::<Vec<_>>()
                        .join("\n"),
                },
                Meta::Unknown(cmd) => format!("unknown command :{}", cmd),
            };
            out.write_all(format!("{}\n", reply).as_bytes()).await?;
            continue;
        }

        let composed = format!("{}{}", session.input(), line);
        session.set_input(composed);

        if session.palette().is_visible() {
            let typed = session.input().to_string();
            for (_, cmd) in CommandPalette::matches(&typed) {
                out.write_all(format!("  {:<10} {} - {}\n", cmd.prefix, cmd.label, cmd.description).as_bytes()).await?;
            }
            session.handle_key(Key::Tab);
            match session.recent_command() {
                Some(label) if !session.palette().is_visible() => {
                    out.write_all(format!("{} selected\n", label).as_bytes()).await?;
                }
                _ => {
                    out.write_all(format!("no command matches {}\n", typed).as_bytes()).await?;
                    session.set_input(String::new());
                }
            }
            continue;
        }

        if session.handle_key(Key::Enter { shift: false }) != KeyAction::Send {
            continue;
        }

        debug!("Sending {} chars", session.input().trim().len());
        out.write_all(b"...\n").await?;
        out.flush().await?;

        match session.send_message(transport).await {
            Ok(outcome) => {
                if let Some(last) = session.transcript().last() {
                    let body = renderer.render_message(last);
                    out.write_all(format!("{}\n", body).as_bytes()).await?;
                }
                if outcome == SendOutcome::Failed {
                    out.write_all(b"(request failed)\n").await?;
                }
                session.clear_recent_command();
            }
            Err(e) => {
                out.write_all(format!("{}\n", e).as_bytes()).await?;
            }
        }
    }

    out.write_all(b"\n").await?;
    out.flush().await
}
