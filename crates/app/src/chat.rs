//! Line-oriented chat loop with live rendering of streamed replies.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use chat_host::{ChatSession, ChatTurnController, TurnInput, TurnOutcome};
use shared::chat::{ChatMessage, ChatModeConfig, GeoLocation, ImageAttachment, MessageId, Role};
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::unbounded_channel;

const HELP: &str = "Commands: /think /search /maps toggle modes, /image <path> attaches an image to the next message, /quit exits.";

#[derive(Debug, PartialEq)]
enum Command<'a> {
    Quit,
    Help,
    Think,
    Search,
    Maps,
    Image(&'a str),
    Send(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let line = line.trim();
    match line {
        "/quit" | "/exit" => Command::Quit,
        "/help" => Command::Help,
        "/think" => Command::Think,
        "/search" => Command::Search,
        "/maps" => Command::Maps,
        _ => match line.strip_prefix("/image ") {
            Some(path) => Command::Image(path.trim()),
            None => Command::Send(line),
        },
    }
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

fn load_image(path: &Path) -> Result<ImageAttachment> {
    let mime_type = mime_for(path)
        .with_context(|| format!("unsupported image type: {}", path.display()))?;
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(ImageAttachment {
        data: B64.encode(bytes),
        mime_type: mime_type.to_string(),
    })
}

/// Prints the growing tail of the reply being streamed.
#[derive(Default)]
struct ReplyPrinter {
    current: Option<MessageId>,
    printed: String,
}

impl ReplyPrinter {
    fn render(&mut self, snapshot: &[ChatMessage]) {
        let Some(reply) = snapshot.last().filter(|m| m.role == Role::Model) else {
            return;
        };
        let mut out = std::io::stdout().lock();
        if self.current != Some(reply.id) {
            self.current = Some(reply.id);
            self.printed.clear();
            let _ = write!(out, "drip> ");
        }
        match reply.text.strip_prefix(self.printed.as_str()) {
            Some(tail) => {
                let _ = write!(out, "{}", tail);
            }
            // text was replaced rather than extended
            None => {
                let _ = write!(out, "\n{}", reply.text);
            }
        }
        self.printed.clone_from(&reply.text);
        let _ = out.flush();
    }

    fn finish(&mut self, reply: Option<&ChatMessage>) {
        println!();
        if let Some(reply) = reply {
            for (i, source) in reply.sources.iter().enumerate() {
                println!("  [{}] {} <{}>", i + 1, source.label(), source.uri);
            }
        }
    }
}

fn describe_mode(mode: &ChatModeConfig) -> String {
    let on = |flag: bool| if flag { "on" } else { "off" };
    format!(
        "thinking {}, search {}, maps {}",
        on(mode.use_thinking),
        on(mode.use_search),
        on(mode.use_maps)
    )
}

pub async fn run_chat(controller: ChatTurnController, location: Option<GeoLocation>) -> Result<()> {
    let (tx, mut rx) = unbounded_channel();
    let mut session = ChatSession::with_observer(tx);
    let mut mode = ChatModeConfig {
        location,
        ..ChatModeConfig::default()
    };
    let mut pending_image: Option<ImageAttachment> = None;
    let mut printer = ReplyPrinter::default();

    println!("Hi! Ask me anything about today's news. {}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("you> ");
        let _ = std::io::stdout().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let text = match parse_command(&line) {
            Command::Quit => break,
            Command::Help => {
                println!("{}", HELP);
                continue;
            }
            Command::Think => {
                mode.use_thinking = !mode.use_thinking;
                println!("({})", describe_mode(&mode));
                continue;
            }
            Command::Search => {
                mode.use_search = !mode.use_search;
                println!("({})", describe_mode(&mode));
                continue;
            }
            Command::Maps => {
                mode.use_maps = !mode.use_maps;
                if mode.use_maps && mode.location.is_none() {
                    println!("(no location set; maps results will not be local)");
                }
                println!("({})", describe_mode(&mode));
                continue;
            }
            Command::Image(path) => {
                match load_image(Path::new(path)) {
                    Ok(image) => {
                        println!("(image attached: {})", path);
                        pending_image = Some(image);
                    }
                    Err(err) => println!("(could not attach image: {:#})", err),
                }
                continue;
            }
            Command::Send(text) => text.to_string(),
        };

        let input = TurnInput {
            text,
            image: pending_image.take(),
        };
        let outcome = {
            let turn = controller.send(&mut session, input, &mode);
            tokio::pin!(turn);
            loop {
                tokio::select! {
                    outcome = &mut turn => break outcome,
                    Some(snapshot) = rx.recv() => printer.render(&snapshot),
                }
            }
        };
        while let Ok(snapshot) = rx.try_recv() {
            printer.render(&snapshot);
        }

        match outcome {
            TurnOutcome::Skipped => {}
            TurnOutcome::Completed { message_id } | TurnOutcome::Failed { message_id } => {
                printer.finish(session.get(message_id));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("/quit"), Command::Quit);
        assert_eq!(parse_command("  /think "), Command::Think);
        assert_eq!(parse_command("/image ~/cup.png"), Command::Image("~/cup.png"));
        assert_eq!(parse_command("what's new?"), Command::Send("what's new?"));
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_for(Path::new("a/B.JPG")), Some("image/jpeg"));
        assert_eq!(mime_for(Path::new("notes.txt")), None);
        assert_eq!(mime_for(Path::new("noext")), None);
    }

    #[test]
    fn test_load_image_encodes_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("dot.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        let image = load_image(&path).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "iVBORw==");
    }
}
