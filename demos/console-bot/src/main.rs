//! Runs the tournament bot against an in-memory guild driven from stdin.
//!
//! Member 100 is a guild administrator; members 101 to 112 are regular
//! members. Everything the bot posts or reacts with is echoed back.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tourney::prelude::*;
use tourney_platform::{ResourceHandle, ResourceKind};

const BOT: MemberId = MemberId(1);
const GUILD: GuildId = GuildId(1);
const CONFIG_PATH: &str = "tourney.toml";
/// Where lines go before the operations channel exists.
const FALLBACK_CHANNEL: &str = "general";

const HELP: &str = "\
<member> <text>        post <text> in the operations channel as <member>
dm <member> <text>     send <text> to the bot privately
voice <member> <room>  connect <member> to a voice room by name
leave <member>         disconnect <member> from voice
help                   show this text
Ctrl-D                 stop";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = if Path::new(CONFIG_PATH).exists() {
        BotConfig::load(CONFIG_PATH)?
    } else {
        tracing::warn!(path = CONFIG_PATH, "config file not found, using defaults");
        BotConfig::default()
    };

    let platform = Arc::new(seed());
    match config.roster.path.clone() {
        Some(path) => serve(config, platform, JsonFileRoster::new(path)).await,
        None => serve(config, platform, MemoryRoster::new()).await,
    }
}

fn seed() -> MemoryPlatform {
    let platform = MemoryPlatform::new(BOT, GUILD);
    platform.add_admin(MemberId(100));
    for id in 101..=112 {
        platform.add_member(MemberId(id));
    }
    platform.add_text_channel(FALLBACK_CHANNEL);
    platform.add_room("Lounge", None);
    platform.add_room("Game Night", Some("Code Names"));
    platform
}

async fn serve<R: RosterStore>(
    config: BotConfig,
    platform: Arc<MemoryPlatform>,
    roster: R,
) -> Result<(), Box<dyn std::error::Error>> {
    let chat = config.layout.chat.clone();
    let bot = TournamentBotBuilder::new()
        .config(config)
        .build(Arc::clone(&platform), roster);
    bot.start().await?;

    let (stop_tx, stop_rx) = oneshot::channel();
    let printer = tokio::spawn(print_outbox(Arc::clone(&platform), stop_rx));

    // A plain thread, so a pending stdin read never holds up shutdown.
    let (events_tx, events) = mpsc::channel(64);
    let driver = Arc::clone(&platform);
    std::thread::spawn(move || drive(&driver, &chat, events_tx));

    println!("{HELP}");
    bot.run(events).await;

    let _ = stop_tx.send(());
    printer.await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

fn drive(platform: &MemoryPlatform, chat: &str, events: mpsc::Sender<PlatformEvent>) {
    let mut next_id = 1;
    for line in std::io::stdin().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "failed to read stdin");
                break;
            }
        };
        let event = match parse_line(platform, chat, line.trim(), MessageId(next_id)) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(usage) => {
                eprintln!("{usage}");
                continue;
            }
        };
        next_id += 1;
        if events.blocking_send(event).is_err() {
            break;
        }
    }
}

/// Turns one input line into a platform event. Voice lines are applied
/// to the guild right away and reported as the matching event.
fn parse_line(
    platform: &MemoryPlatform,
    chat: &str,
    line: &str,
    id: MessageId,
) -> Result<Option<PlatformEvent>, String> {
    let (head, rest) = split(line);
    match head {
        "" => Ok(None),
        "help" => {
            println!("{HELP}");
            Ok(None)
        }
        "dm" => {
            let (member, text) = split(rest);
            let member = member_id(member)?;
            Ok(Some(message(id, member, Origin::Direct(member), text)))
        }
        "voice" => {
            let (member, room_name) = split(rest);
            let member = member_id(member)?;
            let room = channel(platform, ResourceKind::VoiceChannel, room_name)
                .ok_or_else(|| format!("no voice room named {room_name:?}"))?;
            let from = platform.room_of(member);
            platform.place(member, room);
            Ok(Some(PlatformEvent::VoiceMoved {
                member,
                from,
                to: Some(room),
            }))
        }
        "leave" => {
            let member = member_id(rest)?;
            let from = platform.room_of(member);
            platform.disconnect(member);
            Ok(Some(PlatformEvent::VoiceMoved { member, from, to: None }))
        }
        author => {
            let author = member_id(author)?;
            let origin = channel(platform, ResourceKind::TextChannel, chat)
                .or_else(|| channel(platform, ResourceKind::TextChannel, FALLBACK_CHANNEL))
                .map(Origin::Channel)
                .ok_or("no text channel to post in")?;
            Ok(Some(message(id, author, origin, rest)))
        }
    }
}

fn split(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim_start()),
        None => (line, ""),
    }
}

fn member_id(token: &str) -> Result<MemberId, String> {
    token
        .parse()
        .map(MemberId)
        .map_err(|_| format!("not a member id: {token:?} (try `help`)"))
}

fn channel(platform: &MemoryPlatform, kind: ResourceKind, name: &str) -> Option<ChannelId> {
    platform.lookup(kind, name).and_then(ResourceHandle::channel)
}

fn message(id: MessageId, author: MemberId, origin: Origin, content: &str) -> PlatformEvent {
    PlatformEvent::Message(InboundMessage {
        id,
        author,
        origin,
        content: content.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

async fn print_outbox(platform: Arc<MemoryPlatform>, mut stop: oneshot::Receiver<()>) {
    let mut tick = tokio::time::interval(Duration::from_millis(50));
    let (mut printed, mut reacted) = (0, 0);
    loop {
        let stopping = tokio::select! {
            _ = tick.tick() => false,
            _ = &mut stop => true,
        };

        let sent = platform.sent();
        for (to, content) in &sent[printed..] {
            println!("[{to}] {content}");
        }
        printed = sent.len();

        let reactions = platform.reactions();
        for (message, reaction) in &reactions[reacted..] {
            println!("[{message}] {}", reaction.emoji());
        }
        reacted = reactions.len();

        if stopping {
            break;
        }
    }
}
