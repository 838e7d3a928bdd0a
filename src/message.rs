//! Line protocol definitions
//!
//! Newline-delimited UTF-8 text in both directions. Inbound lines are
//! classified into a `Command`; outbound text is either a stamped roster
//! line (`[addr]name:body`) or a `Reply` addressed to a single participant.

use std::fmt;

use crate::error::CommandError;

/// Presence query
pub const WHO: &str = "who";
/// Rename request prefix
pub const RENAME_PREFIX: &str = "rename|";
/// Directed message prefix
pub const DIRECT_PREFIX: &str = "to|";

/// Longest accepted inbound line, terminator included
pub const MAX_LINE_LENGTH: usize = 4096;

/// Join notice body
pub const ONLINE: &str = "已上线";
/// Leave notice body (peer closed the stream)
pub const OFFLINE: &str = "已下线";
/// Leave notice body (read failure)
pub const DROPPED: &str = "下线";
/// Roster entry body for `who`
pub const LISTED: &str = "当前在线...";

/// Client → Server command
///
/// Prefixes are case-sensitive. Anything unrecognised is public chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// List the roster to the sender only
    Who,
    /// Change the sender's display name
    Rename { new_name: &'a str },
    /// Directed message; fields are checked by `check_recipient` and `check_content`
    Direct { target: &'a str, content: &'a str },
    /// Public broadcast
    Chat(&'a str),
}

impl<'a> Command<'a> {
    /// Classify a line that already had its terminator stripped
    pub fn parse(line: &'a str) -> Self {
        if line == WHO {
            return Command::Who;
        }

        if line.len() > RENAME_PREFIX.len() {
            if let Some(rest) = line.strip_prefix(RENAME_PREFIX) {
                let new_name = rest.split('|').next().unwrap_or_default();
                if !new_name.is_empty() {
                    return Command::Rename { new_name };
                }
                return Command::Chat(line);
            }
        }

        if line.len() > DIRECT_PREFIX.len() {
            if let Some(rest) = line.strip_prefix(DIRECT_PREFIX) {
                let (target, content) = rest.split_once('|').unwrap_or((rest, ""));
                return Command::Direct { target, content };
            }
        }

        Command::Chat(line)
    }
}

/// Validate a directed message's syntax before the recipient lookup
///
/// The lookup itself (`UnknownRecipient`) sits between these two checks,
/// so this only reports the missing-recipient case; empty content is
/// reported by `check_content` once the recipient is known to exist.
pub fn check_recipient(target: &str) -> Result<(), CommandError> {
    if target.is_empty() {
        return Err(CommandError::MissingRecipient);
    }
    Ok(())
}

/// Reject directed messages without content
pub fn check_content(content: &str) -> Result<(), CommandError> {
    if content.is_empty() {
        return Err(CommandError::EmptyContent);
    }
    Ok(())
}

/// Decode one inbound unit
///
/// Strips exactly one trailing `\n` and decodes the rest as UTF-8,
/// replacing invalid sequences.
pub fn decode_line(raw: &[u8]) -> String {
    let body = raw.strip_suffix(b"\n").unwrap_or(raw);
    String::from_utf8_lossy(body).into_owned()
}

/// Format a roster-scoped line: `[addr]name:body`
pub fn stamped(addr: &str, name: &str, body: &str) -> String {
    format!("[{}]{}:{}", addr, name, body)
}

/// Server → single participant text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// One `who` result line
    RosterEntry { addr: String, name: String },
    /// Rename succeeded
    Renamed { name: String },
    /// Rename (or join) collided with an existing name
    NameTaken,
    /// `to|` without a recipient
    BadDirectFormat,
    /// `to|` recipient not registered
    UnknownRecipient,
    /// `to|` without content
    EmptyContent,
    /// Directed message body as seen by the recipient
    Whisper { from: String, content: String },
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::RosterEntry { addr, name } => f.write_str(&stamped(addr, name, LISTED)),
            Reply::Renamed { name } => write!(f, "您已更新用户名为：{}", name),
            Reply::NameTaken => f.write_str("当前用户名已被使用！"),
            Reply::BadDirectFormat => {
                f.write_str("消息格式不正确，请使用\"to|对方用户名|消息内容\"格式。")
            }
            Reply::UnknownRecipient => f.write_str("该用户名不存在！"),
            Reply::EmptyContent => f.write_str("消息内容为空！请重新输入！"),
            Reply::Whisper { from, content } => write!(f, "{}对您说：{}", from, content),
        }
    }
}

/// Convert CommandError to Reply for sender notification
impl From<CommandError> for Reply {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::NameTaken => Reply::NameTaken,
            CommandError::MissingRecipient => Reply::BadDirectFormat,
            CommandError::UnknownRecipient => Reply::UnknownRecipient,
            CommandError::EmptyContent => Reply::EmptyContent,
        }
    }
}
