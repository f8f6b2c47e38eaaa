//! Chat commands handled by the tracker.
//!
//! Command dispatch and authorization happen outside; the tracker receives
//! a parsed [`Command`] together with a [`CommandRequest`].

use std::str::FromStr;

use chrono::TimeDelta;

use crate::Error;

/// Requested follower-notification setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl FromStr for Toggle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("on") {
            Ok(Toggle::On)
        } else if s.eq_ignore_ascii_case("off") {
            Ok(Toggle::Off)
        } else {
            Err(Error::validation(format!("expected on or off, got {s:?}")))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `fnotify <arg>`; the raw argument is kept so unknown values can be ignored.
    FollowNotify(Option<String>),
    Uptime,
    Vod,
}

impl Command {
    /// Parse `name [arg]` without the control prefix.
    pub fn parse(name: &str, arg: Option<&str>) -> Option<Self> {
        let arg = arg.map(str::trim).filter(|a| !a.is_empty());
        match name.to_ascii_lowercase().as_str() {
            "fnotify" => Some(Command::FollowNotify(arg.map(str::to_string))),
            "uptime" => Some(Command::Uptime),
            "vod" => Some(Command::Vod),
            _ => None,
        }
    }

    pub fn requires_admin(&self) -> bool {
        matches!(self, Command::FollowNotify(_))
    }
}

/// Who asked, where, and whether they may administer that channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub channel: String,
    pub requester: String,
    pub is_admin: bool,
}

impl CommandRequest {
    pub fn new(channel: impl Into<String>, requester: impl Into<String>, is_admin: bool) -> Self {
        Self {
            channel: channel.into(),
            requester: requester.into(),
            is_admin,
        }
    }

    /// Prefix `text` with the requester's name.
    pub fn reply(&self, text: impl AsRef<str>) -> String {
        format!("{}: {}", self.requester, text.as_ref())
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// `H hour(s), M minute(s).`, with hours only past the first hour.
pub fn format_uptime(uptime: TimeDelta) -> String {
    let mut minutes = uptime.num_minutes().max(0);
    let mut out = String::new();
    if minutes > 60 {
        let hours = minutes / 60;
        out.push_str(&format!("{} hour{}, ", hours, plural(hours)));
        minutes %= 60;
    }
    out.push_str(&format!("{} minute{}.", minutes, plural(minutes)));
    out
}
