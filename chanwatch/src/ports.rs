//! Capabilities the host provides to the tracker.

use std::collections::HashSet;

use async_trait::async_trait;
use twitch_api::channel_login;

/// Outgoing chat messages.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send_message(&self, channel: &str, text: &str);
}

/// Global administrator lookup.
pub trait AdminCheck: Send + Sync {
    fn is_admin(&self, name: &str) -> bool;
}

/// No configured authority; nobody is a global admin.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAdmins;

impl AdminCheck for NoAdmins {
    fn is_admin(&self, _name: &str) -> bool {
        false
    }
}

/// Fixed admin list, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct StaticAdmins {
    names: HashSet<String>,
}

impl StaticAdmins {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().to_lowercase())
                .collect(),
        }
    }
}

impl AdminCheck for StaticAdmins {
    fn is_admin(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }
}

/// A requester may administer a channel they own or when they are a global admin.
pub fn is_channel_admin(admins: &dyn AdminCheck, channel: &str, requester: &str) -> bool {
    channel_login(channel).eq_ignore_ascii_case(requester) || admins.is_admin(requester)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_is_admin_without_authority() {
        assert!(is_channel_admin(&NoAdmins, "#SomeStreamer", "somestreamer"));
        assert!(!is_channel_admin(&NoAdmins, "#somestreamer", "viewer"));
    }

    #[test]
    fn test_static_admins() {
        let admins = StaticAdmins::new(["Operator"]);
        assert!(is_channel_admin(&admins, "#somestreamer", "operator"));
        assert!(!is_channel_admin(&admins, "#somestreamer", "viewer"));
    }
}
