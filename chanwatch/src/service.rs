//! Tracker service.
//!
//! The [`Tracker`] owns the channel registry and the pollers. Every entry
//! point runs to completion in the caller's task: the host calls
//! [`Tracker::tick`] periodically and [`Tracker::handle_command`] for chat
//! commands, and the tracker decides from its task table what is due.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use twitch_api::TwitchApi;

use crate::Result;
use crate::channel::{ChannelRegistry, ChannelState};
use crate::clock::{Clock, SystemClock};
use crate::commands::{Command, CommandRequest, Toggle, format_uptime};
use crate::config::TrackerConfig;
use crate::monitor::{
    FollowerNotification, FollowerPoller, TrackerEvent, TrackerEventBroadcaster, UptimePoller,
    VodResolver,
};
use crate::ports::{AdminCheck, MessageSink, NoAdmins, is_channel_admin};
use crate::scheduler::{TaskKind, TaskTable};
use crate::storage::ChannelListStore;

pub struct Tracker {
    registry: ChannelRegistry,
    uptime: UptimePoller,
    vod: VodResolver,
    followers: FollowerPoller,
    tasks: TaskTable,
    events: TrackerEventBroadcaster,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn MessageSink>,
    admins: Arc<dyn AdminCheck>,
    store: Arc<dyn ChannelListStore>,
    /// Notification set changed since the last save.
    dirty: bool,
}

impl Tracker {
    /// Create a tracker using the system clock and no global admins.
    pub fn new(
        api: Arc<dyn TwitchApi>,
        store: Arc<dyn ChannelListStore>,
        sink: Arc<dyn MessageSink>,
        config: TrackerConfig,
    ) -> Self {
        Self::with_clock(api, store, sink, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        api: Arc<dyn TwitchApi>,
        store: Arc<dyn ChannelListStore>,
        sink: Arc<dyn MessageSink>,
        config: TrackerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events = TrackerEventBroadcaster::new();
        let now = clock.now();

        let mut tasks = TaskTable::new();
        tasks.register(TaskKind::FollowerScan, config.follower_interval, now);
        tasks.register(TaskKind::Autosave, config.autosave_interval, now);

        Self {
            registry: ChannelRegistry::new(),
            uptime: UptimePoller::new(api.clone(), config.uptime_cache_window, events.clone()),
            vod: VodResolver::new(api.clone(), config.vod_page_size, events.clone()),
            followers: FollowerPoller::new(api, config.follower_page_size, events.clone()),
            tasks,
            events,
            clock,
            sink,
            admins: Arc::new(NoAdmins),
            store,
            dirty: false,
        }
    }

    /// Use `admins` for global admin lookups.
    pub fn with_admins(mut self, admins: Arc<dyn AdminCheck>) -> Self {
        self.admins = admins;
        self
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn channel(&self, channel: &str) -> Option<&ChannelState> {
        self.registry.get(channel)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    pub fn tasks(&self) -> &TaskTable {
        &self.tasks
    }

    // ========== Persistence ==========

    /// Enable notification for every persisted channel.
    pub async fn load(&mut self) -> Result<usize> {
        let channel_ids = self.store.load().await?;
        let now = self.clock.now();
        let count = self.registry.apply_notify_list(&channel_ids, now);
        info!("Loaded {} channels with follower notification", count);
        Ok(count)
    }

    /// Write the ids of opted-in channels, in registry order.
    pub async fn save(&mut self) -> Result<()> {
        let channel_ids = self.registry.notify_enabled_ids();
        self.store.save(&channel_ids).await?;
        self.dirty = false;
        self.tasks.mark_run(TaskKind::Autosave, self.clock.now());
        debug!(count = channel_ids.len(), "Saved notification list");
        Ok(())
    }

    /// Save if anything changed since the last save.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.dirty {
            self.save().await?;
        }
        Ok(())
    }

    // ========== Periodic work ==========

    /// Run whatever periodic work is due.
    ///
    /// Returns the follower notifications sent during this tick.
    pub async fn tick(&mut self) -> Vec<FollowerNotification> {
        let now = self.clock.now();
        let mut notifications = Vec::new();

        if !self.registry.is_empty() && self.tasks.is_due(TaskKind::FollowerScan, now) {
            notifications = self.run_follower_scan(now).await;
        }

        if self.dirty && self.tasks.is_due(TaskKind::Autosave, now) {
            if let Err(e) = self.save().await {
                warn!(error = %e, "Failed to save notification list");
                self.tasks.mark_run(TaskKind::Autosave, now);
            }
        }

        notifications
    }

    /// Scan followers now, regardless of the follower interval.
    pub async fn check_followers(&mut self) -> Vec<FollowerNotification> {
        let now = self.clock.now();
        self.run_follower_scan(now).await
    }

    async fn run_follower_scan(&mut self, now: DateTime<Utc>) -> Vec<FollowerNotification> {
        info!("Checking twitch followers...");
        let notifications = self
            .followers
            .run(&mut self.registry, &self.uptime, now)
            .await;
        self.tasks.mark_run(TaskKind::FollowerScan, now);

        for notification in &notifications {
            self.sink
                .send_message(&notification.channel, &notification.message())
                .await;
        }
        notifications
    }

    // ========== On-demand queries ==========

    /// Cached liveness of `channel`, refreshed when the cache window elapsed.
    pub async fn is_live(&mut self, channel: &str) -> bool {
        let now = self.clock.now();
        let state = self.registry.get_or_create(channel);
        self.uptime.is_live(channel, state, now).await
    }

    /// Current recording URL, if the channel is live and recording.
    pub async fn vod_url(&mut self, channel: &str) -> Option<String> {
        let now = self.clock.now();
        let state = self.registry.get_or_create(channel);
        if self.uptime.is_live(channel, state, now).await {
            self.vod.vod_url(channel, state, now).await
        } else {
            None
        }
    }

    // ========== Commands ==========

    /// Build a request, deciding admin rights from ownership and the admin port.
    pub fn request(&self, channel: &str, requester: &str) -> CommandRequest {
        let is_admin = is_channel_admin(self.admins.as_ref(), channel, requester);
        CommandRequest::new(channel, requester, is_admin)
    }

    /// Run a command and send its reply, if any, to the channel.
    pub async fn handle_command(
        &mut self,
        request: &CommandRequest,
        command: Command,
    ) -> Option<String> {
        if command.requires_admin() && !request.is_admin {
            debug!(
                channel = %request.channel,
                requester = %request.requester,
                ?command,
                "Command denied"
            );
            return None;
        }

        let reply = match command {
            Command::FollowNotify(arg) => self.follow_notify(request, arg.as_deref()),
            Command::Uptime => Some(self.uptime_reply(request).await),
            Command::Vod => self
                .vod_url(&request.channel)
                .await
                .map(|url| request.reply(url)),
        };

        if let Some(text) = &reply {
            self.sink.send_message(&request.channel, text).await;
        }
        reply
    }

    fn follow_notify(&mut self, request: &CommandRequest, arg: Option<&str>) -> Option<String> {
        let toggle = match arg?.parse::<Toggle>() {
            Ok(toggle) => toggle,
            Err(e) => {
                debug!(error = %e, "Ignoring fnotify argument");
                return None;
            }
        };

        let state = self.registry.get_or_create(&request.channel);
        let text = match (toggle, state.notify_enabled()) {
            (Toggle::Off, true) => {
                state.set_notify_enabled(false);
                self.dirty = true;
                "Disabled follow notifier."
            }
            (Toggle::Off, false) => "It's already disabled.",
            (Toggle::On, true) => "It's already enabled.",
            (Toggle::On, false) => {
                state.set_notify_enabled(true);
                self.dirty = true;
                "Enabled follow notifier."
            }
        };
        info!(channel = %request.channel, requester = %request.requester, "{}", text);
        Some(request.reply(text))
    }

    async fn uptime_reply(&mut self, request: &CommandRequest) -> String {
        let now = self.clock.now();
        let state = self.registry.get_or_create(&request.channel);
        if self.uptime.is_live(&request.channel, state, now).await
            && let Some(uptime) = state.uptime(now)
        {
            request.reply(format!(
                "The stream has been live for {}",
                format_uptime(uptime)
            ))
        } else {
            request.reply("The stream is not live.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryChannelStore;
    use crate::testing::{RecordingSink, ScriptedApi};
    use chrono::{TimeDelta, TimeZone};

    struct Harness {
        api: Arc<ScriptedApi>,
        clock: Arc<ManualClock>,
        sink: Arc<RecordingSink>,
        store: Arc<MemoryChannelStore>,
        tracker: Tracker,
    }

    fn harness() -> Harness {
        let api = Arc::new(ScriptedApi::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let sink = Arc::new(RecordingSink::new());
        let store = Arc::new(MemoryChannelStore::new());
        let tracker = Tracker::with_clock(
            api.clone(),
            store.clone(),
            sink.clone(),
            TrackerConfig::default(),
            clock.clone(),
        );
        Harness {
            api,
            clock,
            sink,
            store,
            tracker,
        }
    }

    #[tokio::test]
    async fn test_fnotify_toggle_replies() {
        let mut h = harness();
        let owner = h.tracker.request("#streamer", "Streamer");
        assert!(owner.is_admin);

        let on = Command::FollowNotify(Some("on".into()));
        let off = Command::FollowNotify(Some("off".into()));
        assert_eq!(
            h.tracker.handle_command(&owner, on.clone()).await.as_deref(),
            Some("Streamer: Enabled follow notifier.")
        );
        assert_eq!(
            h.tracker.handle_command(&owner, on).await.as_deref(),
            Some("Streamer: It's already enabled.")
        );
        assert_eq!(
            h.tracker.handle_command(&owner, off.clone()).await.as_deref(),
            Some("Streamer: Disabled follow notifier.")
        );
        assert_eq!(
            h.tracker.handle_command(&owner, off).await.as_deref(),
            Some("Streamer: It's already disabled.")
        );
        assert_eq!(h.sink.messages().len(), 4);
    }

    #[tokio::test]
    async fn test_fnotify_ignored_for_viewers_and_bad_args() {
        let mut h = harness();
        let viewer = h.tracker.request("#streamer", "viewer");
        assert!(!viewer.is_admin);
        let on = Command::FollowNotify(Some("on".into()));
        assert_eq!(h.tracker.handle_command(&viewer, on).await, None);

        let owner = h.tracker.request("#streamer", "streamer");
        assert_eq!(
            h.tracker
                .handle_command(&owner, Command::FollowNotify(None))
                .await,
            None
        );
        assert_eq!(
            h.tracker
                .handle_command(&owner, Command::FollowNotify(Some("maybe".into())))
                .await,
            None
        );
        assert!(h.tracker.channel("#streamer").is_none());
        assert!(h.sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_follows_while_disabled_announced_after_reenable() {
        let mut h = harness();
        let start = h.clock.now();
        let owner = h.tracker.request("#streamer", "streamer");
        let on = Command::FollowNotify(Some("on".into()));
        let off = Command::FollowNotify(Some("off".into()));

        h.tracker.handle_command(&owner, on.clone()).await;
        h.tracker.handle_command(&owner, off).await;
        h.api.set_followers(
            "streamer",
            vec![crate::testing::follow("2024-01-01T12:00:20Z", "WhileOff")],
        );
        h.clock.advance(TimeDelta::seconds(30));
        h.tracker.handle_command(&owner, on).await;
        assert_eq!(
            h.tracker.channel("#streamer").unwrap().last_follower_time(),
            DateTime::<Utc>::UNIX_EPOCH
        );

        h.api.set_stream("streamer", Some("2024-01-01T11:00:00Z"));
        h.clock.set(start + TimeDelta::seconds(61));
        let notifications = h.tracker.tick().await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].followers, ["WhileOff"]);
        assert_eq!(
            h.sink.messages_for("#streamer").last().map(String::as_str),
            Some("Thank you to WhileOff for following the channel! <3")
        );
    }

    #[tokio::test]
    async fn test_uptime_reply() {
        let mut h = harness();
        let request = h.tracker.request("#streamer", "viewer");
        assert_eq!(
            h.tracker.handle_command(&request, Command::Uptime).await.as_deref(),
            Some("viewer: The stream is not live.")
        );

        h.api.set_stream("streamer", Some("2024-01-01T10:30:00Z"));
        h.clock.advance(TimeDelta::seconds(121));
        assert_eq!(
            h.tracker.handle_command(&request, Command::Uptime).await.as_deref(),
            Some("viewer: The stream has been live for 1 hour, 32 minutes.")
        );
    }

    #[tokio::test]
    async fn test_vod_reply() {
        let mut h = harness();
        let request = h.tracker.request("#streamer", "viewer");
        assert_eq!(h.tracker.handle_command(&request, Command::Vod).await, None);
        assert_eq!(h.api.video_calls(), 0);

        h.api.set_stream("streamer", Some("2024-01-01T10:30:00Z"));
        h.api.set_videos(
            "streamer",
            vec![crate::testing::video(
                Some("recording"),
                Some("https://www.twitch.tv/videos/1"),
            )],
        );
        h.clock.advance(TimeDelta::seconds(121));
        assert_eq!(
            h.tracker.handle_command(&request, Command::Vod).await.as_deref(),
            Some("viewer: https://www.twitch.tv/videos/1")
        );
        assert_eq!(
            h.sink.messages(),
            [(
                "#streamer".to_string(),
                "viewer: https://www.twitch.tv/videos/1".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_tick_gates_follower_scan() {
        let mut h = harness();
        h.store.save(&["#streamer".to_string()]).await.unwrap();
        h.tracker.load().await.unwrap();
        h.api.set_stream("streamer", Some("2024-01-01T10:30:00Z"));

        h.clock.advance(TimeDelta::seconds(60));
        h.tracker.tick().await;
        assert_eq!(h.api.follower_calls(), 0);

        h.clock.advance(TimeDelta::seconds(1));
        h.tracker.tick().await;
        assert_eq!(h.api.follower_calls(), 1);

        h.clock.advance(TimeDelta::seconds(30));
        h.tracker.tick().await;
        assert_eq!(h.api.follower_calls(), 1);
    }

    #[tokio::test]
    async fn test_tick_skips_empty_registry() {
        let mut h = harness();
        h.clock.advance(TimeDelta::seconds(600));
        h.tracker.tick().await;
        assert_eq!(
            h.tracker.tasks().last_run(TaskKind::FollowerScan),
            Some(h.clock.now() - TimeDelta::seconds(600))
        );
    }

    #[tokio::test]
    async fn test_autosave_only_when_dirty() {
        let mut h = harness();
        h.clock.advance(TimeDelta::seconds(301));
        h.tracker.tick().await;
        assert_eq!(h.store.save_count(), 0);

        let owner = h.tracker.request("#b", "b");
        h.tracker
            .handle_command(&owner, Command::FollowNotify(Some("on".into())))
            .await;
        let owner = h.tracker.request("#a", "a");
        h.tracker
            .handle_command(&owner, Command::FollowNotify(Some("on".into())))
            .await;
        h.tracker.tick().await;
        assert_eq!(h.store.save_count(), 1);
        assert_eq!(h.store.channels(), ["#b", "#a"]);

        h.clock.advance(TimeDelta::seconds(301));
        h.tracker.tick().await;
        assert_eq!(h.store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_saves_pending_changes() {
        let mut h = harness();
        h.tracker.shutdown().await.unwrap();
        assert_eq!(h.store.save_count(), 0);

        let owner = h.tracker.request("#a", "a");
        h.tracker
            .handle_command(&owner, Command::FollowNotify(Some("on".into())))
            .await;
        h.tracker.shutdown().await.unwrap();
        assert_eq!(h.store.channels(), ["#a"]);
    }
}
