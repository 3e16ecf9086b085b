use std::path::{Path, PathBuf};

use chrono::Weekday;
use serde::{Deserialize, Serialize};

// ──────────────────── Link State ────────────────────

/// Connection state of the messaging transport.
///
/// The transport starts `Disconnected`, moves through `Initializing` while
/// the bridge session is being established, sits in `AwaitingPairing` until
/// the QR code has been scanned, and is `Ready` once messages can be sent.
/// A dropped session returns to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Disconnected,
    Initializing,
    AwaitingPairing,
    Ready,
}

impl LinkState {
    /// Whether the transport can send messages right now.
    pub fn is_ready(self) -> bool {
        self == LinkState::Ready
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Initializing => "initializing",
            LinkState::AwaitingPairing => "awaiting_pairing",
            LinkState::Ready => "ready",
        };
        f.write_str(s)
    }
}

// ──────────────────── Transport Types ────────────────────

/// Opaque, transport-assigned message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A group chat the transport can deliver to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfo {
    /// Destination identifier usable with `send_message`.
    pub id: String,
    /// Human-readable group name.
    pub name: String,
}

/// An inbound reaction correlated to a previously sent message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionEvent {
    /// Id of the message that was reacted to.
    pub target_message_id: MessageId,
    /// The reaction emoji as sent by the platform.
    pub emoji: String,
    /// Identifier of the reacting account.
    pub sender: String,
    /// Event timestamp (unix millis).
    pub timestamp: i64,
}

/// Events pushed by the transport's event pump.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A reaction landed on some previously sent message.
    Reaction(ReactionEvent),
    /// The bridge session changed state.
    StateChanged(LinkState),
}

// ──────────────────── Outbound Content ────────────────────

/// One media attachment, encoded and ready for the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPayload {
    /// Base64-encoded file contents.
    pub base64: String,
    /// MIME type guessed from the file extension.
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl MediaPayload {
    /// Read and encode a file from disk.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let base64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &data);
        Ok(Self {
            base64,
            mime_type: mime_for_path(path).to_string(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
        })
    }
}

/// Guess a MIME type from a file extension. Unknown extensions fall back
/// to `application/octet-stream`.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Content of one outbound send: text plus at most one attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundContent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaPayload>,
}

impl OutboundContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            media: None,
        }
    }

    pub fn with_media(text: impl Into<String>, media: MediaPayload) -> Self {
        Self {
            text: text.into(),
            media: Some(media),
        }
    }
}

/// Per-send options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendOptions {
    /// Background color for text-only status posts (e.g. `"#FF0000"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

// ──────────────────── Schedule Types ────────────────────

/// Weekday class used by the schedule table. The three classes partition
/// the week exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayClass {
    /// Sunday through Thursday.
    SunThu,
    Fri,
    Sat,
}

impl DayClass {
    /// Classify a weekday.
    pub fn for_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sat => DayClass::Sat,
            Weekday::Fri => DayClass::Fri,
            _ => DayClass::SunThu,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid schedule time {0:?} (expected 24h \"HH:MM\")")]
pub struct InvalidScheduleTime(pub String);

/// A validated 24h `"HH:MM"` wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScheduleTime(String);

impl ScheduleTime {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact string match against a `"HH:MM"` stamp of the current minute.
    pub fn matches(&self, stamp: &str) -> bool {
        self.0 == stamp
    }
}

impl std::str::FromStr for ScheduleTime {
    type Err = InvalidScheduleTime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 5
            && bytes[2] == b':'
            && bytes[0].is_ascii_digit()
            && bytes[1].is_ascii_digit()
            && bytes[3].is_ascii_digit()
            && bytes[4].is_ascii_digit();
        if !well_formed {
            return Err(InvalidScheduleTime(s.to_string()));
        }
        let hour: u8 = s[0..2].parse().map_err(|_| InvalidScheduleTime(s.to_string()))?;
        let minute: u8 = s[3..5].parse().map_err(|_| InvalidScheduleTime(s.to_string()))?;
        if hour > 23 || minute > 59 {
            return Err(InvalidScheduleTime(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ScheduleTime {
    type Error = InvalidScheduleTime;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ScheduleTime> for String {
    fn from(t: ScheduleTime) -> Self {
        t.0
    }
}

impl std::fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-weekday-class broadcast times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTable {
    pub sun_thu: ScheduleTime,
    pub fri: ScheduleTime,
    pub sat: ScheduleTime,
}

impl ScheduleTable {
    /// The target time for a weekday class.
    pub fn target_for(&self, class: DayClass) -> &ScheduleTime {
        match class {
            DayClass::SunThu => &self.sun_thu,
            DayClass::Fri => &self.fri,
            DayClass::Sat => &self.sat,
        }
    }
}

impl Default for ScheduleTable {
    fn default() -> Self {
        Self {
            sun_thu: "08:00".parse().unwrap(),
            fri: "08:00".parse().unwrap(),
            sat: "20:00".parse().unwrap(),
        }
    }
}

// ──────────────────── Broadcast Config ────────────────────

/// Runtime-editable broadcast settings, persisted by the config store and
/// re-read before every decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default)]
    pub schedule: ScheduleTable,
    #[serde(default = "default_message")]
    pub message: String,
    /// Path of the single optional media attachment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_path: Option<PathBuf>,
    /// Ordered group destinations. Duplicates are wasteful, not invalid.
    #[serde(default)]
    pub destinations: Vec<String>,
}

fn default_message() -> String {
    "Hello! This is a broadcast message.".to_string()
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            schedule: ScheduleTable::default(),
            message: default_message(),
            media_path: None,
            destinations: Vec::new(),
        }
    }
}

/// Field-wise partial update, as accepted by `POST /config`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct BroadcastConfigPatch {
    pub schedule: Option<ScheduleTable>,
    pub message: Option<String>,
    pub media_path: Option<PathBuf>,
    pub destinations: Option<Vec<String>>,
}

impl BroadcastConfig {
    /// Merge a partial update over the current config. Absent fields are
    /// left untouched.
    pub fn apply(&mut self, patch: BroadcastConfigPatch) {
        if let Some(schedule) = patch.schedule {
            self.schedule = schedule;
        }
        if let Some(message) = patch.message {
            self.message = message;
        }
        if let Some(media_path) = patch.media_path {
            self.media_path = Some(media_path);
        }
        if let Some(destinations) = patch.destinations {
            self.destinations = destinations;
        }
    }
}

// ──────────────────── Broadcast Trigger ────────────────────

/// What caused a broadcast run. Carried for logging only; the executor
/// loads config fresh either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOrigin {
    /// Confirmed schedule trigger.
    Scheduled,
    /// Manual trigger from the control surface.
    Manual,
}

impl std::fmt::Display for TriggerOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerOrigin::Scheduled => f.write_str("scheduled"),
            TriggerOrigin::Manual => f.write_str("manual"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_class_partition() {
        use chrono::Weekday::*;
        assert_eq!(DayClass::for_weekday(Sat), DayClass::Sat);
        assert_eq!(DayClass::for_weekday(Fri), DayClass::Fri);
        for day in [Sun, Mon, Tue, Wed, Thu] {
            assert_eq!(DayClass::for_weekday(day), DayClass::SunThu);
        }
    }

    #[test]
    fn test_schedule_time_parse() {
        let t: ScheduleTime = "08:00".parse().unwrap();
        assert_eq!(t.as_str(), "08:00");
        assert!(t.matches("08:00"));
        assert!(!t.matches("08:01"));

        for bad in ["8:00", "08:60", "24:00", "0800", "ab:cd", "08:00:00", ""] {
            assert!(bad.parse::<ScheduleTime>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_schedule_time_serde_rejects_malformed() {
        let ok: ScheduleTime = serde_json::from_str("\"23:59\"").unwrap();
        assert_eq!(ok.as_str(), "23:59");
        assert!(serde_json::from_str::<ScheduleTime>("\"25:00\"").is_err());
    }

    #[test]
    fn test_schedule_table_target_for() {
        let table = ScheduleTable::default();
        assert_eq!(table.target_for(DayClass::SunThu).as_str(), "08:00");
        assert_eq!(table.target_for(DayClass::Fri).as_str(), "08:00");
        assert_eq!(table.target_for(DayClass::Sat).as_str(), "20:00");
    }

    #[test]
    fn test_broadcast_config_defaults() {
        let config: BroadcastConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, BroadcastConfig::default());
        assert_eq!(config.message, "Hello! This is a broadcast message.");
        assert!(config.media_path.is_none());
        assert!(config.destinations.is_empty());
    }

    #[test]
    fn test_broadcast_config_round_trip() {
        let mut config = BroadcastConfig::default();
        config.destinations = vec!["group-a@g.us".into(), "group-b@g.us".into()];
        config.media_path = Some(PathBuf::from("/data/uploads/pic.png"));

        let json = serde_json::to_string(&config).unwrap();
        let parsed: BroadcastConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_patch_merges_only_present_fields() {
        let mut config = BroadcastConfig::default();
        config.destinations = vec!["keep@g.us".into()];

        let patch: BroadcastConfigPatch =
            serde_json::from_str(r#"{"message": "Updated"}"#).unwrap();
        config.apply(patch);

        assert_eq!(config.message, "Updated");
        assert_eq!(config.destinations, vec!["keep@g.us".to_string()]);
        assert_eq!(config.schedule, ScheduleTable::default());
    }

    #[test]
    fn test_patch_replaces_destinations() {
        let mut config = BroadcastConfig::default();
        config.destinations = vec!["old@g.us".into()];

        let patch: BroadcastConfigPatch =
            serde_json::from_str(r#"{"destinations": ["new@g.us"]}"#).unwrap();
        config.apply(patch);
        assert_eq!(config.destinations, vec!["new@g.us".to_string()]);
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("a.png")), "image/png");
        assert_eq!(mime_for_path(Path::new("a.mp4")), "video/mp4");
        assert_eq!(mime_for_path(Path::new("a.bin")), "application/octet-stream");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_link_state_serde() {
        let json = serde_json::to_string(&LinkState::AwaitingPairing).unwrap();
        assert_eq!(json, "\"awaiting_pairing\"");
        let parsed: LinkState = serde_json::from_str("\"ready\"").unwrap();
        assert!(parsed.is_ready());
        assert!(!LinkState::Disconnected.is_ready());
    }

    #[test]
    fn test_message_id_transparent_serde() {
        let id = MessageId::from("true_1234@c.us_ABCDEF");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"true_1234@c.us_ABCDEF\"");
        let parsed: MessageId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
