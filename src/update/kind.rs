//! Event-kind classification.

use std::fmt;

use crate::json::JsonView;

/// Sub-type fields scanned against the resolved message, in priority order.
///
/// When several fields coexist on one message (a captioned document also
/// carrying entities, say), the earlier entry wins. This exact order is a
/// compatibility contract - do not reorder.
const SUBTYPE_FIELDS: [(&str, EventKind); 32] = [
    ("voice", EventKind::Voice),
    ("video_note", EventKind::VideoNote),
    ("video", EventKind::Video),
    ("animation", EventKind::Animation),
    ("venue", EventKind::Venue),
    ("text", EventKind::Text),
    ("supergroup_chat_created", EventKind::SupergroupChatCreated),
    ("successful_payment", EventKind::SuccessfulPayment),
    ("sticker", EventKind::Sticker),
    ("pinned_message", EventKind::PinnedMessage),
    ("photo", EventKind::Photo),
    ("new_chat_title", EventKind::NewChatTitle),
    ("new_chat_photo", EventKind::NewChatPhoto),
    ("my_chat_member", EventKind::MyChatMember),
    ("chat_member", EventKind::ChatMember),
    ("new_chat_members", EventKind::NewChatMembers),
    ("migrate_to_chat_id", EventKind::MigrateToChatId),
    ("migrate_from_chat_id", EventKind::MigrateFromChatId),
    ("location", EventKind::Location),
    ("left_chat_member", EventKind::LeftChatMember),
    ("invoice", EventKind::Invoice),
    ("group_chat_created", EventKind::GroupChatCreated),
    ("game", EventKind::Game),
    ("document", EventKind::Document),
    ("delete_chat_photo", EventKind::DeleteChatPhoto),
    ("contact", EventKind::Contact),
    ("channel_chat_created", EventKind::ChannelChatCreated),
    ("audio", EventKind::Audio),
    ("connected_website", EventKind::ConnectedWebsite),
    ("passport_data", EventKind::PassportData),
    ("poll", EventKind::Poll),
    ("forward_date", EventKind::Forward),
];

/// The classified category of an update's payload content.
///
/// Mirrors the message sub-type field names, except `forward_date` maps to
/// the synthetic [`Forward`](EventKind::Forward) and unclassifiable updates
/// map to [`Unknown`](EventKind::Unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Voice,
    VideoNote,
    Video,
    Animation,
    Venue,
    Text,
    SupergroupChatCreated,
    SuccessfulPayment,
    Sticker,
    PinnedMessage,
    Photo,
    NewChatTitle,
    NewChatPhoto,
    MyChatMember,
    ChatMember,
    NewChatMembers,
    MigrateToChatId,
    MigrateFromChatId,
    Location,
    LeftChatMember,
    Invoice,
    GroupChatCreated,
    Game,
    Document,
    DeleteChatPhoto,
    Contact,
    ChannelChatCreated,
    Audio,
    ConnectedWebsite,
    PassportData,
    Poll,
    Forward,
    Unknown,
}

impl EventKind {
    /// Classify a resolved message object; `None` classifies as `Unknown`.
    pub(crate) fn classify(message: Option<JsonView<'_>>) -> EventKind {
        let Some(message) = message else {
            return EventKind::Unknown;
        };
        for (field, kind) in SUBTYPE_FIELDS {
            if message.get(field).exists() {
                return kind;
            }
        }
        EventKind::Unknown
    }

    /// The kind's wire-level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Voice => "voice",
            EventKind::VideoNote => "video_note",
            EventKind::Video => "video",
            EventKind::Animation => "animation",
            EventKind::Venue => "venue",
            EventKind::Text => "text",
            EventKind::SupergroupChatCreated => "supergroup_chat_created",
            EventKind::SuccessfulPayment => "successful_payment",
            EventKind::Sticker => "sticker",
            EventKind::PinnedMessage => "pinned_message",
            EventKind::Photo => "photo",
            EventKind::NewChatTitle => "new_chat_title",
            EventKind::NewChatPhoto => "new_chat_photo",
            EventKind::MyChatMember => "my_chat_member",
            EventKind::ChatMember => "chat_member",
            EventKind::NewChatMembers => "new_chat_members",
            EventKind::MigrateToChatId => "migrate_to_chat_id",
            EventKind::MigrateFromChatId => "migrate_from_chat_id",
            EventKind::Location => "location",
            EventKind::LeftChatMember => "left_chat_member",
            EventKind::Invoice => "invoice",
            EventKind::GroupChatCreated => "group_chat_created",
            EventKind::Game => "game",
            EventKind::Document => "document",
            EventKind::DeleteChatPhoto => "delete_chat_photo",
            EventKind::Contact => "contact",
            EventKind::ChannelChatCreated => "channel_chat_created",
            EventKind::Audio => "audio",
            EventKind::ConnectedWebsite => "connected_website",
            EventKind::PassportData => "passport_data",
            EventKind::Poll => "poll",
            EventKind::Forward => "forward",
            EventKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
