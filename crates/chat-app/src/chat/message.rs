/// Chat speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    Bot,
}

/// Stable identifier for one transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

impl EntryId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Lifecycle status for one entry.
///
/// `Pending` is the explicit placeholder that stands in for a reply still in
/// flight; it is resolved in place, never removed, so the transcript's
/// insertion order is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub id: EntryId,
    pub sender: Sender,
    pub text: String,
    pub status: EntryStatus,
}

impl TranscriptEntry {
    /// True for entries that carry rating and copy affordances.
    pub fn is_settled_reply(&self) -> bool {
        self.sender == Sender::Bot && self.status == EntryStatus::Done
    }
}

/// Addresses the placeholder of one send cycle when its reply resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingToken(EntryId);

/// Rejection reason for a placeholder resolution that no longer applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveRejection {
    UnknownEntry(EntryId),
    AlreadyResolved(EntryId),
}

/// Ordered sequence of displayed messages for the current conversation.
///
/// Mutated only from the UI event context, so it needs no locking. Multiple
/// pending entries may coexist when the user fires overlapping sends; each
/// send cycle resolves exactly its own placeholder through its token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    next_id: u64,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.status == EntryStatus::Pending)
    }

    /// Appends a settled entry and returns its display index.
    pub fn push_done(&mut self, sender: Sender, text: impl Into<String>) -> usize {
        let id = self.alloc_id();
        self.entries.push(TranscriptEntry {
            id,
            sender,
            text: text.into(),
            status: EntryStatus::Done,
        });
        self.entries.len() - 1
    }

    /// Appends the placeholder for a reply in flight.
    pub fn begin_pending(&mut self) -> PendingToken {
        let id = self.alloc_id();
        self.entries.push(TranscriptEntry {
            id,
            sender: Sender::Bot,
            text: String::new(),
            status: EntryStatus::Pending,
        });
        PendingToken(id)
    }

    /// Replaces the placeholder addressed by `token` with the settled reply.
    pub fn resolve(&mut self, token: PendingToken, text: impl Into<String>) -> Result<(), ResolveRejection> {
        let PendingToken(id) = token;
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            return Err(ResolveRejection::UnknownEntry(id));
        };

        if entry.status != EntryStatus::Pending {
            return Err(ResolveRejection::AlreadyResolved(id));
        }

        entry.text = text.into();
        entry.status = EntryStatus::Done;
        Ok(())
    }

    fn alloc_id(&mut self) -> EntryId {
        let id = EntryId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }
}

/// Literal marker separating a reply's body from its suggested follow-ups.
pub const RELATED_TOPICS_MARKER: &str = "RELATED_TOPICS:";

/// A reply split at [`RELATED_TOPICS_MARKER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyParts {
    /// Markdown body shown in the transcript.
    pub body: String,
    /// Suggested follow-up prompts, `|`-separated after the marker.
    pub topics: Vec<String>,
}

pub fn split_reply(text: &str) -> ReplyParts {
    match text.split_once(RELATED_TOPICS_MARKER) {
        Some((body, tail)) => ReplyParts {
            body: body.trim().to_string(),
            topics: tail
                .split('|')
                .map(str::trim)
                .filter(|topic| !topic.is_empty())
                .map(str::to_string)
                .collect(),
        },
        None => ReplyParts {
            body: text.trim().to_string(),
            topics: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_cycle_appends_user_then_placeholder_then_resolves_in_place() {
        let mut transcript = Transcript::new();

        transcript.push_done(Sender::User, "Hello");
        let token = transcript.begin_pending();
        assert!(transcript.has_pending());
        assert_eq!(transcript.len(), 2);

        transcript.resolve(token, "Hi there").unwrap();

        let entries = transcript.entries();
        assert!(!transcript.has_pending());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sender, Sender::User);
        assert_eq!(entries[0].text, "Hello");
        assert_eq!(entries[1].sender, Sender::Bot);
        assert_eq!(entries[1].text, "Hi there");
        assert_eq!(entries[1].status, EntryStatus::Done);
    }

    #[test]
    fn a_token_resolves_only_its_own_placeholder_and_only_once() {
        let mut transcript = Transcript::new();

        let first = transcript.begin_pending();
        let second = transcript.begin_pending();

        transcript.resolve(second, "late question, early answer").unwrap();
        assert!(transcript.has_pending());

        assert_eq!(
            transcript.resolve(second, "again"),
            Err(ResolveRejection::AlreadyResolved(transcript.entries()[1].id))
        );

        transcript.resolve(first, "first answer").unwrap();
        assert!(!transcript.has_pending());
        assert_eq!(transcript.entries()[0].text, "first answer");
        assert_eq!(transcript.entries()[1].text, "late question, early answer");
    }

    #[test]
    fn resolving_against_an_unknown_entry_is_rejected() {
        let mut empty = Transcript::new();
        let mut other = Transcript::new();
        let foreign_token = other.begin_pending();

        assert_eq!(
            empty.resolve(foreign_token, "x"),
            Err(ResolveRejection::UnknownEntry(EntryId::new(1)))
        );
    }

    #[test]
    fn reply_split_extracts_body_and_topics() {
        let parts = split_reply("Body text RELATED_TOPICS: TopicA | TopicB");

        assert_eq!(parts.body, "Body text");
        assert_eq!(parts.topics, vec!["TopicA".to_string(), "TopicB".to_string()]);
    }

    #[test]
    fn reply_split_without_marker_trims_and_keeps_everything() {
        let parts = split_reply("  Just a reply with *markdown*.  ");

        assert_eq!(parts.body, "Just a reply with *markdown*.");
        assert!(parts.topics.is_empty());
    }

    #[test]
    fn reply_split_drops_empty_topic_fragments() {
        let parts = split_reply("Body RELATED_TOPICS: | A ||  B |");

        assert_eq!(parts.body, "Body");
        assert_eq!(parts.topics, vec!["A".to_string(), "B".to_string()]);
    }
}
