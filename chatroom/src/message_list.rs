use chrono::{DateTime, Utc};
use circular_queue::CircularQueue;

use crate::{message::Message, relative_time};

/// How many messages of the active room are kept around for rendering
const MAX_MESSAGES_TO_STORE: usize = 500;

/// The surface arrivals of a room are rendered on
pub trait MessageListView {
    /// Forget everything rendered so far
    fn clear(&mut self);

    fn append(&mut self, message: Message);
}

/// One message, ready to be drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub author: String,
    pub body: String,
    pub when: String,
}

/// Bounded log of the latest messages, oldest ones fall off first
#[derive(Debug, Clone)]
pub struct MessageList {
    messages: CircularQueue<Message>,
}

impl Default for MessageList {
    fn default() -> Self {
        MessageList {
            messages: CircularQueue::with_capacity(MAX_MESSAGES_TO_STORE),
        }
    }
}

impl MessageList {
    /// Messages in the order they were appended
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.asc_iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Relative times are computed against `now`, so call this on every frame
    pub fn lines(&self, now: DateTime<Utc>) -> Vec<RenderedMessage> {
        self.messages()
            .map(|message| RenderedMessage {
                author: message.author.clone(),
                body: message.body.clone(),
                when: relative_time::format_distance(message.created_at, now),
            })
            .collect()
    }
}

impl MessageListView for MessageList {
    fn clear(&mut self) {
        self.messages.clear();
    }

    fn append(&mut self, message: Message) {
        self.messages.push(message);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn message(body: &str, created_at: DateTime<Utc>) -> Message {
        Message {
            author: "peach".into(),
            body: body.into(),
            room: "general".into(),
            created_at,
        }
    }

    #[test]
    fn test_clear_then_append_leaves_only_that_message() {
        let created_at = Utc.with_ymd_and_hms(2024, 2, 2, 9, 0, 0).unwrap();
        let mut list = MessageList::default();
        list.append(message("first", created_at));
        list.append(message("second", created_at));

        list.clear();
        let latest = message("third", created_at);
        list.append(latest.clone());

        assert_eq!(list.messages().collect::<Vec<_>>(), vec![&latest]);
    }

    #[test]
    fn test_lines_keep_append_order_with_relative_times() {
        let now = Utc.with_ymd_and_hms(2024, 2, 2, 9, 0, 0).unwrap();
        let mut list = MessageList::default();
        list.append(message("hello", now - Duration::minutes(3)));
        list.append(message("hi", now - Duration::seconds(5)));

        let lines = list.lines(now);
        assert_eq!(
            lines,
            vec![
                RenderedMessage {
                    author: "peach".into(),
                    body: "hello".into(),
                    when: "3 minutes ago".into(),
                },
                RenderedMessage {
                    author: "peach".into(),
                    body: "hi".into(),
                    when: "less than a minute ago".into(),
                },
            ]
        );
    }

    #[test]
    fn test_oldest_messages_fall_off() {
        let now = Utc.with_ymd_and_hms(2024, 2, 2, 9, 0, 0).unwrap();
        let mut list = MessageList::default();
        for i in 0..MAX_MESSAGES_TO_STORE + 2 {
            list.append(message(&i.to_string(), now));
        }

        assert_eq!(list.len(), MAX_MESSAGES_TO_STORE);
        assert_eq!(list.messages().next().map(|m| m.body.as_str()), Some("2"));
    }
}
