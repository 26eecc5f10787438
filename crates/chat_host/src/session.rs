//! Session-scoped conversation state.
//!
//! Messages are never persisted or deleted. Every mutation publishes a full
//! snapshot of the list to the observer, if one is attached.

use shared::chat::{ChatMessage, ImageAttachment, MessageId};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    next_id: u64,
    observer: Option<UnboundedSender<Vec<ChatMessage>>>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive a snapshot of the message list after every change.
    pub fn with_observer(observer: UnboundedSender<Vec<ChatMessage>>) -> Self {
        Self {
            observer: Some(observer),
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn allocate_id(&mut self) -> MessageId {
        self.next_id += 1;
        MessageId(self.next_id)
    }

    pub fn push_user(&mut self, text: &str, image: Option<ImageAttachment>) -> MessageId {
        let id = self.allocate_id();
        self.messages.push(ChatMessage::user(id, text, image));
        self.publish();
        id
    }

    /// Append the empty model message a reply streams into.
    pub fn push_placeholder(&mut self) -> MessageId {
        let id = self.allocate_id();
        self.messages.push(ChatMessage::placeholder(id));
        self.publish();
        id
    }

    /// Mutate one message in place and publish. Returns false if `id` is unknown.
    pub fn update<F>(&mut self, id: MessageId, f: F) -> bool
    where
        F: FnOnce(&mut ChatMessage),
    {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        f(message);
        self.publish();
        true
    }

    fn publish(&self) {
        if let Some(observer) = &self.observer {
            // a closed observer only means nobody is rendering anymore
            let _ = observer.send(self.messages.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::chat::Role;

    #[test]
    fn test_ids_increase_in_creation_order() {
        let mut session = ChatSession::new();
        let first = session.push_user("hi", None);
        let second = session.push_placeholder();
        assert!(first < second);
        assert_eq!(session.get(second).unwrap().role, Role::Model);
    }

    #[test]
    fn test_every_change_is_published() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut session = ChatSession::with_observer(tx);
        session.push_user("hi", None);
        let reply = session.push_placeholder();
        assert!(session.update(reply, |m| m.text.push_str("hey")));

        assert_eq!(rx.try_recv().unwrap().len(), 1);
        assert_eq!(rx.try_recv().unwrap()[1].text, "");
        assert_eq!(rx.try_recv().unwrap()[1].text, "hey");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_update_unknown_id() {
        let mut session = ChatSession::new();
        assert!(!session.update(MessageId(42), |m| m.text.clear()));
    }
}
