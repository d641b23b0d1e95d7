// Gift message carry-over when an order item is turned back into a quote item

use crate::catalog::{EntityId, StoreId};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub type GiftMessageId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftMessage {
    pub id: Option<GiftMessageId>,
    pub sender: String,
    pub recipient: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: EntityId,
    pub product_id: EntityId,
    pub store_id: StoreId,
    pub gift_message_id: Option<GiftMessageId>,
    /// Set on orders that were already copied into a new cart
    pub order_reordered: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub product_id: EntityId,
    pub gift_message_id: Option<GiftMessageId>,
}

/// Decides whether gift messages are available for an item in its store.
pub trait GiftMessagePolicy {
    fn messages_allowed(&self, item: &OrderItem) -> bool;
}

impl<F> GiftMessagePolicy for F
where
    F: Fn(&OrderItem) -> bool,
{
    fn messages_allowed(&self, item: &OrderItem) -> bool {
        self(item)
    }
}

pub trait GiftMessageRepository {
    type Error: std::error::Error;

    fn load(&self, id: GiftMessageId) -> Result<Option<GiftMessage>, Self::Error>;

    /// Persists a message without id and returns the id it was stored under.
    fn create(&mut self, message: GiftMessage) -> Result<GiftMessageId, Self::Error>;
}

/// Copies an order item's gift message onto the quote item created from it.
pub struct GiftMessageCopier<P, R> {
    policy: P,
    repository: R,
}

impl<P: GiftMessagePolicy, R: GiftMessageRepository> GiftMessageCopier<P, R> {
    pub fn new(policy: P, repository: R) -> Self {
        Self { policy, repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Duplicates the message so the new cart owns its own copy.
    ///
    /// Returns the id of the copy, or `None` when nothing was copied.
    pub fn copy(
        &mut self,
        order_item: &OrderItem,
        quote_item: &mut QuoteItem,
    ) -> Result<Option<GiftMessageId>, R::Error> {
        if order_item.order_reordered || !self.policy.messages_allowed(order_item) {
            return Ok(None);
        }

        let Some(message_id) = order_item.gift_message_id else {
            return Ok(None);
        };

        let Some(message) = self.repository.load(message_id)? else {
            debug!(
                "Gift message {} of order item {} no longer exists",
                message_id, order_item.id
            );
            return Ok(None);
        };

        let new_id = self.repository.create(GiftMessage { id: None, ..message })?;
        quote_item.gift_message_id = Some(new_id);
        debug!(
            "Copied gift message {} to {} for order item {}",
            message_id, new_id, order_item.id
        );

        Ok(Some(new_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::convert::Infallible;

    const STUB_MESSAGE_ID: GiftMessageId = 1;
    const STUB_NEW_MESSAGE_ID: GiftMessageId = 2;

    #[derive(Default)]
    struct MemoryMessages {
        messages: BTreeMap<GiftMessageId, GiftMessage>,
    }

    impl GiftMessageRepository for MemoryMessages {
        type Error = Infallible;

        fn load(&self, id: GiftMessageId) -> Result<Option<GiftMessage>, Self::Error> {
            Ok(self.messages.get(&id).cloned())
        }

        fn create(&mut self, mut message: GiftMessage) -> Result<GiftMessageId, Self::Error> {
            let id = self.messages.keys().max().copied().unwrap_or(0) + 1;
            message.id = Some(id);
            self.messages.insert(id, message);
            Ok(id)
        }
    }

    fn repository() -> MemoryMessages {
        let mut repository = MemoryMessages::default();
        repository.messages.insert(
            STUB_MESSAGE_ID,
            GiftMessage {
                id: Some(STUB_MESSAGE_ID),
                sender: "Ann".to_string(),
                recipient: "Bob".to_string(),
                message: "Happy birthday".to_string(),
            },
        );
        repository
    }

    fn order_item(reordered: bool) -> OrderItem {
        OrderItem {
            id: 10,
            product_id: 123,
            store_id: 1,
            gift_message_id: Some(STUB_MESSAGE_ID),
            order_reordered: reordered,
        }
    }

    fn run(reordered: bool, allowed: bool) -> (Option<GiftMessageId>, QuoteItem, usize) {
        let policy = move |_: &OrderItem| allowed;
        let mut copier = GiftMessageCopier::new(policy, repository());
        let mut quote_item = QuoteItem {
            product_id: 123,
            gift_message_id: None,
        };
        let copied = copier.copy(&order_item(reordered), &mut quote_item).unwrap();
        (copied, quote_item, copier.repository().messages.len())
    }

    #[test]
    fn test_copies_message_when_not_reordered_and_allowed() {
        let (copied, quote_item, stored) = run(false, true);

        assert_eq!(copied, Some(STUB_NEW_MESSAGE_ID));
        assert_eq!(quote_item.gift_message_id, Some(STUB_NEW_MESSAGE_ID));
        assert_eq!(stored, 2);
    }

    #[test]
    fn test_reordered_order_is_skipped() {
        for allowed in [true, false] {
            let (copied, quote_item, stored) = run(true, allowed);
            assert_eq!(copied, None);
            assert_eq!(quote_item.gift_message_id, None);
            assert_eq!(stored, 1);
        }
    }

    #[test]
    fn test_disallowed_messages_are_skipped() {
        let (copied, quote_item, stored) = run(false, false);
        assert_eq!(copied, None);
        assert_eq!(quote_item.gift_message_id, None);
        assert_eq!(stored, 1);
    }

    #[test]
    fn test_item_without_message() {
        let mut copier = GiftMessageCopier::new(|_: &OrderItem| true, repository());
        let mut quote_item = QuoteItem::default();
        let item = OrderItem {
            gift_message_id: None,
            ..order_item(false)
        };

        assert_eq!(copier.copy(&item, &mut quote_item).unwrap(), None);
        assert_eq!(quote_item.gift_message_id, None);
    }

    #[test]
    fn test_copy_keeps_message_content() {
        let mut copier = GiftMessageCopier::new(|_: &OrderItem| true, repository());
        let mut quote_item = QuoteItem::default();
        let new_id = copier
            .copy(&order_item(false), &mut quote_item)
            .unwrap()
            .unwrap();

        let copy = copier.repository().load(new_id).unwrap().unwrap();
        assert_eq!(copy.message, "Happy birthday");
        assert_eq!(copy.id, Some(new_id));
    }
}
