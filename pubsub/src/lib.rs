//! In-process topic bus the engine uses to fan state changes out to its own
//! handlers (`store_height`, `update_latest_and_store`, ...). Delivery is
//! synchronous, in subscription order, on the publishing caller's stack —
//! there is no queue and no backpressure, so listeners must not block long.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::trace;
use types::events::BlockEvent;

type Listener = Arc<dyn Fn(&BlockEvent) + Send + Sync>;

/// Returned by `subscribe`; pass back to `unsubscribe` to stop receiving.
pub struct Subscription {
    topic: String,
    id: u64,
}

#[derive(Default)]
pub struct PubSub {
    listeners: Mutex<HashMap<String, Vec<(u64, &'static str, Listener)>>>,
    next_id: AtomicU64,
}

impl PubSub {
    pub fn new() -> Self {
        Self::default()
    }

    /// `context` is a short label (e.g. the subscribing component's name)
    /// used only for tracing output.
    pub fn subscribe<F>(&self, topic: &str, context: &'static str, listener: F) -> Subscription
    where
        F: Fn(&BlockEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut listeners = self.listeners.lock().unwrap();
        listeners
            .entry(topic.to_string())
            .or_default()
            .push((id, context, Arc::new(listener)));
        Subscription {
            topic: topic.to_string(),
            id,
        }
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        let mut listeners = self.listeners.lock().unwrap();
        if let Some(list) = listeners.get_mut(&subscription.topic) {
            list.retain(|(id, _, _)| *id != subscription.id);
        }
    }

    pub fn publish(&self, topic: &str, payload: &BlockEvent) {
        let subscribers = {
            let listeners = self.listeners.lock().unwrap();
            listeners.get(topic).cloned().unwrap_or_default()
        };
        trace!(topic, subscribers = subscribers.len(), "pubsub: publishing");
        for (_, context, listener) in subscribers {
            trace!(topic, context, "pubsub: delivering");
            listener(payload);
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn delivers_in_subscription_order() {
        let bus = PubSub::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let o1 = order.clone();
        let o2 = order.clone();
        bus.subscribe("topic", "first", move |_| o1.lock().unwrap().push(1));
        bus.subscribe("topic", "second", move |_| o2.lock().unwrap().push(2));
        bus.publish("topic", &BlockEvent::new(sample_block()));
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn unsubscribed_listener_stops_receiving() {
        let bus = PubSub::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let sub = bus.subscribe("topic", "ctx", move |_| {
            h.fetch_add(1, Ordering::Relaxed);
        });
        bus.publish("topic", &BlockEvent::new(sample_block()));
        bus.unsubscribe(sub);
        bus.publish("topic", &BlockEvent::new(sample_block()));
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn publish_with_no_subscribers_is_a_noop() {
        let bus = PubSub::new();
        bus.publish("nobody-listens", &BlockEvent::new(sample_block()));
    }

    fn sample_block() -> types::ParentBlock {
        types::ParentBlock {
            hash: "h".to_string(),
            previous_hash: "p".to_string(),
            version: 1,
            schema_version: 1,
            height: 1,
            miner: "m".to_string(),
            difficulty: types::BigIntHex::from_u64(1),
            timestamp_s: 0,
            merkle_root: "r".to_string(),
            chain_root: "0".to_string(),
            distance: types::BigIntHex::zero(),
            total_distance: types::BigIntHex::zero(),
            nonce: String::new(),
            nrg_grant: 0,
            genesis: types::parent_block::GenesisParams {
                emblem: "e".to_string(),
                tx_fee_base: 0,
                tx_fee_per_byte: 0,
                nrg_target: 0,
            },
            tx_list: vec![],
            tx_count: 0,
            blockchain_headers_count: 0,
            blockchain_headers: types::ChildHeaderMap::new(),
            blockchain_fingerprints_root: String::new(),
        }
    }
}
