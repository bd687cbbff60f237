//! Ordering properties of the message queue

use olos_core::{MessageKind, MessageQueue, Priority};
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Low), Just(Priority::Mid), Just(Priority::High)]
}

proptest! {
    #[test]
    fn get_returns_high_before_mid_before_low_and_fifo_within(
        priorities in prop::collection::vec(priority_strategy(), 0..64)
    ) {
        let queue = MessageQueue::new();
        for (index, priority) in priorities.iter().enumerate() {
            queue.put(MessageKind::Normal, *priority, index);
        }

        let mut received = Vec::new();
        while let Some(message) = queue.try_get() {
            received.push((message.priority, message.payload));
        }
        prop_assert_eq!(received.len(), priorities.len());

        for pair in received.windows(2) {
            let (first_priority, first_index) = pair[0];
            let (second_priority, second_index) = pair[1];
            prop_assert!(first_priority >= second_priority);
            if first_priority == second_priority {
                prop_assert!(first_index < second_index);
            }
        }
    }

    #[test]
    fn high_priority_overtakes_pending_messages(
        pending in prop::collection::vec(
            prop_oneof![Just(Priority::Low), Just(Priority::Mid)],
            1..32
        )
    ) {
        let queue = MessageQueue::new();
        for priority in &pending {
            queue.put(MessageKind::Normal, *priority, "pending");
        }
        queue.put(MessageKind::RealTime, Priority::High, "urgent");

        prop_assert_eq!(queue.get().payload, "urgent");
    }
}

#[test]
fn concurrent_producers_lose_nothing() {
    let queue = Arc::new(MessageQueue::new());
    let producers: Vec<_> = (0..4)
        .map(|producer| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..250 {
                    queue.put(MessageKind::Normal, Priority::Mid, (producer, i));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let drained = queue.drain();
    assert_eq!(drained.len(), 1000);

    // Each producer's messages stay in the order that producer sent them.
    for producer in 0..4 {
        let sequence: Vec<i32> = drained
            .iter()
            .filter(|m| m.payload.0 == producer)
            .map(|m| m.payload.1)
            .collect();
        assert_eq!(sequence, (0..250).collect::<Vec<_>>());
    }
}
