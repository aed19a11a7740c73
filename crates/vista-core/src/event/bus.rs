// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// A generic, thread-safe broadcast channel.
///
/// Each call to [`EventBus::subscribe`] creates a fresh `flume` queue. Publishing
/// clones the event into every live queue; queues whose receiver was dropped are
/// pruned on the next publish.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + 'static> {
    subscribers: Mutex<Vec<flume::Sender<T>>>,
}

impl<T: Clone + Send + 'static> EventBus<T> {
    /// Creates a new EventBus with no subscribers.
    pub fn new() -> Self {
        log::debug!("EventBus initialized.");
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    // A subscriber list is valid after any panic, so poisoning is ignored.
    fn subscribers(&self) -> MutexGuard<'_, Vec<flume::Sender<T>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new subscriber and returns its receiving end.
    ///
    /// Only events published after this call are delivered.
    pub fn subscribe(&self) -> flume::Receiver<T> {
        let (sender, receiver) = flume::unbounded();
        self.subscribers().push(sender);
        receiver
    }

    /// Broadcasts an event to every live subscriber.
    ///
    /// ## Returns
    /// The number of subscribers the event was delivered to.
    pub fn publish(&self, event: T) -> usize {
        let mut subscribers = self.subscribers();
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
        log::trace!("Event broadcast to {} subscriber(s).", subscribers.len());
        subscribers.len()
    }

    /// Returns the number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flume::TryRecvError;
    use std::{sync::Arc, thread, time::Duration};

    /// A local, self-contained event enum for testing purposes.
    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Resized { width: u32, height: u32 },
        Level(u8),
        Shutdown,
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = EventBus::<TestEvent>::new();
        assert_eq!(bus.publish(TestEvent::Shutdown), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn every_subscriber_receives_every_event() {
        let bus = EventBus::<TestEvent>::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        assert_eq!(bus.publish(TestEvent::Level(1)), 2);
        assert_eq!(
            bus.publish(TestEvent::Resized {
                width: 4,
                height: 3
            }),
            2
        );

        for rx in [&first, &second] {
            assert_eq!(rx.try_recv(), Ok(TestEvent::Level(1)));
            assert_eq!(
                rx.try_recv(),
                Ok(TestEvent::Resized {
                    width: 4,
                    height: 3
                })
            );
            assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        }
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let bus = EventBus::<TestEvent>::new();
        bus.publish(TestEvent::Level(1));
        let late = bus.subscribe();
        bus.publish(TestEvent::Level(2));

        assert_eq!(late.try_recv(), Ok(TestEvent::Level(2)));
        assert_eq!(late.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = EventBus::<TestEvent>::new();
        let kept = bus.subscribe();
        let dropped = bus.subscribe();
        drop(dropped);

        assert_eq!(bus.publish(TestEvent::Shutdown), 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.try_recv(), Ok(TestEvent::Shutdown));
    }

    #[test]
    fn publish_from_thread() {
        let bus = Arc::new(EventBus::<TestEvent>::new());
        let receiver = bus.subscribe();
        let publisher = Arc::clone(&bus);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            publisher.publish(TestEvent::Level(3));
        });

        match receiver.recv_timeout(Duration::from_secs(1)) {
            Ok(received_event) => assert_eq!(received_event, TestEvent::Level(3)),
            Err(e) => panic!("Failed to receive event from thread: {e:?}"),
        }

        handle.join().expect("Thread join failed");
    }

    #[test]
    fn a_panicking_holder_does_not_wedge_the_bus() {
        let bus = Arc::new(EventBus::<TestEvent>::new());
        let rx = bus.subscribe();

        let holder = bus.clone();
        let crashed = thread::spawn(move || {
            let _guard = holder.subscribers.lock().unwrap();
            panic!("subscriber list holder crashed");
        })
        .join();
        assert!(crashed.is_err());
        assert!(bus.subscribers.is_poisoned());

        assert_eq!(bus.publish(TestEvent::Level(7)), 1);
        assert_eq!(rx.try_recv(), Ok(TestEvent::Level(7)));
        let _late = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }
}
