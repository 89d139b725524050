//! # Distributed and topic-driven bus contracts.
//!
//! The core is strictly in-process; these traits define the surface a
//! distributed wrapper (JMS/Kafka/MQTT-style transports) exposes on top of
//! it. A wrapper translates inbound remote messages into local
//! [`EventBus`](crate::EventBus) publishes and, optionally, forwards local
//! publishes outward for subscribed topics. No implementation lives in this
//! crate.

use async_trait::async_trait;

use crate::core::bus::EventBus;
use crate::error::BusError;

/// An event bus backed by a remote cluster or broker.
#[async_trait]
pub trait DistributedBus: EventBus {
    /// Connects to the remote bus/cluster.
    async fn connect(&self) -> Result<(), BusError>;

    /// Disconnects from the remote bus/cluster.
    async fn disconnect(&self) -> Result<(), BusError>;
}

/// A distributed bus with named-channel (topic) routing.
#[async_trait]
pub trait TopicBus: DistributedBus {
    /// Subscribes to a topic; inbound messages on it become local publishes.
    async fn subscribe(&self, topic: &str) -> Result<(), BusError>;

    /// Unsubscribes from a previously subscribed topic.
    async fn unsubscribe(&self, topic: &str) -> Result<(), BusError>;

    /// The currently active topic subscriptions; empty if none.
    fn subscriptions(&self) -> Vec<String>;
}
