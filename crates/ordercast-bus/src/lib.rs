//! # ordercast-bus
//!
//! Event distribution for the ordercast service, in two layers:
//!
//! - **[`EventBus`]**: in-process publish/subscribe of [`OrderEvent`]s over a
//!   `tokio::sync::broadcast` channel. Best-effort and not durable; this is
//!   the live-notification path consumed by the dispatchers.
//! - **[`broker`]**: the durable broadcast fabric. One fan-out exchange
//!   delivers an independent copy of every published order to each bound
//!   queue (statistics, CRM, inventory), and a separate direct-routed
//!   statistics pipeline carries TTL'd stat records with a dead-letter queue.
//!
//! [`OrderEvent`]: ordercast_core::OrderEvent

#![deny(unsafe_code)]

pub mod broker;
pub mod bus;
pub mod consumers;

pub use broker::{
    Broker, BrokerConfig, Delivery, DurableQueue, Exchange, ExchangeKind, Message, PublishError,
    PublishReceipt, RedeliveryPolicy,
};
pub use bus::EventBus;
pub use consumers::{run_dead_letter_inspector, run_notify_consumer, run_stat_consumer};
