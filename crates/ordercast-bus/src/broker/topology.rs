//! Names of the exchanges, queues, and bindings the broker declares.
//!
//! Two pipelines share the broker. Order notifications fan out to three
//! durable queues so statistics, CRM, and inventory consumers each get their
//! own copy. Order statistics ride a direct exchange into a TTL'd queue whose
//! expired messages are dead-lettered for inspection.

use std::time::Duration;

/// Fan-out exchange for order notifications.
pub const FANOUT_EXCHANGE: &str = "order.fanout.exchange";

/// Statistics copy of the order notification stream.
pub const QUEUE_STAT: &str = "order.notify.queue.stat";

/// CRM copy of the order notification stream.
pub const QUEUE_CRM: &str = "order.notify.queue.crm";

/// Inventory copy of the order notification stream.
pub const QUEUE_INVENTORY: &str = "order.notify.queue.inventory";

/// All queues bound to the fan-out exchange.
pub const NOTIFY_QUEUES: [&str; 3] = [QUEUE_STAT, QUEUE_CRM, QUEUE_INVENTORY];

/// Direct exchange for the order statistics pipeline.
pub const STAT_EXCHANGE: &str = "order.stat.exchange";

/// TTL'd queue on the statistics pipeline.
pub const STAT_QUEUE: &str = "order.stat.queue";

/// Dead-letter exchange receiving expired statistics messages.
pub const STAT_DLX: &str = "order.stat.dlx";

/// Dead-letter queue bound to [`STAT_DLX`].
pub const STAT_DLQ: &str = "order.stat.dlq";

/// Binding pattern used on both the statistics queue and its dead-letter
/// queue.
pub const STAT_BINDING: &str = "order.stat.#";

/// Routing key for order-creation statistics records.
pub const STAT_CREATE_KEY: &str = "order.stat.create";

/// Default TTL on [`STAT_QUEUE`].
pub const STAT_DEFAULT_TTL: Duration = Duration::from_millis(120_000);

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
