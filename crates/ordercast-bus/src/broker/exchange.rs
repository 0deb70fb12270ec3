//! Exchanges: routing between publishers and durable queues.

use std::sync::Arc;

use parking_lot::RwLock;

use super::delivery::Message;
use super::queue::DurableQueue;

/// How an exchange routes messages to its bound queues.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExchangeKind {
    /// Every bound queue receives a copy, routing key ignored.
    Fanout,
    /// Only queues whose binding pattern matches the routing key receive it.
    Direct,
}

struct Binding {
    pattern: String,
    queue: Arc<DurableQueue>,
}

/// A named exchange holding bindings to durable queues.
pub struct Exchange {
    name: String,
    kind: ExchangeKind,
    bindings: RwLock<Vec<Binding>>,
}

impl Exchange {
    /// Declare an exchange of the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ExchangeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            bindings: RwLock::new(Vec::new()),
        }
    }

    /// Exchange name as declared.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Routing kind.
    #[must_use]
    pub fn kind(&self) -> ExchangeKind {
        self.kind
    }

    /// Bind a queue. The pattern only matters on direct exchanges; a
    /// trailing `.#` segment matches any suffix of the routing key.
    pub fn bind(&self, pattern: impl Into<String>, queue: Arc<DurableQueue>) {
        self.bindings.write().push(Binding {
            pattern: pattern.into(),
            queue,
        });
    }

    /// Route a message to every matching queue. Returns how many queues
    /// accepted a copy.
    pub fn publish(&self, message: &Message) -> usize {
        let bindings = self.bindings.read();
        let mut matched = 0;
        for binding in bindings.iter() {
            let hit = match self.kind {
                ExchangeKind::Fanout => true,
                ExchangeKind::Direct => pattern_matches(&binding.pattern, &message.routing_key),
            };
            if hit {
                let _ = binding.queue.push(message);
                matched += 1;
            }
        }
        matched
    }
}

/// Match a binding pattern against a routing key. Patterns are literal
/// except for a trailing `.#`, which matches the bare prefix and any
/// dot-separated suffix under it.
fn pattern_matches(pattern: &str, routing_key: &str) -> bool {
    if pattern == "#" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix(".#") {
        return match routing_key.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        };
    }
    pattern == routing_key
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
