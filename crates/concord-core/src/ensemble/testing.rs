//! Scripted backends for ensemble tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{Backend, BackendRegistry};
use crate::models::document::{Document, LineItem, ParserResult};

pub(crate) fn item(description: &str, quantity: f64, total_price: f64) -> LineItem {
    LineItem {
        description: description.to_string(),
        quantity,
        total_price,
        ..LineItem::default()
    }
}

pub(crate) fn result(name: &str, confidence: f64, items: Vec<LineItem>) -> ParserResult {
    ParserResult::succeeded(name, items, Default::default(), confidence)
}

pub(crate) fn document() -> Document {
    Document::new(b"Widget 10 ea 10.00 100.00".to_vec(), "quote.pdf")
}

enum Behaviour {
    Return(ParserResult),
    Panic,
}

/// A backend that replays a fixed outcome, optionally after a delay.
pub(crate) struct Stub {
    name: String,
    behaviour: Behaviour,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl Stub {
    pub(crate) fn returning(result: ParserResult) -> Self {
        Self {
            name: result.parser_name.clone(),
            behaviour: Behaviour::Return(result),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn ok(name: &str, confidence: f64, items: Vec<LineItem>) -> Self {
        Self::returning(result(name, confidence, items))
    }

    pub(crate) fn failing(name: &str) -> Self {
        Self::returning(ParserResult::failed(name, "scripted failure"))
    }

    pub(crate) fn panicking(name: &str) -> Self {
        Self {
            behaviour: Behaviour::Panic,
            ..Self::failing(name)
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Counter of `extract` invocations.
    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Backend for Stub {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(&self, _document: &Document) -> ParserResult {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behaviour {
            Behaviour::Return(result) => result.clone(),
            Behaviour::Panic => panic!("{} blew up", self.name),
        }
    }
}

pub(crate) fn registry(stubs: Vec<Stub>) -> Arc<BackendRegistry> {
    let mut registry = BackendRegistry::new();
    for stub in stubs {
        registry.register(Arc::new(stub));
    }
    Arc::new(registry)
}
