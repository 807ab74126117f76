//! Shared test utilities for integration tests.
//!
//! Provides a small inventory service with both protobuf and JSON methods,
//! plus helpers to wire it to a consumer backed by an in-memory event sink.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rpcqueue_kernel::{
    CallContext, Consumer, Json, MemorySink, MethodDesc, RegistrationError, ServiceDesc, Status,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Fully qualified name of the inventory service.
pub const INVENTORY: &str = "shop.Inventory";

/// Protobuf request adding stock for one item.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Restock {
    /// Item identifier.
    #[prost(string, tag = "1")]
    pub sku: String,
    /// Units to add.
    #[prost(uint32, tag = "2")]
    pub quantity: u32,
}

/// JSON request removing stock for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserve {
    /// Item identifier.
    pub sku: String,
    /// Units to remove.
    pub quantity: u32,
}

/// Server side of the inventory service.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Adds stock.
    async fn restock(&self, ctx: CallContext, request: Restock) -> Result<(), Status>;
    /// Removes stock, failing when not enough is on hand.
    async fn reserve(&self, ctx: CallContext, request: Reserve) -> Result<(), Status>;
}

/// Descriptor binding every `Inventory` method.
pub fn inventory_desc() -> ServiceDesc<dyn Inventory> {
    ServiceDesc::new(INVENTORY)
        .with_interface(["Restock", "Reserve"])
        .method(MethodDesc::unary(
            "Restock",
            |svc: Arc<dyn Inventory>, ctx, request: Restock| async move {
                svc.restock(ctx, request).await
            },
        ))
        .method(MethodDesc::unary(
            "Reserve",
            |svc: Arc<dyn Inventory>, ctx, Json(request): Json<Reserve>| async move {
                svc.reserve(ctx, request).await
            },
        ))
}

/// In-memory inventory that records every call it handles.
#[derive(Default)]
pub struct Warehouse {
    stock: Mutex<HashMap<String, u32>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl Warehouse {
    /// Creates a warehouse whose handlers sleep for `delay` before running.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Units on hand for `sku`.
    pub fn on_hand(&self, sku: &str) -> u32 {
        self.stock.lock().get(sku).copied().unwrap_or(0)
    }

    /// Calls handled so far, as `Method:sku`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Inventory for Warehouse {
    async fn restock(&self, _ctx: CallContext, request: Restock) -> Result<(), Status> {
        self.pause().await;
        self.calls.lock().push(format!("Restock:{}", request.sku));
        *self.stock.lock().entry(request.sku).or_default() += request.quantity;
        Ok(())
    }

    async fn reserve(&self, _ctx: CallContext, request: Reserve) -> Result<(), Status> {
        self.pause().await;
        self.calls.lock().push(format!("Reserve:{}", request.sku));
        let mut stock = self.stock.lock();
        let on_hand = stock.entry(request.sku).or_default();
        if *on_hand < request.quantity {
            return Err(Status::failed_precondition("insufficient stock"));
        }
        *on_hand -= request.quantity;
        Ok(())
    }
}

/// A consumer with the inventory service registered.
pub struct Harness {
    /// The consumer under test.
    pub consumer: Arc<Consumer>,
    /// The registered implementation.
    pub warehouse: Arc<Warehouse>,
    /// Every event the consumer emitted.
    pub events: Arc<MemorySink>,
}

impl Harness {
    /// Registers `warehouse` on a fresh consumer.
    pub fn new(warehouse: Warehouse) -> Result<Self, RegistrationError> {
        let events = Arc::new(MemorySink::new());
        let consumer = Consumer::with_events(events.clone());
        let warehouse = Arc::new(warehouse);
        consumer.register(&inventory_desc(), warehouse.clone() as Arc<dyn Inventory>)?;
        Ok(Self {
            consumer: Arc::new(consumer),
            warehouse,
            events,
        })
    }
}

/// Builds a `Restock` request.
pub fn restock(sku: &str, quantity: u32) -> Restock {
    Restock {
        sku: sku.to_string(),
        quantity,
    }
}

/// Builds a JSON `Reserve` request.
pub fn reserve(sku: &str, quantity: u32) -> Json<Reserve> {
    Json(Reserve {
        sku: sku.to_string(),
        quantity,
    })
}
