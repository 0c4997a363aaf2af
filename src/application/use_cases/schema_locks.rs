use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per schema name. Writers to the same schema serialize;
/// writers to different schemas do not contend.
#[derive(Default)]
pub struct SchemaLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SchemaLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, schema_name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(schema_name.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_name_serializes() {
        let locks = SchemaLocks::new();
        let _guard = locks.acquire("orders").await;

        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire("orders")).await;

        assert!(second.is_err(), "second writer should wait for the first");
    }

    #[tokio::test]
    async fn different_names_do_not_contend() {
        let locks = SchemaLocks::new();
        let _guard = locks.acquire("orders").await;

        let other = tokio::time::timeout(Duration::from_millis(50), locks.acquire("customers")).await;

        assert!(other.is_ok());
    }
}
