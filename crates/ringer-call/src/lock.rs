use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// 按键加锁
///
/// 只串行化同一个键上的操作，不同键互不阻塞。
/// 没有持有者也没有等待者的键会在守卫释放时移出表。
#[derive(Debug, Default, Clone)]
pub struct KeyedLock {
    table: LockTable,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: impl Into<String>) -> KeyGuard {
        let key = key.into();
        let entry = {
            let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            table
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let guard = entry.lock_owned().await;
        KeyGuard {
            key,
            table: self.table.clone(),
            guard: Some(guard),
        }
    }

    /// 当前表中的键数量
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 持有期间独占对应的键
#[derive(Debug)]
pub struct KeyGuard {
    key: String,
    table: LockTable,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.guard.take();

        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        // 表自身持有一份引用，等于 1 说明没有其他持有者或等待者
        if table
            .get(&self.key)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            table.remove(&self.key);
        }
    }
}
