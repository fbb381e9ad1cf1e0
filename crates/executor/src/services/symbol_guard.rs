use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Symbols with an execution in flight. A symbol is claimed with
/// [`InFlightSymbols::try_claim`] and released when the guard drops.
#[derive(Clone, Default)]
pub struct InFlightSymbols {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl InFlightSymbols {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when the symbol is already claimed.
    pub fn try_claim(&self, symbol: &str) -> Option<SymbolGuard> {
        let mut set = lock(&self.inner);
        if !set.insert(symbol.to_string()) {
            return None;
        }
        Some(SymbolGuard {
            inner: Arc::clone(&self.inner),
            symbol: symbol.to_string(),
        })
    }
}

pub struct SymbolGuard {
    inner: Arc<Mutex<HashSet<String>>>,
    symbol: String,
}

impl Drop for SymbolGuard {
    fn drop(&mut self) {
        lock(&self.inner).remove(&self.symbol);
    }
}

// The set stays consistent even if a holder panicked mid-update.
fn lock(inner: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
