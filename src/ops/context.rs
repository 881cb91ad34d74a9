//! Engine context: all ambient authority, threaded explicitly.

use crate::layout::Layout;
use crate::resolver::ProviderRegistry;
use crate::store::Store;
use crate::types::Platform;

/// Groups the state every lifecycle operation needs. Built once at startup
/// (or per test) and passed by reference; nothing in the engine reaches for
/// globals.
pub struct EngineContext {
    pub store: Store,
    pub client: reqwest::Client,
    pub providers: ProviderRegistry,
    pub layout: Layout,
    pub platform: Platform,
}

impl EngineContext {
    pub fn new(
        store: Store,
        client: reqwest::Client,
        providers: ProviderRegistry,
        layout: Layout,
        platform: Platform,
    ) -> Self {
        Self {
            store,
            client,
            providers,
            layout,
            platform,
        }
    }
}
