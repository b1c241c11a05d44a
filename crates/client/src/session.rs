//! Per-login bundle of stores.

use std::sync::Arc;

use crate::api::StorefrontApi;
use crate::stores::{CartStore, ProductStore, UserStore};

/// Everything a signed-in client caches, created at login and passed by
/// reference to whatever renders it.
pub struct ClientSession {
    pub products: ProductStore,
    pub users: UserStore,
    pub cart: CartStore,
}

impl ClientSession {
    #[must_use]
    pub fn new(api: Arc<dyn StorefrontApi>) -> Self {
        Self {
            products: ProductStore::new(Arc::clone(&api)),
            users: UserStore::new(api),
            cart: CartStore::new(),
        }
    }

    /// Reset every store. Call at logout.
    pub fn clear(&mut self) {
        self.products.clear();
        self.users.clear();
        self.cart.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use virtual_craft_core::ExternalIdentity;

    use super::*;
    use crate::testing::fake;

    #[tokio::test]
    async fn test_clear_resets_all_stores() {
        let (api, dyn_api) = fake();
        let vase = api.add_product("Vase", 2999);
        let mut session = ClientSession::new(dyn_api);

        session.products.fetch_all().await.unwrap();
        session.cart.add(&vase);
        session
            .users
            .login_with_identity(&ExternalIdentity {
                email: "maker@example.com".to_string(),
                name: "Maker".to_string(),
                picture: None,
            })
            .await
            .unwrap();

        session.clear();
        assert!(session.products.products().is_empty());
        assert!(session.users.current().is_none());
        assert!(session.cart.is_empty());
    }
}
