//! Resolves user-supplied taxonomy names into stored identifiers.

use crate::core::expense::{CanonicalReference, Taxonomy};
use crate::store::{ExpenseStore, Result};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Name lookups scoped to an owner or a parent category.
///
/// `Ok(None)` means the name does not exist in scope, which callers treat as
/// invalid input rather than a fault.
#[derive(Clone)]
pub struct ReferenceResolver {
    store: Arc<dyn ExpenseStore>,
}

impl ReferenceResolver {
    pub fn new(store: Arc<dyn ExpenseStore>) -> Self {
        Self { store }
    }

    pub async fn category(&self, user_id: Uuid, name: &str) -> Result<Option<CanonicalReference>> {
        let found = self.store.category_by_name(user_id, name).await?;
        debug!(%user_id, name, found = found.is_some(), "Resolved category");
        Ok(found.map(Into::into))
    }

    pub async fn subcategory(
        &self,
        category_id: Uuid,
        name: &str,
    ) -> Result<Option<CanonicalReference>> {
        let found = self.store.subcategory_by_name(category_id, name).await?;
        debug!(%category_id, name, found = found.is_some(), "Resolved subcategory");
        Ok(found.map(Into::into))
    }

    pub async fn payment_method(
        &self,
        user_id: Uuid,
        name: &str,
    ) -> Result<Option<CanonicalReference>> {
        let found = self.store.payment_method_by_name(user_id, name).await?;
        debug!(%user_id, name, found = found.is_some(), "Resolved payment method");
        Ok(found.map(Into::into))
    }

    pub async fn recurrent_expense(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<CanonicalReference>> {
        Ok(self
            .store
            .recurrent_expense_by_id(user_id, id)
            .await?
            .map(Into::into))
    }

    /// All names the owner can currently submit against.
    pub async fn taxonomy(&self, user_id: Uuid) -> Result<Taxonomy> {
        Ok(Taxonomy {
            categories: self.store.categories(user_id).await?,
            subcategories: self.store.subcategories(user_id).await?,
            payment_methods: self.store.payment_methods(user_id).await?,
            recurrent_expenses: self.store.recurrent_expenses(user_id).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expense::ReferenceScope;
    use crate::store::SqliteStore;

    #[tokio::test]
    async fn test_resolution_ignores_case() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let user = Uuid::new_v4();
        let food = store.add_category(user, "Food").await.unwrap();
        let resolver = ReferenceResolver::new(store);

        for name in ["food", "FOOD", "Food"] {
            let resolved = resolver.category(user, name).await.unwrap().unwrap();
            assert_eq!(resolved.id, food.id);
            assert_eq!(resolved.name, "Food");
            assert_eq!(resolved.scope, ReferenceScope::Owner(user));
        }
    }

    #[tokio::test]
    async fn test_subcategory_resolves_only_under_its_parent() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let user = Uuid::new_v4();
        let food = store.add_category(user, "Food").await.unwrap();
        let travel = store.add_category(user, "Travel").await.unwrap();
        let food_other = store.add_subcategory(food.id, "Other").await.unwrap();
        let travel_other = store.add_subcategory(travel.id, "Other").await.unwrap();
        let resolver = ReferenceResolver::new(store);

        let resolved = resolver.subcategory(travel.id, "other").await.unwrap().unwrap();
        assert_eq!(resolved.id, travel_other.id);
        assert_eq!(resolved.scope, ReferenceScope::Category(travel.id));
        assert_ne!(resolved.id, food_other.id);
    }

    #[tokio::test]
    async fn test_missing_names_are_not_errors() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let resolver = ReferenceResolver::new(store);
        let user = Uuid::new_v4();

        assert!(resolver.category(user, "Food").await.unwrap().is_none());
        assert!(resolver.payment_method(user, "Cash").await.unwrap().is_none());
        assert!(
            resolver
                .subcategory(Uuid::new_v4(), "Other")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_taxonomy_groups_subcategories_by_parent() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let user = Uuid::new_v4();
        let food = store.add_category(user, "Food").await.unwrap();
        let travel = store.add_category(user, "Travel").await.unwrap();
        store.add_subcategory(food.id, "Market").await.unwrap();
        store.add_subcategory(food.id, "Bakery").await.unwrap();
        store.add_subcategory(travel.id, "Hotels").await.unwrap();
        store.add_payment_method(user, "Cash").await.unwrap();
        let rent = store.add_recurrent_expense(user, "Rent").await.unwrap();
        let resolver = ReferenceResolver::new(store);

        let taxonomy = resolver.taxonomy(user).await.unwrap();
        assert_eq!(taxonomy.categories.len(), 2);
        let under_food: Vec<&str> = taxonomy
            .subcategories_of(food.id)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(under_food, vec!["Bakery", "Market"]);
        assert_eq!(taxonomy.payment_methods[0].name, "Cash");
        assert_eq!(taxonomy.recurrent_expenses, vec![rent]);

        assert_eq!(
            resolver.taxonomy(Uuid::new_v4()).await.unwrap(),
            Taxonomy::default()
        );
    }
}
