//! # Template Repository
//!
//! Stored template bodies, one collection per [`TemplateKind`]. Within a kind,
//! each category (thermal, A4) has at most one default.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use tillbook_core::template::Template;
use tillbook_core::validation::validate_name;
use tillbook_core::{CoreError, DocumentTemplate, TemplateCategory, TemplateKind, TenantContext};

use crate::error::{DbError, DbResult};
use crate::path::{Collection, CollectionPath};
use crate::store::{self, DocumentStore};

const ENTITY: &str = "Template";

#[derive(Debug, Clone)]
pub struct TemplateRepository {
    store: DocumentStore,
}

impl TemplateRepository {
    pub fn new(store: DocumentStore) -> Self {
        TemplateRepository { store }
    }

    fn collection(tenant: &TenantContext, kind: TemplateKind) -> DbResult<CollectionPath> {
        Ok(CollectionPath::new(tenant.require()?, Collection::for_templates(kind)))
    }

    /// Creates or replaces a template. Saving a default clears the previous
    /// default of the same category in the same transaction.
    ///
    /// The body must parse; a broken template is rejected before anything
    /// is written.
    pub async fn save(&self, tenant: &TenantContext, template: &DocumentTemplate) -> DbResult<()> {
        let collection = Self::collection(tenant, template.kind)?;
        validate_name(&template.name).map_err(CoreError::from)?;
        Template::parse(&template.content)
            .map_err(|e| CoreError::invalid_input("content", e.to_string()))?;
        let mut tx = self.store.begin().await?;

        if template.is_default {
            clear_defaults(&mut *tx, &collection, template.category, &template.id).await?;
        }
        store::write_typed(&mut *tx, &collection.doc(&template.id), template, Utc::now()).await?;

        self.store.commit(tx).await?;
        debug!(template_id = %template.id, kind = ?template.kind, "Template saved");
        self.store.notify([collection]).await;
        Ok(())
    }

    pub async fn get(
        &self,
        tenant: &TenantContext,
        kind: TemplateKind,
        id: &str,
    ) -> DbResult<DocumentTemplate> {
        self.store
            .get(tenant, Collection::for_templates(kind), id)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    pub async fn list(
        &self,
        tenant: &TenantContext,
        kind: TemplateKind,
    ) -> DbResult<Vec<DocumentTemplate>> {
        self.store.list(tenant, Collection::for_templates(kind)).await
    }

    /// The default template for a kind and category, if one is marked.
    pub async fn default_for(
        &self,
        tenant: &TenantContext,
        kind: TemplateKind,
        category: TemplateCategory,
    ) -> DbResult<Option<DocumentTemplate>> {
        Ok(self
            .list(tenant, kind)
            .await?
            .into_iter()
            .find(|t| t.is_default && t.category == category))
    }

    /// Marks one template as the default of its category.
    pub async fn set_default(
        &self,
        tenant: &TenantContext,
        kind: TemplateKind,
        id: &str,
    ) -> DbResult<DocumentTemplate> {
        let collection = Self::collection(tenant, kind)?;
        let path = collection.doc(id);
        let mut tx = self.store.begin().await?;

        let mut template: DocumentTemplate = store::read_typed(&mut *tx, &path, ENTITY).await?;
        clear_defaults(&mut *tx, &collection, template.category, id).await?;
        template.is_default = true;
        store::write_typed(&mut *tx, &path, &template, Utc::now()).await?;

        self.store.commit(tx).await?;
        info!(template_id = %id, kind = ?kind, category = ?template.category, "Default template changed");
        self.store.notify([collection]).await;
        Ok(template)
    }

    pub async fn delete(&self, tenant: &TenantContext, kind: TemplateKind, id: &str) -> DbResult<bool> {
        self.store.delete(tenant, Collection::for_templates(kind), id).await
    }
}

/// Unsets `is_default` on every other template of `category`.
async fn clear_defaults(
    conn: &mut SqliteConnection,
    collection: &CollectionPath,
    category: TemplateCategory,
    keep_id: &str,
) -> DbResult<()> {
    let snapshot = store::load_snapshot(conn, collection).await?;
    let now = Utc::now();
    for mut template in snapshot.decode::<DocumentTemplate>()? {
        if template.is_default && template.category == category && template.id != keep_id {
            template.is_default = false;
            store::write_typed(conn, &collection.doc(&template.id), &template, now).await?;
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn template(id: &str, category: TemplateCategory, is_default: bool) -> DocumentTemplate {
        DocumentTemplate {
            id: id.to_string(),
            name: format!("Receipt {}", id),
            kind: TemplateKind::Receipt,
            category,
            locale: "en".to_string(),
            content: "<p>{{number}}</p>".to_string(),
            is_default,
        }
    }

    async fn setup() -> (TemplateRepository, TenantContext) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        (db.templates(), TenantContext::new("org-1"))
    }

    async fn defaults(repo: &TemplateRepository, org: &TenantContext) -> Vec<String> {
        repo.list(org, TemplateKind::Receipt)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.is_default)
            .map(|t| t.id)
            .collect()
    }

    #[tokio::test]
    async fn test_one_default_per_category() {
        let (repo, org) = setup().await;
        repo.save(&org, &template("t1", TemplateCategory::Thermal, true)).await.unwrap();
        repo.save(&org, &template("a4", TemplateCategory::A4, true)).await.unwrap();
        repo.save(&org, &template("t2", TemplateCategory::Thermal, true)).await.unwrap();

        assert_eq!(defaults(&repo, &org).await, vec!["a4", "t2"]);

        let thermal = repo
            .default_for(&org, TemplateKind::Receipt, TemplateCategory::Thermal)
            .await
            .unwrap();
        assert_eq!(thermal.unwrap().id, "t2");
    }

    #[tokio::test]
    async fn test_set_default_switches_atomically() {
        let (repo, org) = setup().await;
        repo.save(&org, &template("t1", TemplateCategory::Thermal, true)).await.unwrap();
        repo.save(&org, &template("t2", TemplateCategory::Thermal, false)).await.unwrap();

        let chosen = repo.set_default(&org, TemplateKind::Receipt, "t2").await.unwrap();
        assert!(chosen.is_default);
        assert_eq!(defaults(&repo, &org).await, vec!["t2"]);

        let missing = repo.set_default(&org, TemplateKind::Receipt, "nope").await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
        assert_eq!(defaults(&repo, &org).await, vec!["t2"]);
    }

    #[tokio::test]
    async fn test_unparsable_template_is_not_saved() {
        let (repo, org) = setup().await;
        repo.save(&org, &template("t1", TemplateCategory::Thermal, true)).await.unwrap();

        let mut broken = template("t2", TemplateCategory::Thermal, true);
        broken.content = "<p>{{#each items}}{{name}}</p>".to_string();
        let err = repo.save(&org, &broken).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidInput { .. })));

        let mut unnamed = template("t3", TemplateCategory::Thermal, false);
        unnamed.name = String::new();
        assert!(matches!(
            repo.save(&org, &unnamed).await,
            Err(DbError::Core(CoreError::Validation(_)))
        ));

        assert_eq!(defaults(&repo, &org).await, vec!["t1"]);
        assert_eq!(repo.list(&org, TemplateKind::Receipt).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_kinds_are_separate_collections() {
        let (repo, org) = setup().await;
        repo.save(&org, &template("t1", TemplateCategory::A4, true)).await.unwrap();

        assert!(repo.list(&org, TemplateKind::Invoice).await.unwrap().is_empty());
        assert!(repo
            .default_for(&org, TemplateKind::Invoice, TemplateCategory::A4)
            .await
            .unwrap()
            .is_none());
    }
}
