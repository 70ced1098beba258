//! SQLite tenant store: transactional reads plus a direct write sink.

use std::str::FromStr;

use async_trait::async_trait;
use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::warn;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::director::{DirectorError, DirectorGraphQLClient};
use crate::model::{BusinessTenantMapping, GraphQLTenantInput};
use crate::storage::schema::{BusinessTenantMappings, Labels, Runtimes, SCENARIOS_LABEL_KEY};
use crate::storage::{Result, StorageError, TenantTransaction, Transactioner};

/// Smallest pool that lets a mover transaction and a direct write coexist.
const MIN_CONNECTIONS: u32 = 2;

/// SQLite implementation of the tenant store.
#[derive(Clone)]
pub struct SqliteTenantStore {
    pool: SqlitePool,
}

impl SqliteTenantStore {
    /// Create a store over an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect using the configured URL and apply migrations.
    ///
    /// WAL lets a mover transaction keep reading while the direct write
    /// sink updates tenants on another connection. The pool never goes
    /// below two connections.
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(MIN_CONNECTIONS))
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/sqlite").run(&self.pool).await?;
        Ok(())
    }

    /// All stored tenants ordered by external ID.
    pub async fn tenants(&self) -> Result<Vec<BusinessTenantMapping>> {
        let query = select_tenants()
            .order_by(BusinessTenantMappings::ExternalTenant, sea_query::Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_mapping).collect()
    }

    /// Scope a runtime to the tenant with internal ID `tenant_id`.
    pub async fn add_runtime(&self, tenant_id: &str, runtime_id: &str, name: &str) -> Result<()> {
        let query = Query::insert()
            .into_table(Runtimes::Table)
            .columns([Runtimes::Id, Runtimes::TenantId, Runtimes::Name])
            .values_panic([runtime_id.into(), tenant_id.into(), name.into()])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    /// Set the scenarios label of a runtime as seen from `tenant_id`.
    pub async fn set_runtime_scenarios(
        &self,
        tenant_id: &str,
        runtime_id: &str,
        scenarios: &[&str],
    ) -> Result<()> {
        let value = serde_json::to_string(scenarios)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;

        let query = Query::insert()
            .into_table(Labels::Table)
            .columns([
                Labels::Id,
                Labels::TenantId,
                Labels::RuntimeId,
                Labels::Key,
                Labels::Value,
            ])
            .values_panic([
                Uuid::new_v4().to_string().into(),
                tenant_id.into(),
                runtime_id.into(),
                SCENARIOS_LABEL_KEY.into(),
                value.into(),
            ])
            .on_conflict(
                OnConflict::columns([Labels::TenantId, Labels::RuntimeId, Labels::Key])
                    .update_column(Labels::Value)
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    /// Resolve a parent reference that may be an internal or an external ID.
    async fn resolve_parent(conn: &mut SqliteConnection, parent: Option<&str>) -> Result<Option<String>> {
        let Some(parent) = parent else {
            return Ok(None);
        };

        let query = Query::select()
            .column(BusinessTenantMappings::Id)
            .from(BusinessTenantMappings::Table)
            .cond_where(
                sea_query::Cond::any()
                    .add(Expr::col(BusinessTenantMappings::Id).eq(parent))
                    .add(Expr::col(BusinessTenantMappings::ExternalTenant).eq(parent)),
            )
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;
        match row {
            Some(row) => Ok(Some(row.get("id"))),
            None => {
                warn!(parent, "Parent tenant not stored, writing tenant without parent");
                Ok(None)
            }
        }
    }

    async fn upsert_tenant(conn: &mut SqliteConnection, tenant: &GraphQLTenantInput) -> Result<()> {
        let parent = Self::resolve_parent(conn, tenant.parent.as_deref()).await?;

        let query = Query::insert()
            .into_table(BusinessTenantMappings::Table)
            .columns([
                BusinessTenantMappings::Id,
                BusinessTenantMappings::ExternalName,
                BusinessTenantMappings::ExternalTenant,
                BusinessTenantMappings::Parent,
                BusinessTenantMappings::Type,
                BusinessTenantMappings::ProviderName,
                BusinessTenantMappings::Subdomain,
                BusinessTenantMappings::Region,
                BusinessTenantMappings::LicenseType,
                BusinessTenantMappings::CustomerId,
            ])
            .values_panic([
                Uuid::new_v4().to_string().into(),
                tenant.name.clone().into(),
                tenant.external_tenant.clone().into(),
                parent.into(),
                tenant.tenant_type.as_str().into(),
                tenant.provider.clone().into(),
                tenant.subdomain.clone().into(),
                tenant.region.clone().into(),
                tenant.license_type.clone().into(),
                tenant.customer_id.clone().into(),
            ])
            .on_conflict(
                OnConflict::column(BusinessTenantMappings::ExternalTenant)
                    .update_columns([
                        BusinessTenantMappings::ExternalName,
                        BusinessTenantMappings::Parent,
                        BusinessTenantMappings::Type,
                        BusinessTenantMappings::ProviderName,
                        BusinessTenantMappings::Subdomain,
                        BusinessTenantMappings::Region,
                        BusinessTenantMappings::LicenseType,
                        BusinessTenantMappings::CustomerId,
                    ])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&mut *conn).await?;
        Ok(())
    }

    async fn write_batch(&self, tenants: &[GraphQLTenantInput]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for tenant in tenants {
            Self::upsert_tenant(&mut tx, tenant).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_batch(&self, tenants: &[GraphQLTenantInput]) -> Result<()> {
        if tenants.is_empty() {
            return Ok(());
        }
        let query = Query::delete()
            .from_table(BusinessTenantMappings::Table)
            .and_where(
                Expr::col(BusinessTenantMappings::ExternalTenant)
                    .is_in(tenants.iter().map(|t| t.external_tenant.clone())),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn update_one(&self, id: &str, tenant: &GraphQLTenantInput) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let parent = Self::resolve_parent(&mut conn, tenant.parent.as_deref()).await?;

        let query = Query::update()
            .table(BusinessTenantMappings::Table)
            .values([
                (BusinessTenantMappings::ExternalName, tenant.name.clone().into()),
                (BusinessTenantMappings::Parent, parent.into()),
                (BusinessTenantMappings::Type, tenant.tenant_type.as_str().into()),
                (BusinessTenantMappings::ProviderName, tenant.provider.clone().into()),
                (BusinessTenantMappings::Subdomain, tenant.subdomain.clone().into()),
                (BusinessTenantMappings::Region, tenant.region.clone().into()),
                (BusinessTenantMappings::LicenseType, tenant.license_type.clone().into()),
                (BusinessTenantMappings::CustomerId, tenant.customer_id.clone().into()),
            ])
            .and_where(Expr::col(BusinessTenantMappings::Id).eq(id))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&mut *conn).await?;
        Ok(())
    }
}

fn select_tenants() -> sea_query::SelectStatement {
    Query::select()
        .columns([
            BusinessTenantMappings::Id,
            BusinessTenantMappings::ExternalName,
            BusinessTenantMappings::ExternalTenant,
            BusinessTenantMappings::Parent,
            BusinessTenantMappings::Type,
            BusinessTenantMappings::ProviderName,
        ])
        .from(BusinessTenantMappings::Table)
        .to_owned()
}

fn row_to_mapping(row: &SqliteRow) -> Result<BusinessTenantMapping> {
    let tenant_type: String = row.get("type");
    Ok(BusinessTenantMapping {
        id: row.get("id"),
        name: row.get("external_name"),
        external_tenant: row.get("external_tenant"),
        parent: row.get("parent"),
        tenant_type: tenant_type.parse().map_err(StorageError::Corrupt)?,
        provider: row.get("provider_name"),
    })
}

#[async_trait]
impl Transactioner for SqliteTenantStore {
    async fn begin(&self) -> Result<Box<dyn TenantTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteTenantTransaction { tx: Some(tx) }))
    }
}

struct SqliteTenantTransaction {
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteTenantTransaction {
    fn conn(&mut self) -> Result<&mut Transaction<'static, Sqlite>> {
        self.tx.as_mut().ok_or(StorageError::TransactionClosed)
    }
}

#[async_trait]
impl TenantTransaction for SqliteTenantTransaction {
    async fn list_by_external_ids(
        &mut self,
        external_ids: &[String],
    ) -> Result<Vec<BusinessTenantMapping>> {
        if external_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = select_tenants()
            .and_where(
                Expr::col(BusinessTenantMappings::ExternalTenant).is_in(external_ids.iter().cloned()),
            )
            .to_string(SqliteQueryBuilder);

        let tx = self.conn()?;
        let rows = sqlx::query(&query).fetch_all(&mut **tx).await?;
        rows.iter().map(row_to_mapping).collect()
    }

    async fn get_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<BusinessTenantMapping>> {
        let query = select_tenants()
            .and_where(Expr::col(BusinessTenantMappings::ExternalTenant).eq(external_id))
            .to_string(SqliteQueryBuilder);

        let tx = self.conn()?;
        let row = sqlx::query(&query).fetch_optional(&mut **tx).await?;
        row.as_ref().map(row_to_mapping).transpose()
    }

    async fn list_runtimes(&mut self, tenant_id: &str) -> Result<Vec<String>> {
        let query = Query::select()
            .column(Runtimes::Id)
            .from(Runtimes::Table)
            .and_where(Expr::col(Runtimes::TenantId).eq(tenant_id))
            .order_by(Runtimes::Id, sea_query::Order::Asc)
            .to_string(SqliteQueryBuilder);

        let tx = self.conn()?;
        let rows = sqlx::query(&query).fetch_all(&mut **tx).await?;
        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn scenario_labels_for_runtimes(
        &mut self,
        tenant_id: &str,
        runtime_ids: &[String],
    ) -> Result<Vec<Vec<String>>> {
        if runtime_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::select()
            .column(Labels::Value)
            .from(Labels::Table)
            .and_where(Expr::col(Labels::TenantId).eq(tenant_id))
            .and_where(Expr::col(Labels::Key).eq(SCENARIOS_LABEL_KEY))
            .and_where(Expr::col(Labels::RuntimeId).is_in(runtime_ids.iter().cloned()))
            .to_string(SqliteQueryBuilder);

        let tx = self.conn()?;
        let rows = sqlx::query(&query).fetch_all(&mut **tx).await?;
        rows.iter()
            .map(|row| {
                let value: String = row.get("value");
                serde_json::from_str::<Vec<String>>(&value)
                    .map_err(|e| StorageError::Corrupt(format!("scenarios label: {}", e)))
            })
            .collect()
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self.tx.take().ok_or(StorageError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl DirectorGraphQLClient for SqliteTenantStore {
    async fn write_tenants(&self, tenants: &[GraphQLTenantInput]) -> std::result::Result<(), DirectorError> {
        self.write_batch(tenants)
            .await
            .map_err(|e| DirectorError::Store(e.to_string()))
    }

    async fn delete_tenants(&self, tenants: &[GraphQLTenantInput]) -> std::result::Result<(), DirectorError> {
        self.delete_batch(tenants)
            .await
            .map_err(|e| DirectorError::Store(e.to_string()))
    }

    async fn update_tenant(
        &self,
        id: &str,
        tenant: &GraphQLTenantInput,
    ) -> std::result::Result<(), DirectorError> {
        self.update_one(id, tenant)
            .await
            .map_err(|e| DirectorError::Store(e.to_string()))
    }
}
