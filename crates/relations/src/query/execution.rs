//! Query Builder execution against a [`QueryExecutor`]

use tracing::debug;

use crate::backends::QueryExecutor;
use crate::error::ModelResult;
use crate::model::Model;
use crate::relationships::eager::load_includes;
use crate::relationships::ResultSet;
use crate::row::Row;

use super::builder::QueryBuilder;

impl<M> QueryBuilder<M> {
    /// Execute the query and return raw rows
    pub async fn rows(self, executor: &dyn QueryExecutor) -> ModelResult<Vec<Row>> {
        self.criteria.require_table()?;
        debug!(table = ?self.criteria.table(), conditions = self.criteria.conditions().len(), "fetching rows");
        executor.fetch_all(&self.criteria).await
    }

    /// Count matching rows; the builder is left untouched for further use
    pub async fn count(&self, executor: &dyn QueryExecutor) -> ModelResult<i64> {
        self.criteria.require_table()?;
        executor.count(&self.criteria).await
    }

    /// Insert a row into the builder's table
    pub async fn insert(self, executor: &dyn QueryExecutor, row: Row) -> ModelResult<bool> {
        let table = self.criteria.require_table()?;
        executor.insert(table, row).await
    }

    /// Delete the rows matching the accumulated conditions
    pub async fn delete(self, executor: &dyn QueryExecutor) -> ModelResult<u64> {
        self.criteria.require_table()?;
        executor.delete(&self.criteria).await
    }
}

impl<M: Model> QueryBuilder<M> {
    /// Execute query and return models, resolving requested includes
    pub async fn all(mut self, executor: &dyn QueryExecutor) -> ModelResult<ResultSet<M>> {
        let includes = std::mem::take(&mut self.includes);
        let rows = self.rows(executor).await?;

        let mut models = rows
            .into_iter()
            .map(M::from_row)
            .collect::<ModelResult<Vec<M>>>()?;

        load_includes(&mut models, &includes, executor).await?;
        Ok(ResultSet::new(models))
    }

    /// Execute query and return first model
    pub async fn first(self, executor: &dyn QueryExecutor) -> ModelResult<Option<M>> {
        let results = self.limit(1).all(executor).await?;
        Ok(results.into_iter().next())
    }
}
