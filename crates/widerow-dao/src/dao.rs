use std::fmt;
use std::sync::Arc;

use tracing::{error, warn};
use widerow_model::{Catalog, Decoded, Model, ModelCodec, SchemaRegistry};
use widerow_store::{Row, RowScanner, Scan, StoreError};

use crate::error::{CrudCause, CrudError, DaoError, ErrorCode};
use crate::session::SessionManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Put,
    Get,
    Delete,
    BatchPut,
    BatchGet,
    BatchDelete,
    Scan,
    Count,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Put => "put",
            Operation::Get => "get",
            Operation::Delete => "delete",
            Operation::BatchPut => "batch_put",
            Operation::BatchGet => "batch_get",
            Operation::BatchDelete => "batch_delete",
            Operation::Scan => "scan",
            Operation::Count => "count",
        })
    }
}

/// Row operations for one model type.
///
/// Every call takes its own table handle from the session and releases it
/// before returning. Store failures are classified into a [`CrudError`];
/// store and I/O classes also make the session reload its configuration.
pub struct CrudDao<M: Model> {
    session: Arc<SessionManager>,
    codec: ModelCodec,
    catalog: Arc<Catalog<M>>,
}

impl<M: Model> CrudDao<M> {
    /// Resolves the model's schema and initializes the session. A table that
    /// cannot be opened yet is logged, not returned.
    pub fn new(session: Arc<SessionManager>, registry: Arc<SchemaRegistry>) -> Result<Self, DaoError> {
        let catalog = registry.resolve::<M>()?;
        session.initialize()?;
        let dao = Self {
            session,
            codec: ModelCodec::new(registry),
            catalog,
        };
        if let Err(e) = dao.session.table(dao.table_name()) {
            error!(model = model_name::<M>(), table = dao.table_name(), error = %e, "failed to open table");
        }
        Ok(dao)
    }

    pub fn with_codec(mut self, codec: ModelCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn table_name(&self) -> &str {
        self.catalog.table_name()
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn codec(&self) -> &ModelCodec {
        &self.codec
    }

    // ── Single row ──────────────────────────────────────────

    /// Write every set field of `model`. `None` is a no-op returning false.
    pub fn put(&self, model: Option<&M>) -> Result<bool, DaoError> {
        let Some(model) = model else {
            return Ok(false);
        };
        let op = Operation::Put;
        let table = self.session.table(self.table_name())?;
        let mutation = self.codec.to_insert(model).map_err(|e| self.fail(op, e.into()))?;
        table.put(&mutation).map_err(|e| self.fail(op, e.into()))?;
        Ok(true)
    }

    /// Remove the whole row of `model`. `None` is a no-op returning false.
    pub fn delete(&self, model: Option<&M>) -> Result<bool, DaoError> {
        let Some(model) = model else {
            return Ok(false);
        };
        let op = Operation::Delete;
        let table = self.session.table(self.table_name())?;
        let deletion = self.codec.to_delete(model).map_err(|e| self.fail(op, e.into()))?;
        table.delete(&deletion).map_err(|e| self.fail(op, e.into()))?;
        Ok(true)
    }

    /// Fill unset fields of `model` from its row. True when anything was assigned.
    pub fn get(&self, model: Option<&mut M>) -> Result<bool, DaoError> {
        match model {
            Some(model) => Ok(self.fetch(model)?.is_populated()),
            None => Ok(false),
        }
    }

    /// Like [`get`](Self::get), but tells a missing row apart from a row with
    /// nothing left to assign.
    pub fn fetch(&self, model: &mut M) -> Result<Decoded, DaoError> {
        let op = Operation::Get;
        let table = self.session.table(self.table_name())?;
        let query = self.codec.to_query(model).map_err(|e| self.fail(op, e.into()))?;
        let row = table.get(&query).map_err(|e| self.fail(op, e.into()))?;
        self.codec
            .from_row(model, &row)
            .map_err(|e| self.fail(op, e.into()))
    }

    // ── Batches ─────────────────────────────────────────────

    /// One slot per input, in input order; a slot is true when the store
    /// acknowledged that write. Any raised error fails the whole batch.
    pub fn batch_put(&self, models: Option<&[M]>) -> Result<Vec<bool>, DaoError> {
        let models = match models {
            Some(models) if !models.is_empty() => models,
            _ => return Ok(Vec::new()),
        };
        let op = Operation::BatchPut;
        let table = self.session.table(self.table_name())?;
        let mutations = models
            .iter()
            .map(|m| self.codec.to_insert(m))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.fail(op, e.into()))?;
        let outcomes = table.put_many(&mutations).map_err(|e| self.fail(op, e.into()))?;
        Ok(self.acknowledged(op, models.len(), outcomes))
    }

    pub fn batch_delete(&self, models: Option<&[M]>) -> Result<Vec<bool>, DaoError> {
        let models = match models {
            Some(models) if !models.is_empty() => models,
            _ => return Ok(Vec::new()),
        };
        let op = Operation::BatchDelete;
        let table = self.session.table(self.table_name())?;
        let deletions = models
            .iter()
            .map(|m| self.codec.to_delete(m))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.fail(op, e.into()))?;
        let outcomes = table.delete_many(&deletions).map_err(|e| self.fail(op, e.into()))?;
        Ok(self.acknowledged(op, models.len(), outcomes))
    }

    /// Slot `i` is true when decoding row `i` assigned anything into `models[i]`.
    pub fn batch_get(&self, models: Option<&mut [M]>) -> Result<Vec<bool>, DaoError> {
        let models = match models {
            Some(models) if !models.is_empty() => models,
            _ => return Ok(Vec::new()),
        };
        let op = Operation::BatchGet;
        let table = self.session.table(self.table_name())?;
        let queries = models
            .iter()
            .map(|m| self.codec.to_query(m))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.fail(op, e.into()))?;
        let rows = table.get_many(&queries).map_err(|e| self.fail(op, e.into()))?;

        let mut results = Vec::with_capacity(models.len());
        for (i, model) in models.iter_mut().enumerate() {
            let populated = match rows.get(i) {
                Some(row) => self
                    .codec
                    .from_row(model, row)
                    .map_err(|e| self.fail(op, e.into()))?
                    .is_populated(),
                None => false,
            };
            results.push(populated);
        }
        Ok(results)
    }

    // ── Range reads ─────────────────────────────────────────

    /// Decode every row of `scan` into a fresh model, keeping those that
    /// received at least one field. `None` returns nothing without touching
    /// the store.
    pub fn scan(&self, scan: Option<&Scan>) -> Result<Vec<M>, DaoError> {
        let Some(scan) = scan else {
            return Ok(Vec::new());
        };
        let op = Operation::Scan;
        let table = self.session.table(self.table_name())?;
        let mut scanner = table.scan(scan).map_err(|e| self.fail(op, e.into()))?;

        let mut models = Vec::new();
        let drained = drain(scanner.as_mut(), |row| {
            let mut model = M::default();
            if self.codec.from_row(&mut model, &row)?.is_populated() {
                models.push(model);
            }
            Ok(())
        });
        close_scanner(self.table_name(), scanner.as_mut());
        drained.map_err(|cause| self.fail(op, cause))?;
        Ok(models)
    }

    /// Number of rows `scan` yields. `None` counts zero without touching the store.
    pub fn count(&self, scan: Option<&Scan>) -> Result<usize, DaoError> {
        let Some(scan) = scan else {
            return Ok(0);
        };
        let op = Operation::Count;
        let table = self.session.table(self.table_name())?;
        let mut scanner = table.scan(scan).map_err(|e| self.fail(op, e.into()))?;

        let mut count = 0;
        let drained = drain(scanner.as_mut(), |_| {
            count += 1;
            Ok(())
        });
        close_scanner(self.table_name(), scanner.as_mut());
        drained.map_err(|cause| self.fail(op, cause))?;
        Ok(count)
    }

    // ── Failure handling ────────────────────────────────────

    fn fail(&self, op: Operation, cause: CrudCause) -> DaoError {
        let code = match &cause {
            CrudCause::Store(e) => ErrorCode::classify(e),
            CrudCause::Model(_) => ErrorCode::UnknownError,
        };
        if code.invalidates_connection() {
            self.session.on_store_failure();
        }
        error!(
            model = model_name::<M>(),
            op = %op,
            code = code.code(),
            error = %cause,
            "operation failed"
        );
        CrudError::new(code, format!("{op} error"), Some(cause)).into()
    }

    fn acknowledged(
        &self,
        op: Operation,
        len: usize,
        outcomes: Vec<Result<(), StoreError>>,
    ) -> Vec<bool> {
        let mut results = vec![false; len];
        for (i, outcome) in outcomes.into_iter().take(len).enumerate() {
            match outcome {
                Ok(()) => results[i] = true,
                Err(e) => warn!(
                    model = model_name::<M>(),
                    op = %op,
                    index = i,
                    error = %e,
                    "batch item not acknowledged"
                ),
            }
        }
        results
    }
}

fn drain<'s>(
    scanner: &mut (dyn RowScanner + 's),
    mut visit: impl FnMut(Row) -> Result<(), CrudCause>,
) -> Result<(), CrudCause> {
    for row in scanner {
        visit(row?)?;
    }
    Ok(())
}

fn close_scanner<'s>(table: &str, scanner: &mut (dyn RowScanner + 's)) {
    if let Err(e) = scanner.close() {
        error!(table, error = %e, "failed to close scanner");
    }
}

fn model_name<M>() -> &'static str {
    let full = std::any::type_name::<M>();
    full.rsplit("::").next().unwrap_or(full)
}
