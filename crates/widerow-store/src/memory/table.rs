use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::StoreError;
use crate::row::{Cell, Filter, Row, RowDeletion, RowMutation, RowQuery, Scan};
use crate::table::{RowScanner, Table};

use super::store::{MemoryStore, RowCells, TableData};

pub(crate) struct MemoryTable {
    name: String,
    store: Arc<MemoryStore>,
    data: Arc<ArcSwap<TableData>>,
    closed: bool,
}

impl MemoryTable {
    pub(crate) fn new(name: String, store: Arc<MemoryStore>, data: Arc<ArcSwap<TableData>>) -> Self {
        Self {
            name,
            store,
            data,
            closed: false,
        }
    }

    fn check_open(&self) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn read_row(data: &TableData, key: &[u8], filter: Option<&Filter>) -> Row {
        match data.get(key) {
            Some(cells) => Row::new(key.to_vec(), collect_cells(cells, |c| {
                filter.is_none_or(|f| f.matches(c))
            })),
            None => Row::empty(key.to_vec()),
        }
    }

    fn apply_put(data: &mut TableData, mutation: &RowMutation) -> Result<(), StoreError> {
        if mutation.cells().is_empty() {
            return Err(StoreError::Other("mutation has no cells".into()));
        }
        let row = data.entry(mutation.row().to_vec()).or_insert_with(RowCells::new);
        for cell in mutation.cells() {
            row.insert(
                (cell.family.clone(), cell.qualifier.clone()),
                cell.value.clone(),
            );
        }
        Ok(())
    }
}

fn collect_cells(cells: &RowCells, keep: impl Fn(&Cell) -> bool) -> Vec<Cell> {
    cells
        .iter()
        .map(|((family, qualifier), value)| Cell {
            family: family.clone(),
            qualifier: qualifier.clone(),
            value: value.clone(),
        })
        .filter(|c| keep(c))
        .collect()
}

impl Table for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, query: &RowQuery) -> Result<Row, StoreError> {
        self.check_open()?;
        let snapshot = self.data.load();
        Ok(Self::read_row(&snapshot, query.row(), query.filter()))
    }

    fn get_many(&self, queries: &[RowQuery]) -> Result<Vec<Row>, StoreError> {
        self.check_open()?;
        let snapshot = self.data.load();
        Ok(queries
            .iter()
            .map(|q| Self::read_row(&snapshot, q.row(), q.filter()))
            .collect())
    }

    fn scan<'a>(&'a self, scan: &Scan) -> Result<Box<dyn RowScanner + 'a>, StoreError> {
        self.check_open()?;
        let snapshot = self.data.load();
        let rows: Vec<Row> = snapshot
            .range(scan.start_row().to_vec()..)
            .take_while(|(key, _)| scan.contains(key))
            .map(|(key, cells)| Row::new(key.clone(), collect_cells(cells, |c| scan.accepts(c))))
            .filter(|row| !row.is_empty())
            .collect();
        Ok(Box::new(MemoryScanner {
            rows: rows.into_iter(),
            closed: false,
        }))
    }

    fn put(&self, mutation: &RowMutation) -> Result<(), StoreError> {
        self.check_open()?;
        self.store
            .write(&self.data, |data| Self::apply_put(data, mutation))
    }

    fn put_many(
        &self,
        mutations: &[RowMutation],
    ) -> Result<Vec<Result<(), StoreError>>, StoreError> {
        self.check_open()?;
        Ok(self.store.write(&self.data, |data| {
            mutations
                .iter()
                .map(|m| Self::apply_put(data, m))
                .collect()
        }))
    }

    fn delete(&self, deletion: &RowDeletion) -> Result<(), StoreError> {
        self.check_open()?;
        self.store.write(&self.data, |data| {
            data.remove(deletion.row());
        });
        Ok(())
    }

    fn delete_many(
        &self,
        deletions: &[RowDeletion],
    ) -> Result<Vec<Result<(), StoreError>>, StoreError> {
        self.check_open()?;
        Ok(self.store.write(&self.data, |data| {
            deletions
                .iter()
                .map(|d| {
                    data.remove(d.row());
                    Ok(())
                })
                .collect()
        }))
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.closed = true;
        Ok(())
    }
}

struct MemoryScanner {
    rows: std::vec::IntoIter<Row>,
    closed: bool,
}

impl Iterator for MemoryScanner {
    type Item = Result<Row, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        self.rows.next().map(Ok)
    }
}

impl RowScanner for MemoryScanner {
    fn close(&mut self) -> Result<(), StoreError> {
        self.closed = true;
        Ok(())
    }
}
