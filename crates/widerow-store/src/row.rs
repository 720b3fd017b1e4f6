/// A single `(family, qualifier) -> value` coordinate within a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    pub value: Vec<u8>,
}

impl Cell {
    pub fn new(family: &[u8], qualifier: &[u8], value: &[u8]) -> Self {
        Self {
            family: family.to_vec(),
            qualifier: qualifier.to_vec(),
            value: value.to_vec(),
        }
    }
}

/// Result of a row read. Cells are sorted by `(family, qualifier)`.
///
/// A row the store has nothing for is returned empty rather than absent,
/// so batch reads keep one slot per requested key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    key: Vec<u8>,
    cells: Vec<Cell>,
}

impl Row {
    pub fn new(key: Vec<u8>, mut cells: Vec<Cell>) -> Self {
        cells.sort_by(|a, b| (&a.family, &a.qualifier).cmp(&(&b.family, &b.qualifier)));
        Self { key, cells }
    }

    pub fn empty(key: Vec<u8>) -> Self {
        Self {
            key,
            cells: Vec::new(),
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn value(&self, family: &[u8], qualifier: &[u8]) -> Option<&[u8]> {
        self.cells
            .binary_search_by(|c| (c.family.as_slice(), c.qualifier.as_slice()).cmp(&(family, qualifier)))
            .ok()
            .map(|i| self.cells[i].value.as_slice())
    }

    /// Cells in `family`, in qualifier order.
    pub fn family_cells<'a>(&'a self, family: &'a [u8]) -> impl Iterator<Item = &'a Cell> + 'a {
        self.cells.iter().filter(move |c| c.family == family)
    }
}

/// Insert/overwrite of a set of cells in one row. Applied atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMutation {
    row: Vec<u8>,
    cells: Vec<Cell>,
}

impl RowMutation {
    pub fn new(row: Vec<u8>) -> Self {
        Self {
            row,
            cells: Vec::new(),
        }
    }

    pub fn add(&mut self, family: &[u8], qualifier: &[u8], value: &[u8]) -> &mut Self {
        self.cells.push(Cell::new(family, qualifier, value));
        self
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

/// Whole-row deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDeletion {
    row: Vec<u8>,
}

impl RowDeletion {
    pub fn new(row: Vec<u8>) -> Self {
        Self { row }
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }
}

/// Point read of one row, optionally narrowed by a cell filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowQuery {
    row: Vec<u8>,
    filter: Option<Filter>,
}

impl RowQuery {
    pub fn new(row: Vec<u8>) -> Self {
        Self { row, filter: None }
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn set_filter(&mut self, filter: Filter) -> &mut Self {
        self.filter = Some(filter);
        self
    }
}

/// Range read over `[start_row, stop_row)`. An empty `stop_row` means unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scan {
    start_row: Vec<u8>,
    stop_row: Vec<u8>,
    families: Vec<Vec<u8>>,
    caching: u32,
    small: bool,
    filter: Option<Filter>,
}

impl Scan {
    pub fn new(start_row: Vec<u8>, stop_row: Vec<u8>) -> Self {
        Self {
            start_row,
            stop_row,
            ..Default::default()
        }
    }

    pub fn add_family(mut self, family: &[u8]) -> Self {
        self.families.push(family.to_vec());
        self
    }

    /// Rows fetched per round trip. A hint for remote backends.
    pub fn caching(mut self, rows: u32) -> Self {
        self.caching = rows;
        self
    }

    /// Marks the scan as short-lived. A hint for remote backends.
    pub fn small(mut self, small: bool) -> Self {
        self.small = small;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn start_row(&self) -> &[u8] {
        &self.start_row
    }

    pub fn stop_row(&self) -> &[u8] {
        &self.stop_row
    }

    pub fn families(&self) -> &[Vec<u8>] {
        &self.families
    }

    pub fn caching_rows(&self) -> u32 {
        self.caching
    }

    pub fn is_small(&self) -> bool {
        self.small
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Whether `row` falls inside the scan range.
    pub fn contains(&self, row: &[u8]) -> bool {
        row >= self.start_row.as_slice() && (self.stop_row.is_empty() || row < self.stop_row.as_slice())
    }

    /// Whether a cell passes the family restriction and the filter.
    pub fn accepts(&self, cell: &Cell) -> bool {
        let family_ok = self.families.is_empty() || self.families.iter().any(|f| *f == cell.family);
        family_ok && self.filter.as_ref().is_none_or(|f| f.matches(cell))
    }
}

/// Cell-level predicate applied server side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Family(Vec<u8>),
    QualifierEquals(Vec<u8>),
    QualifierPrefix(Vec<u8>),
    /// Logical AND of every member.
    All(Vec<Filter>),
}

impl Filter {
    /// AND-compose two filters, flattening nested `All` lists.
    pub fn and(self, other: Filter) -> Filter {
        let mut members = Vec::new();
        for f in [self, other] {
            match f {
                Filter::All(inner) => members.extend(inner),
                f => members.push(f),
            }
        }
        Filter::All(members)
    }

    pub fn matches(&self, cell: &Cell) -> bool {
        match self {
            Filter::Family(family) => cell.family == *family,
            Filter::QualifierEquals(q) => cell.qualifier == *q,
            Filter::QualifierPrefix(prefix) => cell.qualifier.starts_with(prefix),
            Filter::All(members) => members.iter().all(|f| f.matches(cell)),
        }
    }
}
