use crate::error::{JointError, JointResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ARENA_ID: AtomicU64 = AtomicU64::new(1);

/// Typed reference to a table inside one [`TableArena`]. The handle never owns
/// the table and is checked against the arena it is resolved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableHandle {
    arena: u64,
    index: u32,
}

/// Read-only table collaborator consumed by the models. Implementations must
/// tolerate concurrent reads from many contacts.
pub trait TableLookup {
    fn table_index_from_id(&self, id: &str) -> Option<TableHandle>;
    fn y_from_x(&self, handle: TableHandle, x: f64) -> Option<f64>;
    fn slope_from_x(&self, handle: TableHandle, x: f64) -> Option<f64>;
}

/// Piecewise linear function given by sorted `(x, y)` points. Outside the
/// range of the points the end values are held constant.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    points: Vec<(f64, f64)>,
}

impl Table {
    pub fn new(name: impl Into<String>, mut points: Vec<(f64, f64)>) -> JointResult<Self> {
        let name = name.into();
        if points.is_empty() {
            return Err(JointError::configuration(
                "table",
                format!("table '{name}' has no points"),
            ));
        }
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(JointError::configuration(
                "table",
                format!("table '{name}' contains non-finite points"),
            ));
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self { name, points })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    fn segment(&self, x: f64) -> Option<usize> {
        let n = self.points.len();
        if n < 2 || x <= self.points[0].0 || x >= self.points[n - 1].0 {
            return None;
        }
        let upper = self.points.partition_point(|p| p.0 <= x);
        Some(upper - 1)
    }

    pub fn y_from_x(&self, x: f64) -> f64 {
        let n = self.points.len();
        match self.segment(x) {
            Some(i) => {
                let (x0, y0) = self.points[i];
                let (x1, y1) = self.points[i + 1];
                let dx = x1 - x0;
                if dx <= 0.0 {
                    y1
                } else {
                    y0 + (y1 - y0) * (x - x0) / dx
                }
            }
            None if x <= self.points[0].0 => self.points[0].1,
            None => self.points[n - 1].1,
        }
    }

    pub fn slope_from_x(&self, x: f64) -> f64 {
        match self.segment(x) {
            Some(i) => {
                let (x0, y0) = self.points[i];
                let (x1, y1) = self.points[i + 1];
                let dx = x1 - x0;
                if dx <= 0.0 {
                    0.0
                } else {
                    (y1 - y0) / dx
                }
            }
            None => 0.0,
        }
    }
}

/// Owner of all tables of a simulation; models only ever hold handles into it.
#[derive(Debug)]
pub struct TableArena {
    id: u64,
    tables: Vec<Table>,
    by_name: HashMap<String, usize>,
}

impl Default for TableArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TableArena {
    pub fn new() -> Self {
        Self {
            id: NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed),
            tables: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Adds a table, replacing an existing table of the same name in place so
    /// that handles to it stay valid.
    pub fn insert(&mut self, table: Table) -> TableHandle {
        let index = match self.by_name.get(table.name()) {
            Some(&index) => {
                self.tables[index] = table;
                index
            }
            None => {
                let index = self.tables.len();
                self.by_name.insert(table.name().to_string(), index);
                self.tables.push(table);
                index
            }
        };
        TableHandle {
            arena: self.id,
            index: index as u32,
        }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn get(&self, handle: TableHandle) -> Option<&Table> {
        if handle.arena != self.id {
            return None;
        }
        self.tables.get(handle.index as usize)
    }
}

impl TableLookup for TableArena {
    fn table_index_from_id(&self, id: &str) -> Option<TableHandle> {
        self.by_name.get(id).map(|&index| TableHandle {
            arena: self.id,
            index: index as u32,
        })
    }

    fn y_from_x(&self, handle: TableHandle, x: f64) -> Option<f64> {
        self.get(handle).map(|table| table.y_from_x(x))
    }

    fn slope_from_x(&self, handle: TableHandle, x: f64) -> Option<f64> {
        self.get(handle).map(|table| table.slope_from_x(x))
    }
}
