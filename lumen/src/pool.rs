//! Refcounted heap pool for compound values.
//!
//! The pool is a slab: cells are addressed by stable index and never move.
//! Releasing the last reference to a cell clears its payload, releases every
//! value it contained, and links the slot into a free list; later
//! allocations reuse freed slots before growing the slab. Payload storage is
//! retained until the pool itself is dropped.
//!
//! Ownership convention: a cell is created with refcount 1, owned by the
//! `Value` returned to the caller. Storing a value into a second live slot
//! (a local, an object field, an array element) acquires; consuming a slot
//! releases. Values are acyclic, so refcounting is complete.

use crate::value::{numbers_equal, CellRef, Value, ValueKind};

/// Payload of a heap cell
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Slot is on the free list
    Free,
    /// UTF-8 bytes of a string (treated opaquely)
    Str(String),
    /// Ordered object fields; names live only in the static type
    Fields(Vec<Value>),
    /// Array elements
    Elements(Vec<Value>),
}

#[derive(Debug)]
struct Cell {
    kind: ValueKind,
    refs: u32,
    payload: Payload,
}

/// The heap pool
#[derive(Debug, Default)]
pub struct ValuePool {
    cells: Vec<Cell>,
    freed: Vec<CellRef>,
}

impl ValuePool {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, kind: ValueKind, payload: Payload) -> CellRef {
        if let Some(index) = self.freed.pop() {
            let cell = &mut self.cells[index as usize];
            cell.kind = kind;
            cell.refs = 1;
            cell.payload = payload;
            index
        } else {
            let index = self.cells.len() as CellRef;
            self.cells.push(Cell {
                kind,
                refs: 1,
                payload,
            });
            index
        }
    }

    /// Allocate a string cell (copies the bytes) and return its value
    pub fn new_string(&mut self, text: &str) -> Value {
        Value::String(self.allocate(ValueKind::String, Payload::Str(text.to_string())))
    }

    /// Allocate an object cell from an ordered field sequence. The fields'
    /// references move into the cell.
    pub fn new_object(&mut self, fields: Vec<Value>) -> Value {
        Value::Object(self.allocate(ValueKind::Object, Payload::Fields(fields)))
    }

    /// Allocate an array cell from an ordered element sequence. The
    /// elements' references move into the cell.
    pub fn new_array(&mut self, elements: Vec<Value>) -> Value {
        Value::Array(self.allocate(ValueKind::Array, Payload::Elements(elements)))
    }

    /// Append to an array cell; the value's reference moves into the cell.
    pub fn array_push(&mut self, cell: CellRef, value: Value) {
        match &mut self.cells[cell as usize].payload {
            Payload::Elements(elements) => elements.push(value),
            other => panic!("array_push on a {:?} cell", other),
        }
    }

    /// Take one more reference to the cell behind `value`, if any
    pub fn acquire(&mut self, value: &Value) {
        if let Some(cell) = value.cell() {
            self.cells[cell as usize].refs += 1;
        }
    }

    /// Drop one reference. On reaching zero the payload is cleared, values
    /// it contained are released in turn, and the slot becomes reusable.
    pub fn release(&mut self, value: Value) {
        let Some(first) = value.cell() else {
            return;
        };

        // Iterative so deeply nested structures cannot blow the Rust stack.
        let mut pending = vec![first];
        while let Some(cell) = pending.pop() {
            let entry = &mut self.cells[cell as usize];
            entry.refs -= 1;
            if entry.refs > 0 {
                continue;
            }
            let payload = std::mem::replace(&mut entry.payload, Payload::Free);
            self.freed.push(cell);
            match payload {
                Payload::Free | Payload::Str(_) => {}
                Payload::Fields(values) | Payload::Elements(values) => {
                    pending.extend(values.iter().filter_map(|v| v.cell()));
                }
            }
        }
    }

    /// String payload of a cell
    pub fn string(&self, cell: CellRef) -> &str {
        match &self.cells[cell as usize].payload {
            Payload::Str(s) => s,
            other => panic!("string() on a {:?} cell", other),
        }
    }

    pub fn field_count(&self, cell: CellRef) -> usize {
        match &self.cells[cell as usize].payload {
            Payload::Fields(fields) => fields.len(),
            other => panic!("field_count() on a {:?} cell", other),
        }
    }

    pub fn field(&self, cell: CellRef, index: usize) -> Value {
        match &self.cells[cell as usize].payload {
            Payload::Fields(fields) => fields[index],
            other => panic!("field() on a {:?} cell", other),
        }
    }

    pub fn element_count(&self, cell: CellRef) -> usize {
        match &self.cells[cell as usize].payload {
            Payload::Elements(elements) => elements.len(),
            other => panic!("element_count() on a {:?} cell", other),
        }
    }

    pub fn element(&self, cell: CellRef, index: usize) -> Value {
        match &self.cells[cell as usize].payload {
            Payload::Elements(elements) => elements[index],
            other => panic!("element() on a {:?} cell", other),
        }
    }

    /// Structural equality: numbers with epsilon, strings by bytes, objects
    /// and arrays element-wise.
    pub fn values_equal(&self, a: Value, b: Value) -> bool {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
            (Value::Boolean(x), Value::Boolean(y)) => x == y,
            (Value::String(x), Value::String(y)) => self.string(x) == self.string(y),
            (Value::Object(x), Value::Object(y)) => {
                self.field_count(x) == self.field_count(y)
                    && (0..self.field_count(x))
                        .all(|i| self.values_equal(self.field(x, i), self.field(y, i)))
            }
            (Value::Array(x), Value::Array(y)) => {
                self.element_count(x) == self.element_count(y)
                    && (0..self.element_count(x))
                        .all(|i| self.values_equal(self.element(x, i), self.element(y, i)))
            }
            _ => false,
        }
    }

    /// Number of cells currently live (allocated and not freed)
    pub fn live_cells(&self) -> usize {
        self.cells.len() - self.freed.len()
    }

    /// Sum of refcounts over all live cells
    pub fn total_refs(&self) -> u64 {
        self.cells
            .iter()
            .filter(|c| !matches!(c.payload, Payload::Free))
            .map(|c| c.refs as u64)
            .sum()
    }

    /// Refcount of one cell (tests and debugging)
    pub fn refs(&self, cell: CellRef) -> u32 {
        self.cells[cell as usize].refs
    }
}
