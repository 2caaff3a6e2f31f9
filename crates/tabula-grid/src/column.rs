use std::fmt;
use std::sync::Arc;

use tabula_model::RowAccess;
use tabula_query::FilterSpec;

type CellFn<R> = dyn Fn(&R) -> String + Send + Sync;

/// One grid column: `{accessorKey, header, cell?, filter?, className?}`.
pub struct ColumnDef<R> {
    pub accessor_key: String,
    pub header: String,
    cell: Option<Arc<CellFn<R>>>,
    pub filter: Option<FilterSpec>,
    pub class_name: Option<String>,
}

impl<R> Clone for ColumnDef<R> {
    fn clone(&self) -> Self {
        Self {
            accessor_key: self.accessor_key.clone(),
            header: self.header.clone(),
            cell: self.cell.clone(),
            filter: self.filter.clone(),
            class_name: self.class_name.clone(),
        }
    }
}

impl<R> fmt::Debug for ColumnDef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("accessor_key", &self.accessor_key)
            .field("header", &self.header)
            .field("cell", &self.cell.as_ref().map(|_| "<fn>"))
            .field("filter", &self.filter)
            .field("class_name", &self.class_name)
            .finish()
    }
}

impl<R> ColumnDef<R> {
    pub fn new(accessor_key: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            accessor_key: accessor_key.into(),
            header: header.into(),
            cell: None,
            filter: None,
            class_name: None,
        }
    }

    /// Custom cell text instead of the raw field.
    pub fn with_cell(mut self, cell: impl Fn(&R) -> String + Send + Sync + 'static) -> Self {
        self.cell = Some(Arc::new(cell));
        self
    }

    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }
}

impl<R: RowAccess> ColumnDef<R> {
    pub fn render(&self, row: &R) -> String {
        match &self.cell {
            Some(cell) => cell(row),
            None => row
                .field_text(&self.accessor_key)
                .map(std::borrow::Cow::into_owned)
                .unwrap_or_default(),
        }
    }
}
