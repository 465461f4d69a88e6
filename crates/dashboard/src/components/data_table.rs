//! Data table component types.
//!
//! These types configure the tables rendered by `components/data_table.html`:
//! the header row, the filter bar and the empty state.

use serde::{Deserialize, Serialize};

use bluefitt_core::UserRole;

/// Column definition for a data table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableColumn {
    /// Unique key for the column.
    pub key: String,
    /// Display label for the column header.
    pub label: String,
    /// Right-align numeric cells.
    pub numeric: bool,
}

impl TableColumn {
    /// Create a new text column.
    #[must_use]
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            numeric: false,
        }
    }

    /// Create a new right-aligned numeric column.
    #[must_use]
    pub fn numeric(key: &str, label: &str) -> Self {
        Self {
            numeric: true,
            ..Self::new(key, label)
        }
    }
}

/// Option for select filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOption {
    /// Option value.
    pub value: String,
    /// Display label.
    pub label: String,
}

impl FilterOption {
    /// Create a new filter option.
    #[must_use]
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// Single-select filter submitted as a query parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableFilter {
    /// Query parameter key.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Label of the "no filter" option.
    pub all_label: String,
    /// Available options.
    pub options: Vec<FilterOption>,
    /// Currently selected value, empty for none.
    pub selected: String,
}

impl TableFilter {
    /// Create a select filter.
    #[must_use]
    pub fn select(key: &str, label: &str, all_label: &str, options: Vec<FilterOption>) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            all_label: all_label.to_string(),
            options,
            selected: String::new(),
        }
    }

    /// Mark `value` as the selected option.
    #[must_use]
    pub fn selected(mut self, value: Option<&str>) -> Self {
        self.selected = value.map(str::trim).unwrap_or_default().to_string();
        self
    }

    /// Whether `value` is the selected option.
    #[must_use]
    pub fn is_selected(&self, value: &str) -> bool {
        self.selected == value
    }
}

/// Configuration for a data table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTableConfig {
    /// Unique table identifier.
    pub table_id: String,
    /// Column definitions.
    pub columns: Vec<TableColumn>,
    /// Filter definitions.
    pub filters: Vec<TableFilter>,
    /// Icon for empty state.
    pub empty_icon: String,
    /// Title for empty state.
    pub empty_title: String,
    /// Description for empty state.
    pub empty_description: Option<String>,
}

impl DataTableConfig {
    /// Create a new data table configuration.
    #[must_use]
    pub fn new(table_id: &str) -> Self {
        Self {
            table_id: table_id.to_string(),
            columns: vec![],
            filters: vec![],
            empty_icon: "ph-list".to_string(),
            empty_title: "Sin resultados".to_string(),
            empty_description: None,
        }
    }

    /// Add a column.
    #[must_use]
    pub fn column(mut self, column: TableColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(mut self, filter: TableFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set empty state configuration.
    #[must_use]
    pub fn empty_state(mut self, icon: &str, title: &str, description: Option<&str>) -> Self {
        self.empty_icon = icon.to_string();
        self.empty_title = title.to_string();
        self.empty_description = description.map(ToString::to_string);
        self
    }

    /// Whether any filter is set.
    #[must_use]
    pub fn has_active_filter(&self) -> bool {
        self.filters.iter().any(|f| !f.selected.is_empty())
    }
}

/// Build the products table configuration.
///
/// `categories` feeds the category filter; `selected` is the current
/// `?category=` value.
#[must_use]
pub fn products_table_config(categories: &[String], selected: Option<&str>) -> DataTableConfig {
    let options = categories
        .iter()
        .map(|c| FilterOption::new(c, c))
        .collect();

    DataTableConfig::new("products")
        .column(TableColumn::new("image", ""))
        .column(TableColumn::new("code", "Código"))
        .column(TableColumn::new("name", "Producto"))
        .column(TableColumn::new("category", "Categoría"))
        .column(TableColumn::new("brand", "Marca"))
        .column(TableColumn::numeric("price", "Precio"))
        .column(TableColumn::numeric("stock", "Stock"))
        .filter(TableFilter::select("category", "Categoría", "Todas las categorías", options).selected(selected))
        .empty_state(
            "ph-package",
            "No hay productos",
            Some("Importa el catálogo con bf-cli o cambia el filtro de categoría."),
        )
}

/// Build the users table configuration.
#[must_use]
pub fn users_table_config() -> DataTableConfig {
    DataTableConfig::new("users")
        .column(TableColumn::new("name", "Nombre"))
        .column(TableColumn::new("email", "Correo"))
        .column(TableColumn::new("company", "Empresa"))
        .column(TableColumn::new("role", "Rol"))
        .column(TableColumn::new("created", "Creado"))
        .column(TableColumn::new("actions", ""))
        .empty_state("ph-users", "No hay usuarios", None)
}

/// Role options for the role selector.
#[must_use]
pub fn role_options() -> Vec<FilterOption> {
    UserRole::ALL
        .iter()
        .map(|role| FilterOption::new(role.as_str(), role.label()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_products_table_marks_selected_category() {
        let categories = vec!["Goteo".to_string(), "Valvula".to_string()];
        let config = products_table_config(&categories, Some(" Goteo "));

        assert_eq!(config.columns.len(), 7);
        let filter = config.filters.first().map(|f| (f.options.len(), f.is_selected("Goteo")));
        assert_eq!(filter, Some((2, true)));
        assert!(config.has_active_filter());

        assert!(!products_table_config(&categories, None).has_active_filter());
    }

    #[test]
    fn test_role_options_follow_role_order() {
        let values: Vec<String> = role_options().into_iter().map(|o| o.value).collect();
        assert_eq!(values, vec!["admin", "editor", "user"]);
    }
}
