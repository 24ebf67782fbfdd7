//! Canonical in-memory article table shared by every stage.

use arrow::datatypes::{DataType, Schema};

pub const YEAR: &str = "year";
pub const SCORE: &str = "score";
pub const SA_COUNT: &str = "n_sa";
pub const CIP_COUNT: &str = "n_cip";
pub const IMPACT_GROUP: &str = "impact_group";

/// Columns produced by the loader, in this order.
pub fn article_schema() -> Schema {
    schema! {
        YEAR => DataType::Int64, false;
        SCORE => DataType::Float64;
        SA_COUNT => DataType::Int64;
        CIP_COUNT => DataType::Int64;
    }
}

/// Loader columns plus the derived impact label.
pub fn labeled_schema() -> Schema {
    schema! {
        YEAR => DataType::Int64, false;
        SCORE => DataType::Float64;
        SA_COUNT => DataType::Int64;
        CIP_COUNT => DataType::Int64;
        IMPACT_GROUP => DataType::UInt8, false;
    }
}

/// The two independent category schemes summarized per article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryFamily {
    /// Subject areas (`NSAp`)
    Sa,
    /// Classification codes (`NCIPp`)
    Cip,
}

impl CategoryFamily {
    pub const ALL: [CategoryFamily; 2] = [CategoryFamily::Sa, CategoryFamily::Cip];

    pub fn column(self) -> &'static str {
        match self {
            CategoryFamily::Sa => SA_COUNT,
            CategoryFamily::Cip => CIP_COUNT,
        }
    }

    /// Prefix of the per-value fields in the JSON output.
    pub fn prefix(self) -> &'static str {
        match self {
            CategoryFamily::Sa => "sa",
            CategoryFamily::Cip => "cip",
        }
    }
}

/// Grouping key: one publication year and one impact group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub year: i64,
    pub impact_group: u8,
}

impl CellKey {
    pub fn new(year: i64, impact_group: u8) -> Self {
        Self { year, impact_group }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_keys_order_by_year_then_group() {
        let mut keys = vec![
            CellKey::new(2011, 0),
            CellKey::new(2010, 1),
            CellKey::new(2010, 0),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![CellKey::new(2010, 0), CellKey::new(2010, 1), CellKey::new(2011, 0)]
        );
    }

    #[test]
    fn labeled_schema_extends_article_schema() {
        let base = article_schema();
        let labeled = labeled_schema();
        assert_eq!(labeled.fields().len(), base.fields().len() + 1);
        for (a, b) in base.fields().iter().zip(labeled.fields().iter()) {
            assert_eq!(a, b);
        }
        assert!(labeled.field_with_name(IMPACT_GROUP).is_ok());
    }
}
