// Macro for creating Arrow schema fields
macro_rules! field {
    ($name:expr, $data_type:expr) => {
        arrow::datatypes::Field::new($name, $data_type, true)
    };
    ($name:expr, $data_type:expr, $nullable:expr) => {
        arrow::datatypes::Field::new($name, $data_type, $nullable)
    };
}

// Macro for creating schemas with less boilerplate
macro_rules! schema {
    ($($name:expr => $data_type:expr $(, $nullable:expr)?);* $(;)?) => {
        arrow::datatypes::Schema::new(vec![
            $(field!($name, $data_type $(, $nullable)?),)*
        ])
    };
}

// Macro for creating record batches with less boilerplate
macro_rules! record_batch {
    ($schema:expr, $($array:expr),* $(,)?) => {
        arrow::record_batch::RecordBatch::try_new(
            std::sync::Arc::new($schema),
            vec![$($array,)*],
        )
    };
}

// Macro for looking up a typed column on the canonical table
macro_rules! typed_column {
    ($batch:expr, $name:expr, $array_type:ty, $expected:expr) => {
        $batch
            .column_by_name($name)
            .ok_or_else(|| $crate::errors::TransformError::MissingColumn($name.to_string()))?
            .as_any()
            .downcast_ref::<$array_type>()
            .ok_or_else(|| $crate::errors::TransformError::ColumnType {
                column: $name.to_string(),
                expected: $expected,
            })?
    };
}
