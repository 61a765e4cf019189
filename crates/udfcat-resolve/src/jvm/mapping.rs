//! Java type to column type mapping.

use udfcat_core::ColumnType;

/// Superclass every Java UDF must extend.
pub const UDF_BASE_CLASS: &str = "org.apache.hadoop.hive.ql.exec.UDF";

/// Method name of Java UDF entry points.
pub const ENTRY_POINT: &str = "evaluate";

/// Maps a Java parameter or return type to a column type, or `None` if the
/// type is not supported.
pub fn column_type(java_type: &str) -> Option<ColumnType> {
    let ty = match java_type {
        "boolean" | "java.lang.Boolean" | "org.apache.hadoop.io.BooleanWritable" => {
            ColumnType::Boolean
        }
        "byte"
        | "java.lang.Byte"
        | "org.apache.hadoop.io.ByteWritable"
        | "org.apache.hadoop.hive.serde2.io.ByteWritable" => ColumnType::TinyInt,
        "short"
        | "java.lang.Short"
        | "org.apache.hadoop.io.ShortWritable"
        | "org.apache.hadoop.hive.serde2.io.ShortWritable" => ColumnType::SmallInt,
        "int" | "java.lang.Integer" | "org.apache.hadoop.io.IntWritable" => ColumnType::Int,
        "long" | "java.lang.Long" | "org.apache.hadoop.io.LongWritable" => ColumnType::BigInt,
        "float" | "java.lang.Float" | "org.apache.hadoop.io.FloatWritable" => ColumnType::Float,
        "double"
        | "java.lang.Double"
        | "org.apache.hadoop.io.DoubleWritable"
        | "org.apache.hadoop.hive.serde2.io.DoubleWritable" => ColumnType::Double,
        "java.lang.String" | "org.apache.hadoop.io.Text" | "org.apache.hadoop.io.BytesWritable" => {
            ColumnType::String
        }
        _ => return None,
    };
    Some(ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_boxes_and_writables_agree() {
        for t in ["int", "java.lang.Integer", "org.apache.hadoop.io.IntWritable"] {
            assert_eq!(column_type(t), Some(ColumnType::Int));
        }
        assert_eq!(column_type("org.apache.hadoop.io.Text"), Some(ColumnType::String));
        assert_eq!(
            column_type("org.apache.hadoop.hive.serde2.io.ShortWritable"),
            Some(ColumnType::SmallInt)
        );
    }

    #[test]
    fn unsupported_types() {
        assert_eq!(column_type("void"), None);
        assert_eq!(column_type("char"), None);
        assert_eq!(column_type("java.math.BigDecimal"), None);
        assert_eq!(column_type("java.util.List"), None);
    }
}
