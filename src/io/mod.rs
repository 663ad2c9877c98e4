//! Input/Output operations

mod quant;
mod tsv;

pub use quant::{read_quant_column, QuantColumn};
pub use tsv::{
    read_de_table, read_expression_matrix, read_metadata, write_de_table, write_expression_matrix,
    MISSING,
};
pub(crate) use tsv::format_value;
