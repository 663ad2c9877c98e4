//! Tables handled by quantmerge

mod de_table;
mod expression;
mod mapping;
mod metadata;

pub use de_table::{DeSummary, DeTable, LOG2FC_COLUMN, PADJ_COLUMN, PVALUE_COLUMN};
pub use expression::ExpressionMatrix;
pub use mapping::{HeaderRule, IdMapping};
pub use metadata::SampleMetadata;
