
pub mod wrap_matrix;
