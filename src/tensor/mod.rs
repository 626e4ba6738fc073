mod shape;
mod tensor;
pub mod layout;

pub use shape::{Dim, ShapeIndex, Slot};
pub use tensor::Tensor;
pub use layout::Layout;
