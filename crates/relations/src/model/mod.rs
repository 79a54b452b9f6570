//! Model Module - Record type descriptors and key handling

pub mod core_trait;
pub mod descriptor;
pub mod naming;
pub mod primary_key;

pub use core_trait::Model;
pub use descriptor::TableDescriptor;
pub use primary_key::PrimaryKey;
