pub mod document;
pub mod payment;
pub mod product;

pub use document::{Document, DocumentService};
pub use payment::{Payment, PaymentId, PaymentValidator};
pub use product::{Product, ProductId, ProductMerge, ProductPatch, ProductService};
