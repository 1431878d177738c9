mod inner;
pub mod spans;

pub use inner::{CallTree, MethodSamples};
pub use spans::{address_spans, sample_spans, AddressSpans};
