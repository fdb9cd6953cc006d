//! Batch request construction and response demultiplexing
//!
//! Gmail's batch endpoint bundles N thread lookups into one HTTP call:
//! the request is a `multipart/mixed` body with one embedded GET per
//! thread, and the response is a `multipart/mixed` body with one
//! embedded HTTP response per part, in no guaranteed order.
//!
//! The two halves are deliberately separate modules so the ad-hoc
//! response scanner can be swapped for a strict RFC 2046 parser
//! without touching request construction or any caller.

mod request;
mod response;

pub use request::{build_batch_body, make_boundary};
pub use response::{parse_batch_response, BatchOutcome};
