//! Domain model for SOAP 1.1 faults.

use serde::Serialize;
use std::fmt;

/// An application-level fault returned inside a SOAP body.
///
/// The upstream Axis engine fills `code` and `string` on every fault; `actor`
/// and `detail` are usually empty or carry the responding host name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SoapFault {
    /// Qualified fault code, e.g. `ns1:Server.NoService`.
    pub code: String,
    /// Human-readable fault description.
    pub string: String,
    /// URI of the node that raised the fault.
    pub actor: String,
    /// Flattened text content of the `detail` element.
    pub detail: String,
}

impl fmt::Display for SoapFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.string, self.code)
    }
}
