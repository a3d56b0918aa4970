use crate::Result;
use prometheus::{Registry, TextEncoder};

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

pub fn encode(registry: &Registry) -> Result<String> {
    let families = registry.gather();
    let body = TextEncoder::new().encode_to_string(&families)?;
    Ok(body)
}
