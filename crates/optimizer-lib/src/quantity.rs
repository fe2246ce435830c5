//! Kubernetes resource quantity parsing
//!
//! Converts quantity strings such as `150m`, `2`, `500Mi` or `1.5Gi` into
//! integer millicores and bytes.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid quantity: {0:?}")]
pub struct QuantityError(pub String);

/// Parse a CPU quantity into millicores, rounding fractions up
pub fn parse_cpu_millicores(quantity: &str) -> Result<u64, QuantityError> {
    let q = quantity.trim();
    let (number, scale) = if let Some(v) = q.strip_suffix('n') {
        (v, 1e-6)
    } else if let Some(v) = q.strip_suffix('u') {
        (v, 1e-3)
    } else if let Some(v) = q.strip_suffix('m') {
        (v, 1.0)
    } else {
        (q, 1000.0)
    };

    let value = parse_number(number).ok_or_else(|| QuantityError(quantity.to_string()))?;
    // Snap to nanocores first so float noise cannot push an exact value up
    let nanocores = (value * scale * 1e6).round();
    Ok((nanocores / 1e6).ceil() as u64)
}

/// Parse a memory quantity into bytes
pub fn parse_memory_bytes(quantity: &str) -> Result<u64, QuantityError> {
    const SUFFIXES: &[(&str, f64)] = &[
        ("Ki", 1024.0),
        ("Mi", 1024.0 * 1024.0),
        ("Gi", 1024.0 * 1024.0 * 1024.0),
        ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
        ("Pi", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
        ("Ei", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
        ("k", 1e3),
        ("K", 1e3),
        ("M", 1e6),
        ("G", 1e9),
        ("T", 1e12),
        ("P", 1e15),
        ("E", 1e18),
        ("m", 1e-3),
    ];

    let q = quantity.trim();
    let (number, scale) = SUFFIXES
        .iter()
        .find_map(|(suffix, scale)| q.strip_suffix(suffix).map(|n| (n, *scale)))
        .unwrap_or((q, 1.0));

    let value = parse_number(number).ok_or_else(|| QuantityError(quantity.to_string()))?;
    Ok((value * scale).round() as u64)
}

fn parse_number(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}
