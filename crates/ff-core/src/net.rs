use orion_error::StructError;

use crate::error::{CoreReason, CoreResult};

// ---------------------------------------------------------------------------
// IPv4 address & CIDR block arithmetic
// ---------------------------------------------------------------------------

/// Parse a dotted-quad IPv4 address into its 32-bit integer form
/// `(o0<<24)|(o1<<16)|(o2<<8)|o3`.
pub(crate) fn parse_ipv4(text: &str) -> CoreResult<u32> {
    let parts: Vec<&str> = text.split('.').collect();
    if parts.len() != 4 {
        return StructError::from(CoreReason::Domain)
            .with_detail(format!("invalid IPv4 address {text:?}: expected four octets"))
            .err();
    }
    let mut addr: u32 = 0;
    for part in parts {
        let octet: u8 = part.parse().map_err(|_| {
            StructError::from(CoreReason::Domain)
                .with_detail(format!("invalid IPv4 octet {part:?} in {text:?}"))
        })?;
        addr = (addr << 8) | u32::from(octet);
    }
    Ok(addr)
}

/// Parse `A.B.C.D` or `A.B.C.D/w` into the inclusive
/// `(network, broadcast)` pair under the given prefix width (default 32).
pub(crate) fn parse_cidr(text: &str) -> CoreResult<(u32, u32)> {
    let (addr_text, width) = match text.split_once('/') {
        Some((addr, w)) => {
            let width: u32 = w.parse().map_err(|_| {
                StructError::from(CoreReason::Domain)
                    .with_detail(format!("invalid prefix width {w:?} in {text:?}"))
            })?;
            if width > 32 {
                return StructError::from(CoreReason::Domain)
                    .with_detail(format!("prefix width {width} out of range in {text:?}"))
                    .err();
            }
            (addr, width)
        }
        None => (text, 32),
    };
    let addr = parse_ipv4(addr_text)?;
    let host_bits = 32 - width;
    let host_mask: u32 = if host_bits == 32 {
        u32::MAX
    } else {
        (1u32 << host_bits) - 1
    };
    let network = addr & !host_mask;
    Ok((network, network | host_mask))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
