//! Minimal OGC well-known-binary encoding for 2-D polygons.
//!
//! Layout: byte-order marker (u8), geometry type (u32), ring count (u32),
//! then per ring a point count (u32) followed by `x, y` pairs (f64).

use crate::error::{BenchError, BenchResult};

pub const WKB_POLYGON: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Big endian, marker 0.
    Xdr,
    /// Little endian, marker 1.
    Ndr,
}

impl ByteOrder {
    fn marker(self) -> u8 {
        match self {
            ByteOrder::Xdr => 0,
            ByteOrder::Ndr => 1,
        }
    }

    fn put_u32(self, buf: &mut Vec<u8>, v: u32) {
        match self {
            ByteOrder::Xdr => buf.extend_from_slice(&v.to_be_bytes()),
            ByteOrder::Ndr => buf.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn put_f64(self, buf: &mut Vec<u8>, v: f64) {
        match self {
            ByteOrder::Xdr => buf.extend_from_slice(&v.to_be_bytes()),
            ByteOrder::Ndr => buf.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn read_u32(self, b: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Xdr => u32::from_be_bytes(b),
            ByteOrder::Ndr => u32::from_le_bytes(b),
        }
    }
}

/// An `(x, y)` coordinate.
pub type Coord = [f64; 2];

/// The closed triangle inserted by the geometry benchmark.
pub const BENCH_POLYGON: [Coord; 4] = [[1.0, 2.0], [3.0, 4.0], [5.0, 6.0], [1.0, 2.0]];

/// Encode a polygon given as a list of rings (exterior ring first).
pub fn encode_polygon(rings: &[&[Coord]], order: ByteOrder) -> Vec<u8> {
    let points: usize = rings.iter().map(|r| r.len()).sum();
    let mut buf = Vec::with_capacity(9 + rings.len() * 4 + points * 16);

    buf.push(order.marker());
    order.put_u32(&mut buf, WKB_POLYGON);
    order.put_u32(&mut buf, rings.len() as u32);
    for ring in rings {
        order.put_u32(&mut buf, ring.len() as u32);
        for &[x, y] in ring.iter() {
            order.put_f64(&mut buf, x);
            order.put_f64(&mut buf, y);
        }
    }
    buf
}

/// Byte order and geometry type read from the first five bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WkbHeader {
    pub order: ByteOrder,
    pub geometry_type: u32,
}

/// Check that `bytes` starts with a plausible WKB header.
pub fn read_header(bytes: &[u8]) -> BenchResult<WkbHeader> {
    let (&marker, rest) = bytes
        .split_first()
        .ok_or_else(|| BenchError::InvalidInput("empty WKB payload".into()))?;
    let order = match marker {
        0 => ByteOrder::Xdr,
        1 => ByteOrder::Ndr,
        other => {
            return Err(BenchError::InvalidInput(format!(
                "bad WKB byte order marker {other}"
            )));
        }
    };
    let type_bytes: [u8; 4] = rest
        .get(..4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| BenchError::InvalidInput("truncated WKB header".into()))?;
    let geometry_type = order.read_u32(type_bytes);
    // ISO Z/M/ZM variants add 1000/2000/3000 to the base type.
    if !(1..=7).contains(&(geometry_type % 1000)) {
        return Err(BenchError::InvalidInput(format!(
            "unknown WKB geometry type {geometry_type}"
        )));
    }
    Ok(WkbHeader {
        order,
        geometry_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndr_polygon_layout() {
        let wkb = encode_polygon(&[&BENCH_POLYGON[..]], ByteOrder::Ndr);
        assert_eq!(wkb.len(), 1 + 4 + 4 + 4 + 4 * 16);
        assert_eq!(wkb[0], 1);
        assert_eq!(&wkb[1..5], &3u32.to_le_bytes());
        assert_eq!(&wkb[5..9], &1u32.to_le_bytes());
        assert_eq!(&wkb[9..13], &4u32.to_le_bytes());
        assert_eq!(&wkb[13..21], &1.0f64.to_le_bytes());
        assert_eq!(&wkb[21..29], &2.0f64.to_le_bytes());
    }

    #[test]
    fn xdr_uses_big_endian() {
        let wkb = encode_polygon(&[&BENCH_POLYGON[..]], ByteOrder::Xdr);
        assert_eq!(wkb[0], 0);
        assert_eq!(&wkb[1..5], &3u32.to_be_bytes());
    }

    #[test]
    fn header_round_trip() {
        for order in [ByteOrder::Ndr, ByteOrder::Xdr] {
            let wkb = encode_polygon(&[&BENCH_POLYGON[..]], order);
            let header = read_header(&wkb).unwrap();
            assert_eq!(header.order, order);
            assert_eq!(header.geometry_type, WKB_POLYGON);
        }
    }

    #[test]
    fn header_rejects_garbage() {
        assert!(read_header(&[]).is_err());
        assert!(read_header(&[7, 3, 0, 0, 0]).is_err());
        assert!(read_header(&[1, 3, 0]).is_err());
        assert!(read_header(&[1, 99, 0, 0, 0]).is_err());
    }
}
