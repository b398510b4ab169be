//! `ConfirmedPrivateTransfer`: a vendor escape hatch for
//! service parameters this engine doesn't otherwise interpret. The
//! block is opaque here; the object model (or a vendor-specific layer
//! above it) is responsible for understanding `service_parameters`.

use crate::codec::composite::{encode_closing, encode_opening, expect_closing, expect_opening};
use crate::codec::primitive;
use crate::codec::tag::TagClass;
use crate::error::CodecError;

/// `ConfirmedPrivateTransfer-Request`: `vendorID`(0), `serviceNumber`(1),
/// optional opaque `serviceParameters`(2) wrapped in a constructed tag
/// per clause 23.1 (its internal structure is vendor-defined).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedPrivateTransfer {
    /// Vendor identifier, per the ASHRAE-maintained vendor ID registry.
    pub vendor_id: u16,
    /// Vendor-assigned service number.
    pub service_number: u32,
    /// Opaque vendor-defined parameters, verbatim bytes inside the
    /// constructed tag — this engine doesn't decode their contents.
    pub service_parameters: Option<Vec<u8>>,
}

impl ConfirmedPrivateTransfer {
    /// Encode.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i =
            primitive::wrap_context(out, 0, |b| primitive::encode_unsigned(b, u64::from(self.vendor_id)))?;
        i += primitive::wrap_context(&mut out[i..], 1, |b| {
            primitive::encode_unsigned(b, u64::from(self.service_number))
        })?;
        if let Some(params) = &self.service_parameters {
            i += encode_opening(&mut out[i..], 2)?;
            if out.len() < i + params.len() {
                return Err(CodecError::BufferTooSmall { needed: i + params.len(), available: out.len() });
            }
            out[i..i + params.len()].copy_from_slice(params);
            i += params.len();
            i += encode_closing(&mut out[i..], 2)?;
        }
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::MissingRequiredField`] if `vendorID`/`serviceNumber`
    /// is absent.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (vendor_id, mut i) = primitive::decode_context_unsigned(buf, 0)
            .map_err(|_| CodecError::MissingRequiredField("vendorID"))?;
        let (service_number, c) = primitive::decode_context_unsigned(&buf[i..], 1)
            .map_err(|_| CodecError::MissingRequiredField("serviceNumber"))?;
        i += c;
        let mut service_parameters = None;
        if i < buf.len() {
            if let Ok(t) = primitive::peek_tag(&buf[i..]) {
                if t.class == TagClass::Context && t.is_opening(2) {
                    let open_len = expect_opening(&buf[i..], 2)?;
                    i += open_len;
                    let start = i;
                    while !primitive::peek_tag(&buf[i..])?.is_closing(2) {
                        // Skip one tagged element at a time without
                        // interpreting it; only its length matters here.
                        i += skip_one_element(&buf[i..])?;
                    }
                    service_parameters = Some(buf[start..i].to_vec());
                    i += expect_closing(&buf[i..], 2)?;
                }
            }
        }
        Ok((Self { vendor_id: vendor_id as u16, service_number: service_number as u32, service_parameters }, i))
    }
}

/// Skip exactly one application- or context-tagged element (primitive or
/// fully-nested constructed), returning the bytes consumed. Used to scan
/// over opaque vendor payload without interpreting it.
fn skip_one_element(buf: &[u8]) -> Result<usize, CodecError> {
    let (t, tag_len) = crate::codec::tag::decode_tag(buf)?;
    match t.length {
        crate::codec::tag::TagLength::Opening => {
            let mut i = tag_len;
            loop {
                let inner = primitive::peek_tag(&buf[i..])?;
                if inner.is_closing(t.number) {
                    i += crate::codec::tag::decode_tag(&buf[i..])?.1;
                    break;
                }
                i += skip_one_element(&buf[i..])?;
            }
            Ok(i)
        }
        crate::codec::tag::TagLength::Closing => {
            Err(CodecError::MalformedAscii("unexpected closing tag while skipping".to_string()))
        }
        crate::codec::tag::TagLength::Value(n) => Ok(tag_len + n as usize),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_without_parameters() {
        let r = ConfirmedPrivateTransfer { vendor_id: 260, service_number: 9, service_parameters: None };
        let mut buf = [0u8; 16];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = ConfirmedPrivateTransfer::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);
    }

    #[test]
    fn round_trips_with_opaque_parameters() {
        let mut params = Vec::new();
        params.extend_from_slice(&{
            let mut b = [0u8; 8];
            let n = primitive::encode_unsigned(&mut b, 42).unwrap();
            b[..n].to_vec()
        });
        let r = ConfirmedPrivateTransfer { vendor_id: 260, service_number: 9, service_parameters: Some(params) };
        let mut buf = [0u8; 32];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = ConfirmedPrivateTransfer::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);
    }
}
