//! Wire envelope exchanged between mock peers

use overlay_core::{ContextId, Element, OverlayError, Result, Tag, VAddr};

/// A message in flight between two mock peers.
///
/// `src_vaddr` is the sender's address *within `ctx_id`* — both ends agree
/// on this numbering because they hold the same [`overlay_core::Context`].
#[derive(Debug, Clone)]
pub struct Envelope {
    pub ctx_id: ContextId,
    pub src_vaddr: VAddr,
    pub tag: Tag,
    pub bytes: Vec<u8>,
}

/// Encode a typed buffer for transit with `postcard`.
pub fn to_bytes<T: Element>(buf: &[T]) -> Result<Vec<u8>> {
    postcard::to_allocvec(buf).map_err(|e| OverlayError::SubstrateFailure(e.to_string()))
}

/// Inverse of [`to_bytes`]; errors if the decoded element count doesn't
/// match `out`'s length.
pub fn from_bytes<T: Element>(bytes: &[u8], out: &mut [T]) -> Result<()> {
    let values: Vec<T> =
        postcard::from_bytes(bytes).map_err(|e| OverlayError::SubstrateFailure(e.to_string()))?;
    if values.len() != out.len() {
        return Err(OverlayError::SubstrateFailure(format!(
            "envelope payload length mismatch: got {} elements, expected {}",
            values.len(),
            out.len()
        )));
    }
    out.copy_from_slice(&values);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_u32_slice() {
        let values = [1u32, 2, 3, 4];
        let bytes = to_bytes(&values).unwrap();
        let mut out = [0u32; 4];
        from_bytes(&bytes, &mut out).unwrap();
        assert_eq!(values, out);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let values = [1u32, 2, 3];
        let bytes = to_bytes(&values).unwrap();
        let mut out = [0u32; 4];
        assert!(from_bytes(&bytes, &mut out).is_err());
    }
}
