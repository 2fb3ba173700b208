//! Canonical byte encodings.
//!
//! Every field element crosses the wire (and enters a hash preimage that is
//! reproduced off-chain) as the fixed-width big-endian bytes of its
//! canonical representative. Curve points travel as affine `(u, v)`
//! coordinate pairs. The underlying field crates expose little-endian
//! encodings, so these helpers reverse byte order at the boundary.

use bls12_381::Scalar;

/// Size in bytes of an encoded field element.
pub const FIELD_SIZE: usize = 32;

/// Big-endian bytes of an outer-field element.
pub type FieldBytes = [u8; FIELD_SIZE];

/// Errors produced when decoding wire bytes into algebraic values.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    /// The bytes are not the canonical representative of a field element.
    #[error("non-canonical field element encoding")]
    NonCanonicalScalar,
    /// The coordinate pair does not lie on the inner curve.
    #[error("point is not on the inner curve")]
    PointOffCurve,
}

#[allow(
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    reason = "loop is bounded by N, indexing is always in bounds"
)]
const fn reverse<const N: usize>(input: &[u8; N]) -> [u8; N] {
    let mut output = [0_u8; N];
    let mut i = 0;
    while i < N {
        output[i] = input[N - 1 - i];
        i += 1;
    }
    output
}

/// Encode an outer-field element as big-endian bytes.
#[must_use]
pub fn scalar_to_bytes(s: &Scalar) -> FieldBytes {
    reverse(&s.to_bytes())
}

/// Decode an outer-field element from big-endian bytes.
///
/// # Errors
/// Rejects non-canonical representatives.
pub fn scalar_from_bytes(bytes: &FieldBytes) -> Result<Scalar, EncodingError> {
    Scalar::from_bytes(&reverse(bytes))
        .into_option()
        .ok_or(EncodingError::NonCanonicalScalar)
}

/// Encode an inner-field (DH) scalar as big-endian bytes.
#[must_use]
pub fn inner_scalar_to_bytes(s: &jubjub::Fr) -> FieldBytes {
    reverse(&s.to_bytes())
}

/// Decode an inner-field (DH) scalar from big-endian bytes.
///
/// # Errors
/// Rejects non-canonical representatives.
pub fn inner_scalar_from_bytes(bytes: &FieldBytes) -> Result<jubjub::Fr, EncodingError> {
    jubjub::Fr::from_bytes(&reverse(bytes))
        .into_option()
        .ok_or(EncodingError::NonCanonicalScalar)
}

/// Encode an inner-curve point as its affine `(u, v)` coordinates.
#[must_use]
pub fn point_to_coordinates(p: &jubjub::ExtendedPoint) -> (FieldBytes, FieldBytes) {
    let affine = jubjub::AffinePoint::from(p);
    (
        scalar_to_bytes(&affine.get_u()),
        scalar_to_bytes(&affine.get_v()),
    )
}

/// Decode an inner-curve point from affine `(u, v)` coordinates.
///
/// # Errors
/// Rejects coordinate pairs that are non-canonical or off-curve. Subgroup
/// membership is not checked here; circuits re-witness every point with
/// their own small-order checks.
pub fn point_from_coordinates(
    u: &FieldBytes,
    v: &FieldBytes,
) -> Result<jubjub::ExtendedPoint, EncodingError> {
    let u = scalar_from_bytes(u)?;
    let v = scalar_from_bytes(v)?;
    let affine = jubjub::AffinePoint::from_raw_unchecked(u, v);
    let decoded = jubjub::AffinePoint::from_bytes(affine.to_bytes()).into_option();
    if decoded == Some(affine) {
        Ok(jubjub::ExtendedPoint::from(affine))
    } else {
        Err(EncodingError::PointOffCurve)
    }
}

/// Short hex rendering of a field element for log records.
#[must_use]
pub fn fmt_digest(s: &Scalar) -> String {
    let bytes = scalar_to_bytes(s);
    let mut out = hex::encode(bytes);
    out.truncate(16);
    out
}
