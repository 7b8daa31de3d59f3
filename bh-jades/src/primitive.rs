// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::{BoxError, PrimitiveSpec};

/// Raw asymmetric signature primitive.
///
/// Implementations perform a single sign operation as described by the
/// [`PrimitiveSpec`], i.e. they apply the digest and padding or curve the
/// spec names. They don't know anything about JWS; the input is the complete
/// signing input and the output are the raw signature bytes.
///
/// A default [`openssl`] backed implementation is available as
/// [`OpensslPrimitive`](crate::OpensslPrimitive).
pub trait SignaturePrimitive {
    /// Handle of the private key used for signing.
    ///
    /// The key is only ever borrowed, so the same key may be reused across
    /// many signatures.
    type Key: ?Sized;

    /// Sign `data` with `key`, as described by `spec`.
    ///
    /// # Errors
    ///
    /// Implementations **MUST** fail if the key cannot be used with the
    /// `spec`, e.g. an RSA key for an ECDSA signature or an ECDSA key on a
    /// different curve.
    fn sign(&self, spec: &PrimitiveSpec, data: &[u8], key: &Self::Key)
        -> Result<Vec<u8>, BoxError>;
}

impl<T: SignaturePrimitive + ?Sized> SignaturePrimitive for &T {
    type Key = T::Key;

    fn sign(
        &self,
        spec: &PrimitiveSpec,
        data: &[u8],
        key: &Self::Key,
    ) -> Result<Vec<u8>, BoxError> {
        (**self).sign(spec, data, key)
    }
}
