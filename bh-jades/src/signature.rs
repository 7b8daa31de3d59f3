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

use std::str::FromStr as _;

use bherror::{traits::ForeignBoxed as _, Error};

use crate::{base64_url_encode, error::SignatureError, SignaturePrimitive, SigningAlgorithm};

/// Computes JWS signature values, dispatching on the [`SigningAlgorithm`] to
/// the wrapped [`SignaturePrimitive`].
#[derive(Debug)]
pub struct SignatureEngine<'p, P: ?Sized> {
    primitive: &'p P,
}

impl<'p, P: SignaturePrimitive + ?Sized> SignatureEngine<'p, P> {
    /// Creates an engine signing through `primitive`.
    pub fn new(primitive: &'p P) -> Self {
        Self { primitive }
    }

    /// Sign `input` using the algorithm with the JWS identifier `alg`,
    /// returning the `base64url`-encoded signature.
    ///
    /// # Errors
    ///
    /// Fails with [`SignatureError::UnsupportedAlgorithm`] if `alg` is not a
    /// [`SigningAlgorithm`], otherwise as [`SignatureEngine::sign_with`].
    pub fn sign(
        &self,
        alg: &str,
        input: &[u8],
        key: &P::Key,
    ) -> bherror::Result<String, SignatureError> {
        let alg = SigningAlgorithm::from_str(alg)?;
        self.sign_with(alg, input, key)
    }

    /// Sign `input` using `alg`, returning the `base64url`-encoded signature.
    ///
    /// # Errors
    ///
    /// Fails with [`SignatureError::PrimitiveFailed`] if the primitive fails,
    /// and with [`SignatureError::InvalidSignatureLength`] if an ECDSA
    /// signature is not in the fixed-length `r || s` form.
    pub fn sign_with(
        &self,
        alg: SigningAlgorithm,
        input: &[u8],
        key: &P::Key,
    ) -> bherror::Result<String, SignatureError> {
        let spec = alg.primitive_spec();

        let signature = self
            .primitive
            .sign(&spec, input, key)
            .foreign_boxed_err(|| SignatureError::PrimitiveFailed)?;

        if let Some(expected) = spec.fixed_signature_len() {
            if signature.len() != expected {
                return Err(Error::root(SignatureError::InvalidSignatureLength(
                    expected,
                    signature.len(),
                ))
                .ctx(format!("{alg} signature")));
            }
        }

        Ok(base64_url_encode(signature))
    }
}
