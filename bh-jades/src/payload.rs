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

//! Payload encoding and issuance.
//!
//! A JAdES payload is either detached, in which case the signing input only
//! covers the protected header, or issued by an [`IssuanceEngine`], which
//! encodes the payload (e.g. as an SD-JWT) and produces the signatures
//! through the [`IssuanceSigner`] callbacks it is given.

use std::{collections::BTreeMap, fmt};

use bherror::{traits::PropagateError as _, BhError, Error};
use serde::{Deserialize, Serialize};

use crate::{
    base64_url_encode, error::SignError, BoxError, GeneralJws, JwsSignature, ProtectedHeader,
    SigningAlgorithm,
};

/// Type alias for a JSON object.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Describes which parts of a payload are selectively disclosable.
///
/// The `_sd` member lists the concealed object keys or array indices of the
/// current level; every other member holds the frame of the nested object or
/// array under that key (array indices are written as strings):
///
/// ```json
/// { "_sd": ["email", "address"], "nationalities": { "_sd": [0] } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureFrame {
    /// Concealed keys or indices of this level.
    #[serde(rename = "_sd", default, skip_serializing_if = "Vec::is_empty")]
    pub sd: Vec<FrameEntry>,
    /// Frames of the nested values.
    #[serde(flatten)]
    pub nested: BTreeMap<String, DisclosureFrame>,
}

/// A single entry of the `_sd` member of a [`DisclosureFrame`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameEntry {
    /// Key of an object property.
    Key(String),
    /// Index of an array element.
    Index(usize),
}

impl DisclosureFrame {
    /// Creates an empty frame, i.e. one which conceals nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Conceals the property `key` of this level.
    pub fn conceal(mut self, key: impl Into<String>) -> Self {
        self.sd.push(FrameEntry::Key(key.into()));
        self
    }

    /// Conceals the array element at `index` of this level.
    pub fn conceal_index(mut self, index: usize) -> Self {
        self.sd.push(FrameEntry::Index(index));
        self
    }

    /// Sets the frame of the value under `key`.
    pub fn nest(mut self, key: impl Into<String>, frame: DisclosureFrame) -> Self {
        self.nested.insert(key.into(), frame);
        self
    }
}

impl fmt::Display for FrameEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key:?}"),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Callback turning a signing input into the `base64url`-encoded signature.
pub type SignerFn<'a> = dyn Fn(&[u8]) -> Result<String, BoxError> + 'a;

/// A signer handed to an [`IssuanceEngine`].
///
/// Every signer contributes exactly one [`JwsSignature`] to the issued
/// token.
#[derive(Clone, Copy)]
pub struct IssuanceSigner<'a> {
    /// Algorithm of the signature.
    pub alg: SigningAlgorithm,
    /// Identifier of the signing key, written to the unprotected header.
    pub kid: &'a str,
    /// Protected header of the signature.
    pub protected: &'a ProtectedHeader,
    /// Signing callback.
    pub signer: &'a SignerFn<'a>,
}

impl fmt::Debug for IssuanceSigner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuanceSigner")
            .field("alg", &self.alg)
            .field("kid", &self.kid)
            .field("protected", &self.protected)
            .finish_non_exhaustive()
    }
}

impl IssuanceSigner<'_> {
    /// Signs the already encoded payload under the protected header of this
    /// signer.
    ///
    /// The returned signature has no unprotected header; adding one (e.g.
    /// with the `kid`) is up to the [`IssuanceEngine`].
    pub fn sign(&self, encoded_payload: &str) -> Result<JwsSignature, BoxError> {
        let protected = self.protected.encode()?;
        let signature = (self.signer)(signing_input(&protected, encoded_payload).as_bytes())?;

        Ok(JwsSignature::new(protected, signature))
    }

    /// Whether the payload must be `base64url`-encoded for this signer.
    pub fn b64(&self) -> bool {
        self.protected.b64()
    }
}

/// Engine producing a signed token from a JSON payload.
///
/// The engine is responsible for encoding the payload, e.g. as an SD-JWT
/// with disclosures, and for producing one [`JwsSignature`] per
/// [`IssuanceSigner`].
pub trait IssuanceEngine {
    /// The error returned by the engine.
    type Err: BhError;

    /// Issue `payload`, concealing the parts described by `frame`.
    ///
    /// If `frame` is [`None`], the engine's default applies.
    fn issue(
        &self,
        payload: &JsonObject,
        frame: Option<&DisclosureFrame>,
        signers: &[IssuanceSigner],
    ) -> bherror::Result<GeneralJws, Self::Err>;
}

impl<T: IssuanceEngine + ?Sized> IssuanceEngine for &T {
    type Err = T::Err;

    fn issue(
        &self,
        payload: &JsonObject,
        frame: Option<&DisclosureFrame>,
        signers: &[IssuanceSigner],
    ) -> bherror::Result<GeneralJws, Self::Err> {
        (**self).issue(payload, frame, signers)
    }
}

/// The [`IssuanceEngine`] of detached signatures, which never issue a
/// payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoIssuance {}

impl fmt::Display for NoIssuance {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl BhError for NoIssuance {}

impl IssuanceEngine for NoIssuance {
    type Err = NoIssuance;

    fn issue(
        &self,
        _: &JsonObject,
        _: Option<&DisclosureFrame>,
        _: &[IssuanceSigner],
    ) -> bherror::Result<GeneralJws, Self::Err> {
        match *self {}
    }
}

/// Creates the JWS signing input, i.e. `<protected>.<payload>`, as defined
/// [here].
///
/// [here]: https://www.rfc-editor.org/rfc/rfc7515.html#section-5.1
pub fn signing_input(protected: &str, encoded_payload: &str) -> String {
    format!("{protected}.{encoded_payload}")
}

/// Encodes the payload as it appears in the signing input and the token:
/// `base64url`-encoded, unless `b64` is `false` ([RFC7797]).
///
/// [RFC7797]: https://datatracker.ietf.org/doc/html/rfc7797#section-3
pub fn encode_payload(payload: &str, b64: bool) -> String {
    if b64 {
        base64_url_encode(payload)
    } else {
        payload.to_owned()
    }
}

/// Result of [`encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedPayload {
    /// Detached payload, still to be signed.
    Detached {
        /// The encoded protected header.
        protected: String,
        /// The signing input, `<protected>.`
        signing_input: String,
    },
    /// Payload issued and signed by the [`IssuanceEngine`].
    Issued(GeneralJws),
}

/// The payload to encode.
#[derive(Debug)]
pub enum PayloadSource<'a, I> {
    /// Detached payload.
    Detached,
    /// Payload issued by the engine.
    Attached {
        /// The JSON payload.
        payload: &'a JsonObject,
        /// Disclosure frame passed to the engine.
        frame: Option<&'a DisclosureFrame>,
        /// The issuance engine.
        issuer: &'a I,
    },
}

/// Encodes the payload for `signer`.
///
/// A detached payload yields the signing input, which only covers the
/// protected header; the header **MUST** carry `sigD` in that case. An
/// attached payload is issued by the engine, which also signs it through
/// `signer`.
///
/// # Errors
///
/// Fails with [`SignError::MissingSigD`] for a detached payload without
/// `sigD`, and with [`SignError::Issuance`] if the engine fails.
pub fn encode<I: IssuanceEngine>(
    source: PayloadSource<'_, I>,
    signer: IssuanceSigner<'_>,
) -> bherror::Result<EncodedPayload, SignError> {
    match source {
        PayloadSource::Detached => {
            if signer.protected.sig_d().is_none() {
                return Err(Error::root(SignError::MissingSigD));
            }

            let protected = signer
                .protected
                .encode()
                .with_err(|| SignError::Header)?;
            let signing_input = signing_input(&protected, "");

            Ok(EncodedPayload::Detached {
                protected,
                signing_input,
            })
        }
        PayloadSource::Attached {
            payload,
            frame,
            issuer,
        } => {
            let jws = issuer
                .issue(payload, frame, &[signer])
                .with_err(|| SignError::Issuance)?;

            Ok(EncodedPayload::Issued(jws))
        }
    }
}
