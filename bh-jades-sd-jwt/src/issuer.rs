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

//! Provides the [`SdJwtIssuer`], an [`IssuanceEngine`] producing SD-JWTs.

use bh_jades::{
    encode_payload, DisclosureFrame, GeneralJws, IssuanceEngine, IssuanceSigner, JsonObject,
};
use bherror::{
    traits::{ErrorContext as _, ForeignBoxed as _, ForeignError as _},
    Error,
};
use serde_json::Value;

use crate::{
    encoder,
    error::Result,
    path::{frame_paths, top_level_paths},
    Hasher, IssuerError, SaltGenerator, SD_ALG,
};

/// Issuer of SD-JWT payloads in the JWS General JSON Serialization.
///
/// The disclosures are carried in the unprotected header of the first
/// signature, and every signature carries the `kid` of its signer.
#[derive(Debug, Clone)]
pub struct SdJwtIssuer<H, S> {
    hasher: H,
    salt_generator: S,
}

impl<H: Hasher, S: SaltGenerator> SdJwtIssuer<H, S> {
    /// Construct a new [`SdJwtIssuer`] hashing disclosures with `hasher` and
    /// salting them with `salt_generator`.
    pub fn new(hasher: H, salt_generator: S) -> Self {
        Self {
            hasher,
            salt_generator,
        }
    }

    /// Conceals the nodes of `payload` selected by `frame`, or every
    /// top-level claim without a frame, and sets the `_sd_alg` claim.
    ///
    /// Returns the concealed payload and the disclosures.
    pub fn conceal(
        &self,
        payload: &JsonObject,
        frame: Option<&DisclosureFrame>,
    ) -> Result<(JsonObject, Vec<String>)> {
        let paths = match frame {
            Some(frame) => frame_paths(payload, frame)?,
            None => top_level_paths(payload),
        };

        let mut claims = payload.clone();
        let disclosures =
            encoder::encode_claims(&mut claims, &paths, &self.hasher, &self.salt_generator)?;
        claims.insert(
            SD_ALG.to_owned(),
            Value::String(self.hasher.algorithm().to_string()),
        );

        let disclosures = disclosures
            .into_iter()
            .map(|disclosure| disclosure.into_string())
            .collect();

        Ok((claims, disclosures))
    }
}

impl<H: Hasher, S: SaltGenerator> IssuanceEngine for SdJwtIssuer<H, S> {
    type Err = IssuerError;

    fn issue(
        &self,
        payload: &JsonObject,
        frame: Option<&DisclosureFrame>,
        signers: &[IssuanceSigner],
    ) -> Result<GeneralJws> {
        let (claims, disclosures) = self.conceal(payload, frame)?;

        let b64 = signers.first().map_or(true, IssuanceSigner::b64);
        if signers.iter().any(|signer| signer.b64() != b64) {
            return Err(Error::root(IssuerError::Header)
                .ctx("signers disagree on the b64 payload encoding"));
        }

        // every signature covers the same serialized payload
        let serialized =
            serde_json::to_string(&claims).foreign_err(|| IssuerError::Serialization)?;
        let payload = encode_payload(&serialized, b64);

        let mut signatures = Vec::with_capacity(signers.len());
        for signer in signers {
            let mut signature = signer
                .sign(&payload)
                .foreign_boxed_err(|| IssuerError::SigningFailed)
                .ctx(|| format!("{} signer {}", signer.alg, signer.kid))?;
            if !signer.kid.is_empty() {
                signature.header_mut().kid = Some(signer.kid.to_owned());
            }
            signatures.push(signature);
        }

        if let Some(first) = signatures.first_mut() {
            if !disclosures.is_empty() {
                first.header_mut().disclosures = Some(disclosures);
            }
        }

        tracing::debug!(
            "SD-JWT issued with {} disclosures and {} signatures",
            signatures
                .first()
                .and_then(|signature| signature.header.as_ref())
                .and_then(|header| header.disclosures.as_ref())
                .map_or(0, Vec::len),
            signatures.len()
        );

        Ok(GeneralJws {
            payload,
            signatures,
        })
    }
}
