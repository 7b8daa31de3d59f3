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

use std::str::FromStr;

use bherror::{traits::ForeignError as _, Error};
use openssl::hash::MessageDigest;
use serde::{Deserialize, Serialize};

use crate::{error::SignatureError, BoxError};

/// JWS signature algorithms which can be used for producing JAdES signatures.
///
/// Every variant carries its own [`PrimitiveSpec`], i.e. the digest,
/// padding or curve the [`SignaturePrimitive`](crate::SignaturePrimitive)
/// must use, see [`SigningAlgorithm::primitive_spec`].
///
/// For more details see [RFC7518 section 3.1] and [RFC8037 section 3.1].
///
/// [RFC7518 section 3.1]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.1
/// [RFC8037 section 3.1]: https://datatracker.ietf.org/doc/html/rfc8037#section-3.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SigningAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256
    Rs256,
    /// RSASSA-PKCS1-v1_5 with SHA-384
    Rs384,
    /// RSASSA-PKCS1-v1_5 with SHA-512
    Rs512,
    /// RSASSA-PSS with SHA-256 and MGF1 with SHA-256
    Ps256,
    /// RSASSA-PSS with SHA-384 and MGF1 with SHA-384
    Ps384,
    /// RSASSA-PSS with SHA-512 and MGF1 with SHA-512
    Ps512,
    /// ECDSA over P-256 with SHA-256
    Es256,
    /// ECDSA over P-384 with SHA-384
    Es384,
    /// ECDSA over P-521 with SHA-512
    Es512,
    /// EdDSA, with the curve (Ed25519 or Ed448) determined by the key
    #[serde(rename = "EdDSA")]
    EdDsa,
}

/// JWS `"alg"` header parameter value for **RSASSA-PKCS1-v1_5 using SHA-256**.
pub const SIGNING_ALG_RS256: &str = "RS256";
/// JWS `"alg"` header parameter value for **RSASSA-PKCS1-v1_5 using SHA-384**.
pub const SIGNING_ALG_RS384: &str = "RS384";
/// JWS `"alg"` header parameter value for **RSASSA-PKCS1-v1_5 using SHA-512**.
pub const SIGNING_ALG_RS512: &str = "RS512";
/// JWS `"alg"` header parameter value for **RSASSA-PSS using SHA-256 and MGF1
/// with SHA-256**.
pub const SIGNING_ALG_PS256: &str = "PS256";
/// JWS `"alg"` header parameter value for **RSASSA-PSS using SHA-384 and MGF1
/// with SHA-384**.
pub const SIGNING_ALG_PS384: &str = "PS384";
/// JWS `"alg"` header parameter value for **RSASSA-PSS using SHA-512 and MGF1
/// with SHA-512**.
pub const SIGNING_ALG_PS512: &str = "PS512";
/// JWS `"alg"` header parameter value for **ECDSA using P-256 and SHA-256**.
pub const SIGNING_ALG_ES256: &str = "ES256";
/// JWS `"alg"` header parameter value for **ECDSA using P-384 and SHA-384**.
pub const SIGNING_ALG_ES384: &str = "ES384";
/// JWS `"alg"` header parameter value for **ECDSA using P-521 and SHA-512**.
pub const SIGNING_ALG_ES512: &str = "ES512";
/// JWS `"alg"` header parameter value for **EdDSA**, as specified in [RFC8037].
///
/// [RFC8037]: https://datatracker.ietf.org/doc/html/rfc8037#section-3.1
pub const SIGNING_ALG_EDDSA: &str = "EdDSA";

/// The `"alg"` value of an unsecured JWS, which is never accepted.
pub(crate) const SIGNING_ALG_NONE: &str = "none";

impl SigningAlgorithm {
    /// All algorithms of the catalog.
    pub const ALL: [SigningAlgorithm; 10] = [
        Self::Rs256,
        Self::Rs384,
        Self::Rs512,
        Self::Ps256,
        Self::Ps384,
        Self::Ps512,
        Self::Es256,
        Self::Es384,
        Self::Es512,
        Self::EdDsa,
    ];

    /// The JWS `"alg"` identifier of this algorithm.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rs256 => SIGNING_ALG_RS256,
            Self::Rs384 => SIGNING_ALG_RS384,
            Self::Rs512 => SIGNING_ALG_RS512,
            Self::Ps256 => SIGNING_ALG_PS256,
            Self::Ps384 => SIGNING_ALG_PS384,
            Self::Ps512 => SIGNING_ALG_PS512,
            Self::Es256 => SIGNING_ALG_ES256,
            Self::Es384 => SIGNING_ALG_ES384,
            Self::Es512 => SIGNING_ALG_ES512,
            Self::EdDsa => SIGNING_ALG_EDDSA,
        }
    }

    /// The parameters the [`SignaturePrimitive`](crate::SignaturePrimitive)
    /// is invoked with for this algorithm.
    pub const fn primitive_spec(self) -> PrimitiveSpec {
        use DigestAlgorithm::*;

        match self {
            Self::Rs256 => PrimitiveSpec::rsa(Sha256, RsaPadding::Pkcs1v15),
            Self::Rs384 => PrimitiveSpec::rsa(Sha384, RsaPadding::Pkcs1v15),
            Self::Rs512 => PrimitiveSpec::rsa(Sha512, RsaPadding::Pkcs1v15),
            Self::Ps256 => PrimitiveSpec::rsa(Sha256, RsaPadding::Pss),
            Self::Ps384 => PrimitiveSpec::rsa(Sha384, RsaPadding::Pss),
            Self::Ps512 => PrimitiveSpec::rsa(Sha512, RsaPadding::Pss),
            Self::Es256 => PrimitiveSpec::ecdsa(Sha256, EcCurve::P256),
            Self::Es384 => PrimitiveSpec::ecdsa(Sha384, EcCurve::P384),
            Self::Es512 => PrimitiveSpec::ecdsa(Sha512, EcCurve::P521),
            Self::EdDsa => PrimitiveSpec::EdDsa,
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = Error<SignatureError>;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str() == value)
            .ok_or_else(|| Error::root(SignatureError::UnsupportedAlgorithm(value.to_owned())))
    }
}

impl std::fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a single signature primitive invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveSpec {
    /// RSA signature over the digest of the message.
    Rsa {
        /// Digest applied to the message.
        digest: DigestAlgorithm,
        /// Signature padding scheme.
        padding: RsaPadding,
    },
    /// ECDSA signature over the digest of the message.
    ///
    /// The signature **MUST** be returned in the fixed-length `r || s` form
    /// (IEEE P1363), with both integers left-padded to the coordinate length
    /// of the curve, and **NOT** as an ASN.1 DER structure. See
    /// [RFC7518 section 3.4](https://datatracker.ietf.org/doc/html/rfc7518#section-3.4).
    Ecdsa {
        /// Digest applied to the message.
        digest: DigestAlgorithm,
        /// Curve the key must be on.
        curve: EcCurve,
    },
    /// EdDSA signature over the message itself, without a separate digest
    /// stage. The curve is determined by the key.
    EdDsa,
}

impl PrimitiveSpec {
    const fn rsa(digest: DigestAlgorithm, padding: RsaPadding) -> Self {
        Self::Rsa { digest, padding }
    }

    const fn ecdsa(digest: DigestAlgorithm, curve: EcCurve) -> Self {
        Self::Ecdsa { digest, curve }
    }

    /// The exact length of the raw signature, for algorithms whose signatures
    /// have a fixed length.
    pub const fn fixed_signature_len(&self) -> Option<usize> {
        match self {
            Self::Ecdsa { curve, .. } => Some(curve.signature_len()),
            Self::Rsa { .. } | Self::EdDsa => None,
        }
    }
}

/// RSA signature padding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaPadding {
    /// RSASSA-PKCS1-v1_5
    Pkcs1v15,
    /// RSASSA-PSS, with MGF1 using the same digest as the message and a salt
    /// as long as the digest output.
    Pss,
}

/// NIST elliptic curves used by the ECDSA algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    /// NIST P-256, a.k.a. secp256r1 or prime256v1
    P256,
    /// NIST P-384, a.k.a. secp384r1
    P384,
    /// NIST P-521, a.k.a. secp521r1
    P521,
}

impl EcCurve {
    /// Length in bytes of a single coordinate, i.e. of each of `r` and `s`.
    pub const fn coordinate_len(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    /// Length in bytes of the `r || s` signature.
    pub const fn signature_len(self) -> usize {
        2 * self.coordinate_len()
    }
}

/// Digest algorithms used for signing and for certificate thumbprints.
///
/// Serialized with the JAdES digest identifiers (`S256`, `S384`, `S512`)
/// used by the `digAlg` and `hashM` members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256
    #[serde(rename = "S256")]
    Sha256,
    /// SHA-384
    #[serde(rename = "S384")]
    Sha384,
    /// SHA-512
    #[serde(rename = "S512")]
    Sha512,
}

impl DigestAlgorithm {
    /// Compute the digest of `data`.
    ///
    /// This is the hashing primitive used for certificate thumbprints and by
    /// issuance engines.
    pub fn digest(self, data: &[u8]) -> Result<Vec<u8>, BoxError> {
        Ok(openssl::hash::hash(self.message_digest(), data)?.to_vec())
    }

    /// Same as [`DigestAlgorithm::digest`], wrapping the failure into
    /// [`bherror::Error`].
    pub(crate) fn digest_with<E, F>(self, data: &[u8], f: F) -> bherror::Result<Vec<u8>, E>
    where
        E: bherror::BhError,
        F: FnOnce() -> E,
    {
        openssl::hash::hash(self.message_digest(), data)
            .map(|digest| digest.to_vec())
            .foreign_err(f)
    }

    pub(crate) fn message_digest(self) -> MessageDigest {
        match self {
            Self::Sha256 => MessageDigest::sha256(),
            Self::Sha384 => MessageDigest::sha384(),
            Self::Sha512 => MessageDigest::sha512(),
        }
    }
}
