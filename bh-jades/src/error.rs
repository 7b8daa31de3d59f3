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

/// Error raised while configuring the protected header.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum HeaderError {
    /// The `alg` value is missing or is the `"none"` sentinel.
    #[strum(to_string = "Invalid signature algorithm '{0}'")]
    InvalidAlgorithm(String),

    /// The `alg` value is not part of the supported algorithm catalog.
    #[strum(to_string = "Unsupported signature algorithm {0}")]
    UnsupportedAlgorithm(String),

    /// The `x5t#s` header needs a certificate chain, i.e. at least two
    /// certificates; the single-certificate thumbprint setters should be used
    /// otherwise.
    #[strum(to_string = "At least 2 certificates are required, got {0}")]
    InsufficientCertificates(usize),

    /// A certificate could not be encoded or digested.
    #[strum(to_string = "Invalid certificate")]
    InvalidCertificate,

    /// An extension header would shadow a header parameter with a dedicated
    /// setter.
    #[strum(to_string = "Header parameter {0} cannot be set as an extension")]
    ReservedHeaderName(String),

    /// The header could not be serialized as JSON.
    #[strum(to_string = "Header serialization failed")]
    Serialization,
}

impl bherror::BhError for HeaderError {}

/// Error raised by the [`SignatureEngine`](crate::SignatureEngine).
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum SignatureError {
    /// The algorithm identifier is not part of the algorithm catalog.
    #[strum(to_string = "Unsupported signature algorithm {0}")]
    UnsupportedAlgorithm(String),

    /// The underlying [`SignaturePrimitive`](crate::SignaturePrimitive)
    /// failed; the original failure is kept as the error source.
    #[strum(to_string = "Signature primitive failed")]
    PrimitiveFailed,

    /// The primitive returned a signature whose length does not match the
    /// fixed length required by the algorithm.
    #[strum(to_string = "Invalid signature length: expected {0} bytes, got {1}")]
    InvalidSignatureLength(usize, usize),
}

impl bherror::BhError for SignatureError {}

/// Error raised by the [`Sign`](crate::Sign) token assembler.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum SignError {
    /// `sign` was invoked before the `alg` header was configured.
    #[strum(to_string = "Signature algorithm not set")]
    AlgorithmNotSet,

    /// The signed token was accessed before `sign` succeeded.
    #[strum(to_string = "Token is not signed yet")]
    NotSignedYet,

    /// A detached signature was requested without the `sigD` header.
    #[strum(to_string = "Detached payload requires the sigD header")]
    MissingSigD,

    /// An appended signature would use a different `b64` setting than the
    /// already serialized payload.
    #[strum(to_string = "Payload encoding mismatch: payload encoded with b64={0}")]
    PayloadEncodingMismatch(bool),

    /// The protected header could not be encoded.
    #[strum(to_string = "Invalid protected header")]
    Header,

    /// Computing the signature value failed.
    #[strum(to_string = "Signing failed")]
    Signature,

    /// The issuance engine failed.
    #[strum(to_string = "Payload issuance failed")]
    Issuance,

    /// The issuance engine returned a token that does not match the request.
    #[strum(to_string = "Malformed issued token: {0}")]
    MalformedIssuance(String),

    /// The signed token could not be serialized.
    #[strum(to_string = "Token serialization failed")]
    Serialization,
}

impl bherror::BhError for SignError {}
