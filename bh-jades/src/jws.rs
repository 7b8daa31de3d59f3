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

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JWS in the [General JSON Serialization].
///
/// [General JSON Serialization]: https://datatracker.ietf.org/doc/html/rfc7515#section-7.2.1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralJws {
    /// The encoded payload, empty for a detached payload.
    pub payload: String,
    /// The signatures over the payload, in the order they were produced.
    pub signatures: Vec<JwsSignature>,
}

/// A single signature of a [`GeneralJws`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsSignature {
    /// The `base64url`-encoded protected header.
    pub protected: String,
    /// The unprotected header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<UnprotectedHeader>,
    /// The `base64url`-encoded signature value.
    pub signature: String,
}

/// The unprotected header of a [`JwsSignature`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnprotectedHeader {
    /// SD-JWT disclosures of the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclosures: Option<Vec<String>>,
    /// Identifier of the signing key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// SD-JWT key binding JWT.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kb_jwt: Option<String>,
    /// The JAdES unsigned properties.
    #[serde(
        rename = "etsiU",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub etsi_u: Option<Value>,
}

impl UnprotectedHeader {
    /// Whether no member is set, in which case the header is omitted.
    pub fn is_empty(&self) -> bool {
        self.disclosures.is_none()
            && self.kid.is_none()
            && self.kb_jwt.is_none()
            && self.etsi_u.is_none()
    }
}

impl JwsSignature {
    /// Creates a signature without an unprotected header.
    pub fn new(protected: String, signature: String) -> Self {
        Self {
            protected,
            header: None,
            signature,
        }
    }

    /// Returns the unprotected header, creating an empty one when missing.
    pub fn header_mut(&mut self) -> &mut UnprotectedHeader {
        self.header.get_or_insert_with(UnprotectedHeader::default)
    }

    pub(crate) fn normalize_header(&mut self) {
        if self.header.as_ref().is_some_and(UnprotectedHeader::is_empty) {
            self.header = None;
        }
    }
}

impl GeneralJws {
    /// Renders the token in the [Compact Serialization].
    ///
    /// Returns [`None`] unless the token has exactly one signature without an
    /// unprotected header, as the Compact Serialization cannot carry either.
    /// An unencoded payload containing `.` is not representable either
    /// ([RFC7797]).
    ///
    /// [Compact Serialization]: https://datatracker.ietf.org/doc/html/rfc7515#section-7.1
    /// [RFC7797]: https://datatracker.ietf.org/doc/html/rfc7797#section-5.2
    pub fn compact(&self) -> Option<String> {
        if self.payload.contains('.') {
            return None;
        }

        match self.signatures.as_slice() {
            [JwsSignature {
                protected,
                header: None,
                signature,
            }] => Some(format!("{protected}.{}.{signature}", self.payload)),
            _ => None,
        }
    }
}

impl fmt::Display for GeneralJws {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = if f.alternate() {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };

        f.write_str(&json.map_err(|_| fmt::Error)?)
    }
}
