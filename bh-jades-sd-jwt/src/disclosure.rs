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

use serde_json::Value;

use crate::{hasher::base64_url_digest, Hasher};

/// A disclosure of a concealed JSON node, in both parsed form and the
/// serialized form whose digest replaces the node in the payload.
///
/// The serialized form is the `base64url` encoding of
/// `["<salt>", "<claim name>", <value>]` for object properties and of
/// `["<salt>", <value>]` for array elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disclosure {
    salt: String,
    claim_name: Option<String>,
    value: Value,
    serialized: String,
}

impl Disclosure {
    /// Construct a new [`Disclosure`] from the given `salt`, `claim_name` and
    /// `claim_value`; a [`None`] name discloses an array element.
    pub fn new(salt: String, claim_name: Option<String>, claim_value: Value) -> Self {
        let input = match &claim_name {
            Some(name) => format!("[\"{}\", \"{}\", {}]", salt, name, claim_value),
            None => format!("[\"{}\", {}]", salt, claim_value),
        };

        Self {
            salt,
            claim_name,
            value: claim_value,
            serialized: bh_jades::base64_url_encode(input),
        }
    }

    /// The salt of the disclosure.
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// The claim name, [`None`] for an array element.
    pub fn claim_name(&self) -> Option<&str> {
        self.claim_name.as_deref()
    }

    /// The disclosed value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// `base64url`-encoded digest of the serialized form, as embedded in the
    /// payload.
    pub fn digest(&self, hasher: &impl Hasher) -> String {
        base64_url_digest(self.serialized.as_bytes(), hasher)
    }

    /// Serialized form of [`Self`].
    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    /// Serialize [`Self`] into an owned [`String`].
    pub fn into_string(self) -> String {
        self.serialized
    }
}

impl fmt::Display for Disclosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.claim_name {
            Some(name) => write!(f, "[{}, {}, {}]", self.salt, name, self.value),
            None => write!(f, "[{}, {}]", self.salt, self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use serde_json::json;

    use super::*;
    use crate::Sha256;

    #[test]
    fn object_property_disclosure() {
        let disclosure = Disclosure::new(
            "eluV5Og3gSNII8EYnsxA_A".to_owned(),
            Some("locality".to_owned()),
            json!("Schulpforta"),
        );

        assert_eq!(
            disclosure.as_str(),
            "WyJlbHVWNU9nM2dTTklJOEVZbnN4QV9BIiwgImxvY2FsaXR5IiwgIlNjaHVscGZvcnRhIl0"
        );
        assert_eq!(
            disclosure.digest(&Sha256),
            "6vh9bq-zS4GKM_7GpggVbYzzu6oOGXrmNVGPHP75Ud0"
        );
        assert_eq!(disclosure.claim_name(), Some("locality"));
    }

    #[test]
    fn array_element_disclosure() {
        let disclosure = Disclosure::new("lklxF5jMYlGTPUovMNIvCA".to_owned(), None, json!("US"));

        assert_eq!(
            URL_SAFE_NO_PAD.decode(disclosure.as_str()).unwrap(),
            br#"["lklxF5jMYlGTPUovMNIvCA", "US"]"#
        );
        assert_eq!(
            disclosure.digest(&Sha256),
            "pFndjkZ_VCzmyTa6UjlZo3dh-ko8aIKQc9DlGzhaVYo"
        );
        assert_eq!(disclosure.claim_name(), None);
        assert_eq!(disclosure.value(), &json!("US"));
    }

    #[test]
    fn structured_value_is_compact() {
        let disclosure = Disclosure::new(
            "2GLC42sKQveCfGfryNRN9w".to_owned(),
            Some("address".to_owned()),
            json!({ "locality": "Schulpforta", "country": "DE" }),
        );

        assert_eq!(
            URL_SAFE_NO_PAD.decode(disclosure.into_string()).unwrap(),
            br#"["2GLC42sKQveCfGfryNRN9w", "address", {"locality":"Schulpforta","country":"DE"}]"#
        );
    }
}
