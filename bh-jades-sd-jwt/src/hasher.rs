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

use serde::Serialize;

/// The hash algorithm identifier for `SHA-256` as specified in the
/// "*Hash Name String*" column of the *IANA* [Named Information Hash Algorithm
/// Registry].
///
/// [Named Information Hash Algorithm Registry]: https://www.iana.org/assignments/named-information/named-information.xhtml
pub(crate) const SHA_256_ALG_NAME: &str = "sha-256";

/// An identifier of the algorithm used for hashing disclosures.
///
/// The string value of the algorithm is written to the `_sd_alg` claim of
/// the issued payload, formatted as in the *IANA* [Named Information Hash
/// Algorithm Registry].
///
/// [Named Information Hash Algorithm Registry]: https://www.iana.org/assignments/named-information/named-information.xhtml
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HashingAlgorithm {
    /// SHA-256 algorithm for hashing.
    #[serde(rename = "sha-256")]
    #[default]
    Sha256,
}

impl HashingAlgorithm {
    /// Returns the registry name of the algorithm, i.e. the `_sd_alg` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            HashingAlgorithm::Sha256 => SHA_256_ALG_NAME,
        }
    }
}

impl fmt::Display for HashingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hash function used to compute the disclosure digests.
pub trait Hasher {
    /// The identifier of the hash function.
    fn algorithm(&self) -> HashingAlgorithm;

    /// Computes the digest of `input`.
    fn digest(&self, input: &[u8]) -> Vec<u8>;
}

impl<H: Hasher + ?Sized> Hasher for &H {
    fn algorithm(&self) -> HashingAlgorithm {
        (**self).algorithm()
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        (**self).digest(input)
    }
}

/// A [`Hasher`] implementation for the `SHA-256` hash function.
#[derive(Debug, Default, Copy, Clone)]
pub struct Sha256;

impl Hasher for Sha256 {
    fn algorithm(&self) -> HashingAlgorithm {
        HashingAlgorithm::Sha256
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        openssl::sha::sha256(input).to_vec()
    }
}

/// Returns the `base64url`-encoded digest of `input`.
pub fn base64_url_digest(input: &[u8], hasher: &impl Hasher) -> String {
    bh_jades::base64_url_encode(hasher.digest(input))
}
