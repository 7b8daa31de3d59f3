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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate implements the issuance of [Selective Disclosure JWTs][1] as
//! [JAdES][2] tokens in the JWS General JSON Serialization.
//!
//! [1]: <https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt>
//! [2]: <https://www.etsi.org/deliver/etsi_ts/119100_119199/11918201/>
//!
//! # Details
//!
//! The [`SdJwtIssuer`] is an [`IssuanceEngine`](bh_jades::IssuanceEngine)
//! plugged into the [`bh_jades::Sign`] builder. It conceals the claims
//! selected by a [`DisclosureFrame`](bh_jades::DisclosureFrame), replacing
//! each with the digest of its [`Disclosure`], and hands the concealed
//! payload to every signer. The disclosures travel in the unprotected header
//! of the first signature.
//!
//! Digests are computed by a [`Hasher`] (by default [`Sha256`]), and the
//! disclosure salts are drawn from a [`SaltGenerator`] (by default
//! [`RandomSalt`]).
//!
//! # Examples
//!
//! ```
//! use bh_jades::{json_object, DisclosureFrame, OpensslPrimitive, Sign, SigningAlgorithm};
//! use bh_jades_sd_jwt::{RandomSalt, SdJwtIssuer, Sha256};
//! use openssl::pkey::PKey;
//!
//! let key = PKey::generate_ed25519().unwrap();
//! let payload = json_object!({
//!     "sub": "user_42",
//!     "given_name": "John",
//!     "address": { "locality": "Schulpforta", "country": "DE" },
//! });
//!
//! let mut sign = Sign::new(payload, SdJwtIssuer::new(Sha256, RandomSalt));
//! sign.set_algorithm_typed(SigningAlgorithm::EdDsa)
//!     .set_typ("vc+sd-jwt")
//!     .set_disclosure_frame(
//!         DisclosureFrame::new()
//!             .conceal("given_name")
//!             .nest("address", DisclosureFrame::new().conceal("locality")),
//!     );
//!
//! let jws = sign.sign(&OpensslPrimitive, &key, "issuer-key").unwrap();
//! let header = jws.signatures[0].header.as_ref().unwrap();
//! assert_eq!(header.disclosures.as_ref().unwrap().len(), 2);
//! ```

mod disclosure;
mod encoder;
mod error;
mod hasher;
mod issuer;
pub mod path;
mod salt;

pub use disclosure::Disclosure;
pub use error::*;
pub use hasher::{base64_url_digest, Hasher, HashingAlgorithm, Sha256};
pub use issuer::SdJwtIssuer;
pub use salt::{generate_salt, RandomSalt, SaltGenerator, SALT_ENTROPY_BYTES};

/// Key of the array holding the digests of the concealed object properties.
pub const SD: &str = "_sd";

/// Key of the digest of a concealed array element.
pub const ELLIPSIS: &str = "...";

/// The claim naming the hash algorithm used to hide the claims, as specified
/// [here].
///
/// [here]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-07#name-hash-function-claim
pub const SD_ALG: &str = "_sd_alg";

/// Claim names reserved for the SD-JWT encoding.
pub static RESERVED_CLAIM_NAMES: &[&str] = &[SD, SD_ALG, ELLIPSIS];
