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

//! This crate provides functions and types for producing [JAdES][1] (JSON
//! Advanced Electronic Signature) tokens, i.e. [JWS][2] signatures in the
//! General JSON Serialization carrying the ETSI signature metadata.
//!
//! [1]: https://www.etsi.org/deliver/etsi_ts/119100_119199/11918201/
//! [2]: https://datatracker.ietf.org/doc/html/rfc7515
//!
//! # Details
//!
//! The primary way to use this library is via the [`Sign`] builder, which
//! accumulates the [`ProtectedHeader`] parameters, encodes the payload and
//! produces the [`GeneralJws`]. The payload is either
//!
//! - detached, described by the `sigD` header ([`Sign::detached`]), or
//! - issued by an [`IssuanceEngine`], e.g. as an SD-JWT ([`Sign::new`]).
//!
//! Signature values are computed by the [`SignatureEngine`], which maps every
//! [`SigningAlgorithm`] to its [`PrimitiveSpec`] and invokes a
//! [`SignaturePrimitive`]. A default [`openssl`] backed primitive is
//! available as [`OpensslPrimitive`]; a custom implementation (e.g. backed by
//! an HSM) only needs to implement [`SignaturePrimitive`].
//!
//! # Examples
//!
//! ## Sign a detached document
//!
//! ```
//! use bh_jades::{DigestAlgorithm, OpensslPrimitive, SigD, Sign, SigningAlgorithm};
//! use openssl::pkey::PKey;
//!
//! let key = PKey::generate_ed25519().unwrap();
//! let document = b"%PDF-1.7 ...";
//!
//! let mut sign = Sign::detached();
//! sign.set_algorithm_typed(SigningAlgorithm::EdDsa)
//!     .set_signed_at(1_700_000_000)
//!     .set_sig_d(
//!         SigD::object_id_by_uri_hash(
//!             DigestAlgorithm::Sha256,
//!             [("https://example.com/contract.pdf", document.as_slice())],
//!         )
//!         .unwrap(),
//!     );
//!
//! sign.sign(&OpensslPrimitive, &key, "signing-key").unwrap();
//!
//! let token = sign.to_json_string().unwrap();
//! ```

mod algorithm;
mod error;
mod header;
mod jws;
mod openssl_impl;
pub mod payload;
mod primitive;
mod sign;
mod signature;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

pub use algorithm::*;
pub use error::*;
pub use header::*;
pub use jws::*;
pub use openssl_impl::OpensslPrimitive;
pub use payload::{
    encode_payload, signing_input, DisclosureFrame, FrameEntry, IssuanceEngine, IssuanceSigner,
    JsonObject, NoIssuance,
};
pub use primitive::SignaturePrimitive;
pub use sign::Sign;
pub use signature::SignatureEngine;

// Re-export the crates whose types are part of the public API.
pub use bherror;
pub use bhx5chain;
pub use iref;
pub use openssl;

/// Type alias for a boxed error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Returns the `base64url`-encoded string of the given `input`, without
/// padding.
pub fn base64_url_encode<T: AsRef<[u8]>>(input: T) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Macro for constructing a [`JsonObject`].
///
/// Accepts the same syntax as [`serde_json::json!`], but returns a
/// [`JsonObject`] rather than just [`serde_json::Value`] when constructing an
/// object, and panics if the syntax is valid JSON but not an object.
#[macro_export]
macro_rules! json_object {
    ($stuff:tt) => {
        match ::serde_json::json!($stuff) {
            ::serde_json::Value::Object(o) => o,
            _ => unreachable!("JSON literal wasn't an object"),
        }
    };
}
