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

//! Signs a document with a detached JAdES signature, using a freshly
//! generated P-256 key and a self-signed certificate.
//!
//! Run with `cargo run --example sign_detached [DOCUMENT]`; without an
//! argument a built-in document is signed.

use std::time::{SystemTime, UNIX_EPOCH};

use bh_jades::{DigestAlgorithm, OpensslPrimitive, SigD, Sign, SigningAlgorithm};
use bherror::traits::{ErrorContext as _, ForeignError as _, PropagateError as _};
use openssl::{
    asn1::Asn1Time,
    ec::{EcGroup, EcKey},
    hash::MessageDigest,
    nid::Nid,
    pkey::{PKey, Private},
    x509::{X509NameBuilder, X509},
};

/// Error of the example program.
#[derive(strum_macros::Display, Debug)]
enum DemoError {
    #[strum(to_string = "Unable to read the document")]
    Document,
    #[strum(to_string = "Unable to create the signing key")]
    Key,
    #[strum(to_string = "Unable to sign the document")]
    Signing,
}

impl bherror::BhError for DemoError {}

fn self_signed(key: &PKey<Private>) -> Result<X509, openssl::error::ErrorStack> {
    let mut name = X509NameBuilder::new()?;
    name.append_entry_by_text("CN", "JAdES demo signer")?;
    let name = name.build();

    let mut builder = X509::builder()?;
    builder.set_version(2)?;
    builder.set_subject_name(&name)?;
    builder.set_issuer_name(&name)?;
    builder.set_pubkey(key)?;
    let not_before = Asn1Time::days_from_now(0)?;
    let not_after = Asn1Time::days_from_now(30)?;
    builder.set_not_before(&not_before)?;
    builder.set_not_after(&not_after)?;
    builder.sign(key, MessageDigest::sha256())?;

    Ok(builder.build())
}

fn main() -> bherror::Result<(), DemoError> {
    let (uri, document) = match std::env::args().nth(1) {
        Some(path) => {
            let document = std::fs::read(&path).foreign_err(|| DemoError::Document)?;
            (format!("file://{path}"), document)
        }
        None => (
            "urn:example:document".to_owned(),
            b"Hello, JAdES!".to_vec(),
        ),
    };

    let key = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)
        .and_then(|group| EcKey::generate(&group))
        .and_then(PKey::from_ec_key)
        .foreign_err(|| DemoError::Key)?;
    let certificate = self_signed(&key).foreign_err(|| DemoError::Key)?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .foreign_err(|| DemoError::Signing)?
        .as_secs();

    let sig_d = SigD::object_id_by_uri_hash(
        DigestAlgorithm::Sha256,
        [(uri.as_str(), document.as_slice())],
    )
    .with_err(|| DemoError::Signing)
    .ctx(|| "document digest")?;

    let mut sign = Sign::detached();
    sign.set_algorithm_typed(SigningAlgorithm::Es256)
        .set_signed_at(now)
        .set_sig_d(sig_d)
        .set_x5c(&[certificate.clone()])
        .with_err(|| DemoError::Signing)?
        .set_x5t_o(&certificate)
        .with_err(|| DemoError::Signing)?;

    let jws = sign
        .sign(&OpensslPrimitive, &key, "demo-key")
        .with_err(|| DemoError::Signing)?;

    println!("{jws:#}");
    Ok(())
}
