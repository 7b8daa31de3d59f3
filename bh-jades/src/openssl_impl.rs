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

use bherror::Error;
use openssl::{
    ecdsa::EcdsaSig,
    nid::Nid,
    pkey::{Id, PKeyRef, Private},
    rsa::Padding,
    sign::{RsaPssSaltlen, Signer},
};

use crate::{
    BoxError, DigestAlgorithm, EcCurve, PrimitiveSpec, RsaPadding, SignaturePrimitive,
};

/// [`SignaturePrimitive`] implementation backed by [`openssl`].
///
/// It supports every [`PrimitiveSpec`], with the key given as an
/// [`openssl`] private key:
///
/// - an RSA key for [`PrimitiveSpec::Rsa`],
/// - an EC key on the matching curve for [`PrimitiveSpec::Ecdsa`],
/// - an Ed25519 or Ed448 key for [`PrimitiveSpec::EdDsa`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OpensslPrimitive;

impl SignaturePrimitive for OpensslPrimitive {
    type Key = PKeyRef<Private>;

    fn sign(
        &self,
        spec: &PrimitiveSpec,
        data: &[u8],
        key: &Self::Key,
    ) -> Result<Vec<u8>, BoxError> {
        match *spec {
            PrimitiveSpec::Rsa { digest, padding } => sign_rsa(digest, padding, data, key),
            PrimitiveSpec::Ecdsa { digest, curve } => sign_ecdsa(digest, curve, data, key),
            PrimitiveSpec::EdDsa => sign_eddsa(data, key),
        }
    }
}

/// Error raised by the [`OpensslPrimitive`].
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub(crate) enum PrimitiveError {
    /// The key can't be used with the requested primitive.
    #[strum(to_string = "Expected {expected} key")]
    KeyMismatch { expected: &'static str },
}

impl bherror::BhError for PrimitiveError {}

fn key_mismatch(expected: &'static str, key: &PKeyRef<Private>) -> BoxError {
    Box::new(
        Error::root(PrimitiveError::KeyMismatch { expected })
            .ctx(format!("got key of type {}", key.id().as_raw())),
    )
}

fn sign_rsa(
    digest: DigestAlgorithm,
    padding: RsaPadding,
    data: &[u8],
    key: &PKeyRef<Private>,
) -> Result<Vec<u8>, BoxError> {
    if key.id() != Id::RSA {
        return Err(key_mismatch("an RSA", key));
    }

    let md = digest.message_digest();
    let mut signer = Signer::new(md, key)?;

    match padding {
        RsaPadding::Pkcs1v15 => signer.set_rsa_padding(Padding::PKCS1)?,
        RsaPadding::Pss => {
            signer.set_rsa_padding(Padding::PKCS1_PSS)?;
            signer.set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)?;
            signer.set_rsa_mgf1_md(md)?;
        }
    }

    signer.update(data)?;
    Ok(signer.sign_to_vec()?)
}

fn curve_nid(curve: EcCurve) -> Nid {
    match curve {
        // prime256v1 is the ANSI X9.62 name of NIST P-256
        EcCurve::P256 => Nid::X9_62_PRIME256V1,
        EcCurve::P384 => Nid::SECP384R1,
        EcCurve::P521 => Nid::SECP521R1,
    }
}

fn sign_ecdsa(
    digest: DigestAlgorithm,
    curve: EcCurve,
    data: &[u8],
    key: &PKeyRef<Private>,
) -> Result<Vec<u8>, BoxError> {
    if key.id() != Id::EC {
        return Err(key_mismatch("an EC", key));
    }

    let ec_key = key.ec_key()?;
    if ec_key.group().curve_name() != Some(curve_nid(curve)) {
        return Err(key_mismatch(
            match curve {
                EcCurve::P256 => "a P-256",
                EcCurve::P384 => "a P-384",
                EcCurve::P521 => "a P-521",
            },
            key,
        ));
    }

    let hash = digest.digest(data)?;
    let signature = EcdsaSig::sign(&hash, &ec_key)?;

    // JWS needs the raw `r || s` form, not the DER encoding
    let len = i32::try_from(curve.coordinate_len())?;
    let mut raw = signature.r().to_vec_padded(len)?;
    raw.extend(signature.s().to_vec_padded(len)?);

    Ok(raw)
}

fn sign_eddsa(data: &[u8], key: &PKeyRef<Private>) -> Result<Vec<u8>, BoxError> {
    if !matches!(key.id(), Id::ED25519 | Id::ED448) {
        return Err(key_mismatch("an Ed25519 or Ed448", key));
    }

    let mut signer = Signer::new_without_digest(key)?;
    Ok(signer.sign_oneshot_to_vec(data)?)
}

/// Key generation helpers for tests.
#[cfg(test)]
pub(crate) mod test_keys {
    use openssl::{
        ec::{EcGroup, EcKey},
        pkey::PKey,
        rsa::Rsa,
    };

    use super::*;

    pub(crate) fn rsa(bits: u32) -> PKey<Private> {
        PKey::from_rsa(Rsa::generate(bits).unwrap()).unwrap()
    }

    pub(crate) fn ec(curve: EcCurve) -> PKey<Private> {
        let group = EcGroup::from_curve_name(curve_nid(curve)).unwrap();
        PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
    }

    pub(crate) fn ed25519() -> PKey<Private> {
        PKey::generate_ed25519().unwrap()
    }

    pub(crate) fn ed448() -> PKey<Private> {
        PKey::generate_ed448().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use openssl::{
        bn::BigNum,
        ecdsa::EcdsaSig,
        hash::MessageDigest,
        sign::Verifier,
    };

    use super::{test_keys, *};
    use crate::SigningAlgorithm;

    const DATA: &[u8] = b"eyJhbGciOiJSUzI1NiJ9.eyJhIjoxfQ";

    fn sign(alg: SigningAlgorithm, key: &PKeyRef<Private>) -> Result<Vec<u8>, BoxError> {
        OpensslPrimitive.sign(&alg.primitive_spec(), DATA, key)
    }

    fn verify_rsa(alg: SigningAlgorithm, key: &PKeyRef<Private>, signature: &[u8]) -> bool {
        let PrimitiveSpec::Rsa { digest, padding } = alg.primitive_spec() else {
            panic!("{alg} is not an RSA algorithm");
        };

        let mut verifier = Verifier::new(digest.message_digest(), key).unwrap();
        if padding == RsaPadding::Pss {
            verifier.set_rsa_padding(Padding::PKCS1_PSS).unwrap();
            verifier
                .set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)
                .unwrap();
            verifier.set_rsa_mgf1_md(digest.message_digest()).unwrap();
        }
        verifier.update(DATA).unwrap();
        verifier.verify(signature).unwrap()
    }

    #[test]
    fn rsa_signatures_verify() {
        let key = test_keys::rsa(2048);

        for alg in [
            SigningAlgorithm::Rs256,
            SigningAlgorithm::Rs384,
            SigningAlgorithm::Rs512,
            SigningAlgorithm::Ps256,
            SigningAlgorithm::Ps384,
            SigningAlgorithm::Ps512,
        ] {
            let signature = sign(alg, &key).unwrap();
            assert_eq!(signature.len(), 256, "{alg}");
            assert!(verify_rsa(alg, &key, &signature), "{alg}");
        }
    }

    #[test]
    fn pkcs1_is_deterministic_pss_is_not() {
        let key = test_keys::rsa(2048);

        assert_eq!(
            sign(SigningAlgorithm::Rs256, &key).unwrap(),
            sign(SigningAlgorithm::Rs256, &key).unwrap()
        );
        assert_ne!(
            sign(SigningAlgorithm::Ps256, &key).unwrap(),
            sign(SigningAlgorithm::Ps256, &key).unwrap()
        );
    }

    #[test]
    fn ecdsa_signatures_are_raw_and_verify() {
        struct TestCase {
            alg: SigningAlgorithm,
            curve: EcCurve,
            digest: MessageDigest,
        }

        let test_cases = [
            TestCase {
                alg: SigningAlgorithm::Es256,
                curve: EcCurve::P256,
                digest: MessageDigest::sha256(),
            },
            TestCase {
                alg: SigningAlgorithm::Es384,
                curve: EcCurve::P384,
                digest: MessageDigest::sha384(),
            },
            TestCase {
                alg: SigningAlgorithm::Es512,
                curve: EcCurve::P521,
                digest: MessageDigest::sha512(),
            },
        ];

        for TestCase { alg, curve, digest } in test_cases {
            let key = test_keys::ec(curve);
            let signature = sign(alg, &key).unwrap();
            assert_eq!(signature.len(), curve.signature_len(), "{alg}");

            let (r, s) = signature.split_at(curve.coordinate_len());
            let signature = EcdsaSig::from_private_components(
                BigNum::from_slice(r).unwrap(),
                BigNum::from_slice(s).unwrap(),
            )
            .unwrap();
            let hash = openssl::hash::hash(digest, DATA).unwrap();
            assert!(signature.verify(&hash, &key.ec_key().unwrap()).unwrap(), "{alg}");
        }
    }

    #[test]
    fn eddsa_signatures_verify() {
        for key in [test_keys::ed25519(), test_keys::ed448()] {
            let signature = sign(SigningAlgorithm::EdDsa, &key).unwrap();
            assert_eq!(signature.len(), key.size());

            let mut verifier = Verifier::new_without_digest(&key).unwrap();
            assert!(verifier.verify_oneshot(&signature, DATA).unwrap());
        }
    }

    #[test]
    fn mismatched_keys_are_rejected() {
        let rsa = test_keys::rsa(2048);
        let p256 = test_keys::ec(EcCurve::P256);
        let ed25519 = test_keys::ed25519();

        struct TestCase<'a> {
            alg: SigningAlgorithm,
            key: &'a PKeyRef<Private>,
            expected: &'static str,
        }

        let test_cases = [
            TestCase {
                alg: SigningAlgorithm::Rs256,
                key: &p256,
                expected: "an RSA",
            },
            TestCase {
                alg: SigningAlgorithm::Ps256,
                key: &ed25519,
                expected: "an RSA",
            },
            TestCase {
                alg: SigningAlgorithm::Es256,
                key: &rsa,
                expected: "an EC",
            },
            TestCase {
                alg: SigningAlgorithm::Es384,
                key: &p256,
                expected: "a P-384",
            },
            TestCase {
                alg: SigningAlgorithm::EdDsa,
                key: &p256,
                expected: "an Ed25519 or Ed448",
            },
        ];

        for TestCase { alg, key, expected } in test_cases {
            let error = sign(alg, key).unwrap_err();
            let error = error
                .downcast_ref::<Error<PrimitiveError>>()
                .unwrap_or_else(|| panic!("{alg}: unexpected error {error}"));
            assert_eq!(error.error, PrimitiveError::KeyMismatch { expected }, "{alg}");
        }
    }
}
