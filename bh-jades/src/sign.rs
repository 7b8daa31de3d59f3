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

use bherror::{
    traits::{ForeignError as _, PropagateError as _},
    Error,
};
use bhx5chain::X5Chain;
use iref::Uri;
use openssl::x509::X509Ref;
use serde_json::Value;

use crate::{
    error::{HeaderError, SignError},
    header::SecondsSinceEpoch,
    payload::{self, EncodedPayload, PayloadSource},
    signing_input, BoxError, DisclosureFrame, GeneralJws, IssuanceEngine, IssuanceSigner,
    JsonObject, JwsSignature, NoIssuance, ProtectedHeader, SigD, SignatureEngine,
    SignaturePrimitive, SigningAlgorithm,
};

#[derive(Debug)]
enum Source<I> {
    Detached,
    Attached { payload: JsonObject, issuer: I },
}

#[derive(Debug)]
struct Signed {
    jws: GeneralJws,
    /// The `b64` value the payload was encoded with.
    b64: bool,
}

impl Signed {
    /// Appends `signature`, setting its unprotected header.
    fn push(
        &mut self,
        mut signature: JwsSignature,
        kid: &str,
        etsi_u: Option<&Value>,
    ) -> &GeneralJws {
        let header = signature.header_mut();
        header.kid = (!kid.is_empty()).then(|| kid.to_owned());
        header.etsi_u = etsi_u.cloned();
        signature.normalize_header();

        self.jws.signatures.push(signature);
        &self.jws
    }
}

/// Builder and signer of a JAdES token.
///
/// The token is configured through the setters, which validate their input
/// immediately, and then signed with [`Sign::sign`]. Calling [`Sign::sign`]
/// again appends another signature over the same payload.
///
/// # Examples
///
/// ```
/// use bh_jades::{OpensslPrimitive, SigD, Sign, SIGNING_ALG_ES256};
/// use openssl::{ec::{EcGroup, EcKey}, nid::Nid, pkey::PKey};
///
/// let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
/// let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();
///
/// let mut sign = Sign::detached();
/// sign.set_algorithm(SIGNING_ALG_ES256)
///     .unwrap()
///     .set_sig_d(SigD::object_id_by_uri(["https://example.com/contract.pdf"]));
///
/// let jws = sign.sign(&OpensslPrimitive, &key, "key-1").unwrap();
/// assert_eq!(jws.payload, "");
/// ```
#[derive(Debug)]
pub struct Sign<I = NoIssuance> {
    header: ProtectedHeader,
    source: Source<I>,
    disclosure_frame: Option<DisclosureFrame>,
    etsi_u: Option<Value>,
    signed: Option<Signed>,
}

impl Sign<NoIssuance> {
    /// Creates a token with a detached payload.
    ///
    /// The detached data objects are described by the `sigD` header, which
    /// must be set before signing.
    pub fn detached() -> Self {
        Self::with_source(Source::Detached)
    }
}

impl<I: IssuanceEngine> Sign<I> {
    /// Creates a token carrying `payload`, which is issued by `issuer`.
    pub fn new(payload: JsonObject, issuer: I) -> Self {
        Self::with_source(Source::Attached { payload, issuer })
    }

    fn with_source(source: Source<I>) -> Self {
        Self {
            header: ProtectedHeader::new(),
            source,
            disclosure_frame: None,
            etsi_u: None,
            signed: None,
        }
    }

    /// Sets the `alg` header parameter, see [`ProtectedHeader::set_algorithm`].
    pub fn set_algorithm(&mut self, alg: &str) -> bherror::Result<&mut Self, HeaderError> {
        self.header.set_algorithm(alg)?;
        Ok(self)
    }

    /// Sets the `alg` header parameter.
    pub fn set_algorithm_typed(&mut self, alg: SigningAlgorithm) -> &mut Self {
        self.header.set_algorithm_typed(alg);
        self
    }

    /// Sets the `kid` header parameter.
    pub fn set_kid(&mut self, kid: impl Into<String>) -> &mut Self {
        self.header.set_kid(kid);
        self
    }

    /// Sets the `x5u` header parameter.
    pub fn set_x5u(&mut self, x5u: &Uri) -> &mut Self {
        self.header.set_x5u(x5u);
        self
    }

    /// Sets the `x5c` header parameter, see [`ProtectedHeader::set_x5c`].
    pub fn set_x5c<C: AsRef<X509Ref>>(
        &mut self,
        certificates: &[C],
    ) -> bherror::Result<&mut Self, HeaderError> {
        self.header.set_x5c(certificates)?;
        Ok(self)
    }

    /// Sets the `x5c` header parameter to the certificate chain.
    pub fn set_x5c_chain(&mut self, chain: &X5Chain) -> &mut Self {
        self.header.set_x5c_chain(chain);
        self
    }

    /// Sets the `x5t#S256` header parameter, see
    /// [`ProtectedHeader::set_x5t_s256`].
    pub fn set_x5t_s256(&mut self, certificate: &X509Ref) -> bherror::Result<&mut Self, HeaderError> {
        self.header.set_x5t_s256(certificate)?;
        Ok(self)
    }

    /// Sets the `x5t#o` header parameter, see [`ProtectedHeader::set_x5t_o`].
    pub fn set_x5t_o(&mut self, certificate: &X509Ref) -> bherror::Result<&mut Self, HeaderError> {
        self.header.set_x5t_o(certificate)?;
        Ok(self)
    }

    /// Sets the `x5t#s` header parameter, see [`ProtectedHeader::set_x5ts`].
    pub fn set_x5ts<C: AsRef<X509Ref>>(
        &mut self,
        certificates: &[C],
    ) -> bherror::Result<&mut Self, HeaderError> {
        self.header.set_x5ts(certificates)?;
        Ok(self)
    }

    /// Sets the `sigD` header parameter, see [`ProtectedHeader::set_sig_d`].
    pub fn set_sig_d(&mut self, sig_d: SigD) -> &mut Self {
        self.header.set_sig_d(sig_d);
        self
    }

    /// Sets the `b64` header parameter, see [`ProtectedHeader::set_b64`].
    pub fn set_b64(&mut self, b64: bool) -> &mut Self {
        self.header.set_b64(b64);
        self
    }

    /// Sets the `iat` header parameter.
    pub fn set_iat(&mut self, iat: SecondsSinceEpoch) -> &mut Self {
        self.header.set_iat(iat);
        self
    }

    /// Sets the `signedAt` header parameter.
    pub fn set_signed_at(&mut self, signed_at: SecondsSinceEpoch) -> &mut Self {
        self.header.set_signed_at(signed_at);
        self
    }

    /// Sets the `jti` header parameter.
    pub fn set_jti(&mut self, jti: impl Into<String>) -> &mut Self {
        self.header.set_jti(jti);
        self
    }

    /// Sets the `cty` header parameter.
    pub fn set_cty(&mut self, cty: impl Into<String>) -> &mut Self {
        self.header.set_cty(cty);
        self
    }

    /// Sets the `typ` header parameter.
    pub fn set_typ(&mut self, typ: impl Into<String>) -> &mut Self {
        self.header.set_typ(typ);
        self
    }

    /// Sets a header parameter without a dedicated setter, see
    /// [`ProtectedHeader::set_extension`].
    pub fn set_extension(
        &mut self,
        name: impl Into<String>,
        value: Value,
    ) -> bherror::Result<&mut Self, HeaderError> {
        self.header.set_extension(name, value)?;
        Ok(self)
    }

    /// Sets the frame of the selectively disclosable payload parts, passed to
    /// the [`IssuanceEngine`] as is.
    pub fn set_disclosure_frame(&mut self, frame: DisclosureFrame) -> &mut Self {
        self.disclosure_frame = Some(frame);
        self
    }

    /// Sets the JAdES unsigned properties (`etsiU`), added to the unprotected
    /// header of the subsequently produced signatures.
    pub fn set_etsi_u(&mut self, etsi_u: Value) -> &mut Self {
        self.etsi_u = Some(etsi_u);
        self
    }

    /// The protected header used by the next signature.
    pub fn protected_header(&self) -> &ProtectedHeader {
        &self.header
    }

    /// Signs the token with `key`, writing `kid` to the unprotected header of
    /// the signature.
    ///
    /// The first call encodes the payload and produces the token. Every
    /// subsequent call appends a signature over the already encoded payload,
    /// under the current protected header.
    ///
    /// # Errors
    ///
    /// Fails with
    /// - [`SignError::AlgorithmNotSet`] if the `alg` header is not set,
    /// - [`SignError::MissingSigD`] if the payload is detached and the `sigD`
    ///   header is not set,
    /// - [`SignError::PayloadEncodingMismatch`] if appending a signature with
    ///   a different `b64` than the one the payload was encoded with,
    /// - [`SignError::Signature`] or [`SignError::Issuance`] if producing the
    ///   signature fails.
    pub fn sign<P: SignaturePrimitive + ?Sized>(
        &mut self,
        primitive: &P,
        key: &P::Key,
        kid: &str,
    ) -> bherror::Result<&GeneralJws, SignError> {
        let alg = self
            .header
            .algorithm()
            .ok_or_else(|| Error::root(SignError::AlgorithmNotSet))?;
        let engine = SignatureEngine::new(primitive);

        let payload_kind = match self.source {
            Source::Detached => "detached",
            Source::Attached { .. } => "attached",
        };

        let jws = match self.signed {
            Some(ref mut signed) => {
                let signature = next_signature(&self.header, signed, alg, &engine, key)?;
                signed.push(signature, kid, self.etsi_u.as_ref())
            }
            None => {
                let (signed, signature) = self.first_signature(alg, &engine, key, kid)?;
                self.signed
                    .insert(signed)
                    .push(signature, kid, self.etsi_u.as_ref())
            }
        };

        tracing::debug!(
            "{alg} signature {} produced over a {payload_kind} payload",
            jws.signatures.len()
        );

        Ok(jws)
    }

    /// Encodes the payload, returning the token without its last signature
    /// and that signature.
    fn first_signature<P: SignaturePrimitive + ?Sized>(
        &self,
        alg: SigningAlgorithm,
        engine: &SignatureEngine<P>,
        key: &P::Key,
        kid: &str,
    ) -> bherror::Result<(Signed, JwsSignature), SignError> {
        let sign_input = |input: &[u8]| -> Result<String, BoxError> {
            Ok(engine.sign_with(alg, input, key)?)
        };
        let signer = IssuanceSigner {
            alg,
            kid,
            protected: &self.header,
            signer: &sign_input,
        };

        let source = match &self.source {
            Source::Detached => {
                if self.disclosure_frame.is_some() {
                    tracing::warn!("Disclosure frame is ignored for a detached payload");
                }
                PayloadSource::Detached
            }
            Source::Attached { payload, issuer } => PayloadSource::Attached {
                payload,
                frame: self.disclosure_frame.as_ref(),
                issuer,
            },
        };

        let (jws, signature) = match payload::encode(source, signer)? {
            EncodedPayload::Detached {
                protected,
                signing_input,
            } => {
                let signature = engine
                    .sign_with(alg, signing_input.as_bytes(), key)
                    .with_err(|| SignError::Signature)?;
                let jws = GeneralJws {
                    payload: String::new(),
                    signatures: Vec::new(),
                };

                (jws, JwsSignature::new(protected, signature))
            }
            EncodedPayload::Issued(mut jws) => {
                let count = jws.signatures.len();
                let signature = match (jws.signatures.pop(), count) {
                    (Some(signature), 1) => signature,
                    _ => {
                        return Err(Error::root(SignError::MalformedIssuance(format!(
                            "expected 1 signature, got {count}"
                        ))));
                    }
                };

                (jws, signature)
            }
        };

        let signed = Signed {
            jws,
            b64: self.header.b64(),
        };

        Ok((signed, signature))
    }

    /// The signed token.
    ///
    /// # Errors
    ///
    /// Fails with [`SignError::NotSignedYet`] before a successful
    /// [`Sign::sign`].
    pub fn general_jws(&self) -> bherror::Result<&GeneralJws, SignError> {
        self.signed
            .as_ref()
            .map(|signed| &signed.jws)
            .ok_or_else(|| Error::root(SignError::NotSignedYet))
    }

    /// The signed token in the General JSON Serialization.
    pub fn to_json_string(&self) -> bherror::Result<String, SignError> {
        serde_json::to_string(self.general_jws()?).foreign_err(|| SignError::Serialization)
    }

    /// The signed token as a JSON object.
    pub fn to_object(&self) -> bherror::Result<JsonObject, SignError> {
        match serde_json::to_value(self.general_jws()?).foreign_err(|| SignError::Serialization)? {
            Value::Object(object) => Ok(object),
            _ => Err(Error::root(SignError::Serialization)),
        }
    }

    /// Consumes the builder, returning the signed token.
    pub fn into_general_jws(self) -> bherror::Result<GeneralJws, SignError> {
        self.signed
            .map(|signed| signed.jws)
            .ok_or_else(|| Error::root(SignError::NotSignedYet))
    }
}

/// Signs the already encoded payload of `signed` under `header`.
fn next_signature<P: SignaturePrimitive + ?Sized>(
    header: &ProtectedHeader,
    signed: &Signed,
    alg: SigningAlgorithm,
    engine: &SignatureEngine<P>,
    key: &P::Key,
) -> bherror::Result<JwsSignature, SignError> {
    if signed.b64 != header.b64() {
        return Err(Error::root(SignError::PayloadEncodingMismatch(signed.b64)));
    }

    let protected = header.encode().with_err(|| SignError::Header)?;
    let signature = engine
        .sign_with(
            alg,
            signing_input(&protected, &signed.jws.payload).as_bytes(),
            key,
        )
        .with_err(|| SignError::Signature)?;

    Ok(JwsSignature::new(protected, signature))
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use bherror::traits::ForeignBoxed as _;
    use openssl::{
        bn::BigNum,
        ecdsa::EcdsaSig,
        hash::MessageDigest,
        pkey::{PKey, Private},
        rsa::Padding,
        sign::{RsaPssSaltlen, Verifier},
    };
    use serde_json::json;

    use super::*;
    use crate::{
        header::tests::dummy_certificate, json_object, openssl_impl::test_keys, EcCurve,
        OpensslPrimitive, SIG_D_HTTP_HEADERS,
    };

    fn decode_json(encoded: &str) -> Value {
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(encoded).unwrap()).unwrap()
    }

    fn verify_es256(key: &PKey<Private>, input: &str, signature: &str) -> bool {
        let signature = URL_SAFE_NO_PAD.decode(signature).unwrap();
        assert_eq!(signature.len(), 64);

        let signature = EcdsaSig::from_private_components(
            BigNum::from_slice(&signature[..32]).unwrap(),
            BigNum::from_slice(&signature[32..]).unwrap(),
        )
        .unwrap();
        let hash = openssl::sha::sha256(input.as_bytes());
        signature.verify(&hash, &key.ec_key().unwrap()).unwrap()
    }

    fn verify_ps256(key: &PKey<Private>, input: &str, signature: &str) -> bool {
        let signature = URL_SAFE_NO_PAD.decode(signature).unwrap();

        let mut verifier = Verifier::new(MessageDigest::sha256(), key).unwrap();
        verifier.set_rsa_padding(Padding::PKCS1_PSS).unwrap();
        verifier
            .set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)
            .unwrap();
        verifier.set_rsa_mgf1_md(MessageDigest::sha256()).unwrap();
        verifier.update(input.as_bytes()).unwrap();
        verifier.verify(&signature).unwrap()
    }

    /// Engine embedding the plain JSON payload, signed by every signer.
    struct PlainEngine;

    impl IssuanceEngine for PlainEngine {
        type Err = SignError;

        fn issue(
            &self,
            payload: &JsonObject,
            _: Option<&DisclosureFrame>,
            signers: &[IssuanceSigner],
        ) -> bherror::Result<GeneralJws, Self::Err> {
            let payload = serde_json::to_string(payload).unwrap();
            let payload = payload::encode_payload(&payload, signers[0].b64());

            let signatures = signers
                .iter()
                .map(|signer| signer.sign(&payload))
                .collect::<Result<_, _>>()
                .foreign_boxed_err(|| SignError::Signature)?;

            Ok(GeneralJws {
                payload,
                signatures,
            })
        }
    }

    /// Engine returning a token without any signature.
    struct UnsignedEngine;

    impl IssuanceEngine for UnsignedEngine {
        type Err = SignError;

        fn issue(
            &self,
            _: &JsonObject,
            _: Option<&DisclosureFrame>,
            _: &[IssuanceSigner],
        ) -> bherror::Result<GeneralJws, Self::Err> {
            Ok(GeneralJws {
                payload: String::new(),
                signatures: Vec::new(),
            })
        }
    }

    fn detached_sign() -> Sign {
        let mut sign = Sign::detached();
        sign.set_algorithm("ES256")
            .unwrap()
            .set_sig_d(SigD::object_id_by_uri(["https://example.com/doc.pdf"]));
        sign
    }

    #[test]
    fn sign_without_algorithm_fails() {
        let key = test_keys::ec(EcCurve::P256);
        let mut sign = Sign::detached();
        sign.set_sig_d(SigD::object_id_by_uri(["urn:example:doc"]));

        let error = sign.sign(&OpensslPrimitive, &key, "key-1").unwrap_err();
        assert_eq!(error.error, SignError::AlgorithmNotSet);
    }

    #[test]
    fn invalid_algorithms_fail_eagerly() {
        let mut sign = Sign::detached();

        let error = sign.set_algorithm("none").unwrap_err();
        assert_eq!(error.error, HeaderError::InvalidAlgorithm("none".to_owned()));

        let error = sign.set_algorithm("").unwrap_err();
        assert_eq!(error.error, HeaderError::InvalidAlgorithm("".to_owned()));
    }

    #[test]
    fn accessors_before_signing_fail() {
        let sign = detached_sign();

        assert_eq!(
            sign.general_jws().unwrap_err().error,
            SignError::NotSignedYet
        );
        assert_eq!(
            sign.to_json_string().unwrap_err().error,
            SignError::NotSignedYet
        );
        assert_eq!(sign.to_object().unwrap_err().error, SignError::NotSignedYet);
        assert_eq!(
            sign.into_general_jws().unwrap_err().error,
            SignError::NotSignedYet
        );
    }

    #[test]
    fn detached_signature() {
        let key = test_keys::ec(EcCurve::P256);
        let mut sign = detached_sign();
        sign.set_signed_at(1_700_000_000);

        let jws = sign.sign(&OpensslPrimitive, &key, "key-1").unwrap().clone();

        assert_eq!(jws.payload, "");
        assert_eq!(jws.signatures.len(), 1);

        let signature = &jws.signatures[0];
        assert_eq!(signature.protected, sign.protected_header().encode().unwrap());
        assert_eq!(
            decode_json(&signature.protected),
            json!({
                "alg": "ES256",
                "sigD": {
                    "mId": "http://uri.etsi.org/19182/ObjectIdByURI",
                    "pars": ["https://example.com/doc.pdf"],
                },
                "crit": ["sigD"],
                "signedAt": 1_700_000_000,
            })
        );
        assert_eq!(
            signature.header.as_ref().unwrap().kid.as_deref(),
            Some("key-1")
        );
        assert!(verify_es256(
            &key,
            &format!("{}.", signature.protected),
            &signature.signature
        ));

        assert_eq!(
            sign.to_object().unwrap(),
            json_object!({
                "payload": "",
                "signatures": [{
                    "protected": signature.protected,
                    "header": { "kid": "key-1" },
                    "signature": signature.signature,
                }],
            })
        );
    }

    #[test]
    fn detached_signature_requires_sig_d() {
        let key = test_keys::ec(EcCurve::P256);
        let mut sign = Sign::detached();
        sign.set_algorithm_typed(SigningAlgorithm::Es256);

        let error = sign.sign(&OpensslPrimitive, &key, "key-1").unwrap_err();
        assert_eq!(error.error, SignError::MissingSigD);
        assert!(sign.general_jws().is_err());
    }

    #[test]
    fn http_headers_mechanism() {
        let key = test_keys::rsa(2048);
        let mut sign = Sign::detached();
        sign.set_algorithm_typed(SigningAlgorithm::Ps256)
            .set_b64(true)
            .set_sig_d(SigD::http_headers(["(request-target)", "digest"]))
            .set_b64(true);

        let jws = sign.sign(&OpensslPrimitive, &key, "").unwrap();
        let signature = &jws.signatures[0];

        let header = decode_json(&signature.protected);
        assert_eq!(header["b64"], false);
        assert_eq!(header["crit"], json!(["b64", "sigD"]));
        assert_eq!(header["sigD"]["mId"], SIG_D_HTTP_HEADERS);
        assert_eq!(signature.header, None);
        assert!(verify_ps256(
            &key,
            &format!("{}.", signature.protected),
            &signature.signature
        ));
    }

    #[test]
    fn rs256_is_deterministic() {
        let key = test_keys::rsa(2048);

        let signatures: Vec<_> = (0..2)
            .map(|_| {
                let mut sign = detached_sign();
                sign.set_algorithm_typed(SigningAlgorithm::Rs256);
                sign.sign(&OpensslPrimitive, &key, "key-1")
                    .unwrap()
                    .signatures[0]
                    .signature
                    .clone()
            })
            .collect();

        assert_eq!(signatures[0], signatures[1]);
        assert_eq!(URL_SAFE_NO_PAD.decode(&signatures[0]).unwrap().len(), 256);
    }

    #[test]
    fn probabilistic_signatures_differ_and_verify() {
        let ec_key = test_keys::ec(EcCurve::P256);
        let rsa_key = test_keys::rsa(2048);

        let mut es256 = Vec::new();
        let mut ps256 = Vec::new();
        for _ in 0..2 {
            let mut sign = detached_sign();
            es256.push(sign.sign(&OpensslPrimitive, &ec_key, "").unwrap().clone());

            let mut sign = detached_sign();
            sign.set_algorithm_typed(SigningAlgorithm::Ps256);
            ps256.push(sign.sign(&OpensslPrimitive, &rsa_key, "").unwrap().clone());
        }

        assert_ne!(es256[0].signatures[0].signature, es256[1].signatures[0].signature);
        assert_ne!(ps256[0].signatures[0].signature, ps256[1].signatures[0].signature);

        for jws in es256 {
            let signature = &jws.signatures[0];
            let input = format!("{}.", signature.protected);
            assert!(verify_es256(&ec_key, &input, &signature.signature));
        }
        for jws in ps256 {
            let signature = &jws.signatures[0];
            let input = format!("{}.", signature.protected);
            assert!(verify_ps256(&rsa_key, &input, &signature.signature));
        }
    }

    #[test]
    fn certificate_headers_are_signed() {
        let (certificate, key) = dummy_certificate("signer");
        let (root, _) = dummy_certificate("root");

        let mut sign = detached_sign();
        sign.set_x5c(&[certificate.clone()])
            .unwrap()
            .set_x5t_s256(&certificate)
            .unwrap()
            .set_x5t_o(&certificate)
            .unwrap()
            .set_x5ts(&[certificate.clone(), root])
            .unwrap()
            .set_kid("signer-key")
            .set_iat(1_700_000_000)
            .set_jti("3f9a")
            .set_cty("application/pdf")
            .set_typ("jose+json")
            .set_x5u(Uri::new("https://example.com/signer.pem").unwrap())
            .set_extension("etsiCustom", json!("value"))
            .unwrap();

        assert_eq!(
            sign.set_x5ts(&[certificate.clone()]).unwrap_err().error,
            HeaderError::InsufficientCertificates(1)
        );

        let jws = sign.sign(&OpensslPrimitive, &key, "").unwrap();
        let header = decode_json(&jws.signatures[0].protected);

        assert_eq!(header["kid"], "signer-key");
        assert_eq!(header["x5t#s"].as_array().unwrap().len(), 2);
        assert_eq!(header["x5c"].as_array().unwrap().len(), 1);
        assert_eq!(header["etsiCustom"], "value");
        assert!(header.get("x5t#S256").is_some());
        assert!(header.get("x5t#o").is_some());
    }

    #[test]
    fn append_keeps_payload() {
        let ec_key = test_keys::ec(EcCurve::P256);
        let rsa_key = test_keys::rsa(2048);
        let payload = json_object!({ "iss": "https://issuer.example.com", "n": 1 });

        let mut sign = Sign::new(payload, PlainEngine);
        sign.set_algorithm("ES256")
            .unwrap()
            .set_etsi_u(json!([{ "sigTst": { "tstTokens": [] } }]));

        let first = sign.sign(&OpensslPrimitive, &ec_key, "ec-key").unwrap().clone();
        assert_eq!(
            decode_json(&first.payload),
            json!({ "iss": "https://issuer.example.com", "n": 1 })
        );

        sign.set_algorithm("PS256").unwrap().set_kid("rsa-key");
        let second = sign.sign(&OpensslPrimitive, &rsa_key, "rsa-key").unwrap().clone();

        assert_eq!(second.payload, first.payload);
        assert_eq!(second.signatures.len(), 2);
        assert_eq!(second.signatures[0], first.signatures[0]);

        let appended = &second.signatures[1];
        assert_eq!(
            decode_json(&appended.protected),
            json!({ "alg": "PS256", "kid": "rsa-key" })
        );
        let header = appended.header.as_ref().unwrap();
        assert_eq!(header.kid.as_deref(), Some("rsa-key"));
        assert_eq!(header.etsi_u, Some(json!([{ "sigTst": { "tstTokens": [] } }])));
        assert!(verify_ps256(
            &rsa_key,
            &format!("{}.{}", appended.protected, second.payload),
            &appended.signature
        ));

        let first_signature = &second.signatures[0];
        assert!(verify_es256(
            &ec_key,
            &format!("{}.{}", first_signature.protected, second.payload),
            &first_signature.signature
        ));

        assert_eq!(sign.into_general_jws().unwrap(), second);
    }

    #[test]
    fn append_rejects_b64_change() {
        let key = test_keys::ec(EcCurve::P256);
        let mut sign = Sign::new(json_object!({ "a": 1 }), PlainEngine);
        sign.set_algorithm_typed(SigningAlgorithm::Es256).set_b64(false);

        let jws = sign.sign(&OpensslPrimitive, &key, "").unwrap();
        assert_eq!(jws.payload, r#"{"a":1}"#);

        sign.set_b64(true);
        let error = sign.sign(&OpensslPrimitive, &key, "").unwrap_err();
        assert_eq!(error.error, SignError::PayloadEncodingMismatch(false));
        assert_eq!(sign.general_jws().unwrap().signatures.len(), 1);

        sign.set_b64(false);
        let jws = sign.sign(&OpensslPrimitive, &key, "second").unwrap();
        assert_eq!(jws.payload, r#"{"a":1}"#);
        assert_eq!(jws.signatures.len(), 2);
        assert_eq!(jws.signatures[0].header, None);
        assert_eq!(
            jws.signatures[1].header.as_ref().unwrap().kid.as_deref(),
            Some("second")
        );
    }

    #[test]
    fn detached_append_keeps_empty_payload() {
        let key = test_keys::ec(EcCurve::P256);
        let mut sign = detached_sign();
        sign.sign(&OpensslPrimitive, &key, "key-1").unwrap();
        let jws = sign.sign(&OpensslPrimitive, &key, "key-2").unwrap();

        assert_eq!(jws.payload, "");
        assert_eq!(jws.signatures.len(), 2);
        for signature in &jws.signatures {
            assert!(verify_es256(
                &key,
                &format!("{}.", signature.protected),
                &signature.signature
            ));
        }
    }

    #[test]
    fn malformed_issuance_is_rejected() {
        let key = test_keys::ec(EcCurve::P256);
        let mut sign = Sign::new(json_object!({ "a": 1 }), UnsignedEngine);
        sign.set_algorithm_typed(SigningAlgorithm::Es256);

        let error = sign.sign(&OpensslPrimitive, &key, "").unwrap_err();
        assert_eq!(
            error.error,
            SignError::MalformedIssuance("expected 1 signature, got 0".to_owned())
        );
    }

    #[test]
    fn signature_failure_propagates() {
        let key = test_keys::rsa(2048);
        let mut sign = detached_sign();

        let error = sign.sign(&OpensslPrimitive, &key, "").unwrap_err();
        assert_eq!(error.error, SignError::Signature);

        let mut sign = Sign::new(json_object!({ "a": 1 }), PlainEngine);
        sign.set_algorithm_typed(SigningAlgorithm::Es256);
        let error = sign.sign(&OpensslPrimitive, &key, "").unwrap_err();
        assert_eq!(error.error, SignError::Issuance);
    }

    #[test]
    fn general_json_output() {
        let key = test_keys::ed25519();
        let mut sign = detached_sign();
        sign.set_algorithm("EdDSA").unwrap();
        sign.sign(&OpensslPrimitive, &key, "ed-key").unwrap();

        let json: Value = serde_json::from_str(&sign.to_json_string().unwrap()).unwrap();
        assert_eq!(json["payload"], "");
        assert_eq!(json["signatures"][0]["header"], json!({ "kid": "ed-key" }));
        assert_eq!(sign.general_jws().unwrap().compact(), None);
    }
}
