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

use std::str::FromStr as _;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bherror::{
    traits::{ErrorContext as _, ForeignError as _, PropagateError as _},
    Error,
};
use bhx5chain::{JwtX5Chain, X5Chain};
use iref::Uri;
use openssl::x509::X509Ref;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    algorithm::SIGNING_ALG_NONE, base64_url_encode, error::HeaderError, DigestAlgorithm,
    JsonObject, SigningAlgorithm,
};

/// The `sigD` mechanism identifier for signing HTTP header fields.
///
/// When this mechanism is used the payload is never base64url-encoded, i.e.
/// the header always carries `"b64": false`.
pub const SIG_D_HTTP_HEADERS: &str = "http://uri.etsi.org/19182/HttpHeaders";
/// The `sigD` mechanism identifier for detached objects referenced by URI.
pub const SIG_D_OBJECT_ID_BY_URI: &str = "http://uri.etsi.org/19182/ObjectIdByURI";
/// The `sigD` mechanism identifier for detached objects referenced by URI,
/// together with their digests.
pub const SIG_D_OBJECT_ID_BY_URI_HASH: &str = "http://uri.etsi.org/19182/ObjectIdByURIHash";

/// Number of seconds since the Unix epoch.
pub type SecondsSinceEpoch = u64;

/// Header parameters which have a dedicated setter on [`ProtectedHeader`].
const KNOWN_HEADER_NAMES: [&str; 15] = [
    "alg", "kid", "x5u", "x5c", "x5t#S256", "x5t#o", "x5t#s", "sigD", "b64", "crit", "iat",
    "signedAt", "jti", "cty", "typ",
];

const B64: &str = "b64";
const SIG_D: &str = "sigD";

/// Digest of a certificate together with the algorithm used to compute it.
///
/// Used by the `x5t#o` and `x5t#s` header parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestAlgAndValue {
    /// The digest algorithm.
    pub dig_alg: DigestAlgorithm,
    /// The `base64url`-encoded digest value.
    pub dig_val: String,
}

impl DigestAlgAndValue {
    fn of_certificate(
        dig_alg: DigestAlgorithm,
        certificate: &X509Ref,
    ) -> bherror::Result<Self, HeaderError> {
        let der = certificate
            .to_der()
            .foreign_err(|| HeaderError::InvalidCertificate)?;
        let digest = dig_alg.digest_with(&der, || HeaderError::InvalidCertificate)?;

        Ok(Self {
            dig_alg,
            dig_val: base64_url_encode(digest),
        })
    }
}

/// The `sigD` header parameter, describing the detached data objects covered
/// by the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigD {
    /// Identifier of the mechanism used for referencing the detached objects,
    /// e.g. [`SIG_D_HTTP_HEADERS`].
    pub m_id: String,
    /// Mechanism parameters, e.g. the signed HTTP header names or the URIs of
    /// the detached objects.
    pub pars: Vec<String>,
    /// Digest algorithm of the [`SigD::hash_v`] values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_m: Option<DigestAlgorithm>,
    /// `base64url`-encoded digests of the detached objects, in the order of
    /// [`SigD::pars`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_v: Option<Vec<String>>,
    /// Content types of the detached objects, in the order of [`SigD::pars`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctys: Option<Vec<String>>,
}

impl SigD {
    /// `sigD` for the HTTP headers mechanism, signing the header fields named
    /// in `header_names`.
    pub fn http_headers<I, S>(header_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_mechanism(SIG_D_HTTP_HEADERS, header_names)
    }

    /// `sigD` referencing the detached objects by their URIs.
    pub fn object_id_by_uri<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_mechanism(SIG_D_OBJECT_ID_BY_URI, uris)
    }

    /// `sigD` referencing the detached objects by their URIs, while also
    /// carrying the digest of every object, computed with `hash_m`.
    pub fn object_id_by_uri_hash<'a, I>(
        hash_m: DigestAlgorithm,
        objects: I,
    ) -> bherror::Result<Self, HeaderError>
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        let mut pars = Vec::new();
        let mut hash_v = Vec::new();

        for (uri, content) in objects {
            let digest = hash_m
                .digest_with(content, || HeaderError::Serialization)
                .ctx(|| format!("unable to digest the object {uri}"))?;
            pars.push(uri.to_owned());
            hash_v.push(base64_url_encode(digest));
        }

        Ok(Self {
            m_id: SIG_D_OBJECT_ID_BY_URI_HASH.to_owned(),
            pars,
            hash_m: Some(hash_m),
            hash_v: Some(hash_v),
            ctys: None,
        })
    }

    /// Sets the content types of the detached objects.
    pub fn with_ctys<I, S>(mut self, ctys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ctys = Some(ctys.into_iter().map(Into::into).collect());
        self
    }

    fn with_mechanism<I, S>(m_id: &str, pars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            m_id: m_id.to_owned(),
            pars: pars.into_iter().map(Into::into).collect(),
            hash_m: None,
            hash_v: None,
            ctys: None,
        }
    }

    fn is_http_headers(&self) -> bool {
        self.m_id == SIG_D_HTTP_HEADERS
    }
}

/// JAdES protected header.
///
/// The header is built up through its setters, which validate their input
/// eagerly. The following holds for every header built this way:
///
/// - once `sigD` uses the [`SIG_D_HTTP_HEADERS`] mechanism, `b64` is `false`,
/// - `crit` lists exactly the present `b64: false` and `sigD` parameters, and
///   is absent when it would be empty,
/// - extension parameters never shadow a parameter with a dedicated setter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProtectedHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    alg: Option<SigningAlgorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    x5u: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    x5c: Option<Vec<String>>,
    #[serde(rename = "x5t#S256", skip_serializing_if = "Option::is_none")]
    x5t_s256: Option<String>,
    #[serde(rename = "x5t#o", skip_serializing_if = "Option::is_none")]
    x5t_o: Option<DigestAlgAndValue>,
    #[serde(rename = "x5t#s", skip_serializing_if = "Option::is_none")]
    x5t_s: Option<Vec<DigestAlgAndValue>>,
    #[serde(rename = "sigD", skip_serializing_if = "Option::is_none")]
    sig_d: Option<SigD>,
    #[serde(skip_serializing_if = "Option::is_none")]
    b64: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    crit: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    iat: Option<SecondsSinceEpoch>,
    #[serde(rename = "signedAt", skip_serializing_if = "Option::is_none")]
    signed_at: Option<SecondsSinceEpoch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    jti: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
    #[serde(flatten)]
    extensions: JsonObject,
}

impl ProtectedHeader {
    /// Creates an empty header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `alg` header parameter from its JWS identifier.
    ///
    /// # Errors
    ///
    /// Fails with [`HeaderError::InvalidAlgorithm`] for an empty identifier or
    /// `"none"`, and with [`HeaderError::UnsupportedAlgorithm`] for an
    /// identifier outside of [`SigningAlgorithm`].
    pub fn set_algorithm(&mut self, alg: &str) -> bherror::Result<&mut Self, HeaderError> {
        if alg.is_empty() || alg == SIGNING_ALG_NONE {
            return Err(Error::root(HeaderError::InvalidAlgorithm(alg.to_owned())));
        }

        let alg = SigningAlgorithm::from_str(alg)
            .with_err(|| HeaderError::UnsupportedAlgorithm(alg.to_owned()))?;

        Ok(self.set_algorithm_typed(alg))
    }

    /// Sets the `alg` header parameter.
    pub fn set_algorithm_typed(&mut self, alg: SigningAlgorithm) -> &mut Self {
        self.alg = Some(alg);
        self
    }

    /// Sets the `kid` header parameter.
    pub fn set_kid(&mut self, kid: impl Into<String>) -> &mut Self {
        self.kid = Some(kid.into());
        self
    }

    /// Sets the `x5u` header parameter.
    pub fn set_x5u(&mut self, x5u: &Uri) -> &mut Self {
        self.x5u = Some(x5u.as_str().to_owned());
        self
    }

    /// Sets the `x5c` header parameter to the given certificates, leaf first.
    pub fn set_x5c<C: AsRef<X509Ref>>(
        &mut self,
        certificates: &[C],
    ) -> bherror::Result<&mut Self, HeaderError> {
        let x5c = certificates
            .iter()
            .map(|certificate| {
                certificate
                    .as_ref()
                    .to_der()
                    .map(|der| STANDARD.encode(der))
                    .foreign_err(|| HeaderError::InvalidCertificate)
            })
            .collect::<Result<_, _>>()?;

        self.x5c = Some(x5c);
        Ok(self)
    }

    /// Sets the `x5c` header parameter to the given certificate chain.
    pub fn set_x5c_chain(&mut self, chain: &X5Chain) -> &mut Self {
        self.x5c = Some(JwtX5Chain::from(chain.clone()).into_base64_ders());
        self
    }

    /// Sets the `x5t#S256` header parameter to the SHA-256 thumbprint of the
    /// certificate.
    pub fn set_x5t_s256(&mut self, certificate: &X509Ref) -> bherror::Result<&mut Self, HeaderError> {
        let thumbprint = DigestAlgAndValue::of_certificate(DigestAlgorithm::Sha256, certificate)?;

        self.x5t_s256 = Some(thumbprint.dig_val);
        Ok(self)
    }

    /// Sets the `x5t#o` header parameter to the SHA-512 digest of the
    /// certificate.
    pub fn set_x5t_o(&mut self, certificate: &X509Ref) -> bherror::Result<&mut Self, HeaderError> {
        self.x5t_o = Some(DigestAlgAndValue::of_certificate(
            DigestAlgorithm::Sha512,
            certificate,
        )?);
        Ok(self)
    }

    /// Sets the `x5t#s` header parameter to the SHA-512 digests of the
    /// certificate chain, in the given order.
    ///
    /// # Errors
    ///
    /// Fails with [`HeaderError::InsufficientCertificates`] when given less
    /// than 2 certificates; [`ProtectedHeader::set_x5t_o`] or
    /// [`ProtectedHeader::set_x5t_s256`] reference a single certificate.
    pub fn set_x5ts<C: AsRef<X509Ref>>(
        &mut self,
        certificates: &[C],
    ) -> bherror::Result<&mut Self, HeaderError> {
        if certificates.len() < 2 {
            return Err(Error::root(HeaderError::InsufficientCertificates(
                certificates.len(),
            )));
        }

        let x5t_s = certificates
            .iter()
            .enumerate()
            .map(|(index, certificate)| {
                DigestAlgAndValue::of_certificate(DigestAlgorithm::Sha512, certificate.as_ref())
                    .ctx(|| format!("certificate at index {index}"))
            })
            .collect::<Result<_, _>>()?;

        self.x5t_s = Some(x5t_s);
        Ok(self)
    }

    /// Sets the `sigD` header parameter.
    ///
    /// Using the [`SIG_D_HTTP_HEADERS`] mechanism also sets `b64` to `false`.
    pub fn set_sig_d(&mut self, sig_d: SigD) -> &mut Self {
        if sig_d.is_http_headers() {
            self.b64 = Some(false);
        }
        self.sig_d = Some(sig_d);
        self.update_crit();
        self
    }

    /// Sets whether the payload is `base64url`-encoded before signing, as
    /// defined in [RFC7797].
    ///
    /// `true` removes the `b64` header parameter, which is equivalent, unless
    /// the [`SIG_D_HTTP_HEADERS`] mechanism is in use; the header then keeps
    /// `"b64": false`.
    ///
    /// [RFC7797]: https://datatracker.ietf.org/doc/html/rfc7797
    pub fn set_b64(&mut self, b64: bool) -> &mut Self {
        if !b64 {
            self.b64 = Some(false);
        } else if self.is_http_headers() {
            tracing::warn!("b64 cannot be enabled with the {SIG_D_HTTP_HEADERS} sigD mechanism");
        } else {
            self.b64 = None;
        }
        self.update_crit();
        self
    }

    /// Sets the `iat` header parameter.
    pub fn set_iat(&mut self, iat: SecondsSinceEpoch) -> &mut Self {
        self.iat = Some(iat);
        self
    }

    /// Sets the `signedAt` header parameter.
    pub fn set_signed_at(&mut self, signed_at: SecondsSinceEpoch) -> &mut Self {
        self.signed_at = Some(signed_at);
        self
    }

    /// Sets the `jti` header parameter.
    pub fn set_jti(&mut self, jti: impl Into<String>) -> &mut Self {
        self.jti = Some(jti.into());
        self
    }

    /// Sets the `cty` header parameter.
    pub fn set_cty(&mut self, cty: impl Into<String>) -> &mut Self {
        self.cty = Some(cty.into());
        self
    }

    /// Sets the `typ` header parameter.
    pub fn set_typ(&mut self, typ: impl Into<String>) -> &mut Self {
        self.typ = Some(typ.into());
        self
    }

    /// Sets a header parameter without a dedicated setter.
    ///
    /// # Errors
    ///
    /// Fails with [`HeaderError::ReservedHeaderName`] if `name` has a
    /// dedicated setter.
    pub fn set_extension(
        &mut self,
        name: impl Into<String>,
        value: Value,
    ) -> bherror::Result<&mut Self, HeaderError> {
        let name = name.into();
        if KNOWN_HEADER_NAMES.contains(&name.as_str()) {
            return Err(Error::root(HeaderError::ReservedHeaderName(name)));
        }

        self.extensions.insert(name, value);
        Ok(self)
    }

    /// The `alg` header parameter, if set.
    pub fn algorithm(&self) -> Option<SigningAlgorithm> {
        self.alg
    }

    /// The `kid` header parameter, if set.
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// The `sigD` header parameter, if set.
    pub fn sig_d(&self) -> Option<&SigD> {
        self.sig_d.as_ref()
    }

    /// Whether the payload is `base64url`-encoded, i.e. `false` only if the
    /// header carries `"b64": false`.
    pub fn b64(&self) -> bool {
        self.b64.unwrap_or(true)
    }

    /// The `crit` header parameter.
    pub fn crit(&self) -> &[String] {
        self.crit.as_deref().unwrap_or_default()
    }

    /// The extension header parameters.
    pub fn extensions(&self) -> &JsonObject {
        &self.extensions
    }

    /// Returns the `base64url`-encoded JSON serialization of the header, as
    /// used in the signing input.
    pub fn encode(&self) -> bherror::Result<String, HeaderError> {
        let json = serde_json::to_vec(self).foreign_err(|| HeaderError::Serialization)?;

        Ok(base64_url_encode(json))
    }

    /// Returns the header as a JSON object.
    pub fn to_object(&self) -> bherror::Result<JsonObject, HeaderError> {
        match serde_json::to_value(self).foreign_err(|| HeaderError::Serialization)? {
            Value::Object(object) => Ok(object),
            _ => Err(Error::root(HeaderError::Serialization)),
        }
    }

    fn is_http_headers(&self) -> bool {
        self.sig_d.as_ref().is_some_and(SigD::is_http_headers)
    }

    fn update_crit(&mut self) {
        let mut crit = Vec::new();
        if self.b64 == Some(false) {
            crit.push(B64.to_owned());
        }
        if self.sig_d.is_some() {
            crit.push(SIG_D.to_owned());
        }

        self.crit = (!crit.is_empty()).then_some(crit);
    }
}
