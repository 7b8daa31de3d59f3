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

use rand_core::CryptoRngCore;

/// Number of random bytes in a generated salt.
pub const SALT_ENTROPY_BYTES: usize = 16;

/// Source of the salts of the disclosures.
///
/// The salts **MUST** be highly unpredictable, see sections [11.3] and
/// [11.4] of the draft. Deterministic implementations are only meant for
/// testing.
///
/// [11.3]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#name-entropy-of-the-salt
/// [11.4]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#name-minimum-length-of-the-salt
pub trait SaltGenerator {
    /// Returns a fresh salt.
    fn generate_salt(&self) -> String;
}

impl<S: SaltGenerator + ?Sized> SaltGenerator for &S {
    fn generate_salt(&self) -> String {
        (**self).generate_salt()
    }
}

/// A [`SaltGenerator`] drawing [`SALT_ENTROPY_BYTES`] bytes from the
/// thread-local CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSalt;

impl SaltGenerator for RandomSalt {
    fn generate_salt(&self) -> String {
        generate_salt(&mut rand::thread_rng())
    }
}

/// Generates a `base64url` string of [`SALT_ENTROPY_BYTES`] random bytes,
/// drawn from `rng`.
pub fn generate_salt<R: CryptoRngCore + ?Sized>(rng: &mut R) -> String {
    let mut salt = [0; SALT_ENTROPY_BYTES];
    rng.fill_bytes(&mut salt);
    bh_jades::base64_url_encode(salt)
}
