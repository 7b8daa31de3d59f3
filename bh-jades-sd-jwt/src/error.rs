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

/// Error raised by the [`SdJwtIssuer`](crate::SdJwtIssuer).
#[derive(strum_macros::Display, Debug, PartialEq, Eq, Clone)]
pub enum IssuerError {
    /// A claim name is reserved for the SD-JWT encoding and may appear
    /// neither in the payload nor in a disclosure path.
    #[strum(to_string = "Use of reserved claim name {0}")]
    ReservedClaimName(&'static str),

    /// The disclosure path cannot address a concealable node, e.g. it is
    /// empty or indexes an object.
    #[strum(to_string = "Invalid path {0}")]
    InvalidPath(String),

    /// The disclosure path does not exist in the payload.
    #[strum(to_string = "Non existent path {0}")]
    NonExistentPath(String),

    /// The disclosure frame conceals the same node more than once.
    #[strum(to_string = "Duplicate path {0}")]
    DuplicatePath(String),

    /// The signers disagree on the payload encoding.
    #[strum(to_string = "Invalid protected header")]
    Header,

    /// A signer failed, either encoding its protected header or signing.
    #[strum(to_string = "Signing failed")]
    SigningFailed,

    /// The concealed payload could not be serialized.
    #[strum(to_string = "Payload serialization failed")]
    Serialization,
}

impl bherror::BhError for IssuerError {}

/// Result type used across the crate.
pub type Result<T> = bherror::Result<T, IssuerError>;
