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

use std::{cmp::Reverse, collections::HashSet};

use bh_jades::JsonObject;
use bherror::{traits::ErrorContext as _, Error};
use serde_json::{json, Value};

use crate::{
    error::Result,
    path::{index_mut_object_by_path, JsonNodePath, JsonNodePathSegment},
    Disclosure, Hasher, IssuerError, SaltGenerator, ELLIPSIS, RESERVED_CLAIM_NAMES, SD,
};

/// Conceals the nodes of `claims` at `disclosure_paths`, replacing each with
/// the digest of its disclosure as described [here], and returns the
/// disclosures in the order they were created.
///
/// Descendants are concealed before their ancestors, so concealing both a
/// node and one of its children yields a recursive disclosure. Every `_sd`
/// array is kept sorted.
///
/// # Errors
/// Encoding will fail if:
/// - `claims` contains one of the [`RESERVED_CLAIM_NAMES`]
/// - `disclosure_paths` contains duplicate paths
/// - `disclosure_paths` contains one of the [`RESERVED_CLAIM_NAMES`]
/// - `disclosure_paths` contains a path that does not exist in `claims`
/// - `disclosure_paths` contains the empty path
///
/// [here]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#name-disclosures
pub(crate) fn encode_claims<H: Hasher, S: SaltGenerator>(
    claims: &mut JsonObject,
    disclosure_paths: &[JsonNodePath],
    hasher: &H,
    salts: &S,
) -> Result<Vec<Disclosure>> {
    if let Some(name) = check_reserved_keys_in_claims(claims) {
        return Err(Error::root(IssuerError::ReservedClaimName(name)));
    }
    check_duplicate_paths(disclosure_paths)?;

    let mut disclosures = Vec::with_capacity(disclosure_paths.len());

    for path in toposort_node_paths(disclosure_paths) {
        check_reserved_keys_in_path(path)?;
        disclosures.push(conceal_disclosure(claims, path, hasher, salts.generate_salt())?);
    }

    Ok(disclosures)
}

fn conceal_disclosure<H: Hasher>(
    claims: &mut JsonObject,
    path: &JsonNodePath,
    hasher: &H,
    salt: String,
) -> Result<Disclosure> {
    // The root object is not a child of any parent, there is no `_sd` array
    // to put its digest in.
    let (last_segment, path_without_last) = path
        .0
        .split_last()
        .ok_or_else(|| Error::root(IssuerError::InvalidPath(path.to_string())))?;

    if path_without_last.is_empty() {
        let JsonNodePathSegment::Key(key) = last_segment else {
            // the root is an object
            return Err(Error::root(IssuerError::InvalidPath(path.to_string())));
        };
        return conceal_disclosure_in_object(claims, key, salt, hasher, path);
    }

    let disclosure_parent = index_mut_object_by_path(claims, path_without_last)
        .ok_or_else(|| Error::root(IssuerError::NonExistentPath(path.to_string())))?;

    match (disclosure_parent, last_segment) {
        // https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#name-disclosures-for-object-prop
        (Value::Object(object), JsonNodePathSegment::Key(key)) => {
            conceal_disclosure_in_object(object, key, salt, hasher, path)
        }
        // https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#name-disclosures-for-array-eleme
        (Value::Array(array), JsonNodePathSegment::Index(index)) => {
            conceal_disclosure_in_array(array, *index, salt, hasher, path)
        }
        _ => Err(Error::root(IssuerError::InvalidPath(path.to_string()))
            .ctx("parent is not an object or array matching the last segment")),
    }
}

fn conceal_disclosure_in_object<H: Hasher>(
    object: &mut JsonObject,
    key: &str,
    salt: String,
    hasher: &H,
    path: &JsonNodePath,
) -> Result<Disclosure> {
    let value = object
        .remove(key)
        .ok_or_else(|| Error::root(IssuerError::NonExistentPath(path.to_string())))?;

    let disclosure = Disclosure::new(salt, Some(key.to_owned()), value);
    let digest = disclosure.digest(hasher);

    let Value::Array(sd_array) = object.entry(SD).or_insert(Value::Array(vec![])) else {
        return Err(Error::root(IssuerError::ReservedClaimName(SD)))
            .ctx(|| format!("_sd value is not an array at {path}"));
    };
    // sorted insertion hides the original claim order
    let position = sd_array.partition_point(|existing| existing.as_str() < Some(digest.as_str()));
    sd_array.insert(position, Value::String(digest));

    Ok(disclosure)
}

fn conceal_disclosure_in_array<H: Hasher>(
    array: &mut [Value],
    index: usize,
    salt: String,
    hasher: &H,
    path: &JsonNodePath,
) -> Result<Disclosure> {
    let element = array
        .get_mut(index)
        .ok_or_else(|| Error::root(IssuerError::NonExistentPath(path.to_string())))?;

    // take the value without shifting the rest of the array
    let value = std::mem::take(element);
    let disclosure = Disclosure::new(salt, None, value);
    *element = json!({ ELLIPSIS: disclosure.digest(hasher) });

    Ok(disclosure)
}

/// Ancestors have to be concealed strictly after their descendants, which is
/// ensured by sorting the paths descending by length. The sort is stable, so
/// paths of the same depth keep their order.
fn toposort_node_paths(disclosure_paths: &[JsonNodePath]) -> Vec<&JsonNodePath> {
    let mut paths: Vec<_> = disclosure_paths.iter().collect();
    paths.sort_by_key(|path| Reverse(path.len()));
    paths
}

fn check_duplicate_paths(disclosure_paths: &[JsonNodePath]) -> Result<()> {
    let mut uniq = HashSet::new();
    for path in disclosure_paths {
        if !uniq.insert(path) {
            return Err(Error::root(IssuerError::DuplicatePath(path.to_string())));
        }
    }

    Ok(())
}

fn is_reserved_key_name(key: &str) -> Option<&'static str> {
    RESERVED_CLAIM_NAMES.iter().find(|&name| key == *name).copied()
}

/// The payload must not contain the reserved claim names, except as the
/// digests created while concealing.
///
/// [Reference](https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#section-5.1-3.7)
fn check_reserved_keys_in_claims(claims: &JsonObject) -> Option<&'static str> {
    claims.iter().find_map(|(name, value)| {
        is_reserved_key_name(name).or_else(|| check_reserved_keys_in_value(value))
    })
}

fn check_reserved_keys_in_value(value: &Value) -> Option<&'static str> {
    match value {
        Value::Object(object) => check_reserved_keys_in_claims(object),
        Value::Array(array) => array.iter().find_map(check_reserved_keys_in_value),
        _ => None,
    }
}

fn check_reserved_keys_in_path(path: &JsonNodePath) -> Result<()> {
    for segment in &path.0 {
        if let JsonNodePathSegment::Key(key) = segment {
            if let Some(name) = is_reserved_key_name(key) {
                return Err(Error::root(IssuerError::ReservedClaimName(name)))
                    .ctx(|| format!("invalid path {path}"));
            }
        }
    }
    Ok(())
}
