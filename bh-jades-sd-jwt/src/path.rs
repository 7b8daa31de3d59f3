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

//! JSON node paths and their derivation from a [`DisclosureFrame`].

use std::fmt;

use bh_jades::{DisclosureFrame, FrameEntry, JsonObject};
use bherror::Error;
use serde_json::Value;

use crate::{error::Result, IssuerError};

/// A path segment, either an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JsonNodePathSegment {
    /// Object key path segment.
    Key(String),
    /// Array index path segment.
    Index(usize),
}

/// A JSON node path, i.e. the list of segments to follow starting from the
/// root of the payload.
///
/// Not to be confused with the JSONPath query syntax, although paths are
/// displayed in it, e.g. `$.address.street_address` or `$.nationalities[1]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JsonNodePath(pub Vec<JsonNodePathSegment>);

impl From<&FrameEntry> for JsonNodePathSegment {
    fn from(entry: &FrameEntry) -> Self {
        match entry {
            FrameEntry::Key(key) => Self::Key(key.clone()),
            FrameEntry::Index(index) => Self::Index(*index),
        }
    }
}

impl fmt::Display for JsonNodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.0 {
            match segment {
                JsonNodePathSegment::Key(key) => write!(f, ".{}", key)?,
                JsonNodePathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl JsonNodePath {
    fn child(&self, segment: JsonNodePathSegment) -> Self {
        let mut path = self.clone();
        path.0.push(segment);
        path
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the path points to the root.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Paths concealing every top-level claim of `claims`.
pub(crate) fn top_level_paths(claims: &JsonObject) -> Vec<JsonNodePath> {
    claims
        .keys()
        .map(|key| JsonNodePath(vec![JsonNodePathSegment::Key(key.clone())]))
        .collect()
}

/// Collects the paths concealed by `frame`, in frame order, parents before
/// their nested frames.
///
/// Nested frame members are object keys, unless the value they refer to is
/// an array, in which case they must be array indices.
///
/// # Errors
///
/// Fails with [`IssuerError::InvalidPath`] if a nested member of an array
/// frame is not an index.
pub(crate) fn frame_paths(
    claims: &JsonObject,
    frame: &DisclosureFrame,
) -> Result<Vec<JsonNodePath>> {
    let mut paths = Vec::new();
    collect_paths(Node::Object(claims), frame, &JsonNodePath::default(), &mut paths)?;
    Ok(paths)
}

#[derive(Clone, Copy)]
enum Node<'v> {
    Object(&'v JsonObject),
    Array(&'v [Value]),
    Missing,
}

impl<'v> Node<'v> {
    fn from_value(value: Option<&'v Value>) -> Self {
        match value {
            Some(Value::Object(object)) => Self::Object(object),
            Some(Value::Array(array)) => Self::Array(array),
            _ => Self::Missing,
        }
    }
}

fn collect_paths(
    node: Node<'_>,
    frame: &DisclosureFrame,
    prefix: &JsonNodePath,
    paths: &mut Vec<JsonNodePath>,
) -> Result<()> {
    paths.extend(frame.sd.iter().map(|entry| prefix.child(entry.into())));

    for (key, nested) in &frame.nested {
        let (segment, child) = match node {
            Node::Array(array) => {
                let index: usize = key.parse().map_err(|_| {
                    Error::root(IssuerError::InvalidPath(
                        prefix.child(JsonNodePathSegment::Key(key.clone())).to_string(),
                    ))
                    .ctx("array elements are addressed by index")
                })?;
                (JsonNodePathSegment::Index(index), array.get(index))
            }
            Node::Object(object) => (JsonNodePathSegment::Key(key.clone()), object.get(key)),
            Node::Missing => (JsonNodePathSegment::Key(key.clone()), None),
        };

        collect_paths(
            Node::from_value(child),
            nested,
            &prefix.child(segment),
            paths,
        )?;
    }

    Ok(())
}

/// Returns the value at `path` below `object`; [`None`] for the empty path,
/// as `&mut JsonObject` cannot be converted to `&mut Value`.
pub(crate) fn index_mut_object_by_path<'a>(
    object: &'a mut JsonObject,
    path: &[JsonNodePathSegment],
) -> Option<&'a mut Value> {
    let (head, tail) = path.split_first()?;
    match head {
        JsonNodePathSegment::Key(key) => index_mut_by_path(object.get_mut(key)?, tail),
        JsonNodePathSegment::Index(_) => None,
    }
}

fn index_mut_by_path<'a>(
    mut value: &'a mut Value,
    path: &[JsonNodePathSegment],
) -> Option<&'a mut Value> {
    for segment in path {
        value = match (value, segment) {
            (Value::Array(array), JsonNodePathSegment::Index(index)) => array.get_mut(*index)?,
            (Value::Object(object), JsonNodePathSegment::Key(key)) => object.get_mut(key)?,
            _ => return None,
        };
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use bh_jades::json_object;
    use JsonNodePathSegment::*;

    use super::*;

    fn path(segments: &[JsonNodePathSegment]) -> JsonNodePath {
        JsonNodePath(segments.to_vec())
    }

    #[test]
    fn display() {
        assert_eq!(JsonNodePath::default().to_string(), "$");
        assert_eq!(
            path(&[Key("a".into()), Index(3), Key("b".into())]).to_string(),
            "$.a[3].b"
        );
    }

    #[test]
    fn frame_to_paths() {
        let claims = json_object!({
            "given_name": "John",
            "address": { "street_address": "Schulstr. 12", "country": "DE" },
            "nationalities": ["US", { "code": "DE", "since": 2001 }],
        });
        let frame = DisclosureFrame::new()
            .conceal("given_name")
            .conceal("address")
            .nest("address", DisclosureFrame::new().conceal("street_address"))
            .nest(
                "nationalities",
                DisclosureFrame::new()
                    .conceal_index(0)
                    .nest("1", DisclosureFrame::new().conceal("since")),
            );

        assert_eq!(
            frame_paths(&claims, &frame).unwrap(),
            vec![
                path(&[Key("given_name".into())]),
                path(&[Key("address".into())]),
                path(&[Key("address".into()), Key("street_address".into())]),
                path(&[Key("nationalities".into()), Index(0)]),
                path(&[Key("nationalities".into()), Index(1), Key("since".into())]),
            ]
        );
    }

    #[test]
    fn array_frame_requires_indices() {
        let claims = json_object!({ "nationalities": [{ "code": "DE" }] });
        let frame = DisclosureFrame::new().nest(
            "nationalities",
            DisclosureFrame::new().nest("first", DisclosureFrame::new().conceal("code")),
        );

        let error = frame_paths(&claims, &frame).unwrap_err().error;
        assert_eq!(
            error,
            IssuerError::InvalidPath("$.nationalities.first".to_owned())
        );
    }

    #[test]
    fn frame_of_missing_value_keeps_keys() {
        let claims = json_object!({ "sub": "user_42" });
        let frame = DisclosureFrame::new().nest("address", DisclosureFrame::new().conceal("0"));

        assert_eq!(
            frame_paths(&claims, &frame).unwrap(),
            vec![path(&[Key("address".into()), Key("0".into())])]
        );
    }

    #[test]
    fn top_level() {
        let claims = json_object!({ "b": 1, "a": { "c": 2 } });
        assert_eq!(
            top_level_paths(&claims),
            vec![path(&[Key("b".into())]), path(&[Key("a".into())])]
        );
    }

    #[test]
    fn index_mut() {
        let mut claims = json_object!({ "a": [0, { "b": true }] });

        let value =
            index_mut_object_by_path(&mut claims, &[Key("a".into()), Index(1), Key("b".into())]);
        assert_eq!(value, Some(&mut Value::Bool(true)));

        assert!(index_mut_object_by_path(&mut claims, &[]).is_none());
        assert!(index_mut_object_by_path(&mut claims, &[Index(0)]).is_none());

        let through_array = [Key("a".into()), Key("b".into())];
        assert!(index_mut_object_by_path(&mut claims, &through_array).is_none());
    }
}
