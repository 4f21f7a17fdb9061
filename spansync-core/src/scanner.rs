//! Sync marker discovery.
//!
//! A sync marker is a `<span class="sync">` that is a direct child of the
//! field's fragment. Markers nested inside any other element, including
//! another marker, are never reported, so they pass through untouched.
//!
//! | Markup                                   | Classification               |
//! |------------------------------------------|------------------------------|
//! | `<span class="sync" note="42">…</span>`  | [`Marker::Dependency`]       |
//! | `<span class="sync" sid="7_0_0001">…`    | [`Marker::Peer`] with a sid  |
//! | `<span class="sync">…</span>`            | [`Marker::Peer`] without sid |

use crate::markup::{Element, Fragment};
use crate::types::Sid;

pub const MARKER_TAG: &str = "span";
pub const MARKER_CLASS: &str = "sync";
pub const NOTE_ATTR: &str = "note";
pub const SID_ATTR: &str = "sid";

/// What a top-level marker asks the engine to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// Render another record into this marker. `note` is the raw attribute
    /// value; it may not parse as a record id.
    Dependency { note: String },
    /// Member of a peer group. `None` until a sid has been assigned.
    Peer { sid: Option<Sid> },
}

impl Marker {
    /// Classify `element`, or `None` when it is not a sync marker at all.
    /// `note` takes precedence over `sid`.
    pub fn classify(element: &Element) -> Option<Marker> {
        if element.name != MARKER_TAG || !element.has_class(MARKER_CLASS) {
            return None;
        }
        if let Some(note) = element.attr(NOTE_ATTR) {
            return Some(Marker::Dependency {
                note: note.to_owned(),
            });
        }
        Some(Marker::Peer {
            sid: element.attr(SID_ATTR).map(Sid::from),
        })
    }
}

/// Every top-level marker with its index into [`Fragment::nodes`].
pub fn markers(fragment: &Fragment) -> Vec<(usize, Marker)> {
    fragment
        .elements()
        .filter_map(|(i, e)| Marker::classify(e).map(|m| (i, m)))
        .collect()
}

/// Top-level dependency markers: `(index, note)`.
pub fn dependency_markers(fragment: &Fragment) -> Vec<(usize, String)> {
    markers(fragment)
        .into_iter()
        .filter_map(|(i, m)| match m {
            Marker::Dependency { note } => Some((i, note)),
            Marker::Peer { .. } => None,
        })
        .collect()
}

/// Top-level peer markers, with or without a sid.
pub fn peer_markers(fragment: &Fragment) -> Vec<(usize, Option<Sid>)> {
    markers(fragment)
        .into_iter()
        .filter_map(|(i, m)| match m {
            Marker::Peer { sid } => Some((i, sid)),
            Marker::Dependency { .. } => None,
        })
        .collect()
}

/// Indices of top-level peer markers carrying exactly `sid`.
pub fn markers_with_sid(fragment: &Fragment, sid: &Sid) -> Vec<usize> {
    peer_markers(fragment)
        .into_iter()
        .filter(|(_, s)| s.as_ref() == Some(sid))
        .map(|(i, _)| i)
        .collect()
}
