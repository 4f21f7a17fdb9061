//! Two-way sync of peer markers.
//!
//! Every `<span class="sync" sid="TOKEN">` sharing a token forms a peer
//! group whose content should be identical across records. When the group
//! disagrees, the marker being synced either pushes its content to every
//! peer ([`Resolution::Upload`]) or pulls a peer's content
//! ([`Resolution::Download`]). Empty markers always download; otherwise a
//! [`ConflictResolver`] decides.
//!
//! A marker without `sid` joins a new group: it gets a fresh token of the
//! form `{record}_{field}_{NNNN}`.

use rand::Rng;

use spansync_core::scanner::{self, SID_ATTR};
use spansync_core::{Element, Fragment, Node, Record, RecordId, RecordStore, SearchQuery, Sid, StoreError};

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Conflict resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Overwrite every peer with this marker's content.
    Upload,
    /// Replace this marker's content with a peer's.
    Download,
}

/// Decides an incoherent peer group, keyed by its sid.
pub trait ConflictResolver {
    fn resolve(&mut self, sid: &Sid) -> Resolution;
}

impl<F> ConflictResolver for F
where
    F: FnMut(&Sid) -> Resolution,
{
    fn resolve(&mut self, sid: &Sid) -> Resolution {
        self(sid)
    }
}

/// Always answers the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedResolution(pub Resolution);

impl ConflictResolver for FixedResolution {
    fn resolve(&mut self, _sid: &Sid) -> Resolution {
        self.0
    }
}

// ---------------------------------------------------------------------------
// BidirSync
// ---------------------------------------------------------------------------

pub struct BidirSync<R> {
    rng: R,
}

impl Default for BidirSync<rand::rngs::ThreadRng> {
    fn default() -> Self {
        Self::new(rand::thread_rng())
    }
}

impl<R: Rng> BidirSync<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// A sid not yet used anywhere in `store`.
    pub fn generate_id<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        record: &Record,
        idx: usize,
    ) -> Result<Sid, StoreError> {
        loop {
            let sid = Sid(format!(
                "{}_{}_{:04}",
                record.id,
                idx,
                self.rng.gen_range(0..10_000)
            ));
            if store.find(&SearchQuery::SidToken(sid.clone()))?.is_empty() {
                return Ok(sid);
            }
            tracing::debug!("sid {sid} taken, drawing again");
        }
    }

    /// Sync every peer marker in field `idx` of `record`.
    ///
    /// Returns `Ok(false)` without touching anything for unsaved records and
    /// out-of-range indices. Peers are written as soon as an upload is
    /// decided; the field itself is written to `store` once at the end if
    /// any marker changed.
    pub fn sync_field<S, C>(
        &mut self,
        store: &mut S,
        record: &mut Record,
        idx: usize,
        resolver: &mut C,
    ) -> Result<bool, SyncError>
    where
        S: RecordStore + ?Sized,
        C: ConflictResolver + ?Sized,
    {
        if !record.id.is_persisted() || idx >= record.fields.len() {
            return Ok(false);
        }

        let mut fragment = Fragment::parse(&record.fields[idx]);
        let mut changed = false;
        for (i, sid) in scanner::peer_markers(&fragment) {
            let Some(sid) = sid else {
                let sid = self.generate_id(&*store, record, idx)?;
                if let Some(marker) = fragment.element_mut(i) {
                    tracing::debug!("record {} field {idx}: assigned sid {sid}", record.id);
                    marker.set_attr(SID_ATTR, sid.0);
                    changed = true;
                }
                continue;
            };

            let peers = existing_peers(&*store, &sid)?;
            if are_coherent(&*store, &peers, &sid) {
                continue;
            }
            let Some(marker) = fragment.element_mut(i) else {
                continue;
            };

            let decision = if marker.is_empty() {
                Resolution::Download
            } else {
                resolver.resolve(&sid)
            };
            let others: Vec<RecordId> = peers.into_iter().filter(|&p| p != record.id).collect();
            tracing::debug!(
                "record {} field {idx}: sid {sid} incoherent, {decision:?} with {} peers",
                record.id,
                others.len()
            );

            match decision {
                Resolution::Upload => upload(store, &others, &sid, &marker.children),
                Resolution::Download => match download(&*store, &others, &sid) {
                    Some(children) => marker.children = children,
                    None => {
                        tracing::warn!("sid {sid}: no peer left to download from");
                        continue;
                    }
                },
            }
            changed = true;
        }

        if changed {
            record.fields[idx] = fragment.to_html();
            store.update(record)?;
            tracing::info!("updated record {} field {idx}", record.id);
        }
        Ok(changed)
    }
}

/// Whether every top-level marker with `sid` in every field of every record
/// in `ids` has the same content. Records missing from `store` are skipped.
pub fn are_coherent<S: RecordStore + ?Sized>(store: &S, ids: &[RecordId], sid: &Sid) -> bool {
    if ids.len() <= 1 {
        return true;
    }
    let mut first: Option<Content> = None;
    for &id in ids {
        let Ok(record) = store.get(id) else { continue };
        for value in &record.fields {
            let fragment = Fragment::parse(value);
            for i in scanner::markers_with_sid(&fragment, sid) {
                let Some(marker) = fragment.nodes[i].as_element() else {
                    continue;
                };
                let content = Content::of(marker);
                match &first {
                    None => first = Some(content),
                    Some(seen) if *seen != content => return false,
                    Some(_) => {}
                }
            }
        }
    }
    true
}

/// What coherence compares: the string of a marker holding a single string,
/// otherwise its serialized children. An empty marker is `Text("")` and never
/// equals markup.
#[derive(Debug, PartialEq, Eq)]
enum Content {
    Text(String),
    Markup(String),
}

impl Content {
    fn of(marker: &Element) -> Self {
        if marker.is_empty() {
            return Content::Text(String::new());
        }
        match marker.string() {
            Some(s) => Content::Text(s),
            None => Content::Markup(marker.inner_html()),
        }
    }
}

fn existing_peers<S: RecordStore + ?Sized>(store: &S, sid: &Sid) -> Result<Vec<RecordId>, StoreError> {
    let ids = store.find(&SearchQuery::PeerMarkers(sid.clone()))?;
    Ok(ids.into_iter().filter(|&id| store.get(id).is_ok()).collect())
}

// Each peer is written on its own; one failing does not stop the rest.
fn upload<S: RecordStore + ?Sized>(store: &mut S, peers: &[RecordId], sid: &Sid, content: &[Node]) {
    for &id in peers {
        let mut peer = match store.get(id) {
            Ok(peer) => peer,
            Err(e) => {
                tracing::warn!("upload {sid}: skipping record {id}: {e}");
                continue;
            }
        };
        let mut touched = false;
        for value in peer.fields.iter_mut() {
            let mut fragment = Fragment::parse(value);
            let targets = scanner::markers_with_sid(&fragment, sid);
            if targets.is_empty() {
                continue;
            }
            for i in targets {
                if let Some(marker) = fragment.element_mut(i) {
                    marker.children = content.to_vec();
                }
            }
            let html = fragment.to_html();
            if html != *value {
                *value = html;
                touched = true;
            }
        }
        if !touched {
            continue;
        }
        match store.update(&peer) {
            Ok(()) => tracing::info!("upload {sid}: updated record {id}"),
            Err(e) => tracing::warn!("upload {sid}: failed to write record {id}: {e}"),
        }
    }
}

// Content of the first same-sid marker found, walking `peers` in order.
fn download<S: RecordStore + ?Sized>(store: &S, peers: &[RecordId], sid: &Sid) -> Option<Vec<Node>> {
    peers.iter().find_map(|&id| {
        let record = store.get(id).ok()?;
        record.fields.iter().find_map(|value| {
            let mut fragment = Fragment::parse(value);
            let i = *scanner::markers_with_sid(&fragment, sid).first()?;
            fragment
                .element_mut(i)
                .map(|marker| std::mem::take(&mut marker.children))
        })
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use spansync_core::{MemoryStore, TypeName};

    fn seeded() -> BidirSync<StdRng> {
        BidirSync::new(StdRng::seed_from_u64(7))
    }

    fn add(store: &mut MemoryStore, front: &str) -> RecordId {
        store.add(&TypeName::from("Basic"), [front]).unwrap()
    }

    #[test]
    fn generated_ids_have_expected_shape() {
        let mut store = MemoryStore::with_default_types();
        let id = add(&mut store, "x");
        let record = store.get(id).unwrap();
        let sid = seeded().generate_id(&store, &record, 1).unwrap();
        let prefix = format!("{id}_1_");
        let digits = sid.as_str().strip_prefix(&prefix).expect("prefix");
        assert_eq!(digits.len(), 4);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn generated_ids_avoid_existing_tokens() {
        let mut store = MemoryStore::with_default_types();
        let id = add(&mut store, "x");
        let record = store.get(id).unwrap();
        let taken = seeded().generate_id(&store, &record, 0).unwrap();
        add(&mut store, &format!(r#"<span class="sync" sid="{taken}">y</span>"#));

        let again = seeded().generate_id(&store, &record, 0).unwrap();
        assert_ne!(again, taken, "same seed must draw past the taken token");
    }

    #[test]
    fn coherence_with_single_record_is_trivial() {
        let store = MemoryStore::with_default_types();
        assert!(are_coherent(&store, &[RecordId(1)], &Sid::from("1")));
        assert!(are_coherent(&store, &[], &Sid::from("1")));
    }

    #[test]
    fn coherence_distinguishes_empty_from_rich_content() {
        let mut store = MemoryStore::with_default_types();
        let a = add(&mut store, r#"<span class="sync" sid="1"></span>"#);
        let b = add(&mut store, r#"<span class="sync" sid="1">a <b>b</b></span>"#);
        assert!(!are_coherent(&store, &[a, b], &Sid::from("1")));
        assert!(!are_coherent(&store, &[b, a], &Sid::from("1")));
    }

    #[test]
    fn coherence_compares_rich_content() {
        let mut store = MemoryStore::with_default_types();
        let a = add(&mut store, r#"<span class="sync" sid="1">a <b>b</b></span>"#);
        let b = add(&mut store, r#"<span class="sync" sid="1">a <b>b</b></span>"#);
        let c = add(&mut store, r#"<span class="sync" sid="1">a <i>b</i></span>"#);
        assert!(are_coherent(&store, &[a, b], &Sid::from("1")));
        assert!(!are_coherent(&store, &[a, b, c], &Sid::from("1")));
    }

    #[test]
    fn coherence_compares_strings_through_single_child() {
        let mut store = MemoryStore::with_default_types();
        let a = add(&mut store, r#"<span class="sync" sid="1">y</span>"#);
        let b = add(&mut store, r#"<span class="sync" sid="1"><b>y</b></span>"#);
        assert!(are_coherent(&store, &[a, b], &Sid::from("1")));
    }

    #[test]
    fn coherence_skips_missing_records() {
        let mut store = MemoryStore::with_default_types();
        let a = add(&mut store, r#"<span class="sync" sid="1">x</span>"#);
        assert!(are_coherent(&store, &[a, RecordId(99)], &Sid::from("1")));
    }

    #[test]
    fn closures_are_resolvers() {
        let mut calls = 0;
        let mut resolver = |_: &Sid| {
            calls += 1;
            Resolution::Upload
        };
        assert_eq!(resolver.resolve(&Sid::from("1")), Resolution::Upload);
        assert_eq!(calls, 1);
    }
}
