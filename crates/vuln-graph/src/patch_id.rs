//! Patch identity: a stable fingerprint of a commit's textual change.
//!
//! Two commits whose diffs differ only in hunk positions, blob ids, or
//! whitespace produce the same [`PatchId`], so a cherry-pick (typically
//! rebased onto another branch and re-hunked) still matches the original
//! change.

use std::fmt;

use bstr::ByteSlice;
use sha1::{Digest, Sha1};

use crate::commit_id::hex_string;

/// Fingerprint of one commit's change, invariant under rebasing and
/// whitespace noise.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchId([u8; 20]);

impl PatchId {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex_string(&self.0)
    }
}

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PatchId({})", &self.to_hex()[..8])
    }
}

/// Compute the patch-id of a textual diff.
///
/// Normalization: hunk headers contribute only their `@@` marker, blob and
/// mode metadata lines are skipped, and every other line is hashed with
/// its whitespace removed.
pub fn patch_id_of(patch: &[u8]) -> PatchId {
    let mut hasher = Sha1::new();
    for line in patch.lines() {
        if is_metadata_line(line) {
            continue;
        }
        if line.starts_with(b"@@") {
            // Positions and counts change on rebase; the marker is enough.
            hasher.update(b"@@\n");
            continue;
        }
        let stripped: Vec<u8> = line
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        hasher.update(&stripped);
        hasher.update(b"\n");
    }
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hasher.finalize());
    PatchId(bytes)
}

/// Lines describing blob identity or file modes rather than content; they
/// change on rebase even when the patch itself does not.
fn is_metadata_line(line: &[u8]) -> bool {
    line.starts_with(b"index ")
        || line.starts_with(b"similarity index ")
        || line.starts_with(b"dissimilarity index ")
        || line.starts_with(b"old mode ")
        || line.starts_with(b"new mode ")
        || line.starts_with(b"new file mode ")
        || line.starts_with(b"deleted file mode ")
}
