//! Content addressing for revisions.
//!
//! The digest covers a canonical serialisation of the frontmatter followed
//! by a NUL separator and the raw body, so any change to either field
//! changes the hash. Frontmatter serialises with struct fields in
//! declaration order and extension fields in sorted (`BTreeMap`) order,
//! which makes the encoding deterministic for identical logical input.

use sha2::{Digest, Sha256};

use crate::{Result, frontmatter::Frontmatter};

/// SHA-256 hex digest of the canonical `(frontmatter, body)` serialisation.
pub fn content_hash(frontmatter: &Frontmatter, body: &str) -> Result<String> {
  let meta = serde_json::to_vec(frontmatter)?;

  let mut hasher = Sha256::new();
  hasher.update(&meta);
  hasher.update([0u8]);
  hasher.update(body.as_bytes());

  Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identical_input_hashes_identically() {
    let mut fm = Frontmatter::default();
    fm.title = Some("Launch Notes".into());
    fm.tags = vec!["rocketry".into()];

    let a = content_hash(&fm, "body text").unwrap();
    let b = content_hash(&fm.clone(), "body text").unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn body_change_changes_hash() {
    let fm = Frontmatter::default();
    let a = content_hash(&fm, "one").unwrap();
    let b = content_hash(&fm, "two").unwrap();
    assert_ne!(a, b);
  }

  #[test]
  fn metadata_change_changes_hash() {
    let mut fm = Frontmatter::default();
    let a = content_hash(&fm, "same").unwrap();
    fm.category = Some("research".into());
    let b = content_hash(&fm, "same").unwrap();
    assert_ne!(a, b);
  }

  #[test]
  fn extension_field_order_is_stable() {
    let mut fm1 = Frontmatter::default();
    fm1.extra.insert("zeta".into(), serde_json::json!(1));
    fm1.extra.insert("alpha".into(), serde_json::json!(2));

    let mut fm2 = Frontmatter::default();
    fm2.extra.insert("alpha".into(), serde_json::json!(2));
    fm2.extra.insert("zeta".into(), serde_json::json!(1));

    assert_eq!(
      content_hash(&fm1, "x").unwrap(),
      content_hash(&fm2, "x").unwrap()
    );
  }
}
