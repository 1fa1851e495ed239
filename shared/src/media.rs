use thiserror::Error;

use crate::profile::Resolution;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("path format is not supported: {0}")]
pub struct PathError(pub String);

/// Addressable identity of a stored media object: a two-part key, the hash
/// part naming the object family and the sort part naming the item, plus the
/// content type advertised to the store.
///
/// Keys are values: derivation produces a new key, a key handed to the store
/// is never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Media {
    pub hash_id: String,
    pub sort_id: String,
    pub content_type: String,
}

impl Media {
    /// Parses a storage path into a reference to a media object. A path with
    /// no `/` addresses a top-level object: empty hash part, the whole path
    /// as sort part.
    pub fn from_path(path: &str) -> Result<Media, PathError> {
        if path.is_empty() {
            return Err(PathError(path.to_string()));
        }

        let (hash_id, sort_id) = match path.split_once('/') {
            Some((hash_id, sort_id)) if !hash_id.is_empty() && !sort_id.is_empty() => {
                (hash_id.to_string(), sort_id.to_string())
            }
            Some(_) => return Err(PathError(path.to_string())),
            None => (String::new(), path.to_string()),
        };

        Ok(Media {
            hash_id,
            sort_id,
            content_type: String::new(),
        })
    }

    pub fn path_key(&self) -> String {
        if self.hash_id.is_empty() {
            return self.sort_id.clone();
        }

        format!("{}/{}", self.hash_id, self.sort_id)
    }

    /// Key of one derived variant: the sort part keeps its stem, the final
    /// extension is replaced by the `.{resolution}` segment.
    pub fn with_variant(&self, resolution: &Resolution) -> Media {
        let stem = match self.sort_id.rsplit_once('.') {
            Some((stem, _)) => stem,
            None => self.sort_id.as_str(),
        };

        Media {
            hash_id: self.hash_id.clone(),
            sort_id: format!("{stem}.{resolution}"),
            content_type: self.content_type.clone(),
        }
    }

    /// Appends the output encoding: the extension on the sort part, the
    /// content type for the store metadata.
    pub fn with_encoding(&self, ext: &str, content_type: &str) -> Media {
        Media {
            hash_id: self.hash_id.clone(),
            sort_id: format!("{}.{ext}", self.sort_id),
            content_type: content_type.to_string(),
        }
    }
}
