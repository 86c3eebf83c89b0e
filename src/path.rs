use std::{collections::HashMap, fmt::Display, fs, io, path::PathBuf, sync::Arc, sync::RwLock};

use once_cell::sync::Lazy;
use uriparse::{Scheme, URIReference};

use crate::{Error, Result};

/// Path used to identify an asset
///
/// Defaults to a file path if no scheme is specified.
#[derive(Debug, Hash, PartialEq, Eq, Clone)]
pub enum AssetPath {
    /// Filesystem path
    /// Reads the raw bytes from disk
    /// # Example
    /// `file:fonts/NotoSans.ttf`
    File(PathBuf),
    /// In-process byte registry
    /// Reads bytes previously published with [`register_bytes`]
    /// # Example
    /// `mem:ui/title-font`
    Mem(String),
}

impl TryFrom<&str> for AssetPath {
    type Error = Error;

    fn try_from(path: &str) -> Result<Self> {
        let uri = URIReference::try_from(path)
            .map_err(|e| Error::NotFound(format!("{path}: {e}")))?;

        // fetch and normalize scheme
        let mut scheme = uri.scheme().unwrap_or(&Scheme::File).clone();
        scheme.normalize();

        match scheme.as_ref() {
            "file" => Ok(AssetPath::File(uri.path().to_string().into())),
            "mem" => Ok(AssetPath::Mem(uri.path().to_string())),
            scheme => Err(Error::NotFound(format!("unsupported URI scheme {scheme}"))),
        }
    }
}

impl TryFrom<String> for AssetPath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl TryFrom<&String> for AssetPath {
    type Error = Error;

    fn try_from(value: &String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl Display for AssetPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetPath::File(p) => match p.is_absolute() {
                true => write!(f, "file://{}", p.to_string_lossy()),
                false => write!(f, "file:{}", p.to_string_lossy()),
            },
            AssetPath::Mem(key) => write!(f, "mem:{key}"),
        }
    }
}

static MEM_SOURCE: Lazy<RwLock<HashMap<String, Arc<[u8]>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Publish bytes under a `mem:` key so assets can be declared against
/// in-process content.
///
/// Re-registering a key replaces the entry for future reads; content already
/// cached by live assets is unaffected.
pub fn register_bytes(key: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
    MEM_SOURCE.write().unwrap().insert(key.into(), bytes.into());
}

impl AssetPath {
    pub(crate) fn read(&self) -> Result<Arc<[u8]>> {
        match self {
            AssetPath::File(path) => match fs::read(path) {
                Ok(bytes) => Ok(bytes.into()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    Err(Error::NotFound(self.to_string()))
                }
                Err(e) => Err(Error::Io {
                    name: self.to_string(),
                    message: e.to_string(),
                }),
            },
            AssetPath::Mem(key) => MEM_SOURCE
                .read()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| Error::NotFound(self.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_path_defaults_to_file_scheme() {
        let path = AssetPath::try_from("fonts/sans.ttf").unwrap();
        assert_eq!(path, AssetPath::File("fonts/sans.ttf".into()));
    }

    #[test]
    fn mem_scheme_parses() {
        let path = AssetPath::try_from("mem:ui/title").unwrap();
        assert_eq!(path, AssetPath::Mem("ui/title".into()));
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let err = AssetPath::try_from("http://example.com/x.ttf").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn display_round_trips() {
        for s in ["file:fonts/sans.ttf", "mem:ui/title"] {
            assert_eq!(AssetPath::try_from(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn missing_mem_key_is_not_found() {
        let err = AssetPath::Mem("nobody-registered-this".into())
            .read()
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn registered_bytes_read_back() {
        register_bytes("path-test/blob", vec![1u8, 2, 3]);
        let bytes = AssetPath::Mem("path-test/blob".into()).read().unwrap();
        assert_eq!(&bytes[..], &[1, 2, 3]);
    }
}
