// Phase 7: ファイルシステム上のオブジェクトストア: key → 処理済み画像バイト列
//
// `<root>/<key>` に本体、`<root>/<key>.meta.json` にメタデータを保存する。

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::{ObjectStore, sha256_hex};
use crate::error::ChopError;

const METADATA_SUFFIX: &str = ".meta.json";

/// ファイルシステムベースのオブジェクトストア。
pub struct FsObjectStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

/// `<key>.meta.json` に保存するオブジェクトのメタデータ。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ObjectMetadata {
    pub key: String,
    pub content_type: String,
    pub size: u64,
    pub sha256: String,
}

/// オブジェクトキーが安全な相対パスであることを検証する。
///
/// 各セグメントは空でなく `[A-Za-z0-9._-]` のみで構成され、`.` / `..` は不可。
/// パストラバーサルや絶対パスによるルート外への書き込みを防止する。
pub fn validate_object_key(key: &str) -> crate::error::Result<()> {
    let valid = !key.is_empty()
        && !key.ends_with(METADATA_SUFFIX)
        && key.split('/').all(|segment| {
            !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
        });

    if valid {
        Ok(())
    } else {
        Err(ChopError::storage(format!("invalid object key: '{}'", key)))
    }
}

/// `path` に拡張子を付け足したパスを返す（既存の拡張子は置き換えない）。
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

/// 同じディレクトリの一意な一時ファイルに書き込んでからrenameする。
///
/// 書き込み途中のファイルが `path` に現れることはなく、同じキーへの並行した
/// 書き込みが一時ファイルを共有することもない。
fn write_atomic(path: &Path, contents: &[u8]) -> crate::error::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| ChopError::storage(format!("no parent directory: {}", path.display())))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ChopError::storage(e.to_string()))?;
    tmp.write_all(contents)
        .map_err(|e| ChopError::storage(e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| ChopError::storage(e.error.to_string()))?;
    Ok(())
}

impl FsObjectStore {
    /// 指定されたディレクトリをルートとして新しい FsObjectStore を作成する。
    ///
    /// `public_base_url` が指定されていれば公開URLは `<base>/<key>`、
    /// なければ保存先のファイルパスになる。
    pub fn new(root: impl AsRef<Path>, public_base_url: Option<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_base_url: public_base_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    fn object_path(&self, key: &str) -> crate::error::Result<PathBuf> {
        validate_object_key(key)?;
        Ok(self.root.join(key))
    }

    fn public_url(&self, key: &str, path: &Path) -> String {
        match &self.public_base_url {
            Some(base) => format!("{base}/{key}"),
            None => path.display().to_string(),
        }
    }

    /// メタデータを読み込む。オブジェクトが無い場合は None を返す。
    pub fn metadata(&self, key: &str) -> crate::error::Result<Option<ObjectMetadata>> {
        let path = self.object_path(key)?;
        let meta_path = with_suffix(&path, METADATA_SUFFIX);
        if !meta_path.exists() {
            return Ok(None);
        }

        let meta_str =
            fs::read_to_string(&meta_path).map_err(|e| ChopError::storage(e.to_string()))?;
        let metadata: ObjectMetadata = serde_json::from_str(&meta_str)?;

        if metadata.key != key {
            return Err(ChopError::storage(format!(
                "object key mismatch: expected '{}', found '{}'",
                key, metadata.key
            )));
        }
        Ok(Some(metadata))
    }

    /// オブジェクトを読み込み、SHA-256がメタデータと一致することを確認する。
    pub fn get(&self, key: &str) -> crate::error::Result<Option<Vec<u8>>> {
        let Some(metadata) = self.metadata(key)? else {
            return Ok(None);
        };

        let bytes = fs::read(self.object_path(key)?).map_err(|e| ChopError::storage(e.to_string()))?;
        let digest = sha256_hex(&bytes);
        if digest != metadata.sha256 {
            return Err(ChopError::storage(format!(
                "checksum mismatch for '{}': expected {}, got {}",
                key, metadata.sha256, digest
            )));
        }
        Ok(Some(bytes))
    }

    /// オブジェクトが存在するか確認する。
    pub fn contains(&self, key: &str) -> bool {
        match self.object_path(key) {
            Ok(path) => path.exists() && with_suffix(&path, METADATA_SUFFIX).exists(),
            Err(_) => false,
        }
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> crate::error::Result<String> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ChopError::storage(e.to_string()))?;
        }

        let metadata = ObjectMetadata {
            key: key.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
            sha256: sha256_hex(bytes),
        };
        let metadata_json = serde_json::to_string(&metadata)?;

        write_atomic(&path, bytes)?;
        write_atomic(&with_suffix(&path, METADATA_SUFFIX), metadata_json.as_bytes())?;
        debug!(key, size = metadata.size, "stored object");

        Ok(self.public_url(key, &path))
    }

    fn delete(&self, key: &str) -> crate::error::Result<()> {
        let path = self.object_path(key)?;
        for p in [with_suffix(&path, METADATA_SUFFIX), path] {
            if p.exists() {
                fs::remove_file(&p).map_err(|e| ChopError::storage(e.to_string()))?;
            }
        }
        Ok(())
    }
}
