pub mod fs;
pub mod key;

pub use fs::FsObjectStore;

use sha2::{Digest, Sha256};

/// オブジェクトストレージの境界。処理済みバイト列を受け取り公開URLを返す。
pub trait ObjectStore: Send + Sync {
    /// `key` に `bytes` を保存し、公開URLを返す。既存のオブジェクトは置き換える。
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> crate::error::Result<String>;

    /// `key` のオブジェクトを削除する。存在しない場合は何もしない。
    fn delete(&self, key: &str) -> crate::error::Result<()>;
}

/// バイト列のSHA-256を小文字16進数文字列で返す。
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
