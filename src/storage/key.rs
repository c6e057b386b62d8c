// Phase 7: study + filename -> object key
//
// Standardized image names look like `2304B00C0001D00`:
// 4-digit study, B + 2-digit block, C + 4-digit chop, D + 2-digit display day.

use crate::config::settings::OutputFormat;
use crate::error::ChopError;

/// study識別子が決められない場合のプレフィックス。
pub const UNASSIGNED_STUDY: &str = "unassigned";

/// 処理済み画像を格納するプレフィックス。
pub const PROCESSED_PREFIX: &str = "processed";

/// 標準化されたチョップID（`SSSSB##C####D##`）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChopId {
    pub study: String,
    pub block: String,
    pub chop: String,
    pub day: String,
}

impl ChopId {
    /// ファイル名の拡張子を除いた部分をチョップIDとしてパースする。
    ///
    /// 形式に合わない場合は `None` を返す。
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let b = s.as_bytes();
        if b.len() != 15 || b[4] != b'B' || b[7] != b'C' || b[12] != b'D' {
            return None;
        }
        let digits = |range: std::ops::Range<usize>| {
            b[range.clone()]
                .iter()
                .all(u8::is_ascii_digit)
                .then(|| s[range].to_string())
        };

        Some(ChopId {
            study: digits(0..4)?,
            block: digits(5..7)?,
            chop: digits(8..12)?,
            day: digits(13..15)?,
        })
    }
}

/// URLのパス末尾のセグメントをファイル名として取り出す。
pub fn filename_from_url(url: &str) -> crate::error::Result<String> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| ChopError::storage(format!("Invalid image URL '{url}': {e}")))?;

    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ChopError::storage(format!("Image URL has no filename: '{url}'")))
}

/// ファイル名から拡張子を除いた部分を返す。
fn file_stem(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    }
}

/// キーに使えない文字（`[A-Za-z0-9._-]` 以外）を `_` に置き換える。
fn sanitize_segment(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// 処理済み画像のオブジェクトキーを組み立てる。
///
/// 形式: `processed/<study>/<stem>.<ext>`。拡張子は出力フォーマットに合わせて
/// 小文字に標準化する。studyが `None` の場合はファイル名のチョップIDから取り、
/// それも無ければ [`UNASSIGNED_STUDY`] を使う。
pub fn object_key(
    study: Option<&str>,
    filename: &str,
    format: OutputFormat,
) -> crate::error::Result<String> {
    let stem = file_stem(filename.trim());
    if stem.is_empty() {
        return Err(ChopError::storage("Cannot derive object key from empty filename"));
    }

    let study = match study.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_string(),
        None => ChopId::parse(stem)
            .map(|id| id.study)
            .unwrap_or_else(|| UNASSIGNED_STUDY.to_string()),
    };

    let key = format!(
        "{PROCESSED_PREFIX}/{}/{}.{}",
        sanitize_segment(&study),
        sanitize_segment(stem),
        format.extension()
    );
    super::fs::validate_object_key(&key)?;
    Ok(key)
}
