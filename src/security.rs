//! Security Module
//!
//! パッケージを開く時点で適用する制限。
//! ZIP bomb（エントリ数・展開後サイズ）とパストラバーサルを、エントリを展開せずに検査します。

use std::fmt;
use std::io::{Read, Seek};
use zip::ZipArchive;

use crate::error::{Result, XlsxStreamError};

/// パッケージの制限値
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SecurityConfig {
    /// 入力（ファイルまたはバイト列）の最大サイズ。デフォルト: 2GB
    pub max_input_size: u64,
    /// アーカイブ内の最大エントリ数。デフォルト: 10,000
    pub max_entries: usize,
    /// 1パートの展開後の最大サイズ。デフォルト: 100MB
    pub max_part_size: u64,
    /// 全パートの展開後サイズの合計の上限。デフォルト: 1GB
    pub max_total_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_size: 2_147_483_648,
            max_entries: 10_000,
            max_part_size: 104_857_600,
            max_total_size: 1_073_741_824,
        }
    }
}

impl SecurityConfig {
    /// 入力サイズを検証
    pub fn check_input_size(&self, size: u64) -> Result<()> {
        if size > self.max_input_size {
            return Err(violation(format!(
                "Input is {} bytes, limit is {} bytes",
                size, self.max_input_size
            )));
        }
        Ok(())
    }

    /// アーカイブの全エントリを検証
    ///
    /// セントラルディレクトリの情報（名前と宣言された展開後サイズ）のみを使用します。
    pub fn check_archive<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<()> {
        let entries = archive.len();
        if entries > self.max_entries {
            return Err(violation(format!(
                "Package has {} entries, limit is {}",
                entries, self.max_entries
            )));
        }

        let mut total = 0u64;
        for index in 0..entries {
            let entry = archive.by_index_raw(index)?;
            let name = entry.name();

            if let Some(issue) = PartPathIssue::find(name) {
                return Err(violation(format!("Entry '{}': {}", name, issue)));
            }
            if entry.size() > self.max_part_size {
                return Err(violation(format!(
                    "Entry '{}' expands to {} bytes, limit is {} bytes",
                    name,
                    entry.size(),
                    self.max_part_size
                )));
            }

            total = total.saturating_add(entry.size());
            if total > self.max_total_size {
                return Err(violation(format!(
                    "Package expands to more than {} bytes",
                    self.max_total_size
                )));
            }
        }
        Ok(())
    }
}

fn violation(message: String) -> XlsxStreamError {
    XlsxStreamError::SecurityViolation(message)
}

/// パート名の問題
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PartPathIssue {
    Empty,
    /// `/`またはドライブ文字（`C:`）で始まる
    Absolute,
    /// `..`セグメントを含む
    Traversal,
    /// `\`区切りを含む
    Backslash,
}

impl PartPathIssue {
    /// パート名を検査し、最初に見つかった問題を返す
    pub fn find(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if name.is_empty() {
            Some(Self::Empty)
        } else if name.starts_with('/')
            || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
        {
            Some(Self::Absolute)
        } else if name.contains('\\') {
            Some(Self::Backslash)
        } else if name.split('/').any(|segment| segment == "..") {
            Some(Self::Traversal)
        } else {
            None
        }
    }
}

impl fmt::Display for PartPathIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Empty => "empty name",
            Self::Absolute => "absolute path",
            Self::Traversal => "path traversal",
            Self::Backslash => "backslash separator",
        })
    }
}
