//! Builder Module
//!
//! Fluent Builder APIを提供し、読み込みセッションの設定（`ReaderConfig`）を段階的に構築する。

use log::debug;
use std::path::Path;
use std::sync::Arc;

use crate::api::{FormatKind, UnknownCellPolicy};
use crate::error::{Result, XlsxStreamError};
use crate::format::FormatCatalog;
use crate::parser::CustomFormat;
use crate::reader::XlsxReader;
use crate::security::SecurityConfig;

/// ビルダーで指定された書式の上書き
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FormatOverride {
    pub id: u32,
    pub kind: FormatKind,
    pub pattern: String,
}

/// 読み込みセッションの設定
///
/// `ReaderBuilder::build()`で検証済みの値として生成され、以降は変更できません。
/// 同じ設定で複数のセッションを開くことができます。
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// 書式の上書き（指定順）
    pub(crate) overrides: Vec<FormatOverride>,

    /// どの規則にも一致しないセルの扱い
    pub(crate) unknown_cell_policy: UnknownCellPolicy,

    /// マーカーのない日付・時刻書式を検出するか
    pub(crate) detect_datetime: bool,

    /// セキュリティ制限
    pub(crate) security: SecurityConfig,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            overrides: Vec::new(),
            unknown_cell_policy: UnknownCellPolicy::Skip,
            detect_datetime: false,
            security: SecurityConfig::default(),
        }
    }
}

impl ReaderConfig {
    /// どの規則にも一致しないセルの扱い
    pub fn unknown_cell_policy(&self) -> UnknownCellPolicy {
        self.unknown_cell_policy
    }

    /// マーカーのない日付・時刻書式を検出するか
    pub fn datetime_detection(&self) -> bool {
        self.detect_datetime
    }

    /// 入力ファイルの最大サイズ（バイト）
    pub fn max_input_size(&self) -> u64 {
        self.security.max_input_size
    }

    /// ワークブックのカスタム書式から、セッション用の書式カタログを構築
    ///
    /// 1. 組み込み書式で初期化
    /// 2. ビルダーで指定された上書きを適用
    /// 3. ワークブックのカスタム書式を登録（上書き済みのIDは無視）
    ///
    /// # 戻り値
    ///
    /// * `Ok(FormatCatalog)` - 構築されたカタログ
    /// * `Err(XlsxStreamError::DuplicateFormatId)` - ワークブックの書式IDが重複している
    pub(crate) fn build_catalog(&self, custom: &[CustomFormat]) -> Result<FormatCatalog> {
        let mut catalog = FormatCatalog::new();
        for o in &self.overrides {
            catalog.replace(o.id, o.kind, &o.pattern)?;
        }

        for format in custom {
            if self.overrides.iter().any(|o| o.id == format.id) {
                debug!(
                    "Format id {} is overridden, workbook definition '{}' ignored",
                    format.id, format.code
                );
                continue;
            }
            catalog.register_custom(format.id, &format.code, self.detect_datetime)?;
        }

        Ok(catalog)
    }
}

/// Fluent Builder APIを提供する構造体
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxstream::{FormatKind, ReaderBuilder, UnknownCellPolicy};
///
/// # fn main() -> Result<(), xlsxstream::XlsxStreamError> {
/// let mut reader = ReaderBuilder::new()
///     .with_format(14, FormatKind::Date, "%Y-%m-%d")
///     .with_unknown_cell_policy(UnknownCellPolicy::Surface)
///     .open("report.xlsx", "Sheet1")?;
///
/// while let Some(value) = reader.read_column("A")? {
///     println!("{}: {}", value.cell, value.text);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ReaderBuilder {
    /// 内部設定（構築中）
    config: ReaderConfig,
}

impl Default for ReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 書式の上書き: なし
    /// - 一致しないセル: スキップ
    /// - 日付・時刻書式の検出: 無効
    /// - 入力ファイルの最大サイズ: 2GB
    pub fn new() -> Self {
        Self {
            config: ReaderConfig::default(),
        }
    }

    /// 書式を上書きする
    ///
    /// 同じIDの組み込み書式を置き換え、ワークブックで同じIDが定義されていても優先されます。
    ///
    /// # 引数
    ///
    /// * `id` - 書式ID（`numFmtId`）
    /// * `kind` - 登録先のサブカタログ
    /// * `pattern` - 描画用の書式。日付・時刻はstrftime形式（例: `"%Y/%m/%d"`）、
    ///   数値はExcelの数値書式（例: `"#,##0.00"`）
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxstream::{FormatKind, ReaderBuilder};
    ///
    /// let builder = ReaderBuilder::new()
    ///     .with_format(14, FormatKind::Date, "%Y年%m月%d日")
    ///     .with_format(3, FormatKind::Number, "#,##0.0");
    /// ```
    pub fn with_format(mut self, id: u32, kind: FormatKind, pattern: &str) -> Self {
        self.config.overrides.push(FormatOverride {
            id,
            kind,
            pattern: pattern.to_string(),
        });
        self
    }

    /// どの規則にも一致しないセルの扱いを指定する
    ///
    /// # 引数
    ///
    /// * `policy: UnknownCellPolicy`:
    ///   * `Skip`: ストリームから除外する（デフォルト）
    ///   * `Surface`: `ValueKind::Unknown`として出力する
    pub fn with_unknown_cell_policy(mut self, policy: UnknownCellPolicy) -> Self {
        self.config.unknown_cell_policy = policy;
        self
    }

    /// ロケールマーカーのないカスタム書式から日付・時刻を検出するかを指定する
    ///
    /// 無効の場合（デフォルト）、`[$-F800]`・`[$-F400]`で始まらない書式は数値書式として扱われます。
    pub fn with_datetime_detection(mut self, detect: bool) -> Self {
        self.config.detect_datetime = detect;
        self
    }

    /// 入力ファイルの最大サイズ（バイト）を指定する
    pub fn with_max_input_size(mut self, bytes: u64) -> Self {
        self.config.security.max_input_size = bytes;
        self
    }

    /// 設定を検証し、`ReaderConfig`を生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(ReaderConfig)`: 設定が有効な場合
    /// * `Err(XlsxStreamError::DuplicateFormatId)`: 同じIDの上書きが複数指定された
    /// * `Err(XlsxStreamError::Config)`: 日付・時刻の書式がstrftime形式として解釈できない
    pub fn build(self) -> Result<ReaderConfig> {
        // 上書き同士の重複と書式の妥当性を、空のカタログへの登録で検証
        let mut scratch = FormatCatalog::empty();
        for o in &self.config.overrides {
            scratch.register(o.id, o.kind, &o.pattern)?;
        }

        if self.config.security.max_input_size == 0 {
            return Err(XlsxStreamError::Config(
                "Maximum input size must be greater than zero".to_string(),
            ));
        }

        Ok(self.config)
    }

    /// 設定を検証し、ファイルから読み込みセッションを開く
    pub fn open(self, path: impl AsRef<Path>, sheet: &str) -> Result<XlsxReader> {
        let config = self.build()?;
        XlsxReader::open_with(path, sheet, &config)
    }

    /// 設定を検証し、メモリ上のバイト列から読み込みセッションを開く
    pub fn open_bytes(self, bytes: impl Into<Arc<[u8]>>, sheet: &str) -> Result<XlsxReader> {
        let config = self.build()?;
        XlsxReader::open_bytes_with(bytes, sheet, &config)
    }
}
