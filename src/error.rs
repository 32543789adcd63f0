//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。
//!
//! バックグラウンドのスキャナースレッドからカーソルへエラーを転送するため、
//! すべてのバリアントは`Send + Sync`を満たす必要があります。

use thiserror::Error;

/// xlsxstreamクレート全体で使用するエラー型
///
/// ワークブックのオープン、セル値の解決、ストリーミング読み込み中に発生する
/// すべてのエラーを統一的に扱うために使用されます。
///
/// # エラーの分類
///
/// - 設定エラー（`Config`, `InvalidExtension`, `SheetNotFound`, `InvalidColumn`, ...）:
///   呼び出し時に同期的に返され、再試行されません。
/// - データ整合性エラー（`MissingSharedString`, `NumberFormatParse`, ...）:
///   該当するセルのpullのみが失敗します。
/// - 書式カタログエラー（`DuplicateFormatId`）: セッション構築時に致命的エラーとなります。
///
/// 分類は[`XlsxStreamError::category`]で取得できます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxstream::{ErrorCategory, XlsxReader, XlsxStreamError};
///
/// match XlsxReader::open("report.csv", "Sheet1") {
///     Err(e) => assert_eq!(e.category(), ErrorCategory::Configuration),
///     Ok(_) => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum XlsxStreamError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIPアーカイブの解析エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// XMLの解析エラー
    #[error("XML parse error: {0}")]
    Xml(String),

    /// UTF-8文字列の変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// 数値の解析エラー（XML属性値など）
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// 設定の検証に失敗したエラー
    ///
    /// `ReaderBuilder::build()`時に無効な設定が検出された場合などに発生します。
    #[error("Configuration error: {0}")]
    Config(String),

    /// サポートされていないファイル拡張子
    #[error("Invalid file extension: '{0}' (expected .xlsx or .xlsm)")]
    InvalidExtension(String),

    /// 指定された名前のシートがワークブックに存在しない
    #[error("Sheet '{0}' does not exist in the workbook")]
    SheetNotFound(String),

    /// 列名に英字以外の文字が含まれている、または列の上限を超えている
    #[error("Invalid column name: '{0}'")]
    InvalidColumn(String),

    /// セル参照（例: "AB123"）の形式が不正
    #[error("Invalid cell reference: '{0}'")]
    InvalidCellRef(String),

    /// 範囲式（例: "A10:C99"）の形式が不正
    #[error("The range was not in a valid format (e.g. A1:B100): '{0}'")]
    InvalidRange(String),

    /// セッションは既に別の選択範囲でストリーミング中
    #[error("Session is already streaming {active}, cannot switch to {requested}")]
    SelectionMismatch {
        /// 最初のpullで確定した選択範囲
        active: String,
        /// 今回要求された選択範囲
        requested: String,
    },

    /// 同じ書式IDが二重に登録された
    #[error("Duplicate number format id: {0}")]
    DuplicateFormatId(u32),

    /// 共有文字列テーブルに存在しないインデックスを参照している
    #[error("Shared string index {index} referenced by cell {cell} is out of range")]
    MissingSharedString {
        /// 参照されたインデックス
        index: usize,
        /// 参照元のセル（A1記法）
        cell: String,
    },

    /// 共有文字列セルの値がインデックスとして解析できない
    #[error("Cell {cell} holds '{text}', which is not a shared string index")]
    MalformedSharedStringIndex {
        /// セル（A1記法）
        cell: String,
        /// 元のテキスト
        text: String,
    },

    /// 数値として宣言されたセルの値を10進数として解析できない
    #[error("Cell {cell} holds '{text}', which is not a valid decimal number")]
    NumberFormatParse {
        /// セル（A1記法）
        cell: String,
        /// 元のテキスト
        text: String,
    },

    /// スキャナースレッドが結果を報告せずに終了した
    #[error("Worksheet scanner stopped unexpectedly: {0}")]
    ScannerFailed(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb攻撃、パストラバーサル攻撃、ファイルサイズ制限などの
    /// セキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

/// エラーの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 不正な引数・設定（呼び出し時に同期的に返される）
    Configuration,
    /// ワークシートの内容と型宣言の不整合
    DataIntegrity,
    /// 書式カタログの構築失敗
    FormatCatalog,
    /// コンテナ・XML・I/Oレベルの失敗
    Io,
}

impl XlsxStreamError {
    /// このエラーが属する分類を返す
    pub fn category(&self) -> ErrorCategory {
        match self {
            XlsxStreamError::Config(_)
            | XlsxStreamError::InvalidExtension(_)
            | XlsxStreamError::SheetNotFound(_)
            | XlsxStreamError::InvalidColumn(_)
            | XlsxStreamError::InvalidCellRef(_)
            | XlsxStreamError::InvalidRange(_)
            | XlsxStreamError::SelectionMismatch { .. } => ErrorCategory::Configuration,
            XlsxStreamError::MissingSharedString { .. }
            | XlsxStreamError::MalformedSharedStringIndex { .. }
            | XlsxStreamError::NumberFormatParse { .. } => ErrorCategory::DataIntegrity,
            XlsxStreamError::DuplicateFormatId(_) => ErrorCategory::FormatCatalog,
            XlsxStreamError::Io(_)
            | XlsxStreamError::Zip(_)
            | XlsxStreamError::Xml(_)
            | XlsxStreamError::Utf8(_)
            | XlsxStreamError::ParseInt(_)
            | XlsxStreamError::ScannerFailed(_)
            | XlsxStreamError::SecurityViolation(_) => ErrorCategory::Io,
        }
    }
}

impl From<quick_xml::Error> for XlsxStreamError {
    fn from(e: quick_xml::Error) -> Self {
        XlsxStreamError::Xml(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for XlsxStreamError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        XlsxStreamError::Xml(format!("XML attribute error: {}", e))
    }
}

impl From<zip::result::ZipError> for XlsxStreamError {
    fn from(e: zip::result::ZipError) -> Self {
        XlsxStreamError::Zip(e.to_string())
    }
}

/// クレート内で使用する`Result`型エイリアス
pub type Result<T> = std::result::Result<T, XlsxStreamError>;
