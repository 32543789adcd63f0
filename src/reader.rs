//! Reader Module
//!
//! 読み込みセッション（`XlsxReader`）を提供するモジュール。
//!
//! セッションの開始時に、ワークブック・共有文字列・スタイルを一度だけ読み込み、
//! 書式カタログを構築します。これらはセッションの間、読み取り専用です。
//! ワークシート本体は読み込まず、pullのたびにスキャナーが前方向に走査します。

use log::debug;
use std::path::Path;
use std::sync::Arc;

use crate::api::Selection;
use crate::builder::ReaderConfig;
use crate::classifier::CellClassifier;
use crate::cursor::StreamCursor;
use crate::error::{Result, XlsxStreamError};
use crate::filter::RangeFilter;
use crate::package::{Package, PackageArchive};
use crate::parser::{parse_styles, SharedStringTable, StyleTable, WorkbookInfo};
use crate::scanner::WorksheetScanner;
use crate::types::{CellRef, Column, ResolvedValue};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";

/// 1つのワークシートに対する読み込みセッション
///
/// 3種類のpull操作（`read_column`、`read_columns`、`read_range`）を提供します。
/// セッションの選択範囲は最初のpullで確定し、別の選択範囲でpullすると
/// `SelectionMismatch`になります。独立した走査が必要な場合は[`XlsxReader::stream`]を使用します。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxstream::XlsxReader;
///
/// # fn main() -> Result<(), xlsxstream::XlsxStreamError> {
/// let mut reader = XlsxReader::open("report.xlsx", "Sheet1")?;
/// while let Some(value) = reader.read_columns("A", "C")? {
///     println!("{} {}", value.cell, value.text);
/// }
/// reader.close();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct XlsxReader {
    package: Package,
    sheet: String,
    sheet_part: String,
    sheet_names: Vec<String>,
    classifier: Arc<CellClassifier>,
    /// 最初のpullで確定したストリーム
    active: Option<StreamCursor>,
    current: Option<CellRef>,
}

impl XlsxReader {
    /// デフォルト設定でファイルを開く
    ///
    /// # 引数
    ///
    /// * `path` - `.xlsx`または`.xlsm`ファイルのパス
    /// * `sheet` - 読み込むワークシートの名前
    ///
    /// # 戻り値
    ///
    /// * `Ok(XlsxReader)` - セッション
    /// * `Err(XlsxStreamError::InvalidExtension)` - 拡張子がサポート外
    /// * `Err(XlsxStreamError::SheetNotFound)` - シートが存在しない
    /// * `Err(XlsxStreamError::DuplicateFormatId)` - 書式IDが重複している
    pub fn open(path: impl AsRef<Path>, sheet: &str) -> Result<Self> {
        Self::open_with(path, sheet, &ReaderConfig::default())
    }

    /// 設定を指定してファイルを開く
    pub fn open_with(path: impl AsRef<Path>, sheet: &str, config: &ReaderConfig) -> Result<Self> {
        let package = Package::open(path.as_ref(), config.security.clone())?;
        Self::load(package, sheet, config)
    }

    /// デフォルト設定でメモリ上のバイト列を開く
    pub fn open_bytes(bytes: impl Into<Arc<[u8]>>, sheet: &str) -> Result<Self> {
        Self::open_bytes_with(bytes, sheet, &ReaderConfig::default())
    }

    /// 設定を指定してメモリ上のバイト列を開く
    pub fn open_bytes_with(
        bytes: impl Into<Arc<[u8]>>,
        sheet: &str,
        config: &ReaderConfig,
    ) -> Result<Self> {
        let package = Package::from_bytes(bytes, config.security.clone())?;
        Self::load(package, sheet, config)
    }

    /// ワークブックレベルのデータを読み込み、セッションを構築
    fn load(package: Package, sheet: &str, config: &ReaderConfig) -> Result<Self> {
        let mut archive = package.archive()?;

        let workbook = WorkbookInfo::parse(
            &required_part(&mut archive, WORKBOOK_PART)?,
            &required_part(&mut archive, WORKBOOK_RELS_PART)?,
        )?;
        let sheet_part = workbook.sheet_path(sheet)?.to_string();

        let strings = match archive.read_part(SHARED_STRINGS_PART)? {
            Some(xml) => SharedStringTable::parse(&xml)?,
            None => SharedStringTable::default(),
        };
        let (custom_formats, styles) = match archive.read_part(STYLES_PART)? {
            Some(xml) => parse_styles(&xml)?,
            None => (Vec::new(), StyleTable::default()),
        };
        let catalog = config.build_catalog(&custom_formats)?;

        debug!(
            "Opened sheet '{}' ({}): {} shared strings, {} cell formats, {} custom number formats, 1904 dates: {}",
            sheet,
            sheet_part,
            strings.len(),
            styles.len(),
            custom_formats.len(),
            workbook.is_1904
        );

        let classifier = CellClassifier::new(
            catalog,
            strings,
            styles,
            workbook.is_1904,
            config.unknown_cell_policy,
        );

        Ok(Self {
            package,
            sheet: sheet.to_string(),
            sheet_part,
            sheet_names: workbook.sheet_names(),
            classifier: Arc::new(classifier),
            active: None,
            current: None,
        })
    }

    /// 単一列の次の値を取得
    ///
    /// # 引数
    ///
    /// * `column` - 列名（例: `"A"`, `"AB"`、大文字小文字を区別しない）
    ///
    /// # 戻り値
    ///
    /// * `Ok(Some(ResolvedValue))` - 次の値
    /// * `Ok(None)` - 列の終端（以降も`Ok(None)`を返し続ける）
    /// * `Err(XlsxStreamError::InvalidColumn)` - 列名が不正
    pub fn read_column(&mut self, column: &str) -> Result<Option<ResolvedValue>> {
        self.pull(Selection::column(column)?)
    }

    /// 連続した複数列の次の値を取得
    ///
    /// 列ごとに上から下へ走査し、`from`列の値をすべて返した後に次の列へ進みます。
    pub fn read_columns(&mut self, from: &str, to: &str) -> Result<Option<ResolvedValue>> {
        self.pull(Selection::columns(from, to)?)
    }

    /// 範囲（例: `"A10:C99"`）の次の値を取得
    ///
    /// 最初の列は開始行以降、最後の列は終了行以前に制限され、中間の列は全行が対象です。
    pub fn read_range(&mut self, expression: &str) -> Result<Option<ResolvedValue>> {
        self.pull(Selection::range(expression)?)
    }

    fn pull(&mut self, selection: Selection) -> Result<Option<ResolvedValue>> {
        if let Some(cursor) = &self.active {
            if *cursor.selection() != selection {
                return Err(XlsxStreamError::SelectionMismatch {
                    active: cursor.selection().to_string(),
                    requested: selection.to_string(),
                });
            }
        }

        let (package, sheet_part, classifier) = (&self.package, &self.sheet_part, &self.classifier);
        let cursor = self
            .active
            .get_or_insert_with(|| Self::cursor(package, sheet_part, classifier, selection));

        let value = cursor.next_value()?;
        if let Some(value) = &value {
            self.current = Some(value.cell);
        }
        Ok(value)
    }

    /// 独立したストリームを開始
    ///
    /// 返されるカーソルはセッションの状態とは独立しており、
    /// 同じセッションから複数のカーソルを同時に使用できます。
    pub fn stream(&self, selection: Selection) -> StreamCursor {
        Self::cursor(&self.package, &self.sheet_part, &self.classifier, selection)
    }

    fn cursor(
        package: &Package,
        sheet_part: &str,
        classifier: &Arc<CellClassifier>,
        selection: Selection,
    ) -> StreamCursor {
        StreamCursor::new(WorksheetScanner::new(
            package.clone(),
            sheet_part.to_string(),
            Arc::clone(classifier),
            RangeFilter::new(selection),
        ))
    }

    /// 直前のpullで返した値の列
    pub fn current_column(&self) -> Option<Column> {
        self.current.map(|c| c.column)
    }

    /// 直前のpullで返した値の行
    pub fn current_row(&self) -> Option<u32> {
        self.current.map(|c| c.row)
    }

    /// セッションの対象シート名
    pub fn sheet_name(&self) -> &str {
        &self.sheet
    }

    /// ワークブック内のシート名（ワークブック内の順序）
    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    /// セッションを閉じる
    ///
    /// 実行中のスキャナーを停止し、パッケージを解放します。ストリームの途中で呼び出してもかまいません。
    pub fn close(mut self) {
        if let Some(cursor) = self.active.take() {
            cursor.close();
        }
    }
}

/// 必須のパートを読み込む
fn required_part(archive: &mut PackageArchive, name: &str) -> Result<Vec<u8>> {
    archive.read_part(name)?.ok_or_else(|| {
        XlsxStreamError::Zip(format!("Required part '{}' is missing from the package", name))
    })
}
