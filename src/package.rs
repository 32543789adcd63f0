//! Package Module
//!
//! XLSXパッケージ（ZIPコンテナ）を読み取り専用で開くモジュール。
//!
//! パッケージはパスまたはメモリ上のバイト列を保持するだけで、
//! ZIPアーカイブは走査のたびに独立したハンドルとして開き直します。
//! そのため、同じパッケージに対する複数のセッションが走査状態を共有することはありません。

use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::result::ZipError;
use zip::read::ZipFile;
use zip::ZipArchive;

use crate::error::{Result, XlsxStreamError};
use crate::security::SecurityConfig;

/// サポートするファイル拡張子（小文字）
const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm"];

/// パッケージの読み込み元
#[derive(Debug, Clone)]
enum Source {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

/// ZIPアーカイブの下位リーダー
pub(crate) enum PackageReader {
    File(BufReader<File>),
    Memory(Cursor<Arc<[u8]>>),
}

impl Read for PackageReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            PackageReader::File(r) => r.read(buf),
            PackageReader::Memory(r) => r.read(buf),
        }
    }
}

impl Seek for PackageReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            PackageReader::File(r) => r.seek(pos),
            PackageReader::Memory(r) => r.seek(pos),
        }
    }
}

/// 読み取り専用のXLSXパッケージ
#[derive(Debug, Clone)]
pub(crate) struct Package {
    source: Source,
    security: SecurityConfig,
}

impl Package {
    /// パスからパッケージを開く
    ///
    /// # 引数
    ///
    /// * `path` - `.xlsx`または`.xlsm`ファイルのパス
    /// * `security` - セキュリティ制限
    ///
    /// # 戻り値
    ///
    /// * `Ok(Package)` - 検証済みのパッケージ
    /// * `Err(XlsxStreamError::InvalidExtension)` - 拡張子がサポート外
    /// * `Err(XlsxStreamError::Zip)` - ZIPアーカイブとして開けない
    /// * `Err(XlsxStreamError::SecurityViolation)` - セキュリティ制限に違反
    pub fn open(path: &Path, security: SecurityConfig) -> Result<Self> {
        check_extension(path)?;
        security.check_input_size(std::fs::metadata(path)?.len())?;
        Self::verified(Source::File(path.to_path_buf()), security)
    }

    /// メモリ上のバイト列からパッケージを開く
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, security: SecurityConfig) -> Result<Self> {
        let bytes: Arc<[u8]> = bytes.into();
        security.check_input_size(bytes.len() as u64)?;
        Self::verified(Source::Memory(bytes), security)
    }

    fn verified(source: Source, security: SecurityConfig) -> Result<Self> {
        let package = Self { source, security };
        let mut archive = package.archive()?;
        package.security.check_archive(&mut archive.inner)?;
        Ok(package)
    }

    /// 新しいアーカイブハンドルを開く
    pub fn archive(&self) -> Result<PackageArchive> {
        let reader = match &self.source {
            Source::File(path) => PackageReader::File(BufReader::new(File::open(path)?)),
            Source::Memory(bytes) => PackageReader::Memory(Cursor::new(Arc::clone(bytes))),
        };
        Ok(PackageArchive {
            inner: ZipArchive::new(reader)?,
            max_part_size: self.security.max_part_size,
        })
    }
}

/// 開いているZIPアーカイブ
pub(crate) struct PackageArchive {
    inner: ZipArchive<PackageReader>,
    max_part_size: u64,
}

impl PackageArchive {
    /// パートの内容をすべて読み込む
    ///
    /// # 戻り値
    ///
    /// * `Ok(Some(Vec<u8>))` - パートの内容
    /// * `Ok(None)` - パートが存在しない
    pub fn read_part(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let file = match self.inner.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // 宣言サイズを偽ったエントリに備え、展開後のサイズを制限する
        let mut data = Vec::new();
        file.take(self.max_part_size + 1).read_to_end(&mut data)?;
        if data.len() as u64 > self.max_part_size {
            return Err(XlsxStreamError::SecurityViolation(format!(
                "Part '{}' exceeds maximum size: {} bytes",
                name, self.max_part_size
            )));
        }
        Ok(Some(data))
    }

    /// パートをストリームとして開く
    ///
    /// 返されるリーダーはアーカイブを借用するため、走査中はこのアーカイブを他の用途に使えません。
    pub fn open_part(&mut self, name: &str) -> Result<BufReader<ZipFile<'_>>> {
        match self.inner.by_name(name) {
            Ok(file) => Ok(BufReader::new(file)),
            Err(ZipError::FileNotFound) => Err(XlsxStreamError::Zip(format!(
                "Part '{}' is referenced by the workbook but missing from the package",
                name
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

/// ファイル拡張子を検証（大文字小文字を区別しない）
fn check_extension(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(XlsxStreamError::InvalidExtension(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(data.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_check_extension() {
        assert!(check_extension(Path::new("book.xlsx")).is_ok());
        assert!(check_extension(Path::new("BOOK.XLSM")).is_ok());
        assert!(matches!(
            check_extension(Path::new("book.csv")),
            Err(XlsxStreamError::InvalidExtension(_))
        ));
        assert!(check_extension(Path::new("book")).is_err());
    }

    #[test]
    fn test_read_part() {
        let bytes = zip_bytes(&[("xl/workbook.xml", "<workbook/>")]);
        let package = Package::from_bytes(bytes, SecurityConfig::default()).unwrap();
        let mut archive = package.archive().unwrap();
        assert_eq!(
            archive.read_part("xl/workbook.xml").unwrap().as_deref(),
            Some(&b"<workbook/>"[..])
        );
        assert!(archive.read_part("xl/sharedStrings.xml").unwrap().is_none());
        assert!(archive.open_part("xl/worksheets/sheet9.xml").is_err());
    }

    #[test]
    fn test_independent_archives() {
        let bytes = zip_bytes(&[("a.xml", "<a>first</a>")]);
        let package = Package::from_bytes(bytes, SecurityConfig::default()).unwrap();
        let mut first = package.archive().unwrap();
        let mut second = package.archive().unwrap();

        let mut reader = first.open_part("a.xml").unwrap();
        let mut head = [0u8; 3];
        reader.read_exact(&mut head).unwrap();
        // 別のハンドルは最初から読める
        assert_eq!(
            second.read_part("a.xml").unwrap().as_deref(),
            Some(&b"<a>first</a>"[..])
        );
        assert_eq!(&head, b"<a>");
    }

    #[test]
    fn test_not_a_zip() {
        let result = Package::from_bytes(b"plain text".to_vec(), SecurityConfig::default());
        assert!(matches!(result, Err(XlsxStreamError::Zip(_))));
    }

    #[test]
    fn test_part_size_limit() {
        let bytes = zip_bytes(&[("big.xml", "0123456789")]);
        let package = Package {
            source: Source::Memory(bytes.into()),
            security: SecurityConfig {
                max_part_size: 4,
                ..SecurityConfig::default()
            },
        };
        let mut archive = package.archive().unwrap();
        assert!(matches!(
            archive.read_part("big.xml"),
            Err(XlsxStreamError::SecurityViolation(_))
        ));
    }
}
