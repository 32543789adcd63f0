//! Shared Strings Parser
//!
//! `xl/sharedStrings.xml`を解析し、共有文字列テーブルを構築します。

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::Result;

/// 共有文字列テーブル
///
/// セッション開始時に一度だけ読み込まれ、以降は読み取り専用です。
/// リッチテキストは書式を捨てて連結し、ふりがな（`<rPh>`）は除外します。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SharedStringTable {
    strings: Vec<String>,
}

impl SharedStringTable {
    /// XMLから共有文字列テーブルを構築
    ///
    /// # 引数
    ///
    /// * `xml` - `xl/sharedStrings.xml`の内容
    ///
    /// # 戻り値
    ///
    /// * `Ok(SharedStringTable)` - 解析成功
    /// * `Err(XlsxStreamError::Xml)` - XMLが不正な場合
    pub fn parse(xml: &[u8]) -> Result<Self> {
        // 空白を含むテキストを保持するため、trim_textは使用しない
        let mut reader = Reader::from_reader(xml);

        let mut buf = Vec::new();
        let mut strings = Vec::new();
        let mut current: Option<String> = None;
        let mut in_t = false;
        let mut phonetic_depth = 0usize;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"si" => current = Some(String::new()),
                    b"rPh" => phonetic_depth += 1,
                    b"t" if phonetic_depth == 0 && current.is_some() => in_t = true,
                    _ => {}
                },
                Event::Empty(e) => {
                    // <si/>は空文字列
                    if e.local_name().as_ref() == b"si" {
                        strings.push(String::new());
                    }
                }
                Event::Text(e) if in_t => {
                    if let Some(s) = current.as_mut() {
                        s.push_str(&e.unescape()?);
                    }
                }
                Event::CData(e) if in_t => {
                    if let Some(s) = current.as_mut() {
                        s.push_str(std::str::from_utf8(&e.into_inner())?);
                    }
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"si" => {
                        if let Some(s) = current.take() {
                            strings.push(s);
                        }
                    }
                    b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                    b"t" => in_t = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(Self { strings })
    }

    /// インデックスから文字列を取得
    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    /// 文字列の数
    pub fn len(&self) -> usize {
        self.strings.len()
    }
}
