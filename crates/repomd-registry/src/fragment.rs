//! Incremental extraction of repeated XML elements.
//!
//! [`FragmentReader`] walks an XML event stream and cuts every element
//! accepted by its matcher out into a standalone document, so each one can be
//! deserialized on its own. Only the fragment being captured is buffered.
//!
//! While copying, namespace prefixes are dropped from element and attribute
//! names and `xmlns` declarations are left out. `<rpm:entry name="bash"/>`
//! therefore comes out as `<entry name="bash"/>`.
//!
//! Character data is copied exactly. Text with leading or trailing
//! whitespace is written as CDATA, which the deserializer never trims.
//! Whitespace-only text between child elements is dropped.

use std::{fmt, io, io::BufRead, mem, sync::Arc};

use quick_xml::{
    events::{BytesCData, BytesEnd, BytesStart, BytesText, Event},
    utils::is_whitespace,
    Reader, Writer,
};

/// Failure while scanning the outer document.
#[derive(Debug)]
pub(crate) enum ScanError {
    /// The underlying stream could not be read.
    Io(io::Error),
    /// The document is not well-formed.
    Syntax(String),
}

impl ScanError {
    fn from_xml(err: quick_xml::Error, position: u64) -> Self {
        match err {
            quick_xml::Error::Io(err) => {
                ScanError::Io(
                    Arc::try_unwrap(err)
                        .unwrap_or_else(|err| io::Error::new(err.kind(), err.to_string())),
                )
            }
            err => ScanError::Syntax(format!("{err} (at byte {position})")),
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Io(err) => write!(f, "{err}"),
            ScanError::Syntax(msg) => f.write_str(msg),
        }
    }
}

/// An element extracted from a larger document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fragment {
    /// Local name of the fragment's root element.
    pub name: String,
    /// The element re-serialized as a standalone XML document.
    pub xml: String,
}

struct Capture {
    name: String,
    writer: Writer<Vec<u8>>,
    depth: usize,
    /// Unescaped character data not yet written.
    text: String,
    /// Whether the innermost open element has no child elements so far.
    leaf: bool,
}

impl Capture {
    fn new(name: String) -> Self {
        Self {
            name,
            writer: Writer::new(Vec::new()),
            depth: 0,
            text: String::new(),
            leaf: false,
        }
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), ScanError> {
        self.writer
            .write_event(event)
            .map_err(|err| ScanError::Syntax(err.to_string()))
    }

    fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Writes pending character data ahead of the next tag. `closing` is set
    /// when that tag ends the element holding the text.
    fn flush_text(&mut self, closing: bool) -> Result<(), ScanError> {
        if self.text.is_empty() {
            return Ok(());
        }
        let text = mem::take(&mut self.text);
        let bytes = text.as_bytes();

        if bytes.iter().all(|b| is_whitespace(*b)) && !(closing && self.leaf) {
            return Ok(());
        }

        let padded = bytes.first().is_some_and(|b| is_whitespace(*b))
            || bytes.last().is_some_and(|b| is_whitespace(*b));
        if !padded {
            return self.write(Event::Text(BytesText::new(&text)));
        }
        for part in BytesCData::escaped(&text) {
            self.write(Event::CData(part))?;
        }
        Ok(())
    }

    fn open(&mut self, start: &BytesStart<'_>) -> Result<(), ScanError> {
        let start = strip_prefixes(start)?;
        self.flush_text(false)?;
        self.leaf = true;
        self.depth += 1;
        self.write(Event::Start(start))
    }

    fn empty(&mut self, start: &BytesStart<'_>) -> Result<(), ScanError> {
        let start = strip_prefixes(start)?;
        self.flush_text(false)?;
        self.leaf = false;
        self.write(Event::Empty(start))
    }

    fn close(&mut self, end: &BytesEnd<'_>) -> Result<(), ScanError> {
        self.flush_text(true)?;
        self.leaf = false;
        self.depth = self.depth.saturating_sub(1);
        let name = local_name(end.local_name().as_ref());
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn finish(self) -> Result<Fragment, ScanError> {
        let xml = String::from_utf8(self.writer.into_inner())
            .map_err(|err| ScanError::Syntax(format!("fragment is not valid UTF-8: {err}")))?;
        Ok(Fragment {
            name: self.name,
            xml,
        })
    }
}

fn local_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

fn strip_prefixes(start: &BytesStart<'_>) -> Result<BytesStart<'static>, ScanError> {
    let syntax = |err: quick_xml::Error| ScanError::Syntax(err.to_string());

    let mut stripped = BytesStart::new(local_name(start.local_name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|err| ScanError::Syntax(err.to_string()))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = local_name(attr.key.local_name().as_ref());
        let value = attr.unescape_value().map_err(syntax)?;
        stripped.push_attribute((key.as_str(), value.as_ref()));
    }
    Ok(stripped.into_owned())
}

fn trailing_content() -> ScanError {
    ScanError::Syntax("content after the root element".into())
}

/// Pulls matching elements out of an XML stream one at a time.
///
/// The matcher receives the depth of a candidate element (the document root
/// is at depth 0) and its local name. Elements nested inside a fragment that
/// is already being captured are copied as part of it and never matched on
/// their own.
pub(crate) struct FragmentReader<R, M> {
    reader: Reader<R>,
    buf: Vec<u8>,
    depth: usize,
    root: Option<String>,
    /// Set once the root element has been closed.
    closed: bool,
    matcher: M,
}

impl<R, M> FragmentReader<R, M>
where
    R: BufRead,
    M: FnMut(usize, &[u8]) -> bool,
{
    pub fn new(input: R, matcher: M) -> Self {
        let mut reader = Reader::from_reader(input);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = true;

        Self {
            reader,
            buf: Vec::with_capacity(8 * 1024),
            depth: 0,
            root: None,
            closed: false,
            matcher,
        }
    }

    /// Local name of the document's root element, once it has been read.
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Returns the next matching fragment, or `None` once the document has
    /// been read to the end.
    ///
    /// Reaching the end of input with unclosed elements, without any root
    /// element at all, or with elements or text after the root element is
    /// reported as [`ScanError::Syntax`].
    pub fn next_fragment(&mut self) -> Result<Option<Fragment>, ScanError> {
        let mut capture: Option<Capture> = None;

        loop {
            self.buf.clear();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|err| ScanError::from_xml(err, self.reader.buffer_position() as u64))?;

            match event {
                Event::Start(start) => {
                    if self.closed {
                        return Err(trailing_content());
                    }
                    let depth = self.depth;
                    self.depth += 1;
                    if self.root.is_none() {
                        self.root = Some(local_name(start.local_name().as_ref()));
                    }

                    match capture.as_mut() {
                        Some(capture) => capture.open(&start)?,
                        None if (self.matcher)(depth, start.local_name().as_ref()) => {
                            let mut started = Capture::new(local_name(start.local_name().as_ref()));
                            started.open(&start)?;
                            capture = Some(started);
                        }
                        None => {}
                    }
                }
                Event::Empty(start) => {
                    if self.closed {
                        return Err(trailing_content());
                    }
                    if self.root.is_none() {
                        self.root = Some(local_name(start.local_name().as_ref()));
                    }
                    if self.depth == 0 {
                        self.closed = true;
                    }

                    match capture.as_mut() {
                        Some(capture) => capture.empty(&start)?,
                        None if (self.matcher)(self.depth, start.local_name().as_ref()) => {
                            let mut single = Capture::new(local_name(start.local_name().as_ref()));
                            single.empty(&start)?;
                            return single.finish().map(Some);
                        }
                        None => {}
                    }
                }
                Event::End(end) => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        self.closed = true;
                    }

                    if let Some(mut current) = capture.take() {
                        current.close(&end)?;
                        if current.depth == 0 {
                            return current.finish().map(Some);
                        }
                        capture = Some(current);
                    }
                }
                Event::Text(text) => {
                    if let Some(capture) = capture.as_mut() {
                        let text = text.unescape().map_err(|err| {
                            ScanError::from_xml(err, self.reader.buffer_position() as u64)
                        })?;
                        capture.push_text(&text);
                    } else if self.depth == 0 && !text.iter().all(|b| is_whitespace(*b)) {
                        return Err(ScanError::Syntax("text outside the root element".into()));
                    }
                }
                Event::CData(data) => {
                    if let Some(capture) = capture.as_mut() {
                        let data = data
                            .decode()
                            .map_err(|err| ScanError::Syntax(err.to_string()))?;
                        capture.push_text(&data);
                    } else if self.depth == 0 {
                        return Err(ScanError::Syntax("CDATA outside the root element".into()));
                    }
                }
                Event::Eof => {
                    if self.depth > 0 {
                        return Err(ScanError::Syntax(format!(
                            "unexpected end of document with {} unclosed element(s)",
                            self.depth
                        )));
                    }
                    if self.root.is_none() {
                        return Err(ScanError::Syntax("document has no root element".into()));
                    }
                    return Ok(None);
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<M>(xml: &str, matcher: M) -> Result<Vec<Fragment>, ScanError>
    where
        M: FnMut(usize, &[u8]) -> bool,
    {
        let mut reader = FragmentReader::new(xml.as_bytes(), matcher);
        let mut fragments = Vec::new();
        while let Some(fragment) = reader.next_fragment()? {
            fragments.push(fragment);
        }
        Ok(fragments)
    }

    #[test]
    fn test_extracts_matches_at_any_depth() {
        let xml = r#"<metadata>
            <package><name>a</name></package>
            <group><package><name>b</name></package></group>
        </metadata>"#;

        let fragments = collect(xml, |_, name| name == b"package").unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].xml, "<package><name>a</name></package>");
        assert_eq!(fragments[1].xml, "<package><name>b</name></package>");
    }

    #[test]
    fn test_matcher_sees_depth() {
        let xml = "<repomd><data type=\"a\"/><x><data type=\"b\"/></x></repomd>";

        let fragments = collect(xml, |depth, name| depth == 1 && name == b"data").unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].xml, r#"<data type="a"/>"#);
    }

    #[test]
    fn test_strips_namespace_prefixes() {
        let xml = r#"<metadata xmlns="http://linux.duke.edu/metadata/common" xmlns:rpm="http://linux.duke.edu/metadata/rpm">
            <package type="rpm"><format><rpm:provides><rpm:entry name="bash"/></rpm:provides></format></package>
        </metadata>"#;

        let fragments = collect(xml, |_, name| name == b"package").unwrap();
        assert_eq!(
            fragments[0].xml,
            r#"<package type="rpm"><format><provides><entry name="bash"/></provides></format></package>"#
        );
    }

    #[test]
    fn test_nested_match_stays_in_outer_fragment() {
        let xml = "<r><package><package>inner</package></package></r>";

        let fragments = collect(xml, |_, name| name == b"package").unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].xml, "<package><package>inner</package></package>");
    }

    #[test]
    fn test_escaped_text_is_kept_escaped() {
        let xml = "<r><package><summary>a &lt; b &amp; c</summary></package></r>";

        let fragments = collect(xml, |_, name| name == b"package").unwrap();
        assert_eq!(
            fragments[0].xml,
            "<package><summary>a &lt; b &amp; c</summary></package>"
        );
    }

    #[test]
    fn test_padded_text_is_written_as_cdata() {
        let xml = "<r><package>\n  <summary> leading</summary>\n  <url>  </url>\n</package></r>";

        let fragments = collect(xml, |_, name| name == b"package").unwrap();
        assert_eq!(
            fragments[0].xml,
            "<package><summary><![CDATA[ leading]]></summary><url><![CDATA[  ]]></url></package>"
        );
    }

    #[test]
    fn test_single_quoted_attribute_is_requoted() {
        let xml = r#"<r><entry name='say "hi"'/></r>"#;

        let fragments = collect(xml, |_, name| name == b"entry").unwrap();
        assert_eq!(fragments[0].xml, r#"<entry name="say &quot;hi&quot;"/>"#);
    }

    #[test]
    fn test_records_root_name() {
        let mut reader = FragmentReader::new("<rpm:metadata xmlns:rpm=\"x\"/>".as_bytes(), |_, _| false);
        assert!(reader.next_fragment().unwrap().is_none());
        assert_eq!(reader.root(), Some("metadata"));
    }

    #[test]
    fn test_unclosed_element_is_syntax_error() {
        let result = collect("<metadata><package><name>a</name>", |_, name| name == b"package");
        assert!(matches!(result, Err(ScanError::Syntax(_))));
    }

    #[test]
    fn test_mismatched_end_is_syntax_error() {
        let result = collect("<metadata><package></pkg></metadata>", |_, name| name == b"package");
        assert!(matches!(result, Err(ScanError::Syntax(_))));
    }

    #[test]
    fn test_empty_document_is_syntax_error() {
        let result = collect("", |_, _| true);
        assert!(matches!(result, Err(ScanError::Syntax(_))));
    }

    #[test]
    fn test_element_after_root_is_syntax_error() {
        let xml = "<metadata></metadata><package><name>x</name></package>";
        let result = collect(xml, |_, name| name == b"package");
        assert!(matches!(result, Err(ScanError::Syntax(_))));

        let result = collect("<metadata/><package/>", |_, name| name == b"package");
        assert!(matches!(result, Err(ScanError::Syntax(_))));
    }

    #[test]
    fn test_text_after_root_is_syntax_error() {
        let result = collect("<metadata/>trailing", |_, _| false);
        assert!(matches!(result, Err(ScanError::Syntax(_))));

        let fragments = collect("<metadata></metadata>\n", |_, _| false).unwrap();
        assert!(fragments.is_empty());
    }
}
