//! MEDLINE citation reader using quick-xml
//!
//! Streams the XML event sequence and materializes one `MedlineCitation`
//! subtree at a time as an owned [`Element`] tree. Citations are found at
//! any depth (`PubmedArticleSet/PubmedArticle/MedlineCitation`,
//! `MedlineCitationSet/MedlineCitation`, ...).

use std::io::BufRead;
use std::path::Path;

use pmjson_core::{ByteCounter, InputReader, open_input};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Tag of a citation record
pub const CITATION_TAG: &[u8] = b"MedlineCitation";

/// Error that ends reading of one input file
#[derive(Debug)]
pub enum ReadError {
    /// I/O or decompression failure
    Io(std::io::Error),
    /// Markup is not well-formed
    Xml { position: u64, message: String },
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO: {e}"),
            Self::Xml { position, message } => write!(f, "at byte {position}: {message}"),
        }
    }
}

impl std::error::Error for ReadError {}

/// A node inside an [`Element`]
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// Owned XML element: name, attributes, and children in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements, in document order
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First child element with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.name == name)
    }

    /// All elements reached by following `path` one child step at a time,
    /// in document order (like the XPath `A/B/C` relative to this element)
    pub fn select(&self, path: &[&str]) -> Vec<&Element> {
        let mut current = vec![self];
        for step in path {
            let mut next = Vec::new();
            for el in current {
                next.extend(el.child_elements().filter(|c| c.name == *step));
            }
            current = next;
        }
        current
    }

    /// Concatenated text content of this element and its descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Text of the first element on `path` that has any text
    pub fn first_text(&self, path: &[&str]) -> Option<String> {
        self.select(path)
            .into_iter()
            .map(Element::text)
            .find(|t| !t.is_empty())
    }

    pub fn push_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.push((key.into(), value.into()));
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn push_text(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            return;
        }
        // Merge adjacent text (escaped text followed by CDATA, etc.)
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }
}

/// Lazy, forward-only sequence of citation elements from one XML stream.
///
/// Not restartable: a second pass needs a new reader. The first error
/// ends the sequence.
pub struct CitationReader<R: BufRead> {
    reader: Reader<R>,
    /// Open elements outside any citation
    depth: usize,
    /// A root element has been opened; once it closes, no other may follow
    seen_root: bool,
    done: bool,
}

impl CitationReader<InputReader> {
    /// Open a file, gunzipping `.gz` transparently. The counter tracks
    /// on-disk bytes consumed so far.
    pub fn open(path: &Path) -> std::io::Result<(Self, ByteCounter)> {
        let (input, counter) = open_input(path)?;
        Ok((Self::new(input), counter))
    }
}

impl<'a> CitationReader<&'a [u8]> {
    pub fn from_str(xml: &'a str) -> Self {
        Self::new(xml.as_bytes())
    }
}

impl<R: BufRead> CitationReader<R> {
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().check_end_names = true;
        Self {
            reader,
            depth: 0,
            seen_root: false,
            done: false,
        }
    }

    fn xml_error(&self, message: impl Into<String>) -> ReadError {
        ReadError::Xml {
            position: self.reader.buffer_position(),
            message: message.into(),
        }
    }

    fn convert_error(&self, e: quick_xml::Error) -> ReadError {
        match e {
            quick_xml::Error::Io(io) => {
                ReadError::Io(std::io::Error::new(io.kind(), io.to_string()))
            }
            other => self.xml_error(other.to_string()),
        }
    }

    /// A start tag at depth 0 after the root has closed
    fn check_single_root(&self) -> Result<(), ReadError> {
        if self.depth == 0 && self.seen_root {
            return Err(self.xml_error("multiple root elements"));
        }
        Ok(())
    }

    /// Advance to the next citation, building its subtree
    fn next_citation(&mut self) -> Result<Option<Element>, ReadError> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let event = self.reader.read_event_into(&mut buf);
            match event {
                Ok(Event::Start(e)) => {
                    self.check_single_root()?;
                    self.seen_root = true;
                    if e.name().as_ref() == CITATION_TAG {
                        let start = start_element(&e).map_err(|m| self.xml_error(m))?;
                        return self.build_subtree(start, &mut buf).map(Some);
                    }
                    self.depth += 1;
                }
                Ok(Event::Empty(e)) => {
                    self.check_single_root()?;
                    self.seen_root = true;
                    if e.name().as_ref() == CITATION_TAG {
                        return start_element(&e).map(Some).map_err(|m| self.xml_error(m));
                    }
                }
                Ok(Event::End(_)) => {
                    self.depth = self.depth.saturating_sub(1);
                }
                Ok(Event::Text(e)) if self.depth == 0 => {
                    let raw = e.unescape().map_err(|e| self.xml_error(e.to_string()))?;
                    if !raw.trim().is_empty() {
                        return Err(self.xml_error("text outside the root element"));
                    }
                }
                Ok(Event::Eof) => {
                    if self.depth > 0 {
                        return Err(self.xml_error("unexpected end of document"));
                    }
                    if !self.seen_root {
                        return Err(self.xml_error("document has no root element"));
                    }
                    return Ok(None);
                }
                Ok(_) => {}
                Err(e) => return Err(self.convert_error(e)),
            }
        }
    }

    /// Read events until the element opened by `root` closes
    fn build_subtree(&mut self, root: Element, buf: &mut Vec<u8>) -> Result<Element, ReadError> {
        let mut stack = vec![root];
        loop {
            buf.clear();
            let event = self.reader.read_event_into(buf);
            match event {
                Ok(Event::Start(e)) => {
                    let el = start_element(&e).map_err(|m| self.xml_error(m))?;
                    stack.push(el);
                }
                Ok(Event::Empty(e)) => {
                    let el = start_element(&e).map_err(|m| self.xml_error(m))?;
                    if let Some(parent) = stack.last_mut() {
                        parent.push_child(el);
                    }
                }
                Ok(Event::End(_)) => {
                    let Some(done) = stack.pop() else {
                        return Err(self.xml_error("unbalanced end tag"));
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.push_child(done),
                        None => return Ok(done),
                    }
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|e| self.xml_error(e.to_string()))?;
                    if let Some(top) = stack.last_mut() {
                        top.push_text(text);
                    }
                }
                Ok(Event::CData(e)) => {
                    let data = e.into_inner();
                    if let Some(top) = stack.last_mut() {
                        top.push_text(String::from_utf8_lossy(&data));
                    }
                }
                Ok(Event::Eof) => return Err(self.xml_error("unexpected end of document")),
                Ok(_) => {}
                Err(e) => return Err(self.convert_error(e)),
            }
        }
    }
}

/// Element with name and unescaped attributes from a start tag
fn start_element(e: &BytesStart<'_>) -> Result<Element, String> {
    let mut el = Element::new(String::from_utf8_lossy(e.name().as_ref()));
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        el.push_attr(key, value);
    }
    Ok(el)
}

impl<R: BufRead> Iterator for CitationReader<R> {
    type Item = Result<Element, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_citation() {
            Ok(Some(el)) => Some(Ok(el)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: BufRead> std::iter::FusedIterator for CitationReader<R> {}
