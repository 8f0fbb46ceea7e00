//! XML text conversion for [`Document`].
//!
//! Reading keeps text exactly as written, except that whitespace-only text
//! inside an element that also has child elements is dropped (indentation).
//! Writing emits `<name/>` for nodes without children and without text, so
//! indentation never leaks into empty values.

use alloc::borrow::Cow;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::str::FromStr;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::unescape;
use quick_xml::events::attributes::Attributes;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::{Document, NodeId, TreeError};

// -----------------------------------------------------------------------------
// Reading

fn decode_str(bytes: &[u8]) -> Result<&str, TreeError> {
    core::str::from_utf8(bytes).map_err(|_| TreeError::Utf8)
}

fn decode_escaped(bytes: &[u8]) -> Result<Cow<'_, str>, TreeError> {
    let raw = decode_str(bytes)?;
    unescape(raw).map_err(|e| TreeError::Escape(e.to_string()))
}

fn syntax_error(reader: &Reader<&[u8]>, error: impl ToString) -> TreeError {
    TreeError::Syntax {
        position: reader.buffer_position() as u64,
        message: error.to_string(),
    }
}

impl Document {
    /// Parses XML text into a document.
    ///
    /// Declarations, comments, processing instructions and doctypes are skipped.
    /// CDATA sections are appended to the text of the enclosing element.
    pub fn from_xml(xml: &str) -> Result<Self, TreeError> {
        let mut reader = Reader::from_str(xml);
        let mut doc = Document::new();
        let mut stack: Vec<NodeId> = Vec::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| syntax_error(&reader, e))?;

            match event {
                Event::Start(e) => {
                    let node = doc.open_element(&reader, &stack, e.name().as_ref(), e.attributes())?;
                    stack.push(node);
                }
                Event::Empty(e) => {
                    doc.open_element(&reader, &stack, e.name().as_ref(), e.attributes())?;
                }
                Event::End(e) => {
                    let Some(node) = stack.pop() else {
                        let name = e.name();
                        let name = decode_str(name.as_ref())?;
                        return Err(TreeError::Unbalanced(String::from(name)));
                    };
                    doc.drop_indentation(node);
                }
                Event::Text(e) => {
                    if let Some(&node) = stack.last() {
                        let text = decode_escaped(&e)?;
                        doc.push_text(node, &text);
                    }
                }
                Event::CData(e) => {
                    if let Some(&node) = stack.last() {
                        let text = decode_str(&e)?;
                        doc.push_text(node, text);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if doc.root().is_none() {
            return Err(TreeError::Empty);
        }
        Ok(doc)
    }

    fn open_element(
        &mut self,
        reader: &Reader<&[u8]>,
        stack: &[NodeId],
        name: &[u8],
        attributes: Attributes<'_>,
    ) -> Result<NodeId, TreeError> {
        let node = self.create_node(decode_str(name)?);

        for attr in attributes {
            let attr = attr.map_err(|e| syntax_error(reader, e))?;
            let key = decode_str(attr.key.as_ref())?;
            let value = decode_escaped(&attr.value)?;
            self.set_attribute(node, key, value.into_owned());
        }

        match stack.last() {
            Some(&parent) => self.append_child(parent, node),
            None if self.root().is_none() => self.set_root(node),
            None => return Err(TreeError::MultipleRoots),
        }
        Ok(node)
    }

    fn drop_indentation(&mut self, node: NodeId) {
        let indentation = !self.children(node).is_empty()
            && self
                .text(node)
                .is_some_and(|t| t.chars().all(char::is_whitespace));
        if indentation {
            self.clear_text(node);
        }
    }
}

impl FromStr for Document {
    type Err = TreeError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Document::from_xml(s)
    }
}

// -----------------------------------------------------------------------------
// Writing

impl Document {
    /// Writes the document as compact XML text.
    pub fn to_xml(&self) -> Result<String, TreeError> {
        let mut writer = Writer::new(Vec::new());
        self.write_root(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|_| TreeError::Utf8)
    }

    /// Writes the document as XML text indented with `indent` spaces per level.
    pub fn to_xml_pretty(&self, indent: usize) -> Result<String, TreeError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', indent);
        self.write_root(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|_| TreeError::Utf8)
    }

    fn write_root(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), TreeError> {
        let root = self.root().ok_or(TreeError::Empty)?;
        self.write_node(writer, root)
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<(), TreeError> {
        let node = self.node(id);
        let mut start = BytesStart::new(node.name());
        for attr in node.attributes() {
            start.push_attribute(attr);
        }

        let text = node.text().filter(|t| !t.is_empty());
        if node.children().is_empty() && text.is_none() {
            return write_event(writer, Event::Empty(start));
        }

        write_event(writer, Event::Start(start))?;
        if let Some(text) = text {
            write_event(writer, Event::Text(BytesText::new(text)))?;
        }
        for &child in node.children() {
            self.write_node(writer, child)?;
        }
        write_event(writer, Event::End(BytesEnd::new(node.name())))
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), TreeError> {
    writer
        .write_event(event)
        .map_err(|e| TreeError::Write(e.to_string()))
}
