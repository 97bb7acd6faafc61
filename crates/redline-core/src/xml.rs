//! WordprocessingML fragments
//!
//! Reads and writes the subset of `w:` markup the node model covers:
//! paragraphs, runs and their properties, text, tabs, breaks, tracked
//! insertions and deletions, hyperlinks, simple fields, bookmarks, inline
//! drawings and tables. Fragments carry no namespace declarations; elements
//! are matched by local name when reading.
//!
//! Elements outside that subset are skipped together with their content,
//! except for a few transparent wrappers (`w:body`, `w:sdt`, ...) whose
//! children are read as if the wrapper were absent.

use crate::document::Document;
use crate::error::{EditError, XmlError};
use crate::formatting::{Formatting, UnderlineStyle, VerticalAlign};
use crate::node::{HyperlinkTarget, NodeId, NodeKind, TextTag};
use crate::revision::{RevisionKind, RevisionMeta};
use chrono::{DateTime, Utc};
use quick_xml::{Reader, Writer};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

type XmlWriter = Writer<Vec<u8>>;

// -------------------------------------------------------------------------
// Writing

fn open(writer: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<(), XmlError> {
    let mut start = BytesStart::new(name);
    for &attr in attrs {
        start.push_attribute(attr);
    }
    writer.write_event(Event::Start(start))?;
    Ok(())
}

fn close(writer: &mut XmlWriter, name: &str) -> Result<(), XmlError> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn empty(writer: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<(), XmlError> {
    let mut start = BytesStart::new(name);
    for &attr in attrs {
        start.push_attribute(attr);
    }
    writer.write_event(Event::Empty(start))?;
    Ok(())
}

fn toggle(writer: &mut XmlWriter, name: &str, value: Option<bool>) -> Result<(), XmlError> {
    match value {
        Some(true) => empty(writer, name, &[]),
        Some(false) => empty(writer, name, &[("w:val", "0")]),
        None => Ok(()),
    }
}

fn valued(writer: &mut XmlWriter, name: &str, value: Option<&str>) -> Result<(), XmlError> {
    match value {
        Some(value) => empty(writer, name, &[("w:val", value)]),
        None => Ok(()),
    }
}

fn write_properties(writer: &mut XmlWriter, formatting: &Formatting) -> Result<(), XmlError> {
    if formatting.is_empty() {
        return empty(writer, "w:rPr", &[]);
    }
    open(writer, "w:rPr", &[])?;
    if let Some(family) = &formatting.font_family {
        empty(
            writer,
            "w:rFonts",
            &[("w:ascii", family.as_str()), ("w:hAnsi", family.as_str())],
        )?;
    }
    toggle(writer, "w:b", formatting.bold)?;
    toggle(writer, "w:i", formatting.italic)?;
    toggle(writer, "w:caps", formatting.caps)?;
    toggle(writer, "w:strike", formatting.strike)?;
    valued(writer, "w:color", formatting.color.as_deref())?;
    let size = formatting.size.map(|s| s.to_string());
    valued(writer, "w:sz", size.as_deref())?;
    valued(writer, "w:highlight", formatting.highlight.as_deref())?;
    valued(writer, "w:u", formatting.underline.map(UnderlineStyle::as_str))?;
    valued(
        writer,
        "w:vertAlign",
        formatting.vertical_align.map(VerticalAlign::as_str),
    )?;
    valued(writer, "w:lang", formatting.language.as_deref())?;
    close(writer, "w:rPr")
}

/// Serialize run properties as a `w:rPr` fragment.
pub fn properties_to_xml(formatting: &Formatting) -> Result<String, XmlError> {
    let mut writer = Writer::new(Vec::new());
    write_properties(&mut writer, formatting)?;
    Ok(String::from_utf8(writer.into_inner())?)
}

/// Parse a `w:rPr` fragment; unknown properties are ignored.
pub fn properties_from_xml(xml: &str) -> Result<Formatting, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut formatting = Formatting::default();
    let mut inside = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"rPr" => inside = true,
            Event::End(e) if e.local_name().as_ref() == b"rPr" => inside = false,
            Event::Start(e) | Event::Empty(e) if inside => {
                apply_property(&mut formatting, e.local_name().as_ref(), &attributes(&e)?)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(formatting)
}

fn write_node(doc: &Document, writer: &mut XmlWriter, id: NodeId) -> Result<(), XmlError> {
    let arena = doc.arena();
    let children = |writer: &mut XmlWriter| -> Result<(), XmlError> {
        for &child in arena.children(id) {
            write_node(doc, writer, child)?;
        }
        Ok(())
    };

    let element = match arena.kind(id) {
        NodeKind::Body => "w:body",
        NodeKind::Table => "w:tbl",
        NodeKind::TableRow => "w:tr",
        NodeKind::TableCell => "w:tc",
        NodeKind::Paragraph => "w:p",
        NodeKind::Run { formatting } => {
            open(writer, "w:r", &[])?;
            if let Some(formatting) = formatting {
                write_properties(writer, formatting)?;
            }
            children(writer)?;
            return close(writer, "w:r");
        }
        NodeKind::Text {
            value,
            tag,
            preserve_space,
        } => {
            let element = match tag {
                TextTag::Live => "w:t",
                TextTag::Struck => "w:delText",
            };
            let attrs: &[(&str, &str)] = if *preserve_space {
                &[("xml:space", "preserve")]
            } else {
                &[]
            };
            open(writer, element, attrs)?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            return close(writer, element);
        }
        NodeKind::Tab => return empty(writer, "w:tab", &[]),
        NodeKind::Break => return empty(writer, "w:br", &[]),
        NodeKind::Revision { kind, meta } => {
            let element = match kind {
                RevisionKind::Insertion => "w:ins",
                RevisionKind::Deletion => "w:del",
            };
            let rev_id = meta.id.to_string();
            let date = meta.date.format(DATE_FORMAT).to_string();
            let mut attrs = vec![("w:id", rev_id.as_str())];
            if let Some(author) = &meta.author {
                attrs.push(("w:author", author.as_str()));
            }
            attrs.push(("w:date", date.as_str()));
            open(writer, element, &attrs)?;
            children(writer)?;
            return close(writer, element);
        }
        NodeKind::Hyperlink { target } => {
            let attr = match target {
                HyperlinkTarget::Anchor(anchor) => ("w:anchor", anchor.as_str()),
                HyperlinkTarget::Relationship(rel) => ("r:id", rel.as_str()),
            };
            open(writer, "w:hyperlink", &[attr])?;
            children(writer)?;
            return close(writer, "w:hyperlink");
        }
        NodeKind::Field { instruction } => {
            open(writer, "w:fldSimple", &[("w:instr", instruction.as_str())])?;
            children(writer)?;
            return close(writer, "w:fldSimple");
        }
        NodeKind::BookmarkStart { id, name } => {
            let id = id.to_string();
            return empty(
                writer,
                "w:bookmarkStart",
                &[("w:id", id.as_str()), ("w:name", name.as_str())],
            );
        }
        NodeKind::BookmarkEnd { id } => {
            let id = id.to_string();
            return empty(writer, "w:bookmarkEnd", &[("w:id", id.as_str())]);
        }
        NodeKind::Drawing { id, name } => {
            let id = id.to_string();
            open(writer, "w:drawing", &[])?;
            open(writer, "wp:inline", &[])?;
            empty(
                writer,
                "wp:docPr",
                &[("id", id.as_str()), ("name", name.as_str())],
            )?;
            close(writer, "wp:inline")?;
            return close(writer, "w:drawing");
        }
    };

    open(writer, element, &[])?;
    children(writer)?;
    close(writer, element)
}

// -------------------------------------------------------------------------
// Reading

fn attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>, XmlError> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        out.push((key, value));
    }
    Ok(out)
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn parse_number(value: &str) -> Result<u32, XmlError> {
    value
        .trim()
        .parse()
        .map_err(|_| XmlError::InvalidNumber(value.to_string()))
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, XmlError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| XmlError::InvalidDate(value.to_string()))
}

fn parse_toggle(attrs: &[(String, String)]) -> bool {
    !matches!(attr(attrs, "val"), Some("0" | "false" | "off"))
}

fn apply_property(
    formatting: &mut Formatting,
    name: &[u8],
    attrs: &[(String, String)],
) -> Result<(), XmlError> {
    let val = || attr(attrs, "val").map(str::to_string);
    match name {
        b"b" => formatting.bold = Some(parse_toggle(attrs)),
        b"i" => formatting.italic = Some(parse_toggle(attrs)),
        b"caps" => formatting.caps = Some(parse_toggle(attrs)),
        b"strike" => formatting.strike = Some(parse_toggle(attrs)),
        b"color" => formatting.color = val(),
        b"highlight" => formatting.highlight = val(),
        b"lang" => formatting.language = val(),
        b"u" => formatting.underline = attr(attrs, "val").map(UnderlineStyle::parse),
        b"vertAlign" => formatting.vertical_align = attr(attrs, "val").map(VerticalAlign::parse),
        b"sz" => formatting.size = attr(attrs, "val").map(parse_number).transpose()?,
        b"rFonts" => {
            formatting.font_family = attr(attrs, "ascii")
                .or_else(|| attr(attrs, "hAnsi"))
                .map(str::to_string);
        }
        _ => {}
    }
    Ok(())
}

enum Frame {
    /// An element that produced a node; children attach to it.
    Node(NodeId),
    /// A wrapper whose children are read as if it were absent.
    Transparent,
    /// An element skipped together with its content.
    Skip,
    /// Run properties being collected.
    Properties(Formatting),
    /// Text being collected.
    Text { preserve_space: bool, value: String },
    /// An inline drawing; only its `docPr` is read.
    Drawing { id: Option<u32>, name: String },
}

/// Nodes read from a fragment, still detached from the body.
struct Fragment {
    /// Top-level nodes in document order.
    created: Vec<NodeId>,
    /// Revisions and drawings that carried no id of their own.
    unnumbered: Vec<NodeId>,
}

struct FragmentReader<'d> {
    doc: &'d mut Document,
    root: NodeId,
    stack: Vec<Frame>,
    created: Vec<NodeId>,
    unnumbered: Vec<NodeId>,
}

impl<'d> FragmentReader<'d> {
    fn new(doc: &'d mut Document, root: NodeId) -> Self {
        Self {
            doc,
            root,
            stack: Vec::new(),
            created: Vec::new(),
            unnumbered: Vec::new(),
        }
    }

    fn parent(&self) -> NodeId {
        self.stack
            .iter()
            .rev()
            .find_map(|frame| match frame {
                Frame::Node(id) => Some(*id),
                _ => None,
            })
            .unwrap_or(self.root)
    }

    fn attach(&mut self, kind: NodeKind) -> NodeId {
        let node = self.doc.arena.alloc(kind);
        let parent = self.parent();
        self.doc.arena.append_child(parent, node);
        if parent == self.root {
            self.created.push(node);
        }
        node
    }

    fn text_tag(&self) -> TextTag {
        self.stack
            .iter()
            .rev()
            .find_map(|frame| match frame {
                Frame::Node(id) => self.doc.arena.kind(*id).revision_kind(),
                _ => None,
            })
            .map_or(TextTag::Live, RevisionKind::text_tag)
    }

    /// Missing ids are left as 0 and filled in once the fragment is accepted.
    fn revision_meta(&self, attrs: &[(String, String)]) -> Result<RevisionMeta, XmlError> {
        let id = attr(attrs, "id").map(parse_number).transpose()?.unwrap_or(0);
        let date = match attr(attrs, "date") {
            Some(date) => parse_date(date)?,
            None => self.doc.revision_date(),
        };
        Ok(RevisionMeta {
            id,
            author: attr(attrs, "author")
                .filter(|a| !a.is_empty())
                .map(str::to_string),
            date,
        })
    }

    fn open(&mut self, e: &BytesStart<'_>) -> Result<Frame, XmlError> {
        let local = e.local_name();
        let name = local.as_ref();
        let attrs = attributes(e)?;

        if let Some(Frame::Drawing { id, name: title }) = self
            .stack
            .iter_mut()
            .rev()
            .find(|frame| matches!(frame, Frame::Drawing { .. }))
        {
            if name == b"docPr" {
                if let Some(value) = attr(&attrs, "id") {
                    *id = Some(parse_number(value)?);
                }
                if let Some(value) = attr(&attrs, "name") {
                    *title = value.to_string();
                }
            }
            return Ok(Frame::Skip);
        }

        match self.stack.last_mut() {
            Some(Frame::Skip) => return Ok(Frame::Skip),
            Some(Frame::Properties(formatting)) => {
                apply_property(formatting, name, &attrs)?;
                return Ok(Frame::Skip);
            }
            _ => {}
        }

        let kind = match name {
            b"document" | b"body" | b"sdt" | b"sdtContent" | b"smartTag" | b"customXml" => {
                return Ok(Frame::Transparent);
            }
            b"rPr" if self.doc.arena.kind(self.parent()).is_run() => {
                return Ok(Frame::Properties(Formatting::default()));
            }
            b"t" | b"delText" => {
                return Ok(Frame::Text {
                    preserve_space: attr(&attrs, "space") == Some("preserve"),
                    value: String::new(),
                });
            }
            b"drawing" => {
                return Ok(Frame::Drawing {
                    id: None,
                    name: String::new(),
                });
            }
            b"p" => NodeKind::Paragraph,
            b"tbl" => NodeKind::Table,
            b"tr" => NodeKind::TableRow,
            b"tc" => NodeKind::TableCell,
            b"r" => NodeKind::Run { formatting: None },
            b"tab" => NodeKind::Tab,
            b"br" | b"cr" => NodeKind::Break,
            b"ins" | b"del" => {
                let kind = if name == b"ins" {
                    RevisionKind::Insertion
                } else {
                    RevisionKind::Deletion
                };
                let meta = self.revision_meta(&attrs)?;
                let node = self.attach(NodeKind::Revision { kind, meta });
                if attr(&attrs, "id").is_none() {
                    self.unnumbered.push(node);
                }
                return Ok(Frame::Node(node));
            }
            b"hyperlink" => {
                let target = match (attr(&attrs, "anchor"), attr(&attrs, "id")) {
                    (Some(anchor), _) => HyperlinkTarget::Anchor(anchor.to_string()),
                    (None, Some(rel)) => HyperlinkTarget::Relationship(rel.to_string()),
                    (None, None) => HyperlinkTarget::Anchor(String::new()),
                };
                NodeKind::Hyperlink { target }
            }
            b"fldSimple" => NodeKind::Field {
                instruction: attr(&attrs, "instr").unwrap_or_default().to_string(),
            },
            b"bookmarkStart" => NodeKind::BookmarkStart {
                id: parse_number(attr(&attrs, "id").unwrap_or_default())?,
                name: attr(&attrs, "name").unwrap_or_default().to_string(),
            },
            b"bookmarkEnd" => NodeKind::BookmarkEnd {
                id: parse_number(attr(&attrs, "id").unwrap_or_default())?,
            },
            _ => return Ok(Frame::Skip),
        };
        Ok(Frame::Node(self.attach(kind)))
    }

    fn close(&mut self, frame: Frame) {
        match frame {
            Frame::Text {
                preserve_space,
                value,
            } if !value.is_empty() => {
                let tag = self.text_tag();
                self.attach(NodeKind::Text {
                    value,
                    tag,
                    preserve_space,
                });
            }
            Frame::Properties(properties) => {
                let run = self.parent();
                if let NodeKind::Run { formatting } = self.doc.arena.kind_mut(run) {
                    *formatting = Some(properties);
                }
            }
            Frame::Drawing { id, name } => {
                let node = self.attach(NodeKind::Drawing {
                    id: id.unwrap_or(0),
                    name,
                });
                if id.is_none() {
                    self.unnumbered.push(node);
                }
            }
            _ => {}
        }
    }

    fn read(mut self, xml: &str) -> Result<Fragment, XmlError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);
        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let frame = self.open(&e)?;
                    self.stack.push(frame);
                }
                Event::Empty(e) => {
                    let frame = self.open(&e)?;
                    self.close(frame);
                }
                Event::End(_) => {
                    if let Some(frame) = self.stack.pop() {
                        self.close(frame);
                    }
                }
                Event::Text(t) => {
                    if let Some(Frame::Text { value, .. }) = self.stack.last_mut() {
                        value.push_str(&t.unescape()?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(Fragment {
            created: self.created,
            unnumbered: self.unnumbered,
        })
    }
}

impl Document {
    /// Serialize one paragraph as a `w:p` fragment.
    pub fn paragraph_to_xml(&self, paragraph: NodeId) -> Result<String, XmlError> {
        let paragraph = self.paragraph(paragraph)?;
        let mut writer = Writer::new(Vec::new());
        write_node(self, &mut writer, paragraph)?;
        Ok(String::from_utf8(writer.into_inner())?)
    }

    /// Serialize the whole body as a `w:body` fragment.
    pub fn to_xml(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new(Vec::new());
        write_node(self, &mut writer, self.body)?;
        Ok(String::from_utf8(writer.into_inner())?)
    }

    /// Build a document from a body fragment (or a bare sequence of
    /// paragraphs and tables).
    pub fn from_xml(xml: &str) -> Result<Self, XmlError> {
        let mut doc = Document::bare();
        doc.import_xml(xml)?;
        if doc.paragraphs().is_empty() {
            doc.append_paragraph("");
        }
        Ok(doc)
    }

    /// Append the paragraphs and tables of a fragment to the body.
    ///
    /// Nothing is attached and no id is consumed unless the whole fragment
    /// parses and its top level holds only paragraphs and tables. Imported
    /// marker ids are registered with the allocator, revisions and drawings
    /// without an id get fresh ones, and duplicates are renumbered.
    /// Returns the top-level nodes that were appended.
    pub fn import_xml(&mut self, xml: &str) -> Result<Vec<NodeId>, XmlError> {
        let scratch = self.arena.alloc(NodeKind::Body);
        let Fragment {
            created,
            unnumbered,
        } = FragmentReader::new(self, scratch).read(xml)?;

        if let Some(&stray) = created
            .iter()
            .find(|&&node| !matches!(self.arena.kind(node), NodeKind::Paragraph | NodeKind::Table))
        {
            tracing::debug!(node = %stray, "rejected fragment with inline content at the top level");
            return Err(EditError::InvalidContainer(self.body).into());
        }

        let mut imported = Vec::new();
        for &node in &created {
            self.arena.append_child(self.body, node);
            imported.extend(
                std::iter::once(node)
                    .chain(self.arena.descendants(node))
                    .filter(|id| !unnumbered.contains(id))
                    .filter_map(|id| match self.arena.kind(id) {
                        NodeKind::BookmarkStart { id, .. }
                        | NodeKind::BookmarkEnd { id }
                        | NodeKind::Drawing { id, .. } => Some(*id),
                        _ => None,
                    }),
            );
        }
        self.ids.observe(imported);

        for node in unnumbered {
            let fresh = if matches!(self.arena.kind(node), NodeKind::Drawing { .. }) {
                self.next_id()
            } else {
                self.next_revision_id()
            };
            match self.arena.kind_mut(node) {
                NodeKind::Drawing { id, .. } => *id = fresh,
                NodeKind::Revision { meta, .. } => meta.id = fresh,
                _ => {}
            }
        }
        let renumbered = self.renumber_marker_ids();
        tracing::debug!(nodes = created.len(), renumbered, "imported fragment");
        Ok(created)
    }
}
