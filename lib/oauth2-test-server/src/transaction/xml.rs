use indexmap::IndexMap;
use xml::Encoding;
use xml::reader::{ParserConfig, XmlEvent};

/// Errors raised while building an [`XmlElement`] tree.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum XmlError {
    /// The document is not well-formed.
    #[display("malformed XML: {_0}")]
    Malformed(xml::reader::Error),

    /// The document has no root element.
    #[display("XML document has no root element")]
    MissingRootElement,
}

/// A generic XML element tree.
///
/// Whitespace-only text between elements is dropped, other character data (including
/// CDATA sections) is kept in document order in [`XmlElement::text`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Local name of the element.
    pub name: String,
    /// Namespace URI, if the element is qualified.
    pub namespace: Option<String>,
    /// Attributes by local name, in document order.
    pub attributes: IndexMap<String, String>,
    /// Child elements, in document order.
    pub children: Vec<XmlElement>,
    /// Character data directly inside this element.
    pub text: String,
}

impl XmlElement {
    /// Parses a document and returns its root element.
    ///
    /// The document is already text, so its encoding declaration is not applied.
    ///
    /// # Errors
    ///
    /// Returns an [`XmlError`] if the document is not well-formed, including when it
    /// has more than one root element.
    pub fn parse(document: &str) -> Result<Self, XmlError> {
        let reader = ParserConfig::new()
            .allow_multiple_root_elements(false)
            .override_encoding(Some(Encoding::Utf8))
            .ignore_invalid_encoding_declarations(true)
            .create_reader(document.as_bytes());
        let mut open = Vec::<XmlElement>::new();
        let mut root = None;

        for event in reader {
            match event? {
                XmlEvent::StartElement {
                    name, attributes, ..
                } => {
                    open.push(Self {
                        name: name.local_name,
                        namespace: name.namespace,
                        attributes: attributes
                            .into_iter()
                            .map(|attribute| (attribute.name.local_name, attribute.value))
                            .collect(),
                        ..Self::default()
                    });
                }
                XmlEvent::EndElement { .. } => {
                    if let Some(element) = open.pop() {
                        match open.last_mut() {
                            Some(parent) => parent.children.push(element),
                            None => root = Some(element),
                        }
                    }
                }
                XmlEvent::Characters(text) | XmlEvent::CData(text) => {
                    if let Some(current) = open.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                _ => {}
            }
        }

        root.ok_or(XmlError::MissingRootElement)
    }

    /// Returns an attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Returns the first child element with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Iterates over child elements with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Concatenated text of this element and all its descendants.
    pub fn value(&self) -> String {
        let mut value = self.text.clone();
        for child in &self.children {
            value.push_str(&child.value());
        }
        value
    }
}
